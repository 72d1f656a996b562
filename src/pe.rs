//! Low-level PE file format access through the goblin and pelite libraries

use crate::common::LookupError;
use std::path::Path;
use tracing::warn;

/// Source of the import table of a binary
///
/// The dependency scan only needs the names of the imported DLLs, in import table order; any
/// other executable format can be supported by implementing this trait.
pub trait ImportReader {
    /// read the names of the DLLs this executable depends on
    fn read_dependencies(&self, path: &Path) -> Result<Vec<String>, LookupError>;
}

/// Reads import tables from PE files on disk
#[derive(Debug, Default, Clone, Copy)]
pub struct PEImportReader;

impl ImportReader for PEImportReader {
    fn read_dependencies(&self, path: &Path) -> Result<Vec<String>, LookupError> {
        let content = fs_err::read(path)?;
        read_dependencies_from_bytes(&content).map_err(|reason| LookupError::DecodeError {
            path: path.to_owned(),
            reason,
        })
    }
}

/// read the imported DLL names from the content of a PE file
///
/// Names are returned in import table order, each listed once.
pub fn read_dependencies_from_bytes(content: &[u8]) -> Result<Vec<String>, String> {
    // prefer goblin since it seems to be less fragile
    let goblin_error = match goblin::Object::parse(content) {
        Ok(goblin::Object::PE(pe)) => return Ok(goblin_dependencies(&pe)),
        Ok(_) => return Err("unexpected executable format, not a PE file".to_owned()),
        Err(e) => e,
    };

    pelite_dependencies(content).map_err(|pelite_error| {
        format!("{} (pelite: {})", goblin_error, pelite_error)
    })
}

fn push_unique(names: &mut Vec<String>, name: &str) {
    if !names.iter().any(|n| n.eq_ignore_ascii_case(name)) {
        names.push(name.to_owned());
    }
}

// DLL names are ASCII in practice, anything else cannot be looked up
fn push_decoded<E: std::fmt::Display>(names: &mut Vec<String>, name: Result<&str, E>) {
    match name {
        Ok(s) => push_unique(names, s),
        Err(e) => warn!("skipping import with a non UTF-8 DLL name: {}", e),
    }
}

fn goblin_dependencies(pe: &goblin::pe::PE) -> Vec<String> {
    // the libraries list is sorted by goblin, the per-symbol imports keep the table order
    let mut names = Vec::new();
    for import in &pe.imports {
        push_unique(&mut names, import.dll);
    }
    // DLLs from which no symbol is imported only show up in the libraries list
    for lib in &pe.libraries {
        push_unique(&mut names, lib);
    }
    names
}

fn pelite_dependencies(content: &[u8]) -> Result<Vec<String>, pelite::Error> {
    match pelite_dependencies_pe64(content) {
        Err(pelite::Error::PeMagic) => pelite_dependencies_pe32(content),
        res => res,
    }
}

fn pelite_dependencies_pe64(content: &[u8]) -> Result<Vec<String>, pelite::Error> {
    use pelite::pe64::Pe;
    let pefile = pelite::pe64::PeFile::from_bytes(content)?;
    let imports = match pefile.imports() {
        Ok(imports) => imports,
        // there is no import directory
        Err(pelite::Error::Null) => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };
    let mut names = Vec::new();
    for desc in imports.iter() {
        push_decoded(&mut names, desc.dll_name()?.to_str());
    }
    Ok(names)
}

fn pelite_dependencies_pe32(content: &[u8]) -> Result<Vec<String>, pelite::Error> {
    use pelite::pe32::Pe;
    let pefile = pelite::pe32::PeFile::from_bytes(content)?;
    let imports = match pefile.imports() {
        Ok(imports) => imports,
        // there is no import directory
        Err(pelite::Error::Null) => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };
    let mut names = Vec::new();
    for desc in imports.iter() {
        push_decoded(&mut names, desc.dll_name()?.to_str());
    }
    Ok(names)
}

/// Import tables given as data, keyed by file name (case-insensitive)
#[cfg(test)]
#[derive(Debug, Default, Clone)]
pub(crate) struct StaticImports {
    tables: std::collections::HashMap<String, Vec<String>>,
    pub(crate) reads: std::cell::RefCell<Vec<std::path::PathBuf>>,
}

#[cfg(test)]
impl StaticImports {
    pub(crate) fn with(mut self, file_name: &str, imports: &[&str]) -> Self {
        self.tables.insert(
            crate::common::normalized_name(file_name),
            imports.iter().map(|&s| s.to_owned()).collect(),
        );
        self
    }
}

#[cfg(test)]
impl ImportReader for StaticImports {
    fn read_dependencies(&self, path: &Path) -> Result<Vec<String>, LookupError> {
        self.reads.borrow_mut().push(path.to_owned());
        let file_name = path
            .file_name()
            .and_then(|s| s.to_str())
            .map(crate::common::normalized_name)
            .unwrap_or_default();
        self.tables
            .get(&file_name)
            .cloned()
            .ok_or_else(|| LookupError::DecodeError {
                path: path.to_owned(),
                reason: "no import table".to_owned(),
            })
    }
}
