use crate::common::{normalized_name, path_to_string, LookupError};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Sorted list of directories to be looked up when searching for a DLL
///
/// Every directory is searched recursively; the first directory yielding a match wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LookupPath {
    pub entries: Vec<PathBuf>,
}

fn is_glob_pattern(s: &str) -> bool {
    s.contains(['*', '?', '['])
}

impl LookupPath {
    pub fn new<I, P>(entries: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            entries: entries.into_iter().map(Into::into).collect(),
        }
    }

    /// Build the search path from configuration entries, which may contain glob patterns
    ///
    /// A pattern is replaced by the directories it matches, in sorted order; a pattern matching
    /// nothing is dropped. Literal entries are kept even if they don't exist.
    pub fn from_patterns<S: AsRef<str>>(patterns: &[S]) -> Result<Self, LookupError> {
        let mut entries = Vec::new();
        for p in patterns {
            let p: &str = p.as_ref();
            if is_glob_pattern(p) {
                let mut matches: Vec<PathBuf> = glob::glob(p)?
                    .filter_map(Result::ok)
                    .filter(|m| m.is_dir())
                    .collect();
                if matches.is_empty() {
                    debug!("search path pattern {} matches no directory", p);
                }
                matches.sort();
                entries.extend(matches);
            } else {
                entries.push(PathBuf::from(p));
            }
        }
        Ok(Self { entries })
    }

    /// Prepend directories, which then take precedence over the current entries
    pub fn prepend<I, P>(&mut self, dirs: I)
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let mut new_entries: Vec<PathBuf> = dirs.into_iter().map(Into::into).collect();
        new_entries.append(&mut self.entries);
        self.entries = new_entries;
    }

    pub fn search_path(&self) -> &[PathBuf] {
        &self.entries
    }

    /// looks for a DLL by name, comparing file names case-insensitively
    ///
    /// Returns the full path of the first match, scanning the entries in order and each directory
    /// tree depth-first with siblings sorted by name.
    pub fn search_dll(&self, dllname: &str) -> Option<PathBuf> {
        let wanted = normalized_name(dllname);
        let found = self
            .entries
            .iter()
            .find_map(|dir| search_file_in_tree(&wanted, dir));
        match &found {
            Some(p) => debug!("{} => {}", dllname, path_to_string(p)),
            None => debug!("{} => not found", dllname),
        }
        found
    }
}

// an unreadable or missing directory simply contributes no match
fn search_file_in_tree(wanted: &str, root: &Path) -> Option<PathBuf> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(e) => Some(e),
            Err(err) => {
                if err
                    .io_error()
                    .is_some_and(|e| e.kind() == std::io::ErrorKind::NotFound)
                {
                    debug!("skipping missing search directory {}", path_to_string(root));
                } else {
                    warn!("error while scanning {}: {}", path_to_string(root), err);
                }
                None
            }
        })
        .filter(|e| {
            e.file_type().is_file() || (e.file_type().is_symlink() && e.path().is_file())
        })
        .find(|e| {
            e.file_name()
                .to_str()
                .is_some_and(|s| normalized_name(s) == wanted)
        })
        .map(|e| e.into_path())
}
