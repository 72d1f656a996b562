use crate::common::normalized_name;
use serde::Serialize;
use std::collections::HashSet;
use std::path::PathBuf;

/// A DLL that was found on the search path
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedDependency {
    /// Name as it appears in the import table of the first importer
    pub dllname: String,
    /// full path of the file that was found
    pub full_path: PathBuf,
}

/// Outcome of a dependency scan
///
/// Both lists keep the order in which the DLLs were first discovered; a DLL name (compared
/// case-insensitively) appears at most once across `resolved` and `missing`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Resolution {
    /// non-system DLLs that were found, in breadth-first discovery order
    pub resolved: Vec<ResolvedDependency>,
    /// non-system DLLs that are imported but could not be found
    pub missing: Vec<String>,
    /// system DLLs that were imported and skipped
    pub system: Vec<String>,
    #[serde(skip)]
    index: HashSet<String>,
}

impl Resolution {
    pub fn new() -> Self {
        Self::default()
    }

    /// true if the DLL was already resolved, reported missing or skipped as a system DLL
    pub fn contains(&self, dllname: &str) -> bool {
        self.index.contains(&normalized_name(dllname))
    }

    pub fn get(&self, dllname: &str) -> Option<&ResolvedDependency> {
        let key = normalized_name(dllname);
        self.resolved
            .iter()
            .find(|r| normalized_name(&r.dllname) == key)
    }

    pub fn is_missing(&self, dllname: &str) -> bool {
        let key = normalized_name(dllname);
        self.missing.iter().any(|m| normalized_name(m) == key)
    }

    pub(crate) fn insert_resolved(&mut self, found: ResolvedDependency) -> bool {
        if self.index.insert(normalized_name(&found.dllname)) {
            self.resolved.push(found);
            true
        } else {
            false
        }
    }

    pub(crate) fn insert_missing(&mut self, dllname: &str) -> bool {
        if self.index.insert(normalized_name(dllname)) {
            self.missing.push(dllname.to_owned());
            true
        } else {
            false
        }
    }

    pub(crate) fn insert_system(&mut self, dllname: &str) -> bool {
        if self.index.insert(normalized_name(dllname)) {
            self.system.push(dllname.to_owned());
            true
        } else {
            false
        }
    }

    pub fn resolved_names(&self) -> Vec<&str> {
        self.resolved.iter().map(|r| r.dllname.as_str()).collect()
    }
}
