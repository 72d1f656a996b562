//! Configuration of the DLL scan: where to look for DLLs, and which ones to ignore

use crate::common::LookupError;
use crate::lookup_path::LookupPath;
use crate::system::{SystemLibraries, SystemLibraryTable};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Search path of the MinGW-w64 cross toolchain as packaged by Debian and Ubuntu
///
/// The GCC runtime directory is versioned, hence the pattern.
pub const MINGW_SEARCH_PATH: &[&str] = &[
    "/usr/x86_64-w64-mingw32/bin",
    "/usr/x86_64-w64-mingw32/lib",
    "/usr/lib/gcc/x86_64-w64-mingw32/*-posix",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DeployConfig {
    /// Directories searched (recursively, in order) for the imported DLLs; glob patterns allowed
    pub search_path: Vec<String>,
    /// DLLs provided by the target platform
    pub system_libraries: SystemLibraryTable,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            search_path: MINGW_SEARCH_PATH.iter().map(|&s| s.to_owned()).collect(),
            system_libraries: SystemLibraryTable::default(),
        }
    }
}

impl DeployConfig {
    /// Read the configuration from a JSON file; missing fields take the default value
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, LookupError> {
        let content = fs_err::read_to_string(path.as_ref())?;
        serde_json::from_str(&content).map_err(|e| {
            LookupError::ConfigError(format!(
                "invalid configuration file {}: {}",
                path.as_ref().display(),
                e
            ))
        })
    }

    pub fn lookup_path(&self) -> Result<LookupPath, LookupError> {
        LookupPath::from_patterns(&self.search_path)
    }

    pub fn system_libraries(&self) -> Result<SystemLibraries, LookupError> {
        SystemLibraries::new(&self.system_libraries)
    }
}
