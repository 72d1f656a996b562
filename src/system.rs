//! Classification of the DLLs provided by the target platform
//!
//! These are never deployed nor looked up: the loader on the target machine always finds them in
//! the system directories.

use crate::common::{normalized_name, LookupError};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// DLLs shipped with every Windows installation that MinGW-built binaries commonly import
pub const KNOWN_SYSTEM_DLLS: &[&str] = &[
    "WINMM.DLL",
    "MSVCRT.DLL",
    "VERSION.DLL",
    "MPR.DLL",
    "DWMAPI.DLL",
    "UXTHEME.DLL",
    "DNSAPI.DLL",
    "IPHLPAPI.DLL",
];

/// DLLs named like *32.dll (KERNEL32, USER32, WS2_32, ...) are system components
pub const SYSTEM_DLL_PATTERN: &str = r".*32\.DLL";

/// Serializable description of the system libraries, as found in the configuration file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemLibraryTable {
    /// Literal DLL names, compared case-insensitively
    pub names: Vec<String>,
    /// Regular expression matched against the whole upper-cased DLL name
    pub pattern: Option<String>,
}

impl Default for SystemLibraryTable {
    fn default() -> Self {
        Self {
            names: KNOWN_SYSTEM_DLLS.iter().map(|&s| s.to_owned()).collect(),
            pattern: Some(SYSTEM_DLL_PATTERN.to_owned()),
        }
    }
}

/// Decides whether a DLL belongs to the platform
#[derive(Debug, Clone)]
pub struct SystemLibraries {
    names: HashSet<String>,
    pattern: Option<Regex>,
}

impl SystemLibraries {
    pub fn new(table: &SystemLibraryTable) -> Result<Self, LookupError> {
        let pattern = table
            .pattern
            .as_deref()
            .filter(|p| !p.is_empty())
            .map(|p| Regex::new(&format!("^(?:{})$", p)))
            .transpose()?;
        Ok(Self {
            names: table.names.iter().map(|n| normalized_name(n)).collect(),
            pattern,
        })
    }

    /// true if the DLL is provided by the platform and must be neither searched nor deployed
    pub fn is_system(&self, dllname: &str) -> bool {
        let name = normalized_name(dllname);
        self.names.contains(&name) || self.pattern.as_ref().is_some_and(|re| re.is_match(&name))
    }
}

impl Default for SystemLibraries {
    fn default() -> Self {
        Self::new(&SystemLibraryTable::default())
            .expect("the built-in system DLL pattern is a valid regex")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_names_are_system() {
        let sys = SystemLibraries::default();
        assert!(sys.is_system("msvcrt.dll"));
        assert!(sys.is_system("WINMM.DLL"));
        assert!(sys.is_system("UxTheme.dll"));
        assert!(!sys.is_system("libstdc++-6.dll"));
        assert!(!sys.is_system("Qt5Core.dll"));
    }

    #[test]
    fn numeric_suffix_is_system() {
        let sys = SystemLibraries::default();
        assert!(sys.is_system("KERNEL32.dll"));
        assert!(sys.is_system("user32.dll"));
        assert!(sys.is_system("WS2_32.DLL"));
        // the suffix must sit right before the extension
        assert!(!sys.is_system("libgcc_s_seh-1.dll"));
        assert!(!sys.is_system("kernel32.dll.bak"));
        assert!(!sys.is_system("KERNEL32.DLL.MUI"));
        assert!(!sys.is_system("libfoo32.so"));
    }

    #[test]
    fn custom_table() -> Result<(), LookupError> {
        let sys = SystemLibraries::new(&SystemLibraryTable {
            names: vec!["libc.so.6".to_owned()],
            pattern: Some(r"LD-LINUX.*".to_owned()),
        })?;
        assert!(sys.is_system("libc.so.6"));
        assert!(sys.is_system("ld-linux-x86-64.so.2"));
        assert!(!sys.is_system("KERNEL32.DLL"));
        Ok(())
    }

    #[test]
    fn no_pattern() -> Result<(), LookupError> {
        let sys = SystemLibraries::new(&SystemLibraryTable {
            names: vec![],
            pattern: None,
        })?;
        assert!(!sys.is_system("KERNEL32.DLL"));
        Ok(())
    }

    #[test]
    fn invalid_pattern_is_reported() {
        let res = SystemLibraries::new(&SystemLibraryTable {
            names: vec![],
            pattern: Some("(unclosed".to_owned()),
        });
        assert!(matches!(res, Err(LookupError::RegexError(_))));
    }
}
