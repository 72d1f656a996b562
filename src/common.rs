use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LookupError {
    #[error("Could not read the import table of {path}: {reason}")]
    DecodeError { path: PathBuf, reason: String },

    #[error("{0} is not a directory.")]
    TargetNotADirectory(PathBuf),

    #[error("Input binary not found: {0}")]
    InputNotFound(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error(transparent)]
    IOError(#[from] std::io::Error),
    #[error(transparent)]
    PEError(#[from] pelite::Error),
    #[error(transparent)]
    GoblinError(#[from] goblin::error::Error),
    #[error(transparent)]
    RegexError(#[from] regex::Error),
    #[error(transparent)]
    PatternError(#[from] glob::PatternError),
    #[error(transparent)]
    JsonError(#[from] serde_json::Error),
}

/// Identity of a module name: Windows resolves DLL names case-insensitively
pub(crate) fn normalized_name(name: &str) -> String {
    name.to_uppercase()
}

/// Converts the path to a string, replacing invalid unicode sequences
pub fn path_to_string<P: AsRef<Path>>(p: P) -> String {
    p.as_ref().to_string_lossy().into_owned()
}

/// Canonicalizes the path if possible, otherwise keeps it as given
pub fn readable_canonical_path<P: AsRef<Path>>(p: P) -> String {
    fs_err::canonicalize(p.as_ref())
        .map(path_to_string)
        .unwrap_or_else(|_| path_to_string(p))
}

/// Expands the binaries given on the command line
///
/// Existing paths are taken as they are, anything else is treated as a glob pattern (shells on
/// Windows don't expand them); a pattern matching no file is an error.
pub fn expand_input_paths<S: AsRef<str>>(inputs: &[S]) -> Result<Vec<PathBuf>, LookupError> {
    let mut paths = Vec::new();
    for input in inputs {
        let input: &str = input.as_ref();
        let p = Path::new(input);
        if p.exists() {
            if !p.is_file() {
                return Err(LookupError::InputNotFound(format!(
                    "{} is a directory, not an executable file",
                    input
                )));
            }
            paths.push(p.to_owned());
            continue;
        }
        let mut matches: Vec<PathBuf> = glob::glob(input)?
            .filter_map(Result::ok)
            .filter(|m| m.is_file())
            .collect();
        if matches.is_empty() {
            return Err(LookupError::InputNotFound(input.to_owned()));
        }
        matches.sort();
        paths.extend(matches);
    }
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fs_err as fs;

    #[test]
    fn names_compare_case_insensitively() {
        assert_eq!(normalized_name("libFoo.dll"), normalized_name("LIBFOO.DLL"));
        assert_ne!(normalized_name("libfoo.dll"), normalized_name("libbar.dll"));
    }

    #[test]
    fn readable_path_falls_back_to_input() {
        let p = "/this/path/does/not/exist.dll";
        assert_eq!(readable_canonical_path(p), p);
    }

    #[test]
    fn literal_and_pattern_inputs() -> Result<(), LookupError> {
        let tmp = tempfile::tempdir()?;
        fs::write(tmp.path().join("app.exe"), b"MZ")?;
        fs::write(tmp.path().join("plugin_b.dll"), b"MZ")?;
        fs::write(tmp.path().join("plugin_a.dll"), b"MZ")?;
        fs::create_dir_all(tmp.path().join("plugin_dir.dll"))?;

        let inputs = vec![
            path_to_string(tmp.path().join("app.exe")),
            format!("{}/plugin_*.dll", path_to_string(tmp.path())),
        ];
        assert_eq!(
            expand_input_paths(&inputs)?,
            vec![
                tmp.path().join("app.exe"),
                tmp.path().join("plugin_a.dll"),
                tmp.path().join("plugin_b.dll"),
            ]
        );
        Ok(())
    }

    #[test]
    fn unmatched_input_is_an_error() -> Result<(), LookupError> {
        let tmp = tempfile::tempdir()?;
        let missing = path_to_string(tmp.path().join("*.exe"));
        assert!(matches!(
            expand_input_paths(&[missing]),
            Err(LookupError::InputNotFound(_))
        ));
        assert!(matches!(
            expand_input_paths(&[path_to_string(tmp.path())]),
            Err(LookupError::InputNotFound(_))
        ));
        Ok(())
    }
}
