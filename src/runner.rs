use crate::common::{path_to_string, LookupError};
use crate::executable::{Resolution, ResolvedDependency};
use crate::lookup_path::LookupPath;
use crate::pe::ImportReader;
use crate::system::SystemLibraries;
use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Finds the dependencies of the specified executables within the given search path
/// The dependencies are resolved recursively, in a breadth-first fashion.
///
/// A runner holds the state of a single scan and is consumed by it.
pub struct Runner<'a, R: ImportReader> {
    lookup_path: &'a LookupPath,
    system: &'a SystemLibraries,
    reader: &'a R,
    files_to_scan: VecDeque<PathBuf>,
    // canonical paths of every file queued so far, roots included
    scanned: HashSet<PathBuf>,
    resolution: Resolution,
}

impl<'a, R: ImportReader> Runner<'a, R> {
    pub fn new(lookup_path: &'a LookupPath, system: &'a SystemLibraries, reader: &'a R) -> Self {
        Self {
            lookup_path,
            system,
            reader,
            files_to_scan: VecDeque::new(),
            scanned: HashSet::new(),
            resolution: Resolution::new(),
        }
    }

    // every file is read at most once, whether it was given as root or found as a dependency
    fn enqueue(&mut self, path: &Path) {
        let key = fs_err::canonicalize(path).unwrap_or_else(|_| path.to_owned());
        if self.scanned.insert(key) {
            self.files_to_scan.push_back(path.to_owned());
        }
    }

    // classify and look up a single import; only newly found DLLs are scanned in turn
    fn process_import(&mut self, dllname: &str) {
        if self.resolution.contains(dllname) {
            return;
        }
        if self.system.is_system(dllname) {
            if self.resolution.insert_system(dllname) {
                debug!("{} is a system DLL, skipped", dllname);
            }
            return;
        }
        match self.lookup_path.search_dll(dllname) {
            Some(full_path) => {
                let found = ResolvedDependency {
                    dllname: dllname.to_owned(),
                    full_path: full_path.clone(),
                };
                if self.resolution.insert_resolved(found) {
                    self.enqueue(&full_path);
                }
            }
            None => {
                if self.resolution.insert_missing(dllname) {
                    debug!("{} is missing", dllname);
                }
            }
        }
    }

    pub fn run<P: AsRef<Path>>(mut self, roots: &[P]) -> Result<Resolution, LookupError> {
        // roots are scanned, but are not part of the result unless imported by another binary
        for r in roots {
            self.enqueue(r.as_ref());
        }

        while let Some(current) = self.files_to_scan.pop_front() {
            debug!("> {}", path_to_string(&current));
            let dependencies = self.reader.read_dependencies(&current)?;
            for d in &dependencies {
                self.process_import(d);
            }
        }

        Ok(self.resolution)
    }
}

/// Resolve the transitive non-system dependencies of the given binaries
pub fn resolve<P: AsRef<Path>, R: ImportReader>(
    roots: &[P],
    lookup_path: &LookupPath,
    system: &SystemLibraries,
    reader: &R,
) -> Result<Resolution, LookupError> {
    Runner::new(lookup_path, system, reader).run(roots)
}
