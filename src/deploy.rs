//! Copy the resolved dependencies of a set of binaries next to them

use crate::common::{path_to_string, LookupError};
use crate::executable::Resolution;
use crate::lookup_path::LookupPath;
use crate::pe::ImportReader;
use crate::query::DeployConfig;
use crate::runner;
use crate::system::SystemLibraries;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

/// A copy of a resolved DLL into the target directory, performed or (in dry-run mode) planned
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeployedFile {
    pub source: PathBuf,
    pub destination: PathBuf,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeploymentReport {
    pub target_dir: PathBuf,
    pub dry_run: bool,
    pub resolution: Resolution,
    pub files: Vec<DeployedFile>,
}

pub struct Deployer<R: ImportReader> {
    pub lookup_path: LookupPath,
    pub system: SystemLibraries,
    reader: R,
}

impl<R: ImportReader> Deployer<R> {
    pub fn new(lookup_path: LookupPath, system: SystemLibraries, reader: R) -> Self {
        Self {
            lookup_path,
            system,
            reader,
        }
    }

    pub fn from_config(config: &DeployConfig, reader: R) -> Result<Self, LookupError> {
        Ok(Self::new(
            config.lookup_path()?,
            config.system_libraries()?,
            reader,
        ))
    }

    /// Resolve the dependencies of the binaries without deploying anything
    pub fn scan<P: AsRef<Path>>(&self, roots: &[P]) -> Result<Resolution, LookupError> {
        runner::resolve(roots, &self.lookup_path, &self.system, &self.reader)
    }

    /// Resolve the dependencies of the binaries and copy them into the target directory
    ///
    /// The target directory must exist; it is checked before scanning. In dry-run mode the copies
    /// are only listed in the report. A failed copy aborts the deployment, leaving the files
    /// copied so far in place.
    pub fn deploy<P: AsRef<Path>>(
        &self,
        roots: &[P],
        target_dir: &Path,
        dry_run: bool,
    ) -> Result<DeploymentReport, LookupError> {
        if !target_dir.is_dir() {
            return Err(LookupError::TargetNotADirectory(target_dir.to_owned()));
        }

        let resolution = self.scan(roots)?;

        let mut files = Vec::with_capacity(resolution.resolved.len());
        for dep in &resolution.resolved {
            let file_name = dep
                .full_path
                .file_name()
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(&dep.dllname));
            let deployed = DeployedFile {
                source: dep.full_path.clone(),
                destination: target_dir.join(file_name),
            };
            if !dry_run {
                // found in the target directory itself: copying onto it would truncate it
                if is_same_file(&deployed.source, &deployed.destination)? {
                    info!("{} is already in place", path_to_string(&deployed.destination));
                } else {
                    fs_err::copy(&deployed.source, &deployed.destination)?;
                    info!(
                        "copied {} to {}",
                        path_to_string(&deployed.source),
                        path_to_string(&deployed.destination)
                    );
                }
            }
            files.push(deployed);
        }

        Ok(DeploymentReport {
            target_dir: target_dir.to_owned(),
            dry_run,
            resolution,
            files,
        })
    }
}

fn is_same_file(source: &Path, destination: &Path) -> Result<bool, LookupError> {
    if !destination.exists() {
        return Ok(false);
    }
    Ok(fs_err::canonicalize(source)? == fs_err::canonicalize(destination)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pe::StaticImports;
    use fs_err as fs;

    struct Fixture {
        tmp: tempfile::TempDir,
        app: PathBuf,
        target: PathBuf,
        deployer: Deployer<StaticImports>,
    }

    fn fixture() -> Result<Fixture, LookupError> {
        let tmp = tempfile::tempdir()?;
        let lib = tmp.path().join("sysroot").join("lib");
        fs::create_dir_all(&lib)?;
        fs::write(lib.join("liba.dll"), b"liba")?;
        fs::write(lib.join("libb.dll"), b"libb")?;
        let app = tmp.path().join("app.exe");
        fs::write(&app, b"MZ")?;
        let target = tmp.path().join("dist");
        fs::create_dir_all(&target)?;

        let imports = StaticImports::default()
            .with("app.exe", &["liba.dll", "KERNEL32.dll", "libmissing.dll"])
            .with("liba.dll", &["libb.dll"])
            .with("libb.dll", &["msvcrt.dll"]);
        let deployer = Deployer::new(
            LookupPath::new([tmp.path().join("sysroot")]),
            SystemLibraries::default(),
            imports,
        );
        Ok(Fixture {
            tmp,
            app,
            target,
            deployer,
        })
    }

    fn dir_entries(p: &Path) -> Result<Vec<String>, LookupError> {
        let mut names = std::fs::read_dir(p)?
            .map(|e| e.map(|e| e.file_name().to_string_lossy().into_owned()))
            .collect::<Result<Vec<_>, _>>()?;
        names.sort();
        Ok(names)
    }

    #[test]
    fn copies_resolved_dependencies() -> Result<(), LookupError> {
        let f = fixture()?;
        let report = f.deployer.deploy(&[&f.app], &f.target, false)?;

        assert_eq!(dir_entries(&f.target)?, vec!["liba.dll", "libb.dll"]);
        assert_eq!(fs::read(f.target.join("libb.dll"))?, b"libb");
        assert_eq!(report.files.len(), 2);
        assert_eq!(report.resolution.missing, vec!["libmissing.dll"]);
        assert!(!report.dry_run);
        Ok(())
    }

    #[test]
    fn dependency_already_in_target_is_left_intact() -> Result<(), LookupError> {
        let f = fixture()?;
        fs::write(f.target.join("liba.dll"), b"deployed liba")?;
        // the target directory comes first on the search path
        let deployer = Deployer::new(
            LookupPath::new([f.target.clone(), f.tmp.path().join("sysroot")]),
            SystemLibraries::default(),
            StaticImports::default()
                .with("app.exe", &["liba.dll"])
                .with("liba.dll", &["libb.dll"])
                .with("libb.dll", &[]),
        );
        let report = deployer.deploy(&[&f.app], &f.target, false)?;

        assert_eq!(fs::read(f.target.join("liba.dll"))?, b"deployed liba");
        assert_eq!(fs::read(f.target.join("libb.dll"))?, b"libb");
        assert_eq!(
            report.files[0],
            DeployedFile {
                source: f.target.join("liba.dll"),
                destination: f.target.join("liba.dll"),
            }
        );
        assert_eq!(report.files.len(), 2);
        Ok(())
    }

    #[test]
    fn failed_copy_keeps_earlier_copies() -> Result<(), LookupError> {
        let f = fixture()?;
        // a directory in the way of the second copy
        fs::create_dir_all(f.target.join("libb.dll"))?;
        let res = f.deployer.deploy(&[&f.app], &f.target, false);

        assert!(matches!(res, Err(LookupError::IOError(_))));
        assert_eq!(fs::read(f.target.join("liba.dll"))?, b"liba");
        assert!(f.target.join("libb.dll").is_dir());
        Ok(())
    }

    #[test]
    fn dry_run_copies_nothing() -> Result<(), LookupError> {
        let f = fixture()?;
        let report = f.deployer.deploy(&[&f.app], &f.target, true)?;

        assert!(dir_entries(&f.target)?.is_empty());
        assert_eq!(
            report.files,
            vec![
                DeployedFile {
                    source: f.tmp.path().join("sysroot").join("lib").join("liba.dll"),
                    destination: f.target.join("liba.dll"),
                },
                DeployedFile {
                    source: f.tmp.path().join("sysroot").join("lib").join("libb.dll"),
                    destination: f.target.join("libb.dll"),
                },
            ]
        );
        assert!(report.dry_run);
        Ok(())
    }

    #[test]
    fn missing_target_directory_is_an_error() -> Result<(), LookupError> {
        let f = fixture()?;
        let target = f.tmp.path().join("nonexistent");
        let res = f.deployer.deploy(&[&f.app], &target, false);

        assert!(matches!(res, Err(LookupError::TargetNotADirectory(p)) if p == target));
        assert!(!target.exists());
        // nothing was scanned either
        assert!(f.deployer.reader.reads.borrow().is_empty());
        Ok(())
    }

    #[test]
    fn target_must_not_be_a_file() -> Result<(), LookupError> {
        let f = fixture()?;
        let res = f.deployer.deploy(&[&f.app], &f.app, true);
        assert!(matches!(res, Err(LookupError::TargetNotADirectory(_))));
        Ok(())
    }

    #[test]
    fn scan_reports_without_target() -> Result<(), LookupError> {
        let f = fixture()?;
        let res = f.deployer.scan(&[&f.app])?;
        assert_eq!(res.resolved_names(), vec!["liba.dll", "libb.dll"]);
        assert_eq!(res.system, vec!["KERNEL32.dll", "msvcrt.dll"]);
        assert!(dir_entries(&f.target)?.is_empty());
        Ok(())
    }
}
