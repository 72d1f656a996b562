extern crate thiserror;

pub mod common;
pub mod deploy;
pub mod executable;
pub mod lookup_path;
pub mod pe;
pub mod query;
pub mod runner;
pub mod system;

pub use common::{expand_input_paths, path_to_string, readable_canonical_path, LookupError};
pub use deploy::{DeployedFile, Deployer, DeploymentReport};
pub use executable::{Resolution, ResolvedDependency};
pub use lookup_path::LookupPath;
pub use pe::{ImportReader, PEImportReader};
pub use query::DeployConfig;
pub use system::SystemLibraries;

/// Resolve the non-system DLLs the given binaries need, reading PE import tables from disk
pub fn lookup<P: AsRef<std::path::Path>>(
    roots: &[P],
    config: &DeployConfig,
) -> Result<Resolution, LookupError> {
    Deployer::from_config(config, PEImportReader)?.scan(roots)
}
