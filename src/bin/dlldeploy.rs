extern crate dll_deployer;

use anyhow::Context;
use clap::Parser;
use dll_deployer::{
    expand_input_paths, path_to_string, readable_canonical_path, DeployConfig, Deployer,
    LookupError, PEImportReader, Resolution,
};
use fs_err as fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Copy the non-system DLLs needed by Windows binaries into a deployment directory
#[derive(Parser, Debug)]
#[command(name = "dlldeploy", version, about)]
struct Args {
    /// Files to examine (.exe or .dll, glob patterns allowed), followed by the target deploy directory
    #[arg(value_name = "PATHS", required = true, num_args = 2..)]
    paths: Vec<String>,

    /// Only print the copies that would be performed
    #[arg(short = 'n', long = "dry-run")]
    dry_run: bool,

    /// JSON file with the search path and the system DLLs table (default: MinGW-w64 layout)
    #[arg(short = 'c', long = "config", value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Additional directory to search for DLLs, before the configured ones (repeatable)
    #[arg(short = 's', long = "search-path", value_name = "DIR")]
    search_path: Vec<PathBuf>,

    /// Path for output in JSON format
    #[arg(short = 'j', long = "output-json-path", value_name = "OUTPUT_JSON_PATH")]
    output_json_path: Option<PathBuf>,

    /// Include skipped system DLLs in the output
    #[arg(long = "print-system-dlls")]
    print_system_dlls: bool,

    /// Verbose output
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,
}

impl Args {
    fn binaries(&self) -> &[String] {
        &self.paths[..self.paths.len() - 1]
    }

    fn target_dir(&self) -> PathBuf {
        PathBuf::from(&self.paths[self.paths.len() - 1])
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_resolution(resolution: &Resolution, print_system_dlls: bool) {
    if print_system_dlls && !resolution.system.is_empty() {
        println!("Skipped system DLLs:");
        for s in &resolution.system {
            println!("\t{}", s);
        }
    }
    if !resolution.missing.is_empty() {
        println!(
            "Following DLLs are not found:\n{}",
            resolution.missing.join("\n")
        );
    }
}

fn write_json<T: serde::Serialize>(value: &T, path: &Path, verbose: bool) -> anyhow::Result<()> {
    let js = serde_json::to_string_pretty(value).context("Error serializing")?;
    fs::write(path, js).context(format!("couldn't write to {}", path.display()))?;
    if verbose {
        println!("successfully wrote to {}", path.display());
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let config = match &args.config {
        Some(p) => DeployConfig::from_json_file(p)?,
        None => DeployConfig::default(),
    };
    let mut deployer = Deployer::from_config(&config, PEImportReader)?;
    deployer.lookup_path.prepend(args.search_path.iter().cloned());

    let roots = expand_input_paths(args.binaries())?;
    let target_dir = args.target_dir();

    if args.verbose {
        let search_path: Vec<String> = deployer
            .lookup_path
            .search_path()
            .iter()
            .map(path_to_string)
            .collect();
        println!("Search path: {}", search_path.join(", "));
        for r in &roots {
            println!("Input: {}", readable_canonical_path(r));
        }
    }

    println!("Scanning dependencies...");
    let mut target_error = false;
    match deployer.deploy(&roots, &target_dir, args.dry_run) {
        Ok(report) => {
            for f in &report.files {
                if report.dry_run {
                    println!(
                        "[Dry-Run] Copy {} to {}",
                        path_to_string(&f.source),
                        path_to_string(&report.target_dir)
                    );
                } else if args.verbose {
                    println!(
                        "Copied {} to {}",
                        path_to_string(&f.source),
                        path_to_string(&f.destination)
                    );
                }
            }
            println!("Deploy completed.");
            print_resolution(&report.resolution, args.print_system_dlls);
            if let Some(p) = &args.output_json_path {
                write_json(&report, p, args.verbose)?;
            }
        }
        Err(e @ LookupError::TargetNotADirectory(_)) => {
            // nothing can be copied: report what would have been deployed
            eprintln!("{}", e);
            target_error = true;
            let resolution = deployer.scan(&roots)?;
            for r in &resolution.resolved {
                println!("{} => {}", r.dllname, path_to_string(&r.full_path));
            }
            println!("Scan completed, nothing was deployed.");
            print_resolution(&resolution, args.print_system_dlls);
            if let Some(p) = &args.output_json_path {
                write_json(&resolution, p, args.verbose)?;
            }
        }
        Err(e) => return Err(e).context("Deployment failed"),
    }

    if target_error {
        std::process::exit(1);
    }
    Ok(())
}
