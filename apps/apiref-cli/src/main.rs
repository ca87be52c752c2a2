//! API reference tool.
//!
//! # Usage
//!
//! ```bash
//! # Print the reference document of a manifest
//! apiref reference api.yml
//!
//! # Write it to a file
//! apiref reference api.yml --output references/api.json
//!
//! # Only validate the declarations
//! apiref check api.yml
//! ```

// CLI tools are expected to print to stdout/stderr
#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use apiref::{ApiBuilder, DeclarationErrors, load_manifest};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "apiref")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log declarations and build steps (overridden by RUST_LOG)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate the reference document of a manifest
    Reference {
        /// Manifest file (.yml, .yaml or .json)
        #[arg(value_name = "MANIFEST")]
        manifest: PathBuf,

        /// Write the document here instead of stdout
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Emit compact JSON
        #[arg(long)]
        compact: bool,
    },
    /// Validate every declaration of a manifest
    Check {
        #[arg(value_name = "MANIFEST")]
        manifest: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Command::Reference {
            manifest,
            output,
            compact,
        } => reference(&manifest, output.as_deref(), compact),
        Command::Check { manifest } => check(&manifest),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report(&e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load(manifest: &Path) -> anyhow::Result<ApiBuilder> {
    let manifest = load_manifest(manifest)
        .with_context(|| format!("failed to load {}", manifest.display()))?;
    Ok(manifest.into_builder()?)
}

fn reference(manifest: &Path, output: Option<&Path>, compact: bool) -> anyhow::Result<()> {
    let doc = load(manifest)?.reference();
    let json = if compact {
        let mut out = serde_json::to_string(&doc)?;
        out.push('\n');
        out
    } else {
        doc.to_json_pretty()?
    };

    match output {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("failed to write {}", path.display()))?;
            tracing::info!(path = %path.display(), entries = doc.entries.len(), "wrote reference");
        }
        None => print!("{json}"),
    }
    Ok(())
}

fn check(manifest: &Path) -> anyhow::Result<()> {
    let api = load(manifest)?;
    let published = api.reference().entries.len();
    println!(
        "{} {} {}: {} entries, {} published",
        "OK".green().bold(),
        api.descriptor().service_name(),
        api.descriptor().api_version(),
        api.entries().len(),
        published
    );
    Ok(())
}

fn report(error: &anyhow::Error) {
    if let Some(errors) = error.downcast_ref::<DeclarationErrors>() {
        eprintln!(
            "{} {} declaration(s) failed",
            "ERROR".red().bold(),
            errors.errors().len()
        );
        for e in errors.errors() {
            eprintln!("  - {e}");
        }
        return;
    }
    eprintln!("{} {error:#}", "ERROR".red().bold());
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MANIFEST: &str = r"
service:
  serviceName: svc
  apiVersion: v1
  title: Service
  description: A service
entries:
  - method: get
    route: /thing/:id
    name: thing
    title: Get Thing
    description: Fetch a thing
    category: Things
    scopes: null
";

    fn manifest_file(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".yml").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_parse_reference_args() {
        let cli =
            Cli::try_parse_from(["apiref", "reference", "api.yml", "-o", "out.json", "--compact"])
                .unwrap();
        match cli.command {
            Command::Reference {
                manifest,
                output,
                compact,
            } => {
                assert_eq!(manifest, PathBuf::from("api.yml"));
                assert_eq!(output, Some(PathBuf::from("out.json")));
                assert!(compact);
            }
            Command::Check { .. } => panic!("expected reference"),
        }
    }

    #[test]
    fn test_parse_check_args() {
        let cli = Cli::try_parse_from(["apiref", "-v", "check", "api.yml"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.command, Command::Check { .. }));
        assert!(Cli::try_parse_from(["apiref", "check"]).is_err());
    }

    #[test]
    fn test_reference_written_to_file() {
        let manifest = manifest_file(MANIFEST);
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("ref.json");

        reference(manifest.path(), Some(&out), false).unwrap();
        let doc: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(doc["serviceName"], "svc");
        assert_eq!(doc["entries"].as_array().unwrap().len(), 4);
        assert_eq!(doc["entries"][3]["route"], "/thing/<id>");
    }

    #[test]
    fn test_declaration_errors_surface() {
        let manifest = manifest_file(&MANIFEST.replace("scopes: null", "input: thing.yml"));
        let err = load(manifest.path()).unwrap_err();
        let errors = err.downcast_ref::<DeclarationErrors>().unwrap();
        assert_eq!(errors.errors().len(), 1);
    }
}
