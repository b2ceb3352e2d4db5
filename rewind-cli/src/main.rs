//! CLI entry point for the rewind rollback generator.
//! Provides clap-based command routing, exit code mapping based on error
//! type, and terminal or JSON output for every command.

mod output;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use colored::Colorize;

use rewind_core::commands::reverse::{BatchSource, ReverseOutput};
use rewind_core::config::{CliOverrides, RewindConfig};
use rewind_core::error::RewindError;
use rewind_core::{Catalog, Rewind};

/// Top-level CLI definition with global flags and subcommand dispatch.
#[derive(Parser)]
#[command(
    name = "rewind",
    about = "Generate rollback scripts for forward DDL deployments",
    version = concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("GIT_HASH"), " ", env!("BUILD_TIME"), ")"
    ),
    propagate_version = true
)]
struct Cli {
    /// Config file path
    #[arg(short, long, value_name = "PATH", global = true)]
    config: Option<String>,

    /// Catalog JSON path (overrides config)
    #[arg(long, value_name = "PATH", global = true)]
    catalog: Option<PathBuf>,

    /// Output results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Enable verbose/debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// All available rewind subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Scan a repository of forward scripts and build the schema catalog
    Scan {
        /// Repository root
        #[arg(value_name = "DIR", default_value = ".")]
        root: PathBuf,

        /// Directory names to skip (comma-separated, replaces the defaults)
        #[arg(long, value_name = "DIRS", value_delimiter = ',')]
        skip_dirs: Option<Vec<String>>,

        /// Build the catalog without saving it
        #[arg(long)]
        no_save: bool,
    },

    /// Generate rollback scripts for a deployment batch
    Reverse {
        /// Unit directories in deployment order, each holding .sql files
        #[arg(value_name = "UNIT_DIR", conflicts_with_all = ["files", "manifest"])]
        units: Vec<PathBuf>,

        /// Explicit forward files forming one unit, in deployment order
        #[arg(long, value_name = "FILES", value_delimiter = ',', conflicts_with = "manifest")]
        files: Vec<PathBuf>,

        /// JSON deployment manifest
        #[arg(long, value_name = "PATH")]
        manifest: Option<PathBuf>,

        /// Drop every table recorded in the catalog instead of reversing a batch
        #[arg(
            long,
            conflicts_with_all = ["units", "files", "manifest", "per_file", "no_catalog"]
        )]
        from_catalog: bool,

        /// Write the combined rollback script to this file
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,

        /// Write per-file rollback scripts under this directory
        #[arg(long, value_name = "DIR")]
        per_file: Option<PathBuf>,

        /// Prefix for per-file rollback names (overrides config)
        #[arg(long, value_name = "PREFIX")]
        prefix: Option<String>,

        /// Omit the /* original: ... */ annotation before each reversal
        #[arg(long)]
        no_annotate: bool,

        /// Reverse without a catalog even if one exists
        #[arg(long)]
        no_catalog: bool,

        /// Exit with an error if any statement needs manual handling
        #[arg(long)]
        strict: bool,
    },

    /// Show how each statement in the given files is classified
    Classify {
        /// SQL files
        #[arg(value_name = "FILE", required = true)]
        files: Vec<PathBuf>,
    },

    /// Summarize the catalog or show one table or view
    Inspect {
        /// Table or view name, optionally schema-qualified
        #[arg(value_name = "NAME")]
        name: Option<String>,
    },

    /// Check the catalog against the repository it was built from
    Verify {
        /// Repository root
        #[arg(value_name = "DIR", default_value = ".")]
        root: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Set up logging (suppress when JSON output is requested)
    let filter = if cli.json {
        "error"
    } else if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };

    env_logger::Builder::new()
        .parse_env(env_logger::Env::default().default_filter_or(filter))
        .format_target(false)
        .format_timestamp(None)
        .init();

    let json_output = cli.json;
    if let Err(e) = run(cli).await {
        if json_output {
            output::print_json_error(&e, exit_code(&e));
        } else {
            print_error(&e);
        }
        process::exit(exit_code(&e));
    }
}

/// Map error types to differentiated exit codes.
fn exit_code(error: &RewindError) -> i32 {
    match error {
        RewindError::ConfigError(_) => 2,
        RewindError::FileRead { .. } => 3,
        RewindError::CatalogError(_) => 4,
        RewindError::ManifestError(_) => 4,
        RewindError::ManualActionRequired { .. } => 5,
        RewindError::StaleCatalog { .. } => 6,
        _ => 1,
    }
}

/// Build configuration and dispatch the chosen subcommand.
async fn run(cli: Cli) -> Result<(), RewindError> {
    let json_output = cli.json;
    let quiet = cli.quiet;

    let overrides = CliOverrides {
        catalog: cli.catalog,
        skip_dirs: match &cli.command {
            Commands::Scan { skip_dirs, .. } => skip_dirs.clone(),
            _ => None,
        },
        rollback_prefix: match &cli.command {
            Commands::Reverse { prefix, .. } => prefix.clone(),
            _ => None,
        },
        annotate: match &cli.command {
            Commands::Reverse { no_annotate: true, .. } => Some(false),
            _ => None,
        },
    };

    let config = RewindConfig::load(cli.config.as_deref(), &overrides)?;
    let rewind = Rewind::new(config);

    match cli.command {
        Commands::Scan { root, no_save, .. } => {
            let show_progress = !json_output && !quiet;
            let report = rewind
                .scan(&root, !no_save, |p| {
                    if show_progress {
                        output::print_scan_progress(&p);
                    }
                })
                .await?;
            if json_output {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                output::print_scan_report(&report);
            }
        }
        Commands::Reverse {
            units,
            files,
            manifest,
            from_catalog,
            output: combined,
            per_file,
            no_catalog,
            strict,
            ..
        } => {
            if from_catalog {
                let catalog = load_catalog(&rewind)?;
                let out = ReverseOutput {
                    combined,
                    per_file_dir: None,
                };
                let report = rewind.reverse_catalog(&catalog, &out)?;
                if json_output {
                    println!("{}", serde_json::to_string_pretty(&report)?);
                } else {
                    output::print_reverse_report(&report, out.combined.is_none());
                }
                return Ok(());
            }

            let source = if let Some(path) = manifest {
                BatchSource::Manifest(path)
            } else if !files.is_empty() {
                BatchSource::Files(files)
            } else if !units.is_empty() {
                BatchSource::UnitDirs(units)
            } else {
                return Err(RewindError::ConfigError(
                    "Reverse requires unit directories, --files, --manifest or --from-catalog".to_string(),
                ));
            };

            let catalog = if no_catalog {
                None
            } else {
                rewind.load_catalog_if_present()?
            };
            if catalog.is_none() && !no_catalog {
                log::warn!(
                    "No catalog at {}; dropped objects cannot be rebuilt",
                    rewind.config.catalog.path.display()
                );
            }

            let out = ReverseOutput {
                combined,
                per_file_dir: per_file,
            };
            let report = rewind.reverse(source, catalog.as_ref(), &out)?;
            if json_output {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                output::print_reverse_report(&report, out.combined.is_none() && out.per_file_dir.is_none());
            }
            if strict {
                report.require_complete()?;
            }
        }
        Commands::Classify { files } => {
            let report = Rewind::classify(&files)?;
            if json_output {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                output::print_classify_report(&report);
            }
        }
        Commands::Inspect { name } => {
            let catalog = load_catalog(&rewind)?;
            let report = Rewind::inspect(&catalog, name.as_deref())?;
            if json_output {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                output::print_inspect_report(&report);
            }
        }
        Commands::Verify { root } => {
            let catalog = load_catalog(&rewind)?;
            let report = rewind.verify(&catalog, &root)?;
            if json_output {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                output::print_verify_report(&report);
            }
            report.require_fresh()?;
        }
    }

    Ok(())
}

/// Load the configured catalog, reporting a missing file as a catalog error.
fn load_catalog(rewind: &Rewind) -> Result<Catalog, RewindError> {
    rewind.load_catalog_if_present()?.ok_or_else(|| {
        RewindError::CatalogError(format!(
            "No catalog at {}",
            rewind.config.catalog.path.display()
        ))
    })
}

/// Print a formatted error message with actionable hints to stderr.
fn print_error(error: &RewindError) {
    eprintln!("{} {}", "ERROR:".red().bold(), error);

    // Provide actionable guidance
    match error {
        RewindError::ConfigError(_) => {
            eprintln!(
                "{}",
                "Hint: Check your rewind.toml or the REWIND_* environment variables.".dimmed()
            );
        }
        RewindError::CatalogError(_) => {
            eprintln!(
                "{}",
                "Hint: Run 'rewind scan <repo>' to build a catalog, or pass --catalog <path>."
                    .dimmed()
            );
        }
        RewindError::ManifestError(_) => {
            eprintln!(
                "{}",
                "Hint: A manifest is a JSON array of {\"name\", \"files\": [{\"name\", \"path\"}]}."
                    .dimmed()
            );
        }
        RewindError::StaleCatalog { .. } => {
            eprintln!(
                "{}",
                "Hint: Re-run 'rewind scan' so rollbacks are generated from the current schema."
                    .dimmed()
            );
        }
        RewindError::ManualActionRequired { .. } => {
            eprintln!(
                "{}",
                "Hint: Search the output for /* MANUAL and /* UNSUPPORTED markers and complete them by hand."
                    .dimmed()
            );
        }
        _ => {}
    }
}
