//! Catalog-driven rollback script generation for forward DDL deployments.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use rewind_core::config::{CliOverrides, RewindConfig};
//! use rewind_core::commands::reverse::{BatchSource, ReverseOutput};
//! use rewind_core::Rewind;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = RewindConfig::load(None, &CliOverrides::default())?;
//! let rewind = Rewind::new(config);
//! let scan = rewind.scan("db/".as_ref(), true, |_| {}).await?;
//! let report = rewind.reverse(
//!     BatchSource::UnitDirs(vec!["release/42".into()]),
//!     Some(&scan.catalog),
//!     &ReverseOutput::default(),
//! )?;
//! println!("{}", report.script);
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - [`splitter`] — Split SQL text into statements
//! - [`classifier`] — Regex rules mapping a statement to an operation kind
//! - [`catalog`] — Tables, columns and views with JSON persistence
//! - [`builder`] — Forward pass that populates a catalog
//! - [`reverse`] — Inverse SQL for a single statement
//! - [`batch`] — LIFO reversal across deployment units and files
//! - [`scan`] — Repository discovery and concurrent reads
//! - [`checksum`] — CRC32 of source files
//! - [`commands`] — Report-producing command implementations
//! - [`config`] — Configuration loading (TOML, env vars, CLI overrides)
//! - [`error`] — Error types

pub mod batch;
pub mod builder;
pub mod catalog;
pub mod checksum;
pub mod classifier;
pub mod commands;
pub mod config;
pub mod error;
pub mod reverse;
pub mod scan;
pub mod splitter;

use std::path::{Path, PathBuf};

use config::RewindConfig;
use error::Result;

pub use batch::{BatchConfig, BatchReversal, BatchReverser, BatchStats, DeploymentFile, DeploymentUnit, FileReversal};
pub use builder::CatalogBuilder;
pub use catalog::Catalog;
pub use classifier::{classify, ObjectName, Statement};
pub use commands::classify::ClassifyReport;
pub use commands::inspect::InspectReport;
pub use commands::reverse::ReverseReport;
pub use commands::scan::ScanReport;
pub use commands::verify::VerifyReport;
pub use config::CliOverrides;
pub use error::RewindError;
pub use reverse::{Reversal, ReverseGenerator, StatementContext};
pub use scan::ScanProgress;

/// Main entry point for the rewind library.
///
/// Holds resolved configuration and runs commands with it.
pub struct Rewind {
    pub config: RewindConfig,
}

impl Rewind {
    pub fn new(config: RewindConfig) -> Self {
        Self { config }
    }

    /// Load the catalog from the configured path.
    pub fn load_catalog(&self) -> Result<Catalog> {
        Catalog::load(&self.config.catalog.path)
    }

    /// Load the configured catalog if the file exists.
    pub fn load_catalog_if_present(&self) -> Result<Option<Catalog>> {
        if self.config.catalog.path.exists() {
            self.load_catalog().map(Some)
        } else {
            log::debug!(
                "No catalog found; path={}",
                self.config.catalog.path.display()
            );
            Ok(None)
        }
    }

    /// Scan a repository into a fresh catalog, optionally saving it.
    pub async fn scan<F>(&self, root: &Path, save: bool, progress: F) -> Result<ScanReport>
    where
        F: FnMut(ScanProgress),
    {
        commands::scan::execute(root, &self.config, save, progress).await
    }

    /// Generate rollback scripts for a batch.
    pub fn reverse(
        &self,
        source: commands::reverse::BatchSource,
        catalog: Option<&Catalog>,
        output: &commands::reverse::ReverseOutput,
    ) -> Result<ReverseReport> {
        commands::reverse::execute(source, catalog, &self.config, output)
    }

    /// Generate a rollback that drops every table in the catalog.
    pub fn reverse_catalog(
        &self,
        catalog: &Catalog,
        output: &commands::reverse::ReverseOutput,
    ) -> Result<ReverseReport> {
        commands::reverse::execute_from_catalog(catalog, &self.config, output)
    }

    /// Classify every statement in the given files (no catalog required).
    pub fn classify(paths: &[PathBuf]) -> Result<ClassifyReport> {
        commands::classify::execute(paths)
    }

    /// Summarize a catalog or show one object.
    pub fn inspect(catalog: &Catalog, name: Option<&str>) -> Result<InspectReport> {
        commands::inspect::execute(catalog, name)
    }

    /// Compare catalog checksums with a repository.
    pub fn verify(&self, catalog: &Catalog, root: &Path) -> Result<VerifyReport> {
        commands::verify::execute(catalog, root, &self.config.scan)
    }
}
