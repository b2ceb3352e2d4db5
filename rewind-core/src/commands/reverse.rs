//! Generate rollback scripts for a deployment batch.

use std::path::PathBuf;

use serde::Serialize;

use crate::batch::{
    load_manifest, BatchReversal, BatchReverser, BatchStats, DeploymentFile, DeploymentUnit,
    FileReversal,
};
use crate::catalog::Catalog;
use crate::config::RewindConfig;
use crate::error::{Result, RewindError};
use crate::reverse::{drop_catalog_tables, ReverseGenerator};

/// Where the forward batch comes from.
#[derive(Debug, Clone)]
pub enum BatchSource {
    /// Each directory is one unit of its `.sql` files, in the given order.
    UnitDirs(Vec<PathBuf>),
    /// Explicit files forming a single unit.
    Files(Vec<PathBuf>),
    /// A JSON deployment manifest.
    Manifest(PathBuf),
    /// Units assembled by the caller.
    Units(Vec<DeploymentUnit>),
}

impl BatchSource {
    /// Resolve the source into ordered deployment units.
    pub fn into_units(self) -> Result<Vec<DeploymentUnit>> {
        match self {
            BatchSource::UnitDirs(dirs) => dirs.iter().map(|d| DeploymentUnit::from_dir(d)).collect(),
            BatchSource::Files(files) => Ok(vec![DeploymentUnit::new(
                "files",
                files.iter().map(|f| DeploymentFile::from_path(f)).collect(),
            )]),
            BatchSource::Manifest(path) => load_manifest(&path),
            BatchSource::Units(units) => Ok(units),
        }
    }
}

/// Output targets for the reverse command.
#[derive(Debug, Clone, Default)]
pub struct ReverseOutput {
    /// Write the combined script here.
    pub combined: Option<PathBuf>,
    /// Write per-file rollback scripts under this directory.
    pub per_file_dir: Option<PathBuf>,
}

/// Result of the reverse command.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReverseReport {
    /// Combined rollback script.
    pub script: String,
    /// Per-file breakdown in rollback order.
    pub files: Vec<FileReversal>,
    /// Outcome counters.
    pub stats: BatchStats,
    /// Files written to disk.
    pub written: Vec<PathBuf>,
    /// Whether a catalog was available for lookups.
    pub catalog_used: bool,
}

impl ReverseReport {
    /// Fail when any statement needs manual handling.
    pub fn require_complete(&self) -> Result<()> {
        match self.stats.needs_attention() {
            0 => Ok(()),
            count => Err(RewindError::ManualActionRequired { count }),
        }
    }
}

/// Execute the reverse command.
pub fn execute(
    source: BatchSource,
    catalog: Option<&Catalog>,
    config: &RewindConfig,
    output: &ReverseOutput,
) -> Result<ReverseReport> {
    let units = source.into_units()?;
    if units.iter().all(|u| u.files.is_empty()) {
        log::warn!("Batch contains no SQL files; units={}", units.len());
    }

    let generator = ReverseGenerator::new(catalog).with_defaults(config.reconstruct.clone());
    let reverser = BatchReverser::new(generator, config.reverse.clone());
    let batch = reverser.reverse_batch(&units)?;

    let mut written = Vec::new();
    if let Some(path) = &output.combined {
        batch.write_combined(path)?;
        written.push(path.clone());
    }
    if let Some(dir) = &output.per_file_dir {
        written.extend(batch.write_per_file(dir)?);
    }

    Ok(ReverseReport {
        script: batch.script,
        files: batch.files,
        stats: batch.stats,
        written,
        catalog_used: catalog.is_some(),
    })
}

/// Execute the reverse command for a whole catalog: drop every table it
/// records, last key first.
///
/// Only the combined output applies; there are no per-file rollbacks.
pub fn execute_from_catalog(
    catalog: &Catalog,
    config: &RewindConfig,
    output: &ReverseOutput,
) -> Result<ReverseReport> {
    let drops = drop_catalog_tables(catalog, config.reverse.annotate);
    if drops.is_empty() {
        log::warn!("Catalog records no tables; nothing to drop");
    }

    let mut script = String::new();
    for drop in &drops {
        script.push_str(drop);
        script.push_str("\n\n");
    }
    let stats = BatchStats {
        statements: drops.len(),
        reversed: drops.len(),
        ..Default::default()
    };

    let mut written = Vec::new();
    if let Some(path) = &output.combined {
        let batch = BatchReversal {
            script: script.clone(),
            files: Vec::new(),
            stats: stats.clone(),
        };
        batch.write_combined(path)?;
        written.push(path.clone());
    }
    if output.per_file_dir.is_some() {
        log::warn!("Per-file output does not apply when dropping a whole catalog");
    }

    log::info!("Catalog reversed; tables={}", drops.len());
    Ok(ReverseReport {
        script,
        files: Vec::new(),
        stats,
        written,
        catalog_used: true,
    })
}
