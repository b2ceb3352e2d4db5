//! Build a catalog by scanning a repository of forward DDL scripts.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::builder::FileStats;
use crate::catalog::Catalog;
use crate::config::RewindConfig;
use crate::error::Result;
use crate::scan::{scan_repository, ScanProgress};

/// Result of the scan command.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanReport {
    /// Repository root that was scanned.
    pub root: PathBuf,
    /// Where the catalog was saved, if it was.
    pub catalog_path: Option<PathBuf>,
    /// Number of SQL files ingested.
    pub files_scanned: usize,
    /// Number of tables in the resulting catalog.
    pub tables: usize,
    /// Number of views in the resulting catalog.
    pub views: usize,
    /// Number of columns across all tables.
    pub columns: usize,
    /// Statements that could not be applied, summed over all files.
    pub parse_errors: usize,
    /// Per-file statistics in scan order.
    pub files: Vec<FileStats>,
    /// The built catalog.
    #[serde(skip)]
    pub catalog: Catalog,
}

/// Execute the scan command, saving the catalog to the configured path when `save` is set.
pub async fn execute<F>(
    root: &Path,
    config: &RewindConfig,
    save: bool,
    progress: F,
) -> Result<ScanReport>
where
    F: FnMut(ScanProgress),
{
    let outcome = scan_repository(root, &config.scan, progress).await?;

    let catalog_path = if save {
        outcome.catalog.save(&config.catalog.path)?;
        Some(config.catalog.path.clone())
    } else {
        None
    };

    Ok(ScanReport {
        root: root.to_path_buf(),
        catalog_path,
        files_scanned: outcome.files.len(),
        tables: outcome.catalog.tables.len(),
        views: outcome.catalog.views.len(),
        columns: outcome.catalog.column_count(),
        parse_errors: outcome.files.iter().map(|f| f.parse_errors).sum(),
        files: outcome.files,
        catalog: outcome.catalog,
    })
}
