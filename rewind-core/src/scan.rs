//! Repository scanning: discover `.sql` files and build a catalog from them.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::batch::is_sql_file;
use crate::builder::{CatalogBuilder, FileStats};
use crate::catalog::Catalog;
use crate::error::{Result, RewindError};

/// Directory names never descended into during a scan.
pub const DEFAULT_SKIP_DIRS: &[&str] = &[
    "node_modules",
    ".git",
    ".svn",
    ".hg",
    "target",
    "build",
    "dist",
    "out",
    ".idea",
    ".vscode",
    ".vs",
    "bin",
    "obj",
    "logs",
    "temp",
    "tmp",
];

/// Repository scan settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanConfig {
    /// Directory names to skip, matched case-insensitively.
    pub skip_dirs: Vec<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            skip_dirs: DEFAULT_SKIP_DIRS.iter().map(|d| d.to_string()).collect(),
        }
    }
}

/// Progress notification emitted while scanning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanProgress {
    pub current: usize,
    pub total: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

/// A finished scan: the catalog plus per-file statistics.
#[derive(Debug, Clone)]
pub struct ScanOutcome {
    pub catalog: Catalog,
    pub files: Vec<FileStats>,
}

/// Recursively collect `.sql` files under `root`, sorted by path.
pub fn discover_sql_files(root: &Path, skip_dirs: &[String]) -> Result<Vec<PathBuf>> {
    let skip: Vec<String> = skip_dirs.iter().map(|d| d.to_lowercase()).collect();
    let mut found = Vec::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let entries = std::fs::read_dir(&dir).map_err(|e| RewindError::FileRead {
            path: dir.clone(),
            source: e,
        })?;
        for entry in entries {
            let entry = entry?;
            let path = entry.path();
            let file_type = entry.file_type()?;
            if file_type.is_dir() {
                let name = entry.file_name().to_string_lossy().to_lowercase();
                if skip.contains(&name) {
                    log::debug!("Skipping directory; path={}", path.display());
                    continue;
                }
                pending.push(path);
            } else if is_sql_file(&path) {
                found.push(path);
            }
        }
    }

    found.sort();
    Ok(found)
}

/// Path of `file` relative to `root`, with forward slashes.
pub fn source_key(root: &Path, file: &Path) -> String {
    let relative = file.strip_prefix(root).unwrap_or(file);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Scan a repository and build a fresh catalog.
///
/// File reads run concurrently; statements are applied to a single builder
/// strictly in discovery order. `progress` receives `current: 0` before the
/// first file and one notification after each file.
pub async fn scan_repository<F>(root: &Path, config: &ScanConfig, mut progress: F) -> Result<ScanOutcome>
where
    F: FnMut(ScanProgress),
{
    let files = discover_sql_files(root, &config.skip_dirs)?;
    let total = files.len();
    log::info!("Scanning repository; root={}, files={}", root.display(), total);

    progress(ScanProgress {
        current: 0,
        total,
        message: Some(format!("Found {} SQL file(s)", total)),
        file: None,
    });

    let reads: Vec<_> = files
        .iter()
        .cloned()
        .map(|path| tokio::spawn(async move {
            let result = tokio::fs::read_to_string(&path).await;
            (path, result)
        }))
        .collect();

    let mut builder = CatalogBuilder::new();
    for (i, handle) in reads.into_iter().enumerate() {
        let (path, result) = handle
            .await
            .map_err(|e| RewindError::IoError(std::io::Error::other(e)))?;
        let content = result.map_err(|e| RewindError::FileRead {
            path: path.clone(),
            source: e,
        })?;

        let key = source_key(root, &path);
        builder.ingest_source(&key, &content);
        progress(ScanProgress {
            current: i + 1,
            total,
            message: None,
            file: Some(key),
        });
    }

    let files = builder.file_stats().to_vec();
    let catalog = builder.finish();
    Ok(ScanOutcome { catalog, files })
}
