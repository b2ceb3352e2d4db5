//! Compare a persisted catalog's source checksums against a repository.
//!
//! Detects SQL files that were added, removed, or edited since the catalog
//! was built, so a stale catalog is not used to generate rollbacks.

use std::path::Path;

use serde::Serialize;

use crate::catalog::Catalog;
use crate::checksum::crc32;
use crate::error::{Result, RewindError};
use crate::scan::{discover_sql_files, source_key, ScanConfig};

/// A source file whose contents changed since the catalog was built.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModifiedFile {
    pub path: String,
    pub expected_checksum: u32,
    pub actual_checksum: u32,
}

/// Result of the verify command.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyReport {
    /// Files in the repository that the catalog has never seen.
    pub added: Vec<String>,
    /// Files recorded in the catalog that no longer exist.
    pub removed: Vec<String>,
    /// Files whose checksum differs from the recorded one.
    pub modified: Vec<ModifiedFile>,
    /// Number of files whose checksum still matches.
    pub unchanged: usize,
    /// Whether any of the lists above is non-empty.
    pub stale: bool,
}

impl VerifyReport {
    /// Turn a stale report into [`RewindError::StaleCatalog`].
    pub fn require_fresh(&self) -> Result<()> {
        if self.stale {
            return Err(RewindError::StaleCatalog {
                added: self.added.len(),
                removed: self.removed.len(),
                modified: self.modified.len(),
            });
        }
        Ok(())
    }
}

/// Execute the verify command.
pub fn execute(catalog: &Catalog, root: &Path, config: &ScanConfig) -> Result<VerifyReport> {
    let recorded = &catalog.metadata.checksums;
    let mut added = Vec::new();
    let mut modified = Vec::new();
    let mut unchanged = 0;
    let mut seen = Vec::new();

    for path in discover_sql_files(root, &config.skip_dirs)? {
        let key = source_key(root, &path);
        let content = std::fs::read_to_string(&path).map_err(|e| RewindError::FileRead {
            path: path.clone(),
            source: e,
        })?;
        let actual = crc32(&content);

        match recorded.get(&key) {
            None => added.push(key.clone()),
            Some(&expected) if expected != actual => modified.push(ModifiedFile {
                path: key.clone(),
                expected_checksum: expected,
                actual_checksum: actual,
            }),
            Some(_) => unchanged += 1,
        }
        seen.push(key);
    }

    let removed: Vec<String> = recorded
        .keys()
        .filter(|k| !seen.contains(k))
        .cloned()
        .collect();

    let stale = !added.is_empty() || !removed.is_empty() || !modified.is_empty();
    if stale {
        log::warn!(
            "Catalog is stale; added={}, removed={}, modified={}",
            added.len(),
            removed.len(),
            modified.len()
        );
    }

    Ok(VerifyReport {
        added,
        removed,
        modified,
        unchanged,
        stale,
    })
}
