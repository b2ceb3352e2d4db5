//! Error types for rewind operations.

use std::path::PathBuf;

use thiserror::Error;

/// All error types that rewind operations can produce.
#[derive(Error, Debug)]
pub enum RewindError {
    /// Invalid or missing configuration (TOML parse errors, bad values, etc.).
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A source SQL file could not be read. Without its contents there are
    /// no statements to process, so this aborts the current run.
    #[error("Failed to read {}: {source}", path.display())]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A single statement did not have the shape its classification promised.
    ///
    /// Raised per statement while building a catalog. Callers log it and
    /// move on to the next statement.
    #[error("Could not parse {kind} statement: {reason} (statement: {preview})")]
    StatementParse {
        kind: String,
        reason: String,
        preview: String,
    },

    /// A catalog document could not be loaded or saved.
    #[error("Catalog error: {0}")]
    CatalogError(String),

    /// A deployment manifest was malformed.
    #[error("Invalid deployment manifest: {0}")]
    ManifestError(String),

    /// The persisted catalog no longer matches the repository it was built from.
    #[error("Catalog is stale: {added} added, {removed} removed, {modified} modified source file(s)")]
    StaleCatalog {
        added: usize,
        removed: usize,
        modified: usize,
    },

    /// Reversal produced manual-intervention markers and strict mode was requested.
    #[error("{count} statement(s) need manual rollback handling")]
    ManualActionRequired { count: usize },

    /// A filesystem I/O operation failed (writing output, creating directories, etc.).
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization or deserialization failed.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl RewindError {
    /// Build a [`RewindError::StatementParse`] with a truncated statement preview.
    pub fn statement_parse(kind: &str, reason: impl Into<String>, statement: &str) -> Self {
        RewindError::StatementParse {
            kind: kind.to_string(),
            reason: reason.into(),
            preview: preview(statement, 80),
        }
    }
}

/// Truncate a statement to `max` characters for log and error output.
pub fn preview(statement: &str, max: usize) -> String {
    let flat: String = statement.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() > max {
        let head: String = flat.chars().take(max).collect();
        format!("{}...", head)
    } else {
        flat
    }
}

/// Convenience type alias for `Result<T, RewindError>`.
pub type Result<T> = std::result::Result<T, RewindError>;
