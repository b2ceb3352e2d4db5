//! Show how each statement in a set of files is classified.

use std::path::PathBuf;

use serde::Serialize;

use crate::classifier::{classify, Statement};
use crate::error::{preview, Result, RewindError};
use crate::splitter::split_actions;

/// One classified statement.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifiedStatement {
    /// 1-based position within the file.
    pub index: usize,
    /// Operation kind, e.g. `create table`.
    pub kind: String,
    /// Search path in effect at this statement.
    pub search_path: Option<String>,
    /// Shortened statement text.
    pub preview: String,
    /// Captured operands.
    pub statement: Statement,
}

/// All statements of one file.
#[derive(Debug, Clone, Serialize)]
pub struct ClassifiedFile {
    pub path: PathBuf,
    pub statements: Vec<ClassifiedStatement>,
}

/// Result of the classify command.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifyReport {
    pub files: Vec<ClassifiedFile>,
    /// Total statements across all files.
    pub total_statements: usize,
    /// Statements no rule recognized.
    pub unrecognized: usize,
}

/// Execute the classify command.
pub fn execute(paths: &[PathBuf]) -> Result<ClassifyReport> {
    let mut files = Vec::with_capacity(paths.len());
    let mut total_statements = 0;
    let mut unrecognized = 0;

    for path in paths {
        let sql = std::fs::read_to_string(path).map_err(|e| RewindError::FileRead {
            path: path.clone(),
            source: e,
        })?;

        let mut search_path: Option<String> = None;
        let mut statements = Vec::new();
        for (i, stmt) in split_actions(&sql).iter().enumerate() {
            let statement = classify(stmt);
            if let Statement::SetSearchPath { schema } = &statement {
                search_path = Some(schema.to_lowercase());
            }
            if !statement.is_recognized() {
                unrecognized += 1;
            }
            statements.push(ClassifiedStatement {
                index: i + 1,
                kind: statement.kind().to_string(),
                search_path: search_path.clone(),
                preview: preview(stmt, 80),
                statement,
            });
        }
        total_statements += statements.len();
        files.push(ClassifiedFile {
            path: path.clone(),
            statements,
        });
    }

    Ok(ClassifyReport {
        files,
        total_statements,
        unrecognized,
    })
}
