//! Batch reversal across deployment units.
//!
//! A batch is an ordered list of deployment units, each an ordered list of
//! SQL files. Rollback runs strictly last-in-first-out: units in reverse,
//! files in reverse, statements in reverse.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::classifier::{classify, Statement};
use crate::error::{Result, RewindError};
use crate::reverse::{Reversal, ReverseGenerator, StatementContext};
use crate::splitter::split_actions;

/// Default prefix of generated rollback file names.
pub const DEFAULT_ROLLBACK_PREFIX: &str = "rollback_";

/// Output settings for batch reversal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchConfig {
    /// Prefix prepended to each original file name.
    pub rollback_prefix: String,
    /// Precede each reversal with `/* original: ... */`.
    pub annotate: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            rollback_prefix: DEFAULT_ROLLBACK_PREFIX.to_string(),
            annotate: true,
        }
    }
}

/// One forward SQL file within a deployment unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentFile {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub path: PathBuf,
    /// Pre-loaded file contents; read from `path` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contents: Option<String>,
}

/// A named, ordered group of forward files deployed together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentUnit {
    pub name: String,
    #[serde(default)]
    pub files: Vec<DeploymentFile>,
}

impl DeploymentFile {
    /// A file entry named after the last component of `path`.
    pub fn from_path(path: &Path) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            name,
            path: path.to_path_buf(),
            contents: None,
        }
    }

    pub fn with_contents(name: &str, contents: &str) -> Self {
        Self {
            name: name.to_string(),
            path: PathBuf::from(name),
            contents: Some(contents.to_string()),
        }
    }

    fn load(&self) -> Result<String> {
        match &self.contents {
            Some(contents) => Ok(contents.clone()),
            None => std::fs::read_to_string(&self.path).map_err(|e| RewindError::FileRead {
                path: self.path.clone(),
                source: e,
            }),
        }
    }
}

impl DeploymentUnit {
    pub fn new(name: &str, files: Vec<DeploymentFile>) -> Self {
        Self {
            name: name.to_string(),
            files,
        }
    }

    /// A unit from the `.sql` files directly inside `dir`, in file name order.
    pub fn from_dir(dir: &Path) -> Result<Self> {
        let entries = std::fs::read_dir(dir).map_err(|e| RewindError::FileRead {
            path: dir.to_path_buf(),
            source: e,
        })?;

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_file() && is_sql_file(p))
            .collect();
        paths.sort();

        let name = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| dir.display().to_string());
        Ok(Self::new(
            &name,
            paths.iter().map(|p| DeploymentFile::from_path(p)).collect(),
        ))
    }
}

pub(crate) fn is_sql_file(path: &Path) -> bool {
    path.file_name()
        .map(|n| n.to_string_lossy().to_lowercase().ends_with(".sql"))
        .unwrap_or(false)
}

/// Load deployment units from a JSON manifest.
///
/// The manifest is an array of `{ "name", "files": [{ "name", "path", "contents"? }] }`.
/// Relative file paths are resolved against the manifest's directory.
pub fn load_manifest(path: &Path) -> Result<Vec<DeploymentUnit>> {
    let content = std::fs::read_to_string(path).map_err(|e| RewindError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    let mut units: Vec<DeploymentUnit> = serde_json::from_str(&content)
        .map_err(|e| RewindError::ManifestError(format!("{}: {}", path.display(), e)))?;

    let base = path.parent().unwrap_or_else(|| Path::new(""));
    for (i, unit) in units.iter_mut().enumerate() {
        if unit.name.trim().is_empty() {
            return Err(RewindError::ManifestError(format!(
                "unit #{} has an empty name",
                i + 1
            )));
        }
        let mut seen = HashSet::new();
        for file in &mut unit.files {
            if file.path.as_os_str().is_empty() && file.contents.is_none() {
                return Err(RewindError::ManifestError(format!(
                    "file '{}' in unit '{}' has neither a path nor contents",
                    file.name, unit.name
                )));
            }
            if file.path.is_relative() && !file.path.as_os_str().is_empty() {
                file.path = base.join(&file.path);
            }
            if file.name.is_empty() {
                file.name = DeploymentFile::from_path(&file.path).name;
            }
            if !seen.insert(file.name.clone()) {
                return Err(RewindError::ManifestError(format!(
                    "file '{}' appears more than once in unit '{}'",
                    file.name, unit.name
                )));
            }
        }
    }
    Ok(units)
}

/// Rollback output for one forward file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileReversal {
    pub original_file_name: String,
    pub reverse_file_name: String,
    pub content: String,
    pub original_path: PathBuf,
    pub unit_name: String,
}

/// Counters gathered while reversing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchStats {
    pub units: usize,
    pub files: usize,
    pub statements: usize,
    pub reversed: usize,
    pub manual: usize,
    pub unsupported: usize,
    pub skipped: usize,
}

impl BatchStats {
    fn record(&mut self, reversal: &Reversal) {
        self.statements += 1;
        match reversal {
            Reversal::Statement(_) => self.reversed += 1,
            Reversal::Manual(_) => self.manual += 1,
            Reversal::Unsupported => self.unsupported += 1,
            Reversal::Skipped => self.skipped += 1,
        }
    }

    fn merge(&mut self, other: &BatchStats) {
        self.units += other.units;
        self.files += other.files;
        self.statements += other.statements;
        self.reversed += other.reversed;
        self.manual += other.manual;
        self.unsupported += other.unsupported;
        self.skipped += other.skipped;
    }

    /// Statements whose rollback must be finished by hand.
    pub fn needs_attention(&self) -> usize {
        self.manual + self.unsupported
    }
}

/// Result of reversing a whole batch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReversal {
    /// All per-file contents concatenated, each followed by a blank line.
    pub script: String,
    /// Per-file breakdown in rollback order.
    pub files: Vec<FileReversal>,
    pub stats: BatchStats,
}

impl BatchReversal {
    /// Write each file's rollback to `<dir>/<unit>/<reverse file name>`.
    ///
    /// Unit and file names are reduced to single path components. Nothing is
    /// written when two rollbacks would land on the same path.
    pub fn write_per_file(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let mut seen = HashSet::new();
        let mut targets = Vec::with_capacity(self.files.len());
        for file in &self.files {
            let unit_dir = dir.join(sanitize_component(&file.unit_name, "unit"));
            let target = unit_dir.join(sanitize_component(&file.reverse_file_name, "rollback.sql"));
            if !seen.insert(target.clone()) {
                return Err(RewindError::ManifestError(format!(
                    "more than one rollback file maps to {}",
                    target.display()
                )));
            }
            targets.push((unit_dir, target, file));
        }

        let mut written = Vec::with_capacity(targets.len());
        for (unit_dir, target, file) in targets {
            std::fs::create_dir_all(&unit_dir)?;
            std::fs::write(&target, &file.content)?;
            log::debug!("Rollback file written; path={}", target.display());
            written.push(target);
        }
        log::info!(
            "Rollback files written; dir={}, files={}",
            dir.display(),
            written.len()
        );
        Ok(written)
    }

    /// Write the combined script to `path`, creating parent directories.
    pub fn write_combined(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, &self.script)?;
        log::info!(
            "Rollback script written; path={}, bytes={}",
            path.display(),
            self.script.len()
        );
        Ok(())
    }
}

fn sanitize_component(name: &str, fallback: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' => '_',
            c => c,
        })
        .collect();
    match cleaned.trim() {
        "" | "." | ".." => fallback.to_string(),
        other => other.to_string(),
    }
}

/// Drives a [`ReverseGenerator`] over files and units.
#[derive(Debug, Clone, Default)]
pub struct BatchReverser<'a> {
    generator: ReverseGenerator<'a>,
    config: BatchConfig,
}

impl<'a> BatchReverser<'a> {
    pub fn new(generator: ReverseGenerator<'a>, config: BatchConfig) -> Self {
        Self { generator, config }
    }

    /// Reverse every unit, last unit and last file first.
    pub fn reverse_batch(&self, units: &[DeploymentUnit]) -> Result<BatchReversal> {
        let mut out = BatchReversal::default();

        for unit in units.iter().rev() {
            out.stats.units += 1;
            for file in unit.files.iter().rev() {
                let contents = file.load()?;
                let (content, stats) = self.reverse_file(&file.name, &contents);
                out.stats.merge(&stats);
                out.stats.files += 1;

                if content.is_empty() {
                    log::debug!("No rollback output; file={}", file.name);
                    continue;
                }
                out.script.push_str(&content);
                out.script.push_str("\n\n");
                out.files.push(FileReversal {
                    original_file_name: file.name.clone(),
                    reverse_file_name: sanitize_component(
                        &format!("{}{}", self.config.rollback_prefix, file.name),
                        "rollback.sql",
                    ),
                    content,
                    original_path: file.path.clone(),
                    unit_name: unit.name.clone(),
                });
            }
        }

        log::info!(
            "Batch reversed; units={}, files={}, statements={}, manual={}, unsupported={}",
            out.stats.units,
            out.stats.files,
            out.stats.statements,
            out.stats.manual,
            out.stats.unsupported
        );
        Ok(out)
    }

    /// Reverse the statements of one file's contents.
    pub fn reverse_file(&self, name: &str, contents: &str) -> (String, BatchStats) {
        let statements = split_actions(contents);
        self.reverse_statements(name, &statements)
    }

    /// Reverse already split statements, last statement first.
    ///
    /// The search path in effect at each statement comes from a forward walk
    /// that starts empty for every file. In a file that only creates tables,
    /// comments are skipped.
    pub fn reverse_statements(&self, file: &str, statements: &[String]) -> (String, BatchStats) {
        let mut search_path: Option<String> = None;
        let mut walked = Vec::with_capacity(statements.len());
        for stmt in statements {
            let classified = classify(stmt);
            if let Statement::SetSearchPath { schema } = &classified {
                search_path = Some(schema.to_lowercase());
            }
            walked.push((stmt, classified, search_path.clone()));
        }

        let create_only = is_create_table_only(walked.iter().map(|(_, c, _)| c));
        if create_only {
            log::debug!("Table-creation file, comments need no rollback; file={}", file);
        }

        let mut stats = BatchStats::default();
        let mut parts = Vec::new();
        for (stmt, classified, path) in walked.iter().rev() {
            let ctx = StatementContext {
                file,
                search_path: path.as_deref(),
            };
            let reversal = if create_only && is_comment(classified) {
                Reversal::Skipped
            } else {
                self.generator.reverse_classified(classified, &ctx)
            };
            stats.record(&reversal);

            if let Some(text) = reversal.render() {
                if self.config.annotate {
                    parts.push(format!("{}\n{}", annotation(stmt), text));
                } else {
                    parts.push(text);
                }
            }
        }
        (parts.join("\n\n"), stats)
    }
}

/// A file that only creates tables, apart from search-path changes and
/// comments. Its comments vanish with the tables it creates.
fn is_create_table_only<'s>(statements: impl Iterator<Item = &'s Statement>) -> bool {
    let mut creates = false;
    for statement in statements {
        match statement {
            Statement::CreateTable { .. } => creates = true,
            Statement::SetSearchPath { .. } => {}
            other if is_comment(other) => {}
            _ => return false,
        }
    }
    creates
}

fn is_comment(statement: &Statement) -> bool {
    matches!(
        statement,
        Statement::CommentOnTable { .. }
            | Statement::CommentOnColumn { .. }
            | Statement::CommentOnView { .. }
    )
}

fn annotation(stmt: &str) -> String {
    format!("/* original: {} */", stmt.trim().replace("*/", "* /"))
}
