//! Schema catalog data model with JSON persistence.
//!
//! The catalog maps lowercase `schema.name` keys to tables and views. It is
//! built once per scan (see [`crate::builder`]) and treated as read-only by
//! the reverse generator afterwards.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::classifier::ObjectName;
use crate::error::{Result, RewindError};

/// The full schema catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Catalog {
    pub tables: BTreeMap<String, Table>,
    pub views: BTreeMap<String, View>,
    pub metadata: Metadata,
}

/// Summary counters and provenance recorded when the catalog was built.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Metadata {
    pub parsed_at: Option<DateTime<Utc>>,
    pub total_files: usize,
    pub total_tables: usize,
    pub total_views: usize,
    pub total_columns: usize,
    /// Source path → CRC32 of the file contents the catalog was built from.
    pub checksums: BTreeMap<String, u32>,
}

/// A table and everything known about its structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Table {
    /// Table name in its original casing.
    pub name: String,
    /// `schema.name` in original casing.
    pub full_name: String,
    /// Lowercase schema, if the table was qualified.
    pub schema: Option<String>,
    /// Lowercase column name → column.
    pub columns: BTreeMap<String, Column>,
    /// Source files that referenced this table, in first-seen order.
    pub source_files: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distribution: Option<Distribution>,
    #[serde(rename = "withClause", skip_serializing_if = "Option::is_none")]
    pub storage_options: Option<StorageOptions>,
    #[serde(rename = "toGroup", skip_serializing_if = "Option::is_none")]
    pub placement_group: Option<String>,
}

/// A column definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Column {
    /// Column name in its original casing.
    pub name: String,
    /// Declared type, upper-cased, including any size or precision.
    #[serde(rename = "type", alias = "dataType")]
    pub data_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// Declaration position within the table.
    pub ordinal: usize,
    // Legacy attributes carried by hand-built catalogs. The builder never
    // sets them but they are echoed when a dropped column is re-added.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "is_false")]
    pub primary_key: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub unique: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub auto_increment: bool,
}

/// A view, stored as the verbatim statement text that created it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct View {
    pub name: String,
    pub full_name: String,
    pub schema: Option<String>,
    /// The CREATE VIEW statement followed by any comment statements on it.
    pub definition: String,
    pub source_files: Vec<String>,
}

/// How table rows are spread across nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistributionKind {
    Hash,
    #[serde(alias = "round_robin")]
    Roundrobin,
    Random,
}

/// A table distribution clause.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Distribution {
    #[serde(rename = "type")]
    pub kind: DistributionKind,
    #[serde(default)]
    pub columns: Vec<String>,
}

/// A `WITH (k = v, ...)` storage-options clause.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageOptions {
    /// The clause exactly as written, e.g. `WITH(ORIENTATION = COLUMN)`.
    pub raw: String,
    pub options: BTreeMap<String, String>,
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl Distribution {
    pub fn hash(columns: Vec<String>) -> Self {
        Self {
            kind: DistributionKind::Hash,
            columns,
        }
    }

    pub fn round_robin() -> Self {
        Self {
            kind: DistributionKind::Roundrobin,
            columns: Vec::new(),
        }
    }

    pub fn random() -> Self {
        Self {
            kind: DistributionKind::Random,
            columns: Vec::new(),
        }
    }

    /// Render the clause, or `None` for a hash distribution without columns.
    pub fn to_sql(&self) -> Option<String> {
        match self.kind {
            DistributionKind::Hash if self.columns.is_empty() => None,
            DistributionKind::Hash => {
                Some(format!("DISTRIBUTE BY HASH({})", self.columns.join(", ")))
            }
            DistributionKind::Roundrobin => Some("DISTRIBUTE BY ROUNDROBIN".to_string()),
            DistributionKind::Random => Some("DISTRIBUTED RANDOMLY".to_string()),
        }
    }
}

impl FromStr for Distribution {
    type Err = RewindError;

    /// Parse `roundrobin`, `random` or `hash(col, ...)`.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let trimmed = s.trim();
        let lower = trimmed.to_ascii_lowercase();
        match lower.as_str() {
            "roundrobin" | "round_robin" => return Ok(Distribution::round_robin()),
            "random" | "randomly" => return Ok(Distribution::random()),
            _ => {}
        }
        if let Some(inner) = lower
            .strip_prefix("hash")
            .map(str::trim_start)
            .and_then(|rest| rest.strip_prefix('('))
            .and_then(|rest| rest.strip_suffix(')'))
        {
            // Re-slice the original text to keep column casing
            let start = trimmed.len() - inner.len() - 1;
            let columns = split_column_list(&trimmed[start..trimmed.len() - 1]);
            if !columns.is_empty() {
                return Ok(Distribution::hash(columns));
            }
        }
        Err(RewindError::ConfigError(format!(
            "Invalid distribution '{}'. Use 'hash(col, ...)', 'roundrobin', or 'random'.",
            s
        )))
    }
}

/// Split `a, "b", c` into unquoted, non-empty names.
pub fn split_column_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(|c| c.trim().trim_matches(|ch| ch == '"' || ch == '`').to_string())
        .filter(|c| !c.is_empty())
        .collect()
}

impl fmt::Display for DistributionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DistributionKind::Hash => write!(f, "hash"),
            DistributionKind::Roundrobin => write!(f, "roundrobin"),
            DistributionKind::Random => write!(f, "random"),
        }
    }
}

impl StorageOptions {
    /// Build from the raw clause and the text between its parentheses.
    pub fn parse(raw: &str, inner: &str) -> Self {
        let options = inner
            .split(',')
            .filter_map(|opt| opt.split_once('='))
            .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
            .filter(|(k, _)| !k.is_empty())
            .collect();
        Self {
            raw: raw.trim().to_string(),
            options,
        }
    }
}

impl Column {
    pub fn new(name: &str, data_type: &str, ordinal: usize) -> Self {
        Self {
            name: name.to_string(),
            data_type: data_type.to_string(),
            ordinal,
            ..Default::default()
        }
    }

    /// Legacy column options rendered as SQL, each with a leading space.
    pub fn legacy_options_sql(&self) -> String {
        let mut out = String::new();
        if let Some(default) = &self.default {
            match default {
                serde_json::Value::Null => {}
                serde_json::Value::String(s) => out.push_str(&format!(" DEFAULT {}", s)),
                other => out.push_str(&format!(" DEFAULT {}", other)),
            }
        }
        if self.primary_key {
            out.push_str(" PRIMARY KEY");
        }
        if self.unique {
            out.push_str(" UNIQUE");
        }
        if self.auto_increment {
            out.push_str(" AUTO_INCREMENT");
        }
        out
    }
}

impl Table {
    /// A new, empty table for a (resolved) object name.
    pub fn new(name: &ObjectName) -> Self {
        Self {
            name: name.name.clone(),
            full_name: name.to_string(),
            schema: name.schema.as_ref().map(|s| s.to_lowercase()),
            ..Default::default()
        }
    }

    /// The table's name as an [`ObjectName`], schema included when known.
    pub fn object_name(&self) -> ObjectName {
        ObjectName::new(self.schema.as_deref(), &self.name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.get(&name.to_lowercase())
    }

    /// Columns sorted by declaration order.
    pub fn columns_in_order(&self) -> Vec<&Column> {
        let mut cols: Vec<&Column> = self.columns.values().collect();
        cols.sort_by(|a, b| a.ordinal.cmp(&b.ordinal).then_with(|| a.name.cmp(&b.name)));
        cols
    }

    pub fn next_ordinal(&self) -> usize {
        self.columns
            .values()
            .map(|c| c.ordinal + 1)
            .max()
            .unwrap_or(0)
    }

    /// Get a column, creating an `UNKNOWN`-typed stub at the next ordinal.
    pub fn column_or_stub(&mut self, name: &str) -> &mut Column {
        let ordinal = self.next_ordinal();
        self.columns
            .entry(name.to_lowercase())
            .or_insert_with(|| Column::new(name, "UNKNOWN", ordinal))
    }

    pub fn add_source(&mut self, path: &str) {
        if !path.is_empty() && !self.source_files.iter().any(|p| p == path) {
            self.source_files.push(path.to_string());
        }
    }
}

impl View {
    pub fn new(name: &ObjectName, definition: &str) -> Self {
        Self {
            name: name.name.clone(),
            full_name: name.to_string(),
            schema: name.schema.as_ref().map(|s| s.to_lowercase()),
            definition: definition.to_string(),
            source_files: Vec::new(),
        }
    }

    /// Append a later statement (e.g. a comment on the view) to the definition.
    pub fn append(&mut self, statement: &str) {
        if self.definition.is_empty() {
            self.definition = statement.to_string();
        } else {
            self.definition.push('\n');
            self.definition.push_str(statement);
        }
    }

    pub fn add_source(&mut self, path: &str) {
        if !path.is_empty() && !self.source_files.iter().any(|p| p == path) {
            self.source_files.push(path.to_string());
        }
    }
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Find a table: the search-path-qualified key first, then the name as written.
    pub fn lookup_table(&self, name: &ObjectName, search_path: Option<&str>) -> Option<&Table> {
        lookup(&self.tables, name, search_path)
    }

    /// Find a view using the same resolution order as [`Catalog::lookup_table`].
    pub fn lookup_view(&self, name: &ObjectName, search_path: Option<&str>) -> Option<&View> {
        lookup(&self.views, name, search_path)
    }

    /// Get or create the table for an already-resolved name.
    pub fn upsert_table(&mut self, name: &ObjectName) -> &mut Table {
        self.tables
            .entry(name.key())
            .or_insert_with(|| Table::new(name))
    }

    /// Get or create the view for an already-resolved name.
    ///
    /// A created view starts with `definition` as its whole definition.
    pub fn upsert_view(&mut self, name: &ObjectName, definition: &str) -> &mut View {
        self.views
            .entry(name.key())
            .or_insert_with(|| View::new(name, definition))
    }

    pub fn column_count(&self) -> usize {
        self.tables.values().map(|t| t.columns.len()).sum()
    }

    /// Recompute totals and stamp `parsedAt` with the current time.
    pub fn refresh_metadata(&mut self, total_files: usize) {
        self.metadata.parsed_at = Some(Utc::now());
        self.metadata.total_files = total_files;
        self.metadata.total_tables = self.tables.len();
        self.metadata.total_views = self.views.len();
        self.metadata.total_columns = self.column_count();
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| RewindError::CatalogError(format!("Invalid catalog JSON: {}", e)))
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load a catalog document from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| RewindError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_json(&content).map_err(|e| match e {
            RewindError::CatalogError(msg) => {
                RewindError::CatalogError(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })
    }

    /// Write the catalog as pretty JSON, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, self.to_json()?)?;
        log::info!(
            "Catalog saved; path={}, tables={}, views={}",
            path.display(),
            self.tables.len(),
            self.views.len()
        );
        Ok(())
    }
}

fn lookup<'a, T>(
    map: &'a BTreeMap<String, T>,
    name: &ObjectName,
    search_path: Option<&str>,
) -> Option<&'a T> {
    map.get(&name.resolve(search_path).key())
        .or_else(|| map.get(&name.key()))
}
