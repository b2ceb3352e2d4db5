//! Forward pass that accumulates a [`Catalog`] from classified statements.
//!
//! One builder owns one catalog and one search path. Statements must be fed
//! in file order, then statement order, because a `SET search_path` applies
//! to every later unqualified name until it is changed.

use std::sync::LazyLock;

use regex_lite::Regex;
use serde::Serialize;

use crate::catalog::{split_column_list, Catalog, Column, Distribution, StorageOptions};
use crate::checksum::crc32;
use crate::classifier::{self, classify, ObjectName, Statement};
use crate::error::{Result, RewindError};
use crate::splitter::split_actions;

/// Per-file counters produced by [`CatalogBuilder::ingest_source`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct FileStats {
    pub path: String,
    pub statements: usize,
    /// Statements that changed the catalog or the search path.
    pub applied: usize,
    /// Statements the builder has no use for.
    pub ignored: usize,
    /// Statements that were recognized but could not be parsed.
    pub parse_errors: usize,
}

/// What applying one statement did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Changed,
    Ignored,
}

static CREATE_TABLE_BODY_RE: LazyLock<Regex> = LazyLock::new(|| {
    classifier::rule(
        r"CREATE\s+(?:(?:TEMPORARY|TEMP|UNLOGGED)\s+)?TABLE\s+(?:IF\s+NOT\s+EXISTS\s+)?QNAME\s*\(",
    )
});

static COLUMN_DEF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)^([`"]?)([\w$]+)[`"]?\s+([A-Za-z_][\w$]*(?:\s*\([^)]*\))?)"#).unwrap()
});

/// Words that continue a multi-word type such as `DOUBLE PRECISION` or
/// `TIMESTAMP WITH TIME ZONE`.
static TYPE_CONTINUATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)^\s+(PRECISION|VARYING|WITHOUT|WITH|TIME|ZONE|UNSIGNED)\b(\s*\([^)]*\))?")
        .unwrap()
});

static ARRAY_SUFFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\[\s*\])+").unwrap());

static DISTRIBUTE_HASH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)\bDISTRIBUTE\s+BY\s+HASH\s*\(\s*([^)]+)\)").unwrap()
});

static DISTRIBUTE_ROUNDROBIN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)\bDISTRIBUTE\s+BY\s+ROUNDROBIN\b").unwrap());

static DISTRIBUTED_BY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)\bDISTRIBUTED\s+BY\s*\(\s*([^)]+)\)").unwrap()
});

static DISTRIBUTED_RANDOMLY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)\bDISTRIBUTED\s+RANDOMLY\b").unwrap());

static WITH_CLAUSE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)\bWITH\s*\(\s*([^)]*)\)").unwrap());

static TO_GROUP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)\bTO\s+GROUP\s+[`"]?([^`"\s;]+)[`"]?"#).unwrap()
});

/// Leading words of a table-level constraint inside a CREATE TABLE body.
const CONSTRAINT_WORDS: &[&str] = &[
    "CONSTRAINT",
    "PRIMARY",
    "FOREIGN",
    "UNIQUE",
    "CHECK",
    "INDEX",
    "KEY",
    "LIKE",
    "EXCLUDE",
];

/// Accumulates tables, columns and views from forward DDL.
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    catalog: Catalog,
    search_path: Option<String>,
    files: Vec<FileStats>,
}

impl CatalogBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schema applied to unqualified names, if a `SET search_path` was seen.
    pub fn search_path(&self) -> Option<&str> {
        self.search_path.as_deref()
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Stats for every file ingested so far, in ingestion order.
    pub fn file_stats(&self) -> &[FileStats] {
        &self.files
    }

    /// Split one file and apply each statement in order.
    ///
    /// Parse failures are logged and counted; they never abort the file.
    pub fn ingest_source(&mut self, path: &str, sql: &str) -> FileStats {
        let mut stats = FileStats {
            path: path.to_string(),
            ..Default::default()
        };

        for stmt in split_actions(sql) {
            stats.statements += 1;
            match self.apply(&stmt, path) {
                Ok(Applied::Changed) => stats.applied += 1,
                Ok(Applied::Ignored) => stats.ignored += 1,
                Err(e) => {
                    log::warn!("Skipping statement; file={}, error={}", path, e);
                    stats.parse_errors += 1;
                }
            }
        }

        self.catalog
            .metadata
            .checksums
            .insert(path.to_string(), crc32(sql));

        log::info!(
            "Scanned file; path={}, statements={}, applied={}, parse_errors={}",
            path,
            stats.statements,
            stats.applied,
            stats.parse_errors
        );
        self.files.push(stats.clone());
        stats
    }

    /// Classify and apply one statement. `source` is recorded on touched objects.
    pub fn apply(&mut self, stmt: &str, source: &str) -> Result<Applied> {
        let stmt = stmt.trim();
        match classify(stmt) {
            Statement::SetSearchPath { schema } => {
                self.search_path = Some(schema.to_lowercase());
                Ok(Applied::Changed)
            }
            Statement::CreateTable { name } => {
                self.apply_create_table(stmt, &name, source)?;
                Ok(Applied::Changed)
            }
            Statement::CommentOnTable { table, comment } => {
                let resolved = self.resolve(&table);
                let entry = self.catalog.upsert_table(&resolved);
                entry.comment = comment;
                entry.add_source(source);
                Ok(Applied::Changed)
            }
            Statement::CommentOnColumn {
                table,
                column,
                comment,
            } => {
                let resolved = self.resolve(&table);
                if let Some(view) = self.catalog.views.get_mut(&resolved.key()) {
                    view.append(stmt);
                    view.add_source(source);
                    return Ok(Applied::Changed);
                }
                let entry = self.catalog.upsert_table(&resolved);
                entry.add_source(source);
                entry.column_or_stub(&column).comment = comment;
                Ok(Applied::Changed)
            }
            Statement::CommentOnView { view, .. } => {
                let resolved = self.resolve(&view);
                let key = resolved.key();
                match self.catalog.views.get_mut(&key) {
                    Some(existing) => {
                        existing.append(stmt);
                        existing.add_source(source);
                    }
                    None => {
                        self.catalog.upsert_view(&resolved, stmt).add_source(source);
                    }
                }
                Ok(Applied::Changed)
            }
            Statement::CreateView { name } => {
                let resolved = self.resolve(&name);
                let view = self.catalog.upsert_view(&resolved, stmt);
                // A re-created view replaces the earlier definition
                view.definition = stmt.to_string();
                view.add_source(source);
                Ok(Applied::Changed)
            }
            other => {
                log::debug!("Ignoring statement for catalog; kind={}", other.kind());
                Ok(Applied::Ignored)
            }
        }
    }

    /// Stamp metadata and hand over the catalog.
    pub fn finish(mut self) -> Catalog {
        let total_files = self.files.len();
        self.catalog.refresh_metadata(total_files);
        self.catalog
    }

    fn resolve(&self, name: &ObjectName) -> ObjectName {
        name.resolve(self.search_path.as_deref())
    }

    fn apply_create_table(&mut self, stmt: &str, name: &ObjectName, source: &str) -> Result<()> {
        let body_start = CREATE_TABLE_BODY_RE
            .find(stmt)
            .map(|m| m.end())
            .ok_or_else(|| {
                RewindError::statement_parse("create table", "no column list found", stmt)
            })?;
        let (body, tail) = split_body(&stmt[body_start..]).ok_or_else(|| {
            RewindError::statement_parse("create table", "unbalanced parentheses", stmt)
        })?;

        let columns: Vec<(String, String)> = split_top_level(body)
            .into_iter()
            .filter_map(|def| parse_column(&def))
            .collect();
        let clauses = TableClauses::parse(tail);

        let resolved = self.resolve(name);
        let table = self.catalog.upsert_table(&resolved);
        table.name = resolved.name.clone();
        table.full_name = resolved.to_string();
        table.add_source(source);
        if let Some(d) = clauses.distribution {
            table.distribution = Some(d);
        }
        if let Some(w) = clauses.storage_options {
            table.storage_options = Some(w);
        }
        if let Some(g) = clauses.placement_group {
            table.placement_group = Some(g);
        }

        let declared = columns.len();
        let mut declared_keys = Vec::with_capacity(declared);
        for (ordinal, (col_name, data_type)) in columns.into_iter().enumerate() {
            let key = col_name.to_lowercase();
            let column = table
                .columns
                .entry(key.clone())
                .or_insert_with(|| Column::new(&col_name, &data_type, ordinal));
            column.name = col_name;
            column.data_type = data_type;
            column.ordinal = ordinal;
            declared_keys.push(key);
        }

        // Columns known only from earlier comments go after the declared ones
        let mut stubs: Vec<(usize, String)> = table
            .columns
            .iter()
            .filter(|(k, _)| !declared_keys.contains(*k))
            .map(|(k, c)| (c.ordinal, k.clone()))
            .collect();
        stubs.sort();
        for (offset, (_, key)) in stubs.into_iter().enumerate() {
            if let Some(c) = table.columns.get_mut(&key) {
                c.ordinal = declared + offset;
            }
        }

        log::debug!(
            "Recorded table; key={}, columns={}",
            resolved.key(),
            table.columns.len()
        );
        Ok(())
    }
}

/// Split `"a INT, b INT) WITH (...)"` at the parenthesis closing the body.
fn split_body(after_open: &str) -> Option<(&str, &str)> {
    let mut depth = 1usize;
    let mut quote: Option<char> = None;
    for (i, c) in after_open.char_indices() {
        match quote {
            Some(q) => {
                if c == q {
                    quote = None;
                }
            }
            None => match c {
                '\'' | '"' | '`' => quote = Some(c),
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some((&after_open[..i], &after_open[i + 1..]));
                    }
                }
                _ => {}
            },
        }
    }
    None
}

/// Split a table body on commas that are not nested in parentheses or quotes.
fn split_top_level(body: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;

    for c in body.chars() {
        match quote {
            Some(q) => {
                current.push(c);
                if c == q {
                    quote = None;
                }
            }
            None => match c {
                '\'' | '"' | '`' => {
                    quote = Some(c);
                    current.push(c);
                }
                '(' => {
                    depth += 1;
                    current.push(c);
                }
                ')' => {
                    depth = depth.saturating_sub(1);
                    current.push(c);
                }
                ',' if depth == 0 => {
                    let trimmed = current.trim();
                    if !trimmed.is_empty() {
                        parts.push(trimmed.to_string());
                    }
                    current.clear();
                }
                _ => current.push(c),
            },
        }
    }
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        parts.push(trimmed.to_string());
    }
    parts
}

/// Parse `name TYPE ...` into `(name, TYPE)`; `None` for constraints and
/// anything that does not start with an identifier followed by a type.
fn parse_column(def: &str) -> Option<(String, String)> {
    let caps = COLUMN_DEF_RE.captures(def)?;
    let quoted = caps.get(1).is_some_and(|m| !m.as_str().is_empty());
    let name = caps.get(2)?.as_str();
    if !quoted && CONSTRAINT_WORDS.iter().any(|w| w.eq_ignore_ascii_case(name)) {
        log::debug!("Skipping constraint definition; definition={}", def);
        return None;
    }

    let mut data_type = normalize_type(caps.get(3)?.as_str());
    let mut rest = &def[caps.get(0)?.end()..];
    while let Some(more) = TYPE_CONTINUATION_RE.captures(rest) {
        data_type.push(' ');
        data_type.push_str(&normalize_type(more.get(0)?.as_str().trim()));
        rest = &rest[more.get(0)?.end()..];
    }
    if let Some(array) = ARRAY_SUFFIX_RE.find(rest) {
        data_type.push_str(&array.as_str().split_whitespace().collect::<String>());
    }

    Some((name.to_string(), data_type))
}

/// Upper-case a type and drop whitespace before its parenthesized arguments.
fn normalize_type(raw: &str) -> String {
    let upper = raw.to_uppercase();
    match upper.find('(') {
        Some(open) => format!("{}{}", upper[..open].trim_end(), &upper[open..]),
        None => upper,
    }
}

/// Optional clauses following a CREATE TABLE body.
#[derive(Debug, Default, PartialEq)]
struct TableClauses {
    distribution: Option<Distribution>,
    storage_options: Option<StorageOptions>,
    placement_group: Option<String>,
}

impl TableClauses {
    fn parse(tail: &str) -> Self {
        // DISTRIBUTE BY HASH > DISTRIBUTE BY ROUNDROBIN > DISTRIBUTED BY > DISTRIBUTED RANDOMLY
        let distribution = if let Some(caps) = DISTRIBUTE_HASH_RE.captures(tail) {
            Some(Distribution::hash(split_column_list(&caps[1])))
        } else if DISTRIBUTE_ROUNDROBIN_RE.is_match(tail) {
            Some(Distribution::round_robin())
        } else if let Some(caps) = DISTRIBUTED_BY_RE.captures(tail) {
            Some(Distribution::hash(split_column_list(&caps[1])))
        } else if DISTRIBUTED_RANDOMLY_RE.is_match(tail) {
            Some(Distribution::random())
        } else {
            None
        };

        let storage_options = WITH_CLAUSE_RE
            .captures(tail)
            .map(|caps| StorageOptions::parse(&caps[0], &caps[1]));

        let placement_group = TO_GROUP_RE.captures(tail).map(|caps| caps[1].to_string());

        Self {
            distribution,
            storage_options,
            placement_group,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::DistributionKind;

    fn build(sql: &str) -> Catalog {
        let mut builder = CatalogBuilder::new();
        builder.ingest_source("a.sql", sql);
        builder.finish()
    }

    #[test]
    fn test_create_table_columns_in_order() {
        let catalog = build("CREATE TABLE public.orders (id INT, amount NUMERIC(10, 2), note text);");
        let table = &catalog.tables["public.orders"];
        let cols: Vec<(&str, &str)> = table
            .columns_in_order()
            .iter()
            .map(|c| (c.name.as_str(), c.data_type.as_str()))
            .collect();
        assert_eq!(
            cols,
            vec![("id", "INT"), ("amount", "NUMERIC(10, 2)"), ("note", "TEXT")]
        );
        assert_eq!(table.source_files, vec!["a.sql"]);
    }

    #[test]
    fn test_search_path_qualifies_unqualified_names() {
        let catalog = build("SET SEARCH_PATH = sales; CREATE TABLE orders (id INT);");
        assert!(catalog.tables.contains_key("sales.orders"));
        assert_eq!(catalog.tables["sales.orders"].schema.as_deref(), Some("sales"));
    }

    #[test]
    fn test_search_path_carries_across_files_in_one_pass() {
        let mut builder = CatalogBuilder::new();
        builder.ingest_source("a.sql", "SET search_path = hr;");
        builder.ingest_source("b.sql", "CREATE TABLE people (id INT);");
        let catalog = builder.finish();
        assert!(catalog.tables.contains_key("hr.people"));
        assert_eq!(catalog.metadata.total_files, 2);
    }

    #[test]
    fn test_fresh_builder_has_no_search_path() {
        let mut first = CatalogBuilder::new();
        first.ingest_source("a.sql", "SET search_path = hr;");
        assert_eq!(first.search_path(), Some("hr"));

        let second = CatalogBuilder::new();
        assert_eq!(second.search_path(), None);
    }

    #[test]
    fn test_constraints_are_skipped() {
        let sql = "CREATE TABLE t (
            id INT NOT NULL,
            code VARCHAR(10) DEFAULT 'a,b',
            CONSTRAINT pk_t PRIMARY KEY (id),
            PRIMARY KEY (id),
            UNIQUE (code),
            FOREIGN KEY (id) REFERENCES other(id)
        );";
        let catalog = build(sql);
        let table = &catalog.tables["t"];
        assert_eq!(table.columns.len(), 2);
        assert_eq!(table.column("code").unwrap().data_type, "VARCHAR(10)");
    }

    #[test]
    fn test_multi_word_types() {
        let catalog = build(
            "CREATE TABLE t (a DOUBLE PRECISION, b TIMESTAMP WITH TIME ZONE NOT NULL, c character varying(20), d INT[]);",
        );
        let table = &catalog.tables["t"];
        assert_eq!(table.column("a").unwrap().data_type, "DOUBLE PRECISION");
        assert_eq!(table.column("b").unwrap().data_type, "TIMESTAMP WITH TIME ZONE");
        assert_eq!(table.column("c").unwrap().data_type, "CHARACTER VARYING(20)");
        assert_eq!(table.column("d").unwrap().data_type, "INT[]");
    }

    #[test]
    fn test_tail_clauses() {
        let sql = r#"CREATE TABLE dw.facts (id INT, region TEXT)
            WITH (ORIENTATION = COLUMN, COMPRESSION = LOW)
            DISTRIBUTE BY HASH(id, "region")
            TO GROUP "GROUP1";"#;
        let catalog = build(sql);
        let table = &catalog.tables["dw.facts"];
        let dist = table.distribution.as_ref().unwrap();
        assert_eq!(dist.kind, DistributionKind::Hash);
        assert_eq!(dist.columns, vec!["id", "region"]);
        let with = table.storage_options.as_ref().unwrap();
        assert!(with.raw.starts_with("WITH (ORIENTATION"));
        assert_eq!(with.options.get("ORIENTATION").map(String::as_str), Some("COLUMN"));
        assert_eq!(table.placement_group.as_deref(), Some("GROUP1"));
    }

    #[test]
    fn test_legacy_distribution_syntax() {
        let catalog = build("CREATE TABLE a (id INT) DISTRIBUTED BY (id); CREATE TABLE b (id INT) DISTRIBUTED RANDOMLY;");
        assert_eq!(
            catalog.tables["a"].distribution,
            Some(Distribution::hash(vec!["id".into()]))
        );
        assert_eq!(catalog.tables["b"].distribution, Some(Distribution::random()));
    }

    #[test]
    fn test_comments_create_stubs() {
        let catalog = build(
            "COMMENT ON TABLE orders IS 'all orders'; COMMENT ON COLUMN orders.status IS 'order status';",
        );
        let table = &catalog.tables["orders"];
        assert_eq!(table.comment.as_deref(), Some("all orders"));
        let status = table.column("status").unwrap();
        assert_eq!(status.data_type, "UNKNOWN");
        assert_eq!(status.comment.as_deref(), Some("order status"));
    }

    #[test]
    fn test_create_after_comment_keeps_comment_and_reorders_stubs() {
        let catalog = build(
            "COMMENT ON COLUMN t.legacy IS 'old'; COMMENT ON COLUMN t.id IS 'key';
             CREATE TABLE t (id INT, name TEXT);",
        );
        let table = &catalog.tables["t"];
        let names: Vec<&str> = table.columns_in_order().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["id", "name", "legacy"]);
        assert_eq!(table.column("id").unwrap().comment.as_deref(), Some("key"));
        assert_eq!(table.column("id").unwrap().data_type, "INT");
    }

    #[test]
    fn test_later_create_does_not_clear_clauses() {
        let catalog = build(
            "CREATE TABLE t (id INT) TO GROUP g1; CREATE TABLE t (id INT, x INT);",
        );
        let table = &catalog.tables["t"];
        assert_eq!(table.placement_group.as_deref(), Some("g1"));
        assert_eq!(table.columns.len(), 2);
    }

    #[test]
    fn test_view_definitions_and_comments() {
        let catalog = build(
            "CREATE VIEW public.v AS SELECT 1 AS a;
             COMMENT ON COLUMN public.v.a IS 'first';
             COMMENT ON VIEW public.v IS 'demo';",
        );
        let view = &catalog.views["public.v"];
        assert_eq!(
            view.definition,
            "CREATE VIEW public.v AS SELECT 1 AS a;\nCOMMENT ON COLUMN public.v.a IS 'first';\nCOMMENT ON VIEW public.v IS 'demo';"
        );
        assert!(!catalog.tables.contains_key("public.v"));
    }

    #[test]
    fn test_comment_on_unknown_view_creates_stub() {
        let catalog = build("COMMENT ON VIEW v IS 'later';");
        assert_eq!(catalog.views["v"].definition, "COMMENT ON VIEW v IS 'later';");
    }

    #[test]
    fn test_parse_errors_are_counted_not_fatal() {
        let mut builder = CatalogBuilder::new();
        let stats = builder.ingest_source(
            "a.sql",
            "CREATE TABLE broken (id INT; CREATE TABLE ok (id INT); INSERT INTO ok VALUES (1);",
        );
        assert_eq!(stats.statements, 3);
        assert_eq!(stats.parse_errors, 1);
        assert_eq!(stats.applied, 1);
        assert_eq!(stats.ignored, 1);
        let catalog = builder.finish();
        assert!(catalog.tables.contains_key("ok"));
        assert!(!catalog.tables.contains_key("broken"));
    }

    #[test]
    fn test_metadata_totals_and_checksums() {
        let sql = "CREATE TABLE a (x INT, y INT); CREATE VIEW v AS SELECT 1;";
        let catalog = build(sql);
        assert_eq!(catalog.metadata.total_tables, 1);
        assert_eq!(catalog.metadata.total_views, 1);
        assert_eq!(catalog.metadata.total_columns, 2);
        assert_eq!(catalog.metadata.checksums["a.sql"], crc32(sql));
        assert!(catalog.metadata.parsed_at.is_some());
    }

    #[test]
    fn test_case_insensitive_keys_keep_display_casing() {
        let catalog = build("CREATE TABLE \"Public\".\"Orders\" (\"Id\" INT);");
        let table = &catalog.tables["public.orders"];
        assert_eq!(table.name, "Orders");
        assert_eq!(table.full_name, "Public.Orders");
        assert_eq!(table.column("id").unwrap().name, "Id");
    }
}
