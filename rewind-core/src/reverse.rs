//! Inverse SQL for individual forward statements.
//!
//! Each forward statement maps to one [`Reversal`]. When the catalog lacks the
//! information an inverse needs, the result is an explicit `/* MANUAL: ... */`
//! marker rather than guessed SQL. The catalog is only ever read here.

use serde::Serialize;

use crate::catalog::{Catalog, Distribution, Table, View};
use crate::classifier::{classify, split_alter_actions, ObjectName, Statement};

/// Marker emitted for statements no rule recognizes.
pub const UNSUPPORTED_MARKER: &str =
    "/* UNSUPPORTED: statement type cannot be reversed automatically, handle manually */";

/// Opening of every manual-intervention marker.
pub const MANUAL_PREFIX: &str = "/* MANUAL: ";

/// Outcome of reversing one forward statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "sql", rename_all = "snake_case")]
pub enum Reversal {
    /// Executable inverse SQL.
    Statement(String),
    /// A marker describing what must be written by hand.
    Manual(String),
    /// The statement kind is not supported.
    Unsupported,
    /// The statement intentionally has no inverse.
    Skipped,
}

impl Reversal {
    fn manual(message: impl AsRef<str>) -> Self {
        Reversal::Manual(format!("{}{} */", MANUAL_PREFIX, message.as_ref()))
    }

    /// Text to place in a rollback script, or `None` when nothing is emitted.
    pub fn render(&self) -> Option<String> {
        match self {
            Reversal::Statement(sql) | Reversal::Manual(sql) => Some(sql.clone()),
            Reversal::Unsupported => Some(UNSUPPORTED_MARKER.to_string()),
            Reversal::Skipped => None,
        }
    }

    /// True when the reversal is runnable SQL with no manual follow-up.
    pub fn is_complete(&self) -> bool {
        matches!(self, Reversal::Statement(_) | Reversal::Skipped)
    }
}

/// Where a forward statement sits: its file and the search path in effect.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatementContext<'a> {
    pub file: &'a str,
    pub search_path: Option<&'a str>,
}

/// Fallback clauses for rebuilding a dropped table whose catalog entry has none.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconstructDefaults {
    /// Raw storage-options clause, e.g. `WITH(ORIENTATION = COLUMN)`.
    pub storage_options: Option<String>,
    pub distribution: Option<Distribution>,
    pub placement_group: Option<String>,
}

/// Generates inverse statements against an optional, read-only catalog.
#[derive(Debug, Clone, Default)]
pub struct ReverseGenerator<'a> {
    catalog: Option<&'a Catalog>,
    defaults: ReconstructDefaults,
}

impl<'a> ReverseGenerator<'a> {
    pub fn new(catalog: Option<&'a Catalog>) -> Self {
        Self {
            catalog,
            defaults: ReconstructDefaults::default(),
        }
    }

    pub fn with_defaults(mut self, defaults: ReconstructDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    /// Classify and reverse one statement.
    ///
    /// A multi-action `ALTER TABLE` is reversed action by action, last action
    /// first. The result is only a [`Reversal::Statement`] when every action
    /// reversed cleanly.
    pub fn reverse(&self, stmt: &str, ctx: &StatementContext<'_>) -> Reversal {
        let Some(actions) = split_alter_actions(stmt) else {
            return self.reverse_classified(&classify(stmt), ctx);
        };

        let parts: Vec<Reversal> = actions
            .iter()
            .rev()
            .map(|action| self.reverse_classified(&classify(action), ctx))
            .collect();
        let rendered: Vec<String> = parts.iter().filter_map(Reversal::render).collect();
        if rendered.is_empty() {
            Reversal::Skipped
        } else if parts.iter().all(Reversal::is_complete) {
            Reversal::Statement(rendered.join("\n"))
        } else {
            Reversal::Manual(rendered.join("\n"))
        }
    }

    /// Reverse an already classified statement.
    pub fn reverse_classified(&self, statement: &Statement, ctx: &StatementContext<'_>) -> Reversal {
        match statement {
            Statement::SetSearchPath { .. } => Reversal::Skipped,
            Statement::CreateTable { name } => {
                Reversal::Statement(format!("DROP TABLE IF EXISTS {};", name))
            }
            Statement::DropTable { name } => self.reverse_drop_table(name, ctx),
            Statement::AddColumn {
                table,
                column,
                column_keyword,
                ..
            } => {
                if *column_keyword {
                    Reversal::Statement(format!(
                        "ALTER TABLE {} DROP COLUMN IF EXISTS {};",
                        table, column
                    ))
                } else {
                    Reversal::Statement(format!("ALTER TABLE {} DROP {};", table, column))
                }
            }
            Statement::DropColumn {
                table,
                column,
                column_keyword,
            } => self.reverse_drop_column(table, column, *column_keyword, ctx),
            Statement::ModifyColumn {
                table,
                column,
                column_keyword,
                ..
            } => {
                let keyword = if *column_keyword { "COLUMN " } else { "" };
                match self.known_column_type(table, column, ctx) {
                    Some(data_type) => Reversal::Statement(format!(
                        "ALTER TABLE {} MODIFY {}{} {};",
                        table, keyword, column, data_type
                    )),
                    None => Reversal::manual(format!(
                        "original column type needed: ALTER TABLE {} MODIFY {}{} <original type>;",
                        table, keyword, column
                    )),
                }
            }
            Statement::AddPartition {
                table,
                partition,
                bounds,
            } => match partition {
                Some(p) => {
                    let mut sql = format!("ALTER TABLE {} DROP PARTITION {};", table, p);
                    if let Some(b) = bounds {
                        sql.push_str(&format!("\n/* original range: {} */", b));
                    }
                    Reversal::Statement(sql)
                }
                None => Reversal::manual(format!(
                    "partition name not found, for example: ALTER TABLE {} DROP PARTITION <partition_name>;",
                    table
                )),
            },
            Statement::AttachPartition { table, child } => Reversal::Statement(format!(
                "ALTER TABLE {} DETACH PARTITION {};",
                table, child
            )),
            Statement::DetachPartition { table, child } => Reversal::manual(format!(
                "partition bounds are not recorded, for example: ALTER TABLE {} ATTACH PARTITION {} FOR VALUES ...;",
                table, child
            )),
            Statement::RenameTable { from, to } => {
                Reversal::Statement(format!("RENAME TABLE {} TO {};", to, from))
            }
            Statement::RenameColumn { table, from, to } => Reversal::Statement(format!(
                "ALTER TABLE {} RENAME COLUMN {} TO {};",
                table, to, from
            )),
            Statement::RenameBare { table, from, to } => Reversal::Statement(format!(
                "ALTER TABLE {} RENAME {} TO {};",
                table, to, from
            )),
            Statement::RenameTo { table, to } => Reversal::Statement(format!(
                "ALTER TABLE {} RENAME TO {};",
                table.with_name(&to.name),
                table.name
            )),
            Statement::CreateIndex { name, .. } => {
                Reversal::Statement(format!("DROP INDEX IF EXISTS {};", name))
            }
            Statement::DropIndex { name } => Reversal::manual(format!(
                "index definition is not recorded: CREATE INDEX {} ON <table> (<columns>);",
                name
            )),
            Statement::CreateView { name } => match self.view_definition(name, ctx) {
                Some(definition) => Reversal::Statement(definition),
                None => Reversal::Statement(format!("DROP VIEW IF EXISTS {};", name)),
            },
            Statement::DropView { name } => match self.view_definition(name, ctx) {
                Some(definition) => Reversal::Statement(definition),
                None => Reversal::manual(format!(
                    "view definition needed: CREATE OR REPLACE VIEW {} AS SELECT ...;",
                    name
                )),
            },
            Statement::AlterViewRenameTo { view, to } => Reversal::Statement(format!(
                "ALTER VIEW {} RENAME TO {};",
                view.with_name(&to.name),
                view.name
            )),
            Statement::CommentOnTable { table, .. } => match self.table(table, ctx) {
                Some(known) => Reversal::Statement(format!(
                    "COMMENT ON TABLE {} IS '{}';",
                    table,
                    known.comment.as_deref().unwrap_or("")
                )),
                None => Reversal::manual(format!(
                    "no catalog information for table {}, prior comment unknown",
                    table
                )),
            },
            Statement::CommentOnColumn { table, column, .. } => {
                if self.view(table, ctx).is_some() {
                    return Reversal::Skipped;
                }
                match self.table(table, ctx).and_then(|t| t.column(column)) {
                    Some(known) => Reversal::Statement(format!(
                        "COMMENT ON COLUMN {}.{} IS '{}';",
                        table,
                        column,
                        known.comment.as_deref().unwrap_or("")
                    )),
                    // A column the catalog never saw is usually new in this change
                    None => Reversal::Skipped,
                }
            }
            Statement::CommentOnView { .. } => Reversal::Skipped,
            Statement::Unrecognized { .. } => Reversal::Unsupported,
        }
    }

    fn table(&self, name: &ObjectName, ctx: &StatementContext<'_>) -> Option<&'a Table> {
        self.catalog?.lookup_table(name, ctx.search_path)
    }

    fn view(&self, name: &ObjectName, ctx: &StatementContext<'_>) -> Option<&'a View> {
        self.catalog?.lookup_view(name, ctx.search_path)
    }

    fn view_definition(&self, name: &ObjectName, ctx: &StatementContext<'_>) -> Option<String> {
        self.view(name, ctx)
            .map(|v| v.definition.clone())
            .filter(|d| !d.trim().is_empty())
    }

    fn known_column_type(
        &self,
        table: &ObjectName,
        column: &str,
        ctx: &StatementContext<'_>,
    ) -> Option<&'a str> {
        self.table(table, ctx)
            .and_then(|t| t.column(column))
            .map(|c| c.data_type.as_str())
            .filter(|t| is_known_type(t))
    }

    fn reverse_drop_table(&self, name: &ObjectName, ctx: &StatementContext<'_>) -> Reversal {
        let Some(table) = self.table(name, ctx).filter(|t| !t.columns.is_empty()) else {
            return Reversal::manual(format!(
                "table structure needed: CREATE TABLE {} (<columns>);",
                name
            ));
        };

        let sql = reconstruct_create_table(table, &self.defaults);
        if table.columns.values().all(|c| is_known_type(&c.data_type)) {
            Reversal::Statement(sql)
        } else {
            Reversal::manual(format!(
                "column types missing from catalog for {}, review before running:\n{}\n",
                name, sql
            ))
        }
    }

    fn reverse_drop_column(
        &self,
        table: &ObjectName,
        column: &str,
        column_keyword: bool,
        ctx: &StatementContext<'_>,
    ) -> Reversal {
        let keyword = if column_keyword { "COLUMN " } else { "" };
        let known = self
            .table(table, ctx)
            .and_then(|t| t.column(column))
            .filter(|c| is_known_type(&c.data_type));

        let Some(col) = known else {
            return Reversal::manual(format!(
                "column type needed: ALTER TABLE {} ADD {}{} <type>;",
                table, keyword, column
            ));
        };

        let mut sql = format!(
            "ALTER TABLE {} ADD {}{} {}{};",
            table,
            keyword,
            column,
            col.data_type,
            col.legacy_options_sql()
        );
        if let Some(comment) = &col.comment {
            sql.push_str(&format!(
                "\nCOMMENT ON COLUMN {}.{} IS '{}';",
                table, column, comment
            ));
        }
        Reversal::Statement(sql)
    }
}

fn is_known_type(data_type: &str) -> bool {
    !data_type.is_empty() && !data_type.eq_ignore_ascii_case("UNKNOWN")
}

/// Schema-qualified display name for a catalog table.
fn qualified_name(table: &Table) -> String {
    if table.full_name.contains('.') {
        return table.full_name.clone();
    }
    let name = if table.full_name.is_empty() {
        &table.name
    } else {
        &table.full_name
    };
    match &table.schema {
        Some(schema) => format!("{}.{}", schema, name),
        None => name.clone(),
    }
}

/// Rebuild `CREATE TABLE` for a catalog table, followed by its comments.
///
/// Columns come out in declaration order. Storage options, distribution and
/// placement group use the table's own clauses, falling back to `defaults`.
pub fn reconstruct_create_table(table: &Table, defaults: &ReconstructDefaults) -> String {
    let name = qualified_name(table);
    let columns = table.columns_in_order();

    let mut lines = Vec::new();
    lines.push(format!("CREATE TABLE {} (", name));
    let defs: Vec<String> = columns
        .iter()
        .map(|c| format!("  {} {}", c.name, c.data_type))
        .collect();
    lines.push(defs.join(",\n"));

    let storage = table
        .storage_options
        .as_ref()
        .map(|w| w.raw.clone())
        .filter(|raw| !raw.is_empty())
        .or_else(|| defaults.storage_options.clone());
    match storage {
        Some(raw) => lines.push(format!(") {}", raw)),
        None => lines.push(")".to_string()),
    }

    let distribution = table
        .distribution
        .as_ref()
        .or(defaults.distribution.as_ref())
        .and_then(|d| d.to_sql());
    if let Some(d) = distribution {
        lines.push(d);
    }

    if let Some(group) = table
        .placement_group
        .as_ref()
        .or(defaults.placement_group.as_ref())
    {
        lines.push(format!("TO GROUP \"{}\"", group));
    }

    let mut sql = lines.join("\n");
    sql.push(';');

    if let Some(comment) = &table.comment {
        sql.push_str(&format!("\nCOMMENT ON TABLE {} IS '{}';", name, comment));
    }
    for column in columns.iter().filter(|c| c.comment.is_some()) {
        sql.push_str(&format!(
            "\nCOMMENT ON COLUMN {}.{} IS '{}';",
            name,
            column.name,
            column.comment.as_deref().unwrap_or("")
        ));
    }
    sql
}

/// `DROP TABLE IF EXISTS` for every catalog table, in reverse key order.
///
/// With `annotate`, each drop is preceded by a comment naming the table and
/// its comment, if any.
pub fn drop_catalog_tables(catalog: &Catalog, annotate: bool) -> Vec<String> {
    catalog
        .tables
        .values()
        .rev()
        .map(|table| {
            let name = qualified_name(table);
            let drop = format!("DROP TABLE IF EXISTS {};", name);
            match (annotate, &table.comment) {
                (false, _) => drop,
                (true, Some(comment)) => format!(
                    "/* table: {} ({}) */\n{}",
                    name,
                    comment.replace("*/", "* /"),
                    drop
                ),
                (true, None) => format!("/* table: {} */\n{}", name, drop),
            }
        })
        .collect()
}
