//! Regex-based classification of single DDL statements.
//!
//! Classification is an ordered list of independent rules. The first rule
//! whose pattern matches at the start of the statement wins, so more specific
//! patterns sit ahead of the generic ones that share their prefix. Anything
//! no rule accepts is [`Statement::Unrecognized`].

use std::fmt;
use std::sync::LazyLock;

use regex_lite::{Captures, Regex};
use serde::Serialize;

use crate::error::preview;

/// A possibly schema-qualified object name with quotes stripped.
///
/// Display casing is kept as written; [`ObjectName::key`] gives the
/// case-insensitive catalog key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ObjectName {
    pub schema: Option<String>,
    pub name: String,
}

impl ObjectName {
    pub fn new(schema: Option<&str>, name: &str) -> Self {
        Self {
            schema: schema.map(String::from),
            name: name.to_string(),
        }
    }

    /// Parse `name`, `schema.name` or a quoted form of either.
    pub fn parse(raw: &str) -> Self {
        let parts: Vec<&str> = raw.split('.').map(strip_quotes).collect();
        match parts.as_slice() {
            [name] => Self::new(None, name),
            [.., schema, name] => Self::new(Some(schema), name),
            [] => Self::new(None, raw),
        }
    }

    /// Lowercase catalog key: `schema.name`, or `name` when unqualified.
    pub fn key(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{}.{}", schema.to_lowercase(), self.name.to_lowercase()),
            None => self.name.to_lowercase(),
        }
    }

    /// Qualify an unqualified name with the active search-path schema.
    pub fn resolve(&self, search_path: Option<&str>) -> ObjectName {
        match (&self.schema, search_path) {
            (None, Some(schema)) => Self::new(Some(schema), &self.name),
            _ => self.clone(),
        }
    }

    /// Same schema, different object name.
    pub fn with_name(&self, name: &str) -> ObjectName {
        Self::new(self.schema.as_deref(), name)
    }

    pub fn is_qualified(&self) -> bool {
        self.schema.is_some()
    }
}

impl fmt::Display for ObjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.schema {
            Some(schema) => write!(f, "{}.{}", schema, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// A classified forward statement with its captured operands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Statement {
    /// `SET search_path = schema`.
    SetSearchPath { schema: String },
    CreateTable { name: ObjectName },
    DropTable { name: ObjectName },
    /// `ALTER TABLE t ADD PARTITION p ...`.
    AddPartition {
        table: ObjectName,
        /// `None` when the statement carries no partition name.
        partition: Option<String>,
        /// Bound clause following the partition name, if any.
        bounds: Option<String>,
    },
    AttachPartition { table: ObjectName, child: ObjectName },
    DetachPartition { table: ObjectName, child: ObjectName },
    AddColumn {
        table: ObjectName,
        column: String,
        /// Type and options as written after the column name.
        definition: Option<String>,
        /// Whether the optional `COLUMN` keyword was present.
        column_keyword: bool,
    },
    DropColumn {
        table: ObjectName,
        column: String,
        column_keyword: bool,
    },
    ModifyColumn {
        table: ObjectName,
        column: String,
        definition: Option<String>,
        column_keyword: bool,
    },
    /// `RENAME TABLE old TO new`.
    RenameTable { from: ObjectName, to: ObjectName },
    /// `ALTER TABLE t RENAME COLUMN old TO new`.
    RenameColumn {
        table: ObjectName,
        from: String,
        to: String,
    },
    /// `ALTER TABLE t RENAME old TO new` without the COLUMN keyword.
    RenameBare {
        table: ObjectName,
        from: String,
        to: String,
    },
    /// `ALTER TABLE old RENAME TO new`.
    RenameTo { table: ObjectName, to: ObjectName },
    CreateIndex {
        name: ObjectName,
        table: ObjectName,
        unique: bool,
    },
    DropIndex { name: ObjectName },
    CreateView { name: ObjectName },
    DropView { name: ObjectName },
    AlterViewRenameTo { view: ObjectName, to: ObjectName },
    /// `COMMENT ON TABLE t IS '...'`; `comment` is `None` for `IS NULL`.
    CommentOnTable {
        table: ObjectName,
        comment: Option<String>,
    },
    CommentOnColumn {
        table: ObjectName,
        column: String,
        comment: Option<String>,
    },
    CommentOnView {
        view: ObjectName,
        comment: Option<String>,
    },
    /// Any statement no rule recognizes.
    Unrecognized { preview: String },
}

impl Statement {
    /// Short human-readable name of the operation kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Statement::SetSearchPath { .. } => "set search_path",
            Statement::CreateTable { .. } => "create table",
            Statement::DropTable { .. } => "drop table",
            Statement::AddPartition { .. } => "add partition",
            Statement::AttachPartition { .. } => "attach partition",
            Statement::DetachPartition { .. } => "detach partition",
            Statement::AddColumn { .. } => "add column",
            Statement::DropColumn { .. } => "drop column",
            Statement::ModifyColumn { .. } => "modify column",
            Statement::RenameTable { .. } => "rename table",
            Statement::RenameColumn { .. } => "rename column",
            Statement::RenameBare { .. } => "rename",
            Statement::RenameTo { .. } => "rename to",
            Statement::CreateIndex { .. } => "create index",
            Statement::DropIndex { .. } => "drop index",
            Statement::CreateView { .. } => "create view",
            Statement::DropView { .. } => "drop view",
            Statement::AlterViewRenameTo { .. } => "alter view rename to",
            Statement::CommentOnTable { .. } => "comment on table",
            Statement::CommentOnColumn { .. } => "comment on column",
            Statement::CommentOnView { .. } => "comment on view",
            Statement::Unrecognized { .. } => "unrecognized",
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, Statement::Unrecognized { .. })
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::SetSearchPath { schema } => write!(f, "SET search_path = {}", schema),
            Statement::CreateTable { name } => write!(f, "CREATE TABLE {}", name),
            Statement::DropTable { name } => write!(f, "DROP TABLE {}", name),
            Statement::AddPartition {
                table, partition, ..
            } => match partition {
                Some(p) => write!(f, "ALTER TABLE {} ADD PARTITION {}", table, p),
                None => write!(f, "ALTER TABLE {} ADD PARTITION", table),
            },
            Statement::AttachPartition { table, child } => {
                write!(f, "ALTER TABLE {} ATTACH PARTITION {}", table, child)
            }
            Statement::DetachPartition { table, child } => {
                write!(f, "ALTER TABLE {} DETACH PARTITION {}", table, child)
            }
            Statement::AddColumn { table, column, .. } => {
                write!(f, "ALTER TABLE {} ADD COLUMN {}", table, column)
            }
            Statement::DropColumn { table, column, .. } => {
                write!(f, "ALTER TABLE {} DROP COLUMN {}", table, column)
            }
            Statement::ModifyColumn { table, column, .. } => {
                write!(f, "ALTER TABLE {} MODIFY COLUMN {}", table, column)
            }
            Statement::RenameTable { from, to } => write!(f, "RENAME TABLE {} TO {}", from, to),
            Statement::RenameColumn { table, from, to } => {
                write!(f, "ALTER TABLE {} RENAME COLUMN {} TO {}", table, from, to)
            }
            Statement::RenameBare { table, from, to } => {
                write!(f, "ALTER TABLE {} RENAME {} TO {}", table, from, to)
            }
            Statement::RenameTo { table, to } => {
                write!(f, "ALTER TABLE {} RENAME TO {}", table, to)
            }
            Statement::CreateIndex {
                name,
                table,
                unique,
            } => {
                let unique = if *unique { "UNIQUE " } else { "" };
                write!(f, "CREATE {}INDEX {} ON {}", unique, name, table)
            }
            Statement::DropIndex { name } => write!(f, "DROP INDEX {}", name),
            Statement::CreateView { name } => write!(f, "CREATE VIEW {}", name),
            Statement::DropView { name } => write!(f, "DROP VIEW {}", name),
            Statement::AlterViewRenameTo { view, to } => {
                write!(f, "ALTER VIEW {} RENAME TO {}", view, to)
            }
            Statement::CommentOnTable { table, .. } => write!(f, "COMMENT ON TABLE {}", table),
            Statement::CommentOnColumn { table, column, .. } => {
                write!(f, "COMMENT ON COLUMN {}.{}", table, column)
            }
            Statement::CommentOnView { view, .. } => write!(f, "COMMENT ON VIEW {}", view),
            Statement::Unrecognized { preview } => write!(f, "{}", preview),
        }
    }
}

/// One identifier, optionally quoted with `"` or backticks.
const IDENT: &str = r#"[`"]?[\w$-]+[`"]?"#;

/// A column definition up to the next top-level comma or semicolon.
const DEFINITION: &str = r"[^,;(]+(?:\([^)]*\)[^,;(]*)*";

fn qname() -> String {
    format!(r"{IDENT}(?:\.{IDENT})?")
}

/// Compile an anchored, case-insensitive rule, expanding the `QNAME`, `IDENT`
/// and `DEFINITION` placeholders.
pub(crate) fn rule(pattern: &str) -> Regex {
    let pattern = pattern
        .replace("QNAME", &qname())
        .replace("IDENT", IDENT)
        .replace("DEFINITION", DEFINITION);
    Regex::new(&format!(r"(?is)^\s*{}", pattern)).unwrap()
}

static SEARCH_PATH_RE: LazyLock<Regex> =
    LazyLock::new(|| rule(r"SET\s+search_path\s*(?:=|TO)\s*([^;]+?)\s*;?\s*$"));

static CREATE_TABLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    rule(r"CREATE\s+(?:(?:TEMPORARY|TEMP|UNLOGGED)\s+)?TABLE\s+(?:IF\s+NOT\s+EXISTS\s+)?(QNAME)")
});

static DROP_TABLE_RE: LazyLock<Regex> =
    LazyLock::new(|| rule(r"DROP\s+TABLE\s+(?:IF\s+EXISTS\s+)?(QNAME)"));

static ADD_PARTITION_RE: LazyLock<Regex> = LazyLock::new(|| {
    rule(r"ALTER\s+TABLE\s+(?:ONLY\s+)?(QNAME)\s+ADD\s+PARTITION\b\s*(IDENT)?\s*(.*?)\s*;?\s*$")
});

static ATTACH_PARTITION_RE: LazyLock<Regex> = LazyLock::new(|| {
    rule(r"ALTER\s+TABLE\s+(?:ONLY\s+)?(QNAME)\s+ATTACH\s+PARTITION\s+(QNAME)")
});

static DETACH_PARTITION_RE: LazyLock<Regex> = LazyLock::new(|| {
    rule(r"ALTER\s+TABLE\s+(?:ONLY\s+)?(QNAME)\s+DETACH\s+PARTITION\s+(QNAME)")
});

static ADD_COLUMN_RE: LazyLock<Regex> = LazyLock::new(|| {
    rule(r"ALTER\s+TABLE\s+(?:ONLY\s+)?(QNAME)\s+ADD\s+(COLUMN\s+)?(?:IF\s+NOT\s+EXISTS\s+)?(IDENT)(?:\s+(DEFINITION))?")
});

static DROP_COLUMN_RE: LazyLock<Regex> = LazyLock::new(|| {
    rule(r"ALTER\s+TABLE\s+(?:ONLY\s+)?(QNAME)\s+DROP\s+(COLUMN\s+)?(?:IF\s+EXISTS\s+)?(IDENT)")
});

static MODIFY_COLUMN_RE: LazyLock<Regex> = LazyLock::new(|| {
    rule(r"ALTER\s+TABLE\s+(QNAME)\s+MODIFY\s+(COLUMN\s+)?(IDENT)(?:\s+(DEFINITION))?")
});

static RENAME_TABLE_RE: LazyLock<Regex> =
    LazyLock::new(|| rule(r"RENAME\s+TABLE\s+(QNAME)\s+TO\s+(QNAME)"));

static RENAME_COLUMN_RE: LazyLock<Regex> = LazyLock::new(|| {
    rule(r"ALTER\s+TABLE\s+(?:IF\s+EXISTS\s+)?(QNAME)\s+RENAME\s+COLUMN\s+(IDENT)\s+TO\s+(IDENT)")
});

static RENAME_BARE_RE: LazyLock<Regex> = LazyLock::new(|| {
    rule(r"ALTER\s+TABLE\s+(?:IF\s+EXISTS\s+)?(QNAME)\s+RENAME\s+(IDENT)\s+TO\s+(IDENT)")
});

static RENAME_TO_RE: LazyLock<Regex> = LazyLock::new(|| {
    rule(r"ALTER\s+TABLE\s+(?:IF\s+EXISTS\s+)?(QNAME)\s+RENAME\s+TO\s+(QNAME)")
});

static CREATE_INDEX_RE: LazyLock<Regex> = LazyLock::new(|| {
    rule(r"CREATE\s+(UNIQUE\s+)?INDEX\s+(?:CONCURRENTLY\s+)?(?:IF\s+NOT\s+EXISTS\s+)?(QNAME)\s+ON\s+(?:ONLY\s+)?(QNAME)")
});

static DROP_INDEX_RE: LazyLock<Regex> = LazyLock::new(|| {
    rule(r"DROP\s+INDEX\s+(?:CONCURRENTLY\s+)?(?:IF\s+EXISTS\s+)?(QNAME)")
});

static CREATE_VIEW_RE: LazyLock<Regex> = LazyLock::new(|| {
    rule(r"CREATE\s+(?:OR\s+REPLACE\s+)?VIEW\s+(QNAME)(?:\s*\([^)]*\))?\s+AS\b")
});

static DROP_VIEW_RE: LazyLock<Regex> =
    LazyLock::new(|| rule(r"DROP\s+VIEW\s+(?:IF\s+EXISTS\s+)?(QNAME)"));

static ALTER_VIEW_RENAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    rule(r"ALTER\s+VIEW\s+(?:IF\s+EXISTS\s+)?(QNAME)\s+RENAME\s+TO\s+(QNAME)")
});

const COMMENT_LITERAL: &str = r"(?:'((?:[^'\\]|''|\\.)*)'|NULL)";

static COMMENT_ON_TABLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    rule(&format!(r"COMMENT\s+ON\s+TABLE\s+(QNAME)\s+IS\s+{COMMENT_LITERAL}"))
});

static COMMENT_ON_COLUMN_RE: LazyLock<Regex> = LazyLock::new(|| {
    rule(&format!(
        r"COMMENT\s+ON\s+COLUMN\s+(IDENT(?:\.IDENT){{1,2}})\s+IS\s+{COMMENT_LITERAL}"
    ))
});

static COMMENT_ON_VIEW_RE: LazyLock<Regex> = LazyLock::new(|| {
    rule(&format!(r"COMMENT\s+ON\s+VIEW\s+(QNAME)\s+IS\s+{COMMENT_LITERAL}"))
});

static ALTER_TABLE_HEAD_RE: LazyLock<Regex> =
    LazyLock::new(|| rule(r"(ALTER\s+TABLE\s+(?:ONLY\s+|IF\s+EXISTS\s+)?QNAME)\s+"));

/// Leading words of the actions a single `ALTER TABLE` may chain with commas.
const ACTION_WORDS: &[&str] = &["ADD", "DROP", "MODIFY", "ALTER"];

/// Words that introduce a table-level clause rather than a column name
/// after `ADD` / `DROP`.
const NON_COLUMN_WORDS: &[&str] = &[
    "PARTITION",
    "CONSTRAINT",
    "PRIMARY",
    "FOREIGN",
    "UNIQUE",
    "CHECK",
    "INDEX",
    "KEY",
];

type Matcher = fn(&str) -> Option<Statement>;

/// Classification rules, tried in order.
const RULES: &[Matcher] = &[
    match_search_path,
    match_create_table,
    match_drop_table,
    match_add_partition,
    match_attach_partition,
    match_detach_partition,
    match_add_column,
    match_drop_column,
    match_modify_column,
    match_rename_table,
    match_rename_column,
    match_rename_bare,
    match_rename_to,
    match_create_index,
    match_drop_index,
    match_create_view,
    match_drop_view,
    match_alter_view_rename,
    match_comment_on_table,
    match_comment_on_column,
    match_comment_on_view,
];

/// Classify one statement.
pub fn classify(stmt: &str) -> Statement {
    let trimmed = stmt.trim();
    let statement = RULES
        .iter()
        .find_map(|matcher| matcher(trimmed))
        .unwrap_or_else(|| Statement::Unrecognized {
            preview: preview(trimmed, 80),
        });
    log::debug!("Classified statement; kind={}, target={}", statement.kind(), statement);
    statement
}

/// Split `ALTER TABLE t <action>, <action>, ...` into one statement per action.
///
/// Returns `None` for anything that is not a multi-action `ALTER TABLE`, or
/// when a comma-separated part does not start with an action keyword.
pub fn split_alter_actions(stmt: &str) -> Option<Vec<String>> {
    let trimmed = stmt.trim();
    let caps = ALTER_TABLE_HEAD_RE.captures(trimmed)?;
    let head = caps.get(1)?.as_str().trim();
    let body = trimmed[caps.get(0)?.end()..].trim_end().trim_end_matches(';');

    let actions = split_top_level(body);
    if actions.len() < 2 || !actions.iter().all(|a| starts_with_action(a)) {
        return None;
    }
    Some(actions.iter().map(|a| format!("{} {};", head, a)).collect())
}

/// Comma-separated parts of `body` outside quotes and parentheses.
fn split_top_level(body: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut chars = body.chars();

    while let Some(c) = chars.next() {
        match quote {
            Some(q) => {
                current.push(c);
                if c == '\\' && q == '\'' {
                    if let Some(next) = chars.next() {
                        current.push(next);
                    }
                } else if c == q {
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
                ',' if depth == 0 => parts.push(std::mem::take(&mut current)),
                _ => current.push(c),
            },
        }
    }
    parts.push(current);

    parts
        .into_iter()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect()
}

fn starts_with_action(action: &str) -> bool {
    action
        .split_whitespace()
        .next()
        .map(|w| ACTION_WORDS.iter().any(|a| a.eq_ignore_ascii_case(w)))
        .unwrap_or(false)
}

/// True when more than one action follows the table name.
fn chains_actions(stmt: &str, table_end: usize) -> bool {
    split_top_level(stmt[table_end..].trim_end().trim_end_matches(';')).len() > 1
}

fn text<'a>(caps: &'a Captures, i: usize) -> &'a str {
    caps.get(i).map(|m| m.as_str()).unwrap_or("")
}

fn object(caps: &Captures, i: usize) -> ObjectName {
    ObjectName::parse(text(caps, i))
}

fn ident(caps: &Captures, i: usize) -> String {
    strip_quotes(text(caps, i)).to_string()
}

fn optional_text(caps: &Captures, i: usize) -> Option<String> {
    caps.get(i)
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn is_non_column_word(word: &str) -> bool {
    NON_COLUMN_WORDS.iter().any(|w| w.eq_ignore_ascii_case(word))
}

fn strip_quotes(s: &str) -> &str {
    s.trim().trim_matches(|c| c == '"' || c == '`')
}

fn match_search_path(stmt: &str) -> Option<Statement> {
    let caps = SEARCH_PATH_RE.captures(stmt)?;
    let schema = text(&caps, 1)
        .split(',')
        .map(|s| strip_quotes(s).trim_matches('\'').trim())
        .find(|s| !s.is_empty() && !s.eq_ignore_ascii_case("$user"))?;
    Some(Statement::SetSearchPath {
        schema: schema.to_string(),
    })
}

fn match_create_table(stmt: &str) -> Option<Statement> {
    let caps = CREATE_TABLE_RE.captures(stmt)?;
    Some(Statement::CreateTable {
        name: object(&caps, 1),
    })
}

fn match_drop_table(stmt: &str) -> Option<Statement> {
    let caps = DROP_TABLE_RE.captures(stmt)?;
    Some(Statement::DropTable {
        name: object(&caps, 1),
    })
}

fn match_add_partition(stmt: &str) -> Option<Statement> {
    let caps = ADD_PARTITION_RE.captures(stmt)?;
    let token = ident(&caps, 2);
    let rest = optional_text(&caps, 3);
    // `ADD PARTITION VALUES ...` / `ADD PARTITION FOR ...` carry no name
    let (partition, bounds) = if token.is_empty() {
        (None, rest)
    } else if token.eq_ignore_ascii_case("VALUES") || token.eq_ignore_ascii_case("FOR") {
        let raw = text(&caps, 2);
        let bounds = match rest {
            Some(r) => format!("{} {}", raw, r),
            None => raw.to_string(),
        };
        (None, Some(bounds))
    } else {
        (Some(token), rest)
    };
    Some(Statement::AddPartition {
        table: object(&caps, 1),
        partition,
        bounds,
    })
}

fn match_attach_partition(stmt: &str) -> Option<Statement> {
    let caps = ATTACH_PARTITION_RE.captures(stmt)?;
    Some(Statement::AttachPartition {
        table: object(&caps, 1),
        child: object(&caps, 2),
    })
}

fn match_detach_partition(stmt: &str) -> Option<Statement> {
    let caps = DETACH_PARTITION_RE.captures(stmt)?;
    Some(Statement::DetachPartition {
        table: object(&caps, 1),
        child: object(&caps, 2),
    })
}

fn match_add_column(stmt: &str) -> Option<Statement> {
    let caps = ADD_COLUMN_RE.captures(stmt)?;
    if chains_actions(stmt, caps.get(1)?.end()) {
        return None;
    }
    let column = ident(&caps, 3);
    if is_non_column_word(&column) {
        return None;
    }
    Some(Statement::AddColumn {
        table: object(&caps, 1),
        column,
        definition: optional_text(&caps, 4),
        column_keyword: caps.get(2).is_some(),
    })
}

fn match_drop_column(stmt: &str) -> Option<Statement> {
    let caps = DROP_COLUMN_RE.captures(stmt)?;
    if chains_actions(stmt, caps.get(1)?.end()) {
        return None;
    }
    let column = ident(&caps, 3);
    if is_non_column_word(&column) {
        return None;
    }
    Some(Statement::DropColumn {
        table: object(&caps, 1),
        column,
        column_keyword: caps.get(2).is_some(),
    })
}

fn match_modify_column(stmt: &str) -> Option<Statement> {
    let caps = MODIFY_COLUMN_RE.captures(stmt)?;
    if chains_actions(stmt, caps.get(1)?.end()) {
        return None;
    }
    Some(Statement::ModifyColumn {
        table: object(&caps, 1),
        column: ident(&caps, 3),
        definition: optional_text(&caps, 4),
        column_keyword: caps.get(2).is_some(),
    })
}

fn match_rename_table(stmt: &str) -> Option<Statement> {
    let caps = RENAME_TABLE_RE.captures(stmt)?;
    Some(Statement::RenameTable {
        from: object(&caps, 1),
        to: object(&caps, 2),
    })
}

fn match_rename_column(stmt: &str) -> Option<Statement> {
    let caps = RENAME_COLUMN_RE.captures(stmt)?;
    Some(Statement::RenameColumn {
        table: object(&caps, 1),
        from: ident(&caps, 2),
        to: ident(&caps, 3),
    })
}

fn match_rename_bare(stmt: &str) -> Option<Statement> {
    let caps = RENAME_BARE_RE.captures(stmt)?;
    let from = ident(&caps, 2);
    if from.eq_ignore_ascii_case("TO") || is_non_column_word(&from) {
        return None;
    }
    Some(Statement::RenameBare {
        table: object(&caps, 1),
        from,
        to: ident(&caps, 3),
    })
}

fn match_rename_to(stmt: &str) -> Option<Statement> {
    let caps = RENAME_TO_RE.captures(stmt)?;
    Some(Statement::RenameTo {
        table: object(&caps, 1),
        to: object(&caps, 2),
    })
}

fn match_create_index(stmt: &str) -> Option<Statement> {
    let caps = CREATE_INDEX_RE.captures(stmt)?;
    Some(Statement::CreateIndex {
        name: object(&caps, 2),
        table: object(&caps, 3),
        unique: caps.get(1).is_some(),
    })
}

fn match_drop_index(stmt: &str) -> Option<Statement> {
    let caps = DROP_INDEX_RE.captures(stmt)?;
    Some(Statement::DropIndex {
        name: object(&caps, 1),
    })
}

fn match_create_view(stmt: &str) -> Option<Statement> {
    let caps = CREATE_VIEW_RE.captures(stmt)?;
    Some(Statement::CreateView {
        name: object(&caps, 1),
    })
}

fn match_drop_view(stmt: &str) -> Option<Statement> {
    let caps = DROP_VIEW_RE.captures(stmt)?;
    Some(Statement::DropView {
        name: object(&caps, 1),
    })
}

fn match_alter_view_rename(stmt: &str) -> Option<Statement> {
    let caps = ALTER_VIEW_RENAME_RE.captures(stmt)?;
    Some(Statement::AlterViewRenameTo {
        view: object(&caps, 1),
        to: object(&caps, 2),
    })
}

fn comment_text(caps: &Captures, i: usize) -> Option<String> {
    caps.get(i).map(|m| m.as_str().to_string())
}

fn match_comment_on_table(stmt: &str) -> Option<Statement> {
    let caps = COMMENT_ON_TABLE_RE.captures(stmt)?;
    Some(Statement::CommentOnTable {
        table: object(&caps, 1),
        comment: comment_text(&caps, 2),
    })
}

fn match_comment_on_column(stmt: &str) -> Option<Statement> {
    let caps = COMMENT_ON_COLUMN_RE.captures(stmt)?;
    let path = text(&caps, 1);
    let (table, column) = path.rsplit_once('.')?;
    Some(Statement::CommentOnColumn {
        table: ObjectName::parse(table),
        column: strip_quotes(column).to_string(),
        comment: comment_text(&caps, 2),
    })
}

fn match_comment_on_view(stmt: &str) -> Option<Statement> {
    let caps = COMMENT_ON_VIEW_RE.captures(stmt)?;
    Some(Statement::CommentOnView {
        view: object(&caps, 1),
        comment: comment_text(&caps, 2),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(schema: Option<&str>, n: &str) -> ObjectName {
        ObjectName::new(schema, n)
    }

    #[test]
    fn test_object_name_parse_and_key() {
        let n = ObjectName::parse("\"Public\".\"Orders\"");
        assert_eq!(n, name(Some("Public"), "Orders"));
        assert_eq!(n.key(), "public.orders");
        assert_eq!(ObjectName::parse("public.orders").key(), n.key());
        assert_eq!(ObjectName::parse("`t`").key(), "t");
    }

    #[test]
    fn test_object_name_resolve() {
        let n = ObjectName::parse("orders");
        assert_eq!(n.resolve(Some("sales")).key(), "sales.orders");
        assert_eq!(n.resolve(None).key(), "orders");
        let q = ObjectName::parse("hr.people");
        assert_eq!(q.resolve(Some("sales")).key(), "hr.people");
    }

    #[test]
    fn test_classify_search_path() {
        assert_eq!(
            classify("SET SEARCH_PATH = sales;"),
            Statement::SetSearchPath {
                schema: "sales".to_string()
            }
        );
        assert_eq!(
            classify("set search_path to \"hr\", public"),
            Statement::SetSearchPath {
                schema: "hr".to_string()
            }
        );
    }

    #[test]
    fn test_classify_create_and_drop_table() {
        assert_eq!(
            classify("CREATE TABLE public.orders (id INT);"),
            Statement::CreateTable {
                name: name(Some("public"), "orders")
            }
        );
        assert_eq!(
            classify("create table if not exists `orders`(id int)"),
            Statement::CreateTable {
                name: name(None, "orders")
            }
        );
        assert_eq!(
            classify("DROP TABLE IF EXISTS public.orders;"),
            Statement::DropTable {
                name: name(Some("public"), "orders")
            }
        );
    }

    #[test]
    fn test_classify_add_column() {
        let stmt = classify("ALTER TABLE public.orders ADD COLUMN status VARCHAR(20);");
        assert_eq!(
            stmt,
            Statement::AddColumn {
                table: name(Some("public"), "orders"),
                column: "status".to_string(),
                definition: Some("VARCHAR(20)".to_string()),
                column_keyword: true,
            }
        );

        let stmt = classify("ALTER TABLE orders ADD note TEXT");
        assert!(matches!(
            stmt,
            Statement::AddColumn {
                column_keyword: false,
                ..
            }
        ));
    }

    #[test]
    fn test_add_partition_before_add_column() {
        let stmt = classify("ALTER TABLE sales ADD PARTITION p2024 VALUES LESS THAN (2025);");
        assert_eq!(
            stmt,
            Statement::AddPartition {
                table: name(None, "sales"),
                partition: Some("p2024".to_string()),
                bounds: Some("VALUES LESS THAN (2025)".to_string()),
            }
        );
    }

    #[test]
    fn test_add_partition_without_name() {
        let stmt = classify("ALTER TABLE sales ADD PARTITION VALUES LESS THAN (10);");
        assert!(matches!(
            stmt,
            Statement::AddPartition {
                partition: None,
                ..
            }
        ));
    }

    #[test]
    fn test_add_constraint_is_not_a_column() {
        let stmt = classify("ALTER TABLE orders ADD CONSTRAINT pk PRIMARY KEY (id);");
        assert!(!stmt.is_recognized());
        let stmt = classify("ALTER TABLE orders ADD PRIMARY KEY (id);");
        assert!(!stmt.is_recognized());
        let stmt = classify("ALTER TABLE orders DROP CONSTRAINT pk;");
        assert!(!stmt.is_recognized());
    }

    #[test]
    fn test_classify_attach_and_detach_partition() {
        assert_eq!(
            classify("ALTER TABLE m ATTACH PARTITION m_2024 FOR VALUES FROM (1) TO (2);"),
            Statement::AttachPartition {
                table: name(None, "m"),
                child: name(None, "m_2024"),
            }
        );
        assert_eq!(
            classify("ALTER TABLE s.m DETACH PARTITION s.m_2024;"),
            Statement::DetachPartition {
                table: name(Some("s"), "m"),
                child: name(Some("s"), "m_2024"),
            }
        );
    }

    #[test]
    fn test_classify_drop_and_modify_column() {
        assert_eq!(
            classify("ALTER TABLE public.orders DROP COLUMN status;"),
            Statement::DropColumn {
                table: name(Some("public"), "orders"),
                column: "status".to_string(),
                column_keyword: true,
            }
        );
        assert_eq!(
            classify("ALTER TABLE orders MODIFY amount NUMERIC(12,2);"),
            Statement::ModifyColumn {
                table: name(None, "orders"),
                column: "amount".to_string(),
                definition: Some("NUMERIC(12,2)".to_string()),
                column_keyword: false,
            }
        );
    }

    #[test]
    fn test_rename_rules_are_ordered() {
        assert_eq!(
            classify("ALTER TABLE t RENAME COLUMN a TO b;"),
            Statement::RenameColumn {
                table: name(None, "t"),
                from: "a".to_string(),
                to: "b".to_string(),
            }
        );
        assert_eq!(
            classify("ALTER TABLE t RENAME a TO b;"),
            Statement::RenameBare {
                table: name(None, "t"),
                from: "a".to_string(),
                to: "b".to_string(),
            }
        );
        assert_eq!(
            classify("ALTER TABLE s.t RENAME TO t2;"),
            Statement::RenameTo {
                table: name(Some("s"), "t"),
                to: name(None, "t2"),
            }
        );
        assert_eq!(
            classify("RENAME TABLE a TO b;"),
            Statement::RenameTable {
                from: name(None, "a"),
                to: name(None, "b"),
            }
        );
    }

    #[test]
    fn test_classify_index_statements() {
        assert_eq!(
            classify("CREATE UNIQUE INDEX idx_orders_id ON public.orders (id);"),
            Statement::CreateIndex {
                name: name(None, "idx_orders_id"),
                table: name(Some("public"), "orders"),
                unique: true,
            }
        );
        assert_eq!(
            classify("DROP INDEX IF EXISTS idx_orders_id;"),
            Statement::DropIndex {
                name: name(None, "idx_orders_id")
            }
        );
    }

    #[test]
    fn test_classify_view_statements() {
        assert_eq!(
            classify("CREATE OR REPLACE VIEW public.v AS SELECT 1;"),
            Statement::CreateView {
                name: name(Some("public"), "v")
            }
        );
        assert_eq!(
            classify("DROP VIEW v;"),
            Statement::DropView {
                name: name(None, "v")
            }
        );
        assert_eq!(
            classify("ALTER VIEW s.v RENAME TO v2;"),
            Statement::AlterViewRenameTo {
                view: name(Some("s"), "v"),
                to: name(None, "v2"),
            }
        );
    }

    #[test]
    fn test_create_view_requires_as() {
        assert!(!classify("CREATE VIEW canvas").is_recognized());
    }

    #[test]
    fn test_classify_comments() {
        assert_eq!(
            classify("COMMENT ON TABLE public.orders IS 'it''s orders';"),
            Statement::CommentOnTable {
                table: name(Some("public"), "orders"),
                comment: Some("it''s orders".to_string()),
            }
        );
        assert_eq!(
            classify("COMMENT ON COLUMN public.orders.status IS 'order status';"),
            Statement::CommentOnColumn {
                table: name(Some("public"), "orders"),
                column: "status".to_string(),
                comment: Some("order status".to_string()),
            }
        );
        assert_eq!(
            classify("COMMENT ON COLUMN orders.status IS NULL;"),
            Statement::CommentOnColumn {
                table: name(None, "orders"),
                column: "status".to_string(),
                comment: None,
            }
        );
        assert_eq!(
            classify("COMMENT ON VIEW v IS 'daily';"),
            Statement::CommentOnView {
                view: name(None, "v"),
                comment: Some("daily".to_string()),
            }
        );
    }

    #[test]
    fn test_unrecognized_statements() {
        for sql in [
            "INSERT INTO t VALUES (1);",
            "GRANT SELECT ON t TO bob;",
            "SELECT 1;",
            "CREATE FUNCTION f() RETURNS int AS $$ SELECT 1 $$;",
        ] {
            let stmt = classify(sql);
            assert!(!stmt.is_recognized(), "{} should be unrecognized", sql);
            assert_eq!(stmt.kind(), "unrecognized");
        }
    }

    #[test]
    fn test_chained_column_actions_are_not_single_statements() {
        for sql in [
            "ALTER TABLE t ADD COLUMN a INT, ADD COLUMN b INT;",
            "ALTER TABLE t DROP COLUMN a, DROP COLUMN b;",
            "ALTER TABLE t MODIFY a BIGINT, MODIFY b BIGINT;",
        ] {
            assert!(!classify(sql).is_recognized(), "{} should be unrecognized", sql);
        }
        // Commas inside parentheses or quotes do not chain actions
        assert!(matches!(
            classify("ALTER TABLE t ADD COLUMN a NUMERIC(12, 2) DEFAULT 'x,y';"),
            Statement::AddColumn { .. }
        ));
    }

    #[test]
    fn test_split_alter_actions() {
        assert_eq!(
            split_alter_actions("ALTER TABLE s.t ADD COLUMN a NUMERIC(12, 2), ADD COLUMN b INT;"),
            Some(vec![
                "ALTER TABLE s.t ADD COLUMN a NUMERIC(12, 2);".to_string(),
                "ALTER TABLE s.t ADD COLUMN b INT;".to_string(),
            ])
        );
        assert_eq!(
            split_alter_actions("alter table t drop column a, drop b"),
            Some(vec![
                "alter table t drop column a;".to_string(),
                "alter table t drop b;".to_string(),
            ])
        );
        assert_eq!(split_alter_actions("ALTER TABLE t ADD COLUMN a INT;"), None);
        assert_eq!(split_alter_actions("CREATE TABLE t (a INT, b INT);"), None);
        // A part that is not an action keeps the statement whole
        assert_eq!(split_alter_actions("ALTER TABLE t ADD COLUMN a INT, b INT;"), None);
    }

    #[test]
    fn test_comment_with_backslash_escape() {
        assert_eq!(
            classify(r"COMMENT ON TABLE t IS 'it\'s, done';"),
            Statement::CommentOnTable {
                table: name(None, "t"),
                comment: Some(r"it\'s, done".to_string()),
            }
        );
    }

    #[test]
    fn test_search_path_skips_user_placeholder() {
        assert_eq!(
            classify("SET search_path TO \"$user\", public;"),
            Statement::SetSearchPath {
                schema: "public".to_string()
            }
        );
        assert!(!classify("SET search_path TO \"$user\";").is_recognized());
    }

    #[test]
    fn test_keyword_inside_body_does_not_match() {
        let stmt = classify("CREATE VIEW v AS SELECT 'CREATE TABLE x' AS c;");
        assert!(matches!(stmt, Statement::CreateView { .. }));
    }
}
