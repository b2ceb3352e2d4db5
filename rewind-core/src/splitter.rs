//! Split raw SQL file text into discrete statements.
//!
//! The splitter is a small lexer with three exclusive states besides plain
//! code: inside a quoted literal, inside a block comment and inside a line
//! comment. Semicolons only terminate a statement in plain code. Comments are
//! dropped from the emitted text so that classification always sees the
//! statement keyword first.

use crate::classifier::split_alter_actions;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LexState {
    Code,
    /// Inside a literal opened by the given quote character.
    Quoted(char),
    BlockComment,
    LineComment,
}

/// Split SQL into individual statements.
///
/// Each returned statement is trimmed and keeps its terminating semicolon when
/// the source had one. Content after the last semicolon is returned as a final
/// statement without one. Statements that are empty once comments are removed
/// are dropped.
pub fn split_statements(sql: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut state = LexState::Code;
    let mut prev: Option<char> = None;
    let mut chars = sql.chars().peekable();

    while let Some(c) = chars.next() {
        match state {
            LexState::Code => match c {
                '\'' | '"' => {
                    state = LexState::Quoted(c);
                    current.push(c);
                }
                '/' if chars.peek() == Some(&'*') => {
                    chars.next();
                    state = LexState::BlockComment;
                }
                '-' if chars.peek() == Some(&'-') => {
                    chars.next();
                    state = LexState::LineComment;
                }
                ';' => {
                    current.push(';');
                    flush(&mut statements, &mut current);
                }
                _ => current.push(c),
            },
            LexState::Quoted(quote) => {
                current.push(c);
                // A backslash right before the quote escapes it
                if c == quote && prev != Some('\\') {
                    state = LexState::Code;
                }
            }
            LexState::BlockComment => {
                if c == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    state = LexState::Code;
                    if !current.is_empty() && !current.ends_with(char::is_whitespace) {
                        current.push(' ');
                    }
                }
            }
            LexState::LineComment => {
                if c == '\n' {
                    current.push('\n');
                    state = LexState::Code;
                }
            }
        }
        prev = Some(c);
    }

    flush(&mut statements, &mut current);
    statements
}

fn flush(statements: &mut Vec<String>, current: &mut String) {
    let trimmed = current.trim();
    if !trimmed.trim_end_matches(';').trim().is_empty() {
        statements.push(trimmed.to_string());
    }
    current.clear();
}

/// Split SQL into statements, expanding each multi-action `ALTER TABLE` into
/// one statement per action.
pub fn split_actions(sql: &str) -> Vec<String> {
    split_statements(sql)
        .into_iter()
        .flat_map(|stmt| split_alter_actions(&stmt).unwrap_or_else(|| vec![stmt]))
        .collect()
}
