//! Statement parsing for the in-memory tablet
//!
//! Covers the single-table statements the local cluster needs:
//!
//! - `insert into t(c1, c2) values (v1, v2)[, (...)]`
//! - `select * | c1, c2 from t [where c = v]`
//! - `update t set c = v[, ...] where c = v`
//! - `delete from t where c = v`
//!
//! Literals are integers, quoted strings and `null`.

use std::sync::OnceLock;

use regex::Regex;

use super::errors::{TabletError, TabletResult};
use crate::query::Value;

/// Column list of a select
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Projection {
    All,
    Columns(Vec<String>),
}

/// Equality filter `column = value`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub column: String,
    pub value: Value,
}

/// Parsed statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    Insert {
        table: String,
        columns: Vec<String>,
        rows: Vec<Vec<Value>>,
    },
    Select {
        table: String,
        projection: Projection,
        filter: Option<Filter>,
    },
    Update {
        table: String,
        assignments: Vec<(String, Value)>,
        filter: Filter,
    },
    Delete {
        table: String,
        filter: Filter,
    },
}

impl Statement {
    pub fn is_write(&self) -> bool {
        !matches!(self, Statement::Select { .. })
    }
}

fn insert_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?is)^\s*insert\s+into\s+(\w+)\s*\(([^)]*)\)\s*values\s*(.+?)\s*;?\s*$")
            .expect("valid insert pattern")
    })
}

fn select_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?is)^\s*select\s+(.+?)\s+from\s+(\w+)(?:\s+where\s+(\w+)\s*=\s*(.+?))?\s*;?\s*$",
        )
        .expect("valid select pattern")
    })
}

fn update_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?is)^\s*update\s+(\w+)\s+set\s+(.+?)\s+where\s+(\w+)\s*=\s*(.+?)\s*;?\s*$")
            .expect("valid update pattern")
    })
}

fn delete_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?is)^\s*delete\s+from\s+(\w+)\s+where\s+(\w+)\s*=\s*(.+?)\s*;?\s*$")
            .expect("valid delete pattern")
    })
}

/// Parse one statement
pub fn parse(sql: &str) -> TabletResult<Statement> {
    if let Some(caps) = insert_re().captures(sql) {
        let table = caps[1].to_ascii_lowercase();
        let columns = parse_identifiers(&caps[2])?;
        let mut rows = Vec::new();
        for tuple in split_tuples(&caps[3])? {
            let values = split_top_level(&tuple)
                .iter()
                .map(|v| parse_literal(v))
                .collect::<TabletResult<Vec<_>>>()?;
            if values.len() != columns.len() {
                return Err(TabletError::Syntax(format!(
                    "column count {} doesn't match value count {}",
                    columns.len(),
                    values.len()
                )));
            }
            rows.push(values);
        }
        return Ok(Statement::Insert {
            table,
            columns,
            rows,
        });
    }

    if let Some(caps) = select_re().captures(sql) {
        let projection = if caps[1].trim() == "*" {
            Projection::All
        } else {
            Projection::Columns(parse_identifiers(&caps[1])?)
        };
        let filter = match (caps.get(3), caps.get(4)) {
            (Some(column), Some(value)) => Some(Filter {
                column: column.as_str().to_ascii_lowercase(),
                value: parse_literal(value.as_str())?,
            }),
            _ => None,
        };
        return Ok(Statement::Select {
            table: caps[2].to_ascii_lowercase(),
            projection,
            filter,
        });
    }

    if let Some(caps) = update_re().captures(sql) {
        let mut assignments = Vec::new();
        for part in split_top_level(&caps[2]) {
            let (column, value) = part
                .split_once('=')
                .ok_or_else(|| TabletError::Syntax(format!("bad assignment '{}'", part)))?;
            assignments.push((parse_identifier(column)?, parse_literal(value)?));
        }
        return Ok(Statement::Update {
            table: caps[1].to_ascii_lowercase(),
            assignments,
            filter: Filter {
                column: caps[3].to_ascii_lowercase(),
                value: parse_literal(&caps[4])?,
            },
        });
    }

    if let Some(caps) = delete_re().captures(sql) {
        return Ok(Statement::Delete {
            table: caps[1].to_ascii_lowercase(),
            filter: Filter {
                column: caps[2].to_ascii_lowercase(),
                value: parse_literal(&caps[3])?,
            },
        });
    }

    Err(TabletError::Syntax(sql.trim().to_string()))
}

fn parse_identifier(s: &str) -> TabletResult<String> {
    let ident = s.trim().trim_matches('`');
    if ident.is_empty() || !ident.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(TabletError::Syntax(format!("bad identifier '{}'", s.trim())));
    }
    Ok(ident.to_ascii_lowercase())
}

fn parse_identifiers(s: &str) -> TabletResult<Vec<String>> {
    s.split(',').map(parse_identifier).collect()
}

/// Parse an integer, quoted string or `null` literal
pub fn parse_literal(s: &str) -> TabletResult<Value> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("null") {
        return Ok(Value::Null);
    }
    if s.len() >= 2 {
        let quote = s.as_bytes()[0];
        if (quote == b'\'' || quote == b'"') && s.as_bytes()[s.len() - 1] == quote {
            return Ok(Value::VarChar(unescape(&s[1..s.len() - 1], quote as char)));
        }
    }
    s.parse::<i64>()
        .map(Value::Int64)
        .map_err(|_| TabletError::Syntax(format!("bad literal '{}'", s)))
}

fn unescape(body: &str, quote: char) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else if c == quote && chars.peek() == Some(&quote) {
            chars.next();
            out.push(quote);
        } else {
            out.push(c);
        }
    }
    out
}

/// Split on commas that are outside quotes and parentheses
fn split_top_level(s: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut depth = 0usize;
    let mut escaped = false;

    for c in s.chars() {
        if let Some(q) = quote {
            current.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' => {
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
        }
    }
    if !current.trim().is_empty() {
        parts.push(current);
    }
    parts
}

/// Extract the bodies of `(...)` groups in a VALUES list
fn split_tuples(s: &str) -> TabletResult<Vec<String>> {
    let mut tuples = Vec::new();
    for part in split_top_level(s) {
        let part = part.trim();
        if !(part.starts_with('(') && part.ends_with(')')) {
            return Err(TabletError::Syntax(format!("bad values list '{}'", part)));
        }
        tuples.push(part[1..part.len() - 1].to_string());
    }
    if tuples.is_empty() {
        return Err(TabletError::Syntax("empty values list".to_string()));
    }
    Ok(tuples)
}
