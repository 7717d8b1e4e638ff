//! Query results

use std::fmt;

use serde::Serialize;

use super::{Row, Value};

/// Column metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Field {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
}

impl Field {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
        }
    }
}

/// Result of one statement
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueryResult {
    pub fields: Vec<Field>,
    pub rows: Vec<Row>,
    pub rows_affected: u64,
}

impl QueryResult {
    /// Empty result for statements that return nothing (`use`, `begin`, ...)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Result of a write
    pub fn affected(rows_affected: u64) -> Self {
        Self {
            rows_affected,
            ..Self::default()
        }
    }

    /// Result set with fields and rows
    pub fn with_rows(fields: Vec<Field>, rows: Vec<Row>) -> Self {
        Self {
            fields,
            rows,
            rows_affected: 0,
        }
    }

    /// Build a result set of VARCHAR columns from plain strings
    pub fn text(columns: &[&str], rows: Vec<Vec<String>>) -> Self {
        let fields = columns.iter().map(|c| Field::new(*c, "VARCHAR")).collect();
        let rows = rows
            .into_iter()
            .map(|r| Row::new(r.into_iter().map(Value::VarChar).collect()))
            .collect();
        Self::with_rows(fields, rows)
    }

    /// Render the row set, e.g. `[[INT64(1) VARCHAR("email1")]]`
    pub fn rows_string(&self) -> String {
        RowSet(&self.rows).to_string()
    }
}

struct RowSet<'a>(&'a [Row]);

impl fmt::Display for RowSet<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, row) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}", row)?;
        }
        write!(f, "]")
    }
}
