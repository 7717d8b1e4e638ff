//! Typed column values
//!
//! Rendering follows the gateway's result notation: `INT64(1)`,
//! `VARCHAR("email1")`, `NULL`. A row renders as its values separated by
//! single spaces inside brackets.

use std::fmt;

use serde::Serialize;

/// A single column value
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// SQL NULL
    Null,
    /// Signed 64-bit integer
    Int64(i64),
    /// Variable-length string
    VarChar(String),
}

impl Value {
    /// Column type name as reported in result fields
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "NULL_TYPE",
            Value::Int64(_) => "INT64",
            Value::VarChar(_) => "VARCHAR",
        }
    }

    /// Returns the integer if this is an INT64
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int64(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns true for NULL
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Int64(v) => write!(f, "INT64({})", v),
            Value::VarChar(s) => write!(f, "VARCHAR({:?})", s),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::VarChar(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::VarChar(v)
    }
}

/// One result row
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Row(pub Vec<Value>);

impl Row {
    pub fn new(values: Vec<Value>) -> Self {
        Self(values)
    }

    pub fn values(&self) -> &[Value] {
        &self.0
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.0.get(index)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, value) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}", value)?;
        }
        write!(f, "]")
    }
}
