//! Database connection contract and the scalar value model.
//!
//! The core never talks to a driver directly. Everything it needs from a
//! database goes through [`Connection`], which keeps the dumper, importer and
//! inspector testable against scripted connections.

pub mod driver;

use indexmap::IndexMap;
use std::fmt;

use crate::error::Result;

/// A scalar column value as seen by the core.
///
/// Driver adapters normalize booleans and coerce LOBs to text before handing
/// rows over, so this stays a small closed set.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Get as string slice, or None if not text
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Render the value as plain text, None for NULL
    pub fn to_text(&self) -> Option<String> {
        match self {
            Value::Null => None,
            Value::Bool(b) => Some(b.to_string()),
            Value::Int(i) => Some(i.to_string()),
            Value::Float(f) => Some(f.to_string()),
            Value::Text(s) => Some(s.clone()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(v) => write!(f, "{}", v),
            Value::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// One fetched row: column name to value, in select order
pub type Row = IndexMap<String, Value>;

/// Look up a column ignoring case, since catalogs differ in label casing
pub fn column_value<'a>(row: &'a Row, name: &str) -> Option<&'a Value> {
    row.get(name).or_else(|| {
        row.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    })
}

/// Non-null column value rendered as text, looked up ignoring case
pub fn column_text(row: &Row, name: &str) -> Option<String> {
    column_value(row, name).and_then(Value::to_text)
}

/// What the core needs from a live database connection.
///
/// Implementations are used from a single thread; a connection owns at most
/// one open transaction at a time.
pub trait Connection {
    /// Driver/platform name, e.g. `pgsql`, `mysql`, `oci`
    fn platform_name(&self) -> &str;

    /// Execute a statement that returns no rows, returning affected row count
    fn execute(&mut self, sql: &str) -> Result<u64>;

    /// Fetch all rows of a query
    fn fetch_rows(&mut self, sql: &str) -> Result<Vec<Row>>;

    /// Fetch the first column of every row, binding `params` positionally
    fn fetch_column(&mut self, sql: &str, params: &[Value]) -> Result<Vec<Value>>;

    /// Quote a scalar as an SQL literal for this connection
    fn quote(&self, value: &Value) -> String;

    fn begin(&mut self) -> Result<()>;

    fn commit(&mut self) -> Result<()>;

    fn rollback(&mut self) -> Result<()>;

    fn in_transaction(&self) -> bool;
}

/// Named set of connections used by one operation.
///
/// The default connection has no name on disk; every other connection gets
/// its own `dumps/<name>/` subtree.
pub struct Connections {
    default_name: String,
    connections: IndexMap<String, Box<dyn Connection>>,
}

impl Connections {
    pub fn new(default_name: impl Into<String>, default: Box<dyn Connection>) -> Self {
        let default_name = default_name.into();
        let mut connections = IndexMap::new();
        connections.insert(default_name.clone(), default);
        Self {
            default_name,
            connections,
        }
    }

    pub fn add(&mut self, name: impl Into<String>, connection: Box<dyn Connection>) {
        self.connections.insert(name.into(), connection);
    }

    pub fn default_name(&self) -> &str {
        &self.default_name
    }

    pub fn is_default(&self, name: &str) -> bool {
        name == self.default_name
    }

    pub fn names(&self) -> Vec<String> {
        self.connections.keys().cloned().collect()
    }

    /// Resolve a connection by name, None meaning the default connection
    pub fn get_mut(&mut self, name: Option<&str>) -> Result<&mut (dyn Connection + 'static)> {
        let key = name.unwrap_or(&self.default_name).to_string();
        match self.connections.get_mut(&key) {
            Some(conn) => Ok(conn.as_mut()),
            None => Err(crate::error::Error::invalid_config(format!(
                "unknown connection '{}'",
                key
            ))),
        }
    }
}
