//! Schema model for FK-aware operations.
//!
//! This module provides:
//! - `TableKey`, the `schema.table` identity used everywhere as graph node
//!   and config lookup key
//! - Live schema inspection (tables, row counts, samples, foreign keys)
//! - Dependency graph construction with topological sorting
//! - Cycle detection for handling circular FK relationships

mod cycles;
mod graph;
mod inspector;

pub use graph::*;
pub use inspector::*;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Globally unique table identity, always rendered as `schema.table`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableKey {
    pub schema: String,
    pub table: String,
}

impl TableKey {
    pub fn new(schema: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            table: table.into(),
        }
    }
}

impl fmt::Display for TableKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.table)
    }
}

impl FromStr for TableKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().split_once('.') {
            Some((schema, table)) if !schema.is_empty() && !table.is_empty() => {
                Ok(TableKey::new(schema, table))
            }
            _ => Err(format!(
                "Invalid table reference: '{}'. Expected schema.table",
                s
            )),
        }
    }
}

impl Serialize for TableKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for TableKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A single foreign key column pair as reported by the catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    pub child: TableKey,
    pub source_column: String,
    pub parent: TableKey,
    pub target_column: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_key_roundtrip() {
        let key: TableKey = "public.users".parse().unwrap();
        assert_eq!(key.schema, "public");
        assert_eq!(key.table, "users");
        assert_eq!(key.to_string(), "public.users");
    }

    #[test]
    fn test_table_key_rejects_bare_table() {
        assert!("users".parse::<TableKey>().is_err());
        assert!(".users".parse::<TableKey>().is_err());
    }

    #[test]
    fn test_table_key_ordering() {
        let mut keys = vec![
            TableKey::new("public", "orders"),
            TableKey::new("billing", "invoices"),
            TableKey::new("public", "accounts"),
        ];
        keys.sort();
        assert_eq!(keys[0].to_string(), "billing.invoices");
        assert_eq!(keys[1].to_string(), "public.accounts");
    }
}
