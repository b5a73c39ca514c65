//! Dialect strategies for PostgreSQL, MySQL/MariaDB and Oracle.
//!
//! Every dialect-sensitive piece of SQL the tool emits goes through a
//! [`Platform`]: identifier quoting, truncation, sequence reset, random
//! ordering, limits, literal quoting, catalog queries and import session
//! setup. Call sites never compare platform names themselves.

mod mysql;
mod oracle;
mod postgres;

pub use mysql::MySqlPlatform;
pub use oracle::OraclePlatform;
pub use postgres::PostgresPlatform;

use crate::connection::{Connection, Row, Value};
use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Supported database platforms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlatformKind {
    Postgres,
    MySql,
    Oracle,
}

impl FromStr for PlatformKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "postgres" | "postgresql" | "pgsql" | "pg" => Ok(PlatformKind::Postgres),
            "mysql" | "mariadb" => Ok(PlatformKind::MySql),
            "oracle" | "oci" | "oci8" => Ok(PlatformKind::Oracle),
            _ => Err(Error::UnsupportedPlatform(s.to_string())),
        }
    }
}

impl fmt::Display for PlatformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlatformKind::Postgres => write!(f, "postgresql"),
            PlatformKind::MySql => write!(f, "mysql"),
            PlatformKind::Oracle => write!(f, "oracle"),
        }
    }
}

/// Create the platform strategy for a driver/platform name.
///
/// Driver synonyms are normalized (`pgsql` → PostgreSQL, `mariadb` → MySQL,
/// `oci` → Oracle); anything else is an [`Error::UnsupportedPlatform`].
pub fn create(name: &str) -> Result<Box<dyn Platform>> {
    Ok(create_for_kind(name.parse()?))
}

pub fn create_for_kind(kind: PlatformKind) -> Box<dyn Platform> {
    match kind {
        PlatformKind::Postgres => Box::new(PostgresPlatform),
        PlatformKind::MySql => Box::new(MySqlPlatform),
        PlatformKind::Oracle => Box::new(OraclePlatform),
    }
}

/// Dialect capability set
pub trait Platform: Send + Sync {
    fn kind(&self) -> PlatformKind;

    /// Quote a single identifier (schema, table or column name)
    fn quote_identifier(&self, identifier: &str) -> String;

    /// Quoted `schema.table`
    fn full_table_name(&self, schema: &str, table: &str) -> String {
        format!(
            "{}.{}",
            self.quote_identifier(schema),
            self.quote_identifier(table)
        )
    }

    /// Statement that empties a table before its rows are re-inserted
    fn truncate_statement(&self, schema: &str, table: &str) -> String;

    /// SQL that brings identity sequences in line with the imported rows.
    ///
    /// May query the connection to find sequences. Returns an empty string
    /// when there is nothing to reset.
    fn sequence_reset_sql(
        &self,
        connection: &mut dyn Connection,
        schema: &str,
        table: &str,
    ) -> Result<String>;

    /// Expression for random row ordering
    fn random_function_sql(&self) -> &'static str;

    /// Row limit clause, placed after ORDER BY
    fn limit_sql(&self, limit: u64) -> String;

    /// Whether a limited SELECT inside `IN (...)` must be wrapped in a derived table
    fn wraps_limited_subquery(&self) -> bool {
        false
    }

    /// Positional bind placeholder for `fetch_column` params (1-based)
    fn placeholder(&self, _index: usize) -> String {
        "?".to_string()
    }

    /// Render a scalar as an SQL literal
    fn quote_literal(&self, value: &Value) -> String {
        match value {
            Value::Null => "NULL".to_string(),
            Value::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => format_float(*f, |s| self.quote_string(s)),
            Value::Text(s) => self.quote_string(s),
        }
    }

    /// Quote a string literal
    fn quote_string(&self, value: &str) -> String {
        format!("'{}'", value.replace('\'', "''"))
    }

    /// One INSERT statement covering a whole batch of rows
    fn insert_batch_sql(&self, schema: &str, table: &str, columns: &[String], rows: &[Row]) -> String {
        let mut sql = format!(
            "INSERT INTO {} ({}) VALUES\n",
            self.full_table_name(schema, table),
            self.column_list(columns)
        );
        let tuples: Vec<String> = rows
            .iter()
            .map(|row| format!("({})", self.value_list(columns, row)))
            .collect();
        sql.push_str(&tuples.join(",\n"));
        sql.push_str(";\n");
        sql
    }

    /// Comma-separated quoted column names
    fn column_list(&self, columns: &[String]) -> String {
        columns
            .iter()
            .map(|c| self.quote_identifier(c))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Comma-separated literals for `columns`, NULL for columns the row lacks
    fn value_list(&self, columns: &[String], row: &Row) -> String {
        columns
            .iter()
            .map(|c| self.quote_literal(row.get(c).unwrap_or(&Value::Null)))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Catalog query listing FK column pairs.
    ///
    /// Columns: child_schema, child_table, child_column, parent_schema,
    /// parent_table, parent_column.
    fn foreign_keys_sql(&self) -> String;

    /// Catalog query listing user schemas (one column)
    fn list_schemas_sql(&self) -> String;

    /// Catalog query listing base tables of the schema bound to placeholder 1
    fn list_tables_sql(&self) -> String;

    /// Statement run right after BEGIN on import
    fn import_prologue(&self) -> Option<&'static str> {
        None
    }

    /// Statement run before COMMIT/ROLLBACK on import, also on failure
    fn import_epilogue(&self) -> Option<&'static str> {
        None
    }
}

fn format_float(f: f64, quote: impl Fn(&str) -> String) -> String {
    if f.is_finite() {
        let s = f.to_string();
        if s.contains(['.', 'e', 'E']) {
            s
        } else {
            format!("{}.0", s)
        }
    } else {
        quote(&f.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_normalizes_synonyms() {
        assert_eq!(create("pgsql").unwrap().kind(), PlatformKind::Postgres);
        assert_eq!(create("PostgreSQL").unwrap().kind(), PlatformKind::Postgres);
        assert_eq!(create("mariadb").unwrap().kind(), PlatformKind::MySql);
        assert_eq!(create("mysql").unwrap().kind(), PlatformKind::MySql);
        assert_eq!(create("oci").unwrap().kind(), PlatformKind::Oracle);
    }

    #[test]
    fn test_factory_rejects_unknown() {
        let err = create("sqlite").err().unwrap();
        assert!(matches!(err, Error::UnsupportedPlatform(ref p) if p == "sqlite"));
    }

    #[test]
    fn test_insert_batch_fills_missing_columns_with_null() {
        let platform = PostgresPlatform;
        let mut row = Row::new();
        row.insert("id".to_string(), Value::Int(1));
        let columns = vec!["id".to_string(), "name".to_string()];
        let sql = platform.insert_batch_sql("public", "users", &columns, &[row]);
        assert_eq!(
            sql,
            "INSERT INTO \"public\".\"users\" (\"id\", \"name\") VALUES\n(1, NULL);\n"
        );
    }

    #[test]
    fn test_float_literals_keep_decimal_point() {
        let platform = PostgresPlatform;
        assert_eq!(platform.quote_literal(&Value::Float(2.0)), "2.0");
        assert_eq!(platform.quote_literal(&Value::Float(1.25)), "1.25");
    }
}
