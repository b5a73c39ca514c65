//! Live schema inspection over a [`Connection`].

use super::{DependencyGraph, TableKey};
use crate::connection::{Connection, Row, Value};
use crate::error::{Error, Result};
use crate::platform::Platform;

/// Default number of rows sampled for pattern detection
pub const SAMPLE_SIZE: u64 = 200;

/// Lists tables, counts rows, samples data and reads FK metadata
pub struct SchemaInspector<'a> {
    connection: &'a mut dyn Connection,
    platform: &'a dyn Platform,
}

impl<'a> SchemaInspector<'a> {
    pub fn new(connection: &'a mut dyn Connection, platform: &'a dyn Platform) -> Self {
        Self {
            connection,
            platform,
        }
    }

    /// User schemas, system schemas excluded
    pub fn list_schemas(&mut self) -> Result<Vec<String>> {
        let values = self
            .connection
            .fetch_column(&self.platform.list_schemas_sql(), &[])?;
        Ok(values.iter().filter_map(Value::to_text).collect())
    }

    /// Base tables of a schema, sorted by name
    pub fn list_tables(&mut self, schema: &str) -> Result<Vec<TableKey>> {
        let values = self.connection.fetch_column(
            &self.platform.list_tables_sql(),
            &[Value::Text(schema.to_string())],
        )?;
        Ok(values
            .iter()
            .filter_map(Value::to_text)
            .map(|table| TableKey::new(schema, table))
            .collect())
    }

    pub fn count_rows(&mut self, key: &TableKey) -> Result<u64> {
        let sql = format!(
            "SELECT COUNT(*) FROM {}",
            self.platform.full_table_name(&key.schema, &key.table)
        );
        let values = self.connection.fetch_column(&sql, &[])?;
        match values.first() {
            Some(Value::Int(n)) if *n >= 0 => Ok(*n as u64),
            Some(Value::Text(s)) => s
                .trim()
                .parse()
                .map_err(|_| Error::database(format!("unexpected row count '{}' for {}", s, key))),
            other => Err(Error::database(format!(
                "unexpected row count {:?} for {}",
                other, key
            ))),
        }
    }

    /// Up to `limit` rows in random order
    pub fn sample_rows(&mut self, key: &TableKey, limit: u64) -> Result<Vec<Row>> {
        let sql = format!(
            "SELECT * FROM {} ORDER BY {} {}",
            self.platform.full_table_name(&key.schema, &key.table),
            self.platform.random_function_sql(),
            self.platform.limit_sql(limit)
        );
        self.connection.fetch_rows(&sql)
    }

    pub fn dependency_graph(&mut self) -> Result<DependencyGraph> {
        DependencyGraph::build(self.connection, self.platform)
    }
}
