//! MySQL / MariaDB dialect.

use super::{Platform, PlatformKind};
use crate::connection::{Connection, Value};
use crate::error::Result;

#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlPlatform;

const SYSTEM_SCHEMAS: &str = "'mysql', 'information_schema', 'performance_schema', 'sys'";

impl Platform for MySqlPlatform {
    fn kind(&self) -> PlatformKind {
        PlatformKind::MySql
    }

    fn quote_identifier(&self, identifier: &str) -> String {
        format!("`{}`", identifier.replace('`', "``"))
    }

    fn truncate_statement(&self, schema: &str, table: &str) -> String {
        format!("DELETE FROM {};\n", self.full_table_name(schema, table))
    }

    fn sequence_reset_sql(
        &self,
        _connection: &mut dyn Connection,
        schema: &str,
        table: &str,
    ) -> Result<String> {
        // InnoDB clamps the counter to MAX(id) + 1 when asked for a lower value
        Ok(format!(
            "ALTER TABLE {} AUTO_INCREMENT=1;\n",
            self.full_table_name(schema, table)
        ))
    }

    fn random_function_sql(&self) -> &'static str {
        "RAND()"
    }

    fn limit_sql(&self, limit: u64) -> String {
        format!("LIMIT {}", limit)
    }

    fn wraps_limited_subquery(&self) -> bool {
        true
    }

    fn quote_literal(&self, value: &Value) -> String {
        match value {
            Value::Bool(b) => if *b { "1" } else { "0" }.to_string(),
            Value::Null => "NULL".to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => super::format_float(*f, |s| self.quote_string(s)),
            Value::Text(s) => self.quote_string(s),
        }
    }

    fn quote_string(&self, value: &str) -> String {
        format!("'{}'", value.replace('\\', "\\\\").replace('\'', "''"))
    }

    fn foreign_keys_sql(&self) -> String {
        format!(
            "SELECT TABLE_SCHEMA AS child_schema, TABLE_NAME AS child_table, \
             COLUMN_NAME AS child_column, REFERENCED_TABLE_SCHEMA AS parent_schema, \
             REFERENCED_TABLE_NAME AS parent_table, REFERENCED_COLUMN_NAME AS parent_column \
             FROM information_schema.KEY_COLUMN_USAGE \
             WHERE REFERENCED_TABLE_NAME IS NOT NULL AND TABLE_SCHEMA NOT IN ({}) \
             ORDER BY TABLE_SCHEMA, TABLE_NAME, ORDINAL_POSITION",
            SYSTEM_SCHEMAS
        )
    }

    fn list_schemas_sql(&self) -> String {
        format!(
            "SELECT SCHEMA_NAME FROM information_schema.SCHEMATA \
             WHERE SCHEMA_NAME NOT IN ({}) ORDER BY SCHEMA_NAME",
            SYSTEM_SCHEMAS
        )
    }

    fn list_tables_sql(&self) -> String {
        "SELECT TABLE_NAME FROM information_schema.TABLES \
         WHERE TABLE_SCHEMA = ? AND TABLE_TYPE = 'BASE TABLE' ORDER BY TABLE_NAME"
            .to_string()
    }

    fn import_prologue(&self) -> Option<&'static str> {
        Some("SET FOREIGN_KEY_CHECKS=0")
    }

    fn import_epilogue(&self) -> Option<&'static str> {
        Some("SET FOREIGN_KEY_CHECKS=1")
    }
}
