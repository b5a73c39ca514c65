//! Oracle dialect.

use super::{Platform, PlatformKind};
use crate::connection::{Connection, Row, Value};
use crate::error::Result;

#[derive(Debug, Clone, Copy, Default)]
pub struct OraclePlatform;

impl Platform for OraclePlatform {
    fn kind(&self) -> PlatformKind {
        PlatformKind::Oracle
    }

    fn quote_identifier(&self, identifier: &str) -> String {
        format!("\"{}\"", identifier.to_uppercase().replace('"', "\"\""))
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
        Ok(format!(
            "-- Oracle sequences for {}.{} are not reset automatically.\n\
             -- Add the required ALTER SEQUENCE statements to an after_exec script.\n",
            schema, table
        ))
    }

    fn random_function_sql(&self) -> &'static str {
        "DBMS_RANDOM.VALUE"
    }

    fn limit_sql(&self, limit: u64) -> String {
        format!("FETCH FIRST {} ROWS ONLY", limit)
    }

    fn placeholder(&self, index: usize) -> String {
        format!(":{}", index)
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

    /// Oracle has no multi-row VALUES, so batches use `INSERT ALL`
    fn insert_batch_sql(&self, schema: &str, table: &str, columns: &[String], rows: &[Row]) -> String {
        let target = self.full_table_name(schema, table);
        let column_list = self.column_list(columns);
        let mut sql = String::from("INSERT ALL\n");
        for row in rows {
            sql.push_str(&format!(
                "  INTO {} ({}) VALUES ({})\n",
                target,
                column_list,
                self.value_list(columns, row)
            ));
        }
        sql.push_str("SELECT 1 FROM DUAL;\n");
        sql
    }

    fn foreign_keys_sql(&self) -> String {
        "SELECT c.owner AS child_schema, c.table_name AS child_table, \
         cc.column_name AS child_column, p.owner AS parent_schema, \
         p.table_name AS parent_table, pc.column_name AS parent_column \
         FROM all_constraints c \
         JOIN all_cons_columns cc ON cc.owner = c.owner AND cc.constraint_name = c.constraint_name \
         JOIN all_constraints p ON p.owner = c.r_owner AND p.constraint_name = c.r_constraint_name \
         JOIN all_cons_columns pc ON pc.owner = p.owner AND pc.constraint_name = p.constraint_name \
           AND pc.position = cc.position \
         WHERE c.constraint_type = 'R' \
         ORDER BY c.owner, c.table_name, cc.position"
            .to_string()
    }

    fn list_schemas_sql(&self) -> String {
        "SELECT username FROM all_users WHERE oracle_maintained = 'N' ORDER BY username"
            .to_string()
    }

    fn list_tables_sql(&self) -> String {
        "SELECT table_name FROM all_tables WHERE owner = :1 ORDER BY table_name".to_string()
    }
}
