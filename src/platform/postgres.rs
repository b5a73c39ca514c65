//! PostgreSQL dialect.

use super::{Platform, PlatformKind};
use crate::connection::{Connection, Value};
use crate::error::Result;

#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresPlatform;

impl Platform for PostgresPlatform {
    fn kind(&self) -> PlatformKind {
        PlatformKind::Postgres
    }

    fn quote_identifier(&self, identifier: &str) -> String {
        format!("\"{}\"", identifier.to_lowercase().replace('"', "\"\""))
    }

    fn truncate_statement(&self, schema: &str, table: &str) -> String {
        format!(
            "TRUNCATE TABLE {} CASCADE;\n",
            self.full_table_name(schema, table)
        )
    }

    fn sequence_reset_sql(
        &self,
        connection: &mut dyn Connection,
        schema: &str,
        table: &str,
    ) -> Result<String> {
        let schema_lit = self.quote_string(&schema.to_lowercase());
        let table_lit = self.quote_string(&table.to_lowercase());
        let sql = format!(
            "SELECT a.attname AS column_name, \
             pg_get_serial_sequence(format('%I.%I', n.nspname, c.relname), a.attname) AS sequence_name \
             FROM pg_attribute a \
             JOIN pg_class c ON c.oid = a.attrelid \
             JOIN pg_namespace n ON n.oid = c.relnamespace \
             WHERE n.nspname = {} AND c.relname = {} AND a.attnum > 0 AND NOT a.attisdropped \
             AND pg_get_serial_sequence(format('%I.%I', n.nspname, c.relname), a.attname) IS NOT NULL \
             ORDER BY a.attnum",
            schema_lit, table_lit
        );

        let rows = connection.fetch_rows(&sql)?;
        let full_name = self.full_table_name(schema, table);
        let mut out = String::new();
        for row in rows {
            let (Some(Value::Text(column)), Some(Value::Text(sequence))) =
                (row.get("column_name"), row.get("sequence_name"))
            else {
                continue;
            };
            out.push_str(&format!(
                "SELECT setval({}, COALESCE((SELECT MAX({}) FROM {}), 0) + 1, false);\n",
                self.quote_string(sequence),
                self.quote_identifier(column),
                full_name
            ));
        }
        Ok(out)
    }

    fn random_function_sql(&self) -> &'static str {
        "RANDOM()"
    }

    fn limit_sql(&self, limit: u64) -> String {
        format!("LIMIT {}", limit)
    }

    fn placeholder(&self, index: usize) -> String {
        format!("${}", index)
    }

    fn foreign_keys_sql(&self) -> String {
        "SELECT kcu.table_schema AS child_schema, kcu.table_name AS child_table, \
         kcu.column_name AS child_column, ccu.table_schema AS parent_schema, \
         ccu.table_name AS parent_table, ccu.column_name AS parent_column \
         FROM information_schema.table_constraints tc \
         JOIN information_schema.key_column_usage kcu \
           ON tc.constraint_name = kcu.constraint_name AND tc.table_schema = kcu.table_schema \
         JOIN information_schema.constraint_column_usage ccu \
           ON ccu.constraint_name = tc.constraint_name AND ccu.constraint_schema = tc.table_schema \
         WHERE tc.constraint_type = 'FOREIGN KEY' \
         ORDER BY kcu.table_schema, kcu.table_name, kcu.ordinal_position"
            .to_string()
    }

    fn list_schemas_sql(&self) -> String {
        "SELECT schema_name FROM information_schema.schemata \
         WHERE schema_name <> 'information_schema' AND schema_name NOT LIKE 'pg\\_%' \
         ORDER BY schema_name"
            .to_string()
    }

    fn list_tables_sql(&self) -> String {
        format!(
            "SELECT table_name FROM information_schema.tables \
             WHERE table_schema = {} AND table_type = 'BASE TABLE' ORDER BY table_name",
            self.placeholder(1)
        )
    }
}
