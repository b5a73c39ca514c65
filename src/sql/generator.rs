//! Dump SQL generation.
//!
//! A table dump is a header comment block with the truncate statement, one
//! multi-row INSERT per batch, and the sequence reset. Every batch is a
//! complete statement so a partially written file still loads.

use crate::config::TableConfig;
use crate::connection::Row;
use crate::platform::Platform;
use chrono::{DateTime, Utc};

pub const DEFAULT_BATCH_SIZE: usize = 1000;

pub struct SqlGenerator<'a> {
    platform: &'a dyn Platform,
    batch_size: usize,
}

impl<'a> SqlGenerator<'a> {
    pub fn new(platform: &'a dyn Platform) -> Self {
        Self {
            platform,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Rows per INSERT statement, at least 1
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Lazily render the dump of one table.
    ///
    /// Columns are taken from the first row; rows lacking a column get NULL.
    pub fn generate(
        &self,
        table: &TableConfig,
        rows: Vec<Row>,
        sequence_reset: String,
        exported_at: DateTime<Utc>,
    ) -> SqlChunks<'a> {
        let columns: Vec<String> = rows
            .first()
            .map(|row| row.keys().cloned().collect())
            .unwrap_or_default();

        let header = format!(
            "-- Table: {}.{}\n-- Exported at: {}\n-- Rows: {}\n-- Mode: {}\n\n{}\n",
            table.schema,
            table.table,
            exported_at.format("%Y-%m-%d %H:%M:%S UTC"),
            rows.len(),
            if table.is_full_export() { "full" } else { "partial" },
            self.platform.truncate_statement(&table.schema, &table.table)
        );

        let footer = if sequence_reset.trim().is_empty() {
            None
        } else {
            Some(format!("\n{}", sequence_reset))
        };

        SqlChunks {
            platform: self.platform,
            schema: table.schema.clone(),
            table: table.table.clone(),
            columns,
            rows: rows.into_iter(),
            batch_size: self.batch_size,
            header: Some(header),
            footer,
        }
    }
}

/// Iterator over the text chunks of one table dump
pub struct SqlChunks<'a> {
    platform: &'a dyn Platform,
    schema: String,
    table: String,
    columns: Vec<String>,
    rows: std::vec::IntoIter<Row>,
    batch_size: usize,
    header: Option<String>,
    footer: Option<String>,
}

impl Iterator for SqlChunks<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if let Some(header) = self.header.take() {
            return Some(header);
        }

        let batch: Vec<Row> = self.rows.by_ref().take(self.batch_size).collect();
        if !batch.is_empty() {
            return Some(self.platform.insert_batch_sql(
                &self.schema,
                &self.table,
                &self.columns,
                &batch,
            ));
        }

        self.footer.take()
    }
}
