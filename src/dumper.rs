//! Export orchestration.
//!
//! Tables are exported parents first. Each table is fetched with its where,
//! cascade, order and limit settings, faked, rendered to SQL and streamed to
//! `database/dumps/[connection/]schema/table.sql`.

use crate::cascade::CascadeResolver;
use crate::config::{DumpConfig, TableConfig};
use crate::connection::Connections;
use crate::error::{Error, Result};
use crate::faker::Faker;
use crate::filesystem::Filesystem;
use crate::platform::{self, Platform};
use crate::schema::{DependencyGraph, TableKey};
use crate::sql::{SqlGenerator, DEFAULT_BATCH_SIZE};
use crate::writer::{DumpLayout, DumpWriter};
use chrono::Utc;
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;

/// Called before each table with (1-based index, total, table)
pub type ProgressFn<'a> = Box<dyn FnMut(usize, usize, &TableKey) + 'a>;

/// Result of exporting one table
#[derive(Debug, Clone, Serialize)]
pub struct TableReport {
    pub table: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection: Option<String>,
    pub path: PathBuf,
    pub rows: usize,
    pub bytes: u64,
    pub faked: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedTable {
    pub table: String,
    pub error: String,
}

/// Result of a multi-table export
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExportReport {
    pub tables: Vec<TableReport>,
    pub failures: Vec<FailedTable>,
}

impl ExportReport {
    pub fn total_rows(&self) -> usize {
        self.tables.iter().map(|t| t.rows).sum()
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

pub struct DatabaseDumper<'a> {
    connections: &'a mut Connections,
    config: &'a DumpConfig,
    fs: &'a dyn Filesystem,
    layout: DumpLayout,
    batch_size: usize,
    graphs: HashMap<String, Option<DependencyGraph>>,
    progress: Option<ProgressFn<'a>>,
}

impl<'a> DatabaseDumper<'a> {
    pub fn new(
        connections: &'a mut Connections,
        config: &'a DumpConfig,
        fs: &'a dyn Filesystem,
        layout: DumpLayout,
    ) -> Self {
        Self {
            connections,
            config,
            fs,
            layout,
            batch_size: DEFAULT_BATCH_SIZE,
            graphs: HashMap::new(),
            progress: None,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn on_progress(mut self, progress: ProgressFn<'a>) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Configured tables, optionally narrowed to one schema and/or connection.
    ///
    /// Tables of the default connection come first, then each named
    /// connection's tables in config order.
    pub fn tables_to_export(
        &self,
        schema: Option<&str>,
        connection: Option<&str>,
    ) -> Vec<TableConfig> {
        let default_name = self.connections.default_name().to_string();
        let mut scopes: Vec<(Option<String>, &DumpConfig)> = vec![(None, self.config)];
        for (name, nested) in &self.config.connections {
            if name != &default_name {
                scopes.push((Some(name.clone()), nested));
            }
        }

        scopes
            .into_iter()
            .filter(|(name, _)| match connection {
                None => true,
                Some(wanted) if wanted == default_name => name.is_none(),
                Some(wanted) => name.as_deref() == Some(wanted),
            })
            .flat_map(|(name, scope)| {
                scope
                    .tables()
                    .into_iter()
                    .filter(|key| schema.is_none_or(|s| key.schema == s))
                    .filter_map(move |key| {
                        scope
                            .table_config(&key)
                            .map(|t| t.with_connection(name.as_deref()))
                    })
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    /// Look up one `schema.table` in the default connection, then in named ones
    pub fn find_table(&self, key: &TableKey, connection: Option<&str>) -> Result<TableConfig> {
        let found = match connection {
            Some(name) if !self.connections.is_default(name) => self
                .config
                .connection(name)
                .and_then(|scope| scope.table_config(key))
                .map(|t| t.with_connection(Some(name))),
            _ => self.config.table_config(key).or_else(|| {
                self.config
                    .connections
                    .iter()
                    .find_map(|(name, scope)| {
                        scope.table_config(key).map(|t| t.with_connection(Some(name)))
                    })
            }),
        };
        found.ok_or_else(|| Error::invalid_config(format!("{} is not configured for export", key)))
    }

    /// Export several tables, parents before children within each connection.
    ///
    /// A failing table is recorded and its siblings still run, unless
    /// `stop_on_error` is set.
    pub fn export_all(&mut self, tables: Vec<TableConfig>, stop_on_error: bool) -> Result<ExportReport> {
        let ordered = self.order_tables(tables);
        let total = ordered.len();
        let mut report = ExportReport::default();

        for (i, table) in ordered.iter().enumerate() {
            let key = table.key();
            tracing::info!("[{}/{}] {}", i + 1, total, key);
            if let Some(progress) = self.progress.as_mut() {
                progress(i + 1, total, &key);
            }

            match self.export_table(table) {
                Ok(table_report) => report.tables.push(table_report),
                Err(e) if stop_on_error => return Err(e),
                Err(e) => {
                    tracing::error!("{}", e);
                    report.failures.push(FailedTable {
                        table: key.to_string(),
                        error: e.to_string(),
                    });
                }
            }
        }

        Ok(report)
    }

    /// Export one table to its dump file
    pub fn export_table(&mut self, table: &TableConfig) -> Result<TableReport> {
        let key = table.key();
        self.export_table_inner(table)
            .map_err(|e| Error::export_failed(key.to_string(), e))
    }

    fn export_table_inner(&mut self, table: &TableConfig) -> Result<TableReport> {
        let connection_name = table.connection_name.as_deref();
        let scope = self.scope(connection_name)?;
        let dir_segment = connection_name
            .filter(|name| !self.connections.is_default(name))
            .map(str::to_string);

        let connection = self.connections.get_mut(connection_name)?;
        let platform = platform::create(connection.platform_name())?;

        let sql = select_sql(platform.as_ref(), table, scope);
        tracing::debug!(table = %table.key(), sql = %sql, "fetching rows");
        let rows = connection.fetch_rows(&sql)?;
        let row_count = rows.len();

        let faked = scope.faker.columns(&table.schema, &table.table).is_some();
        let rows = Faker::apply(&table.schema, &table.table, &scope.faker, rows);

        let sequence_reset = platform.sequence_reset_sql(connection, &table.schema, &table.table)?;

        let path = self.layout.dump_path(dir_segment.as_deref(), &table.key());
        let generator = SqlGenerator::new(platform.as_ref()).with_batch_size(self.batch_size);
        let chunks = generator.generate(table, rows, sequence_reset, Utc::now());
        let stats = DumpWriter::new(self.fs).write_chunks(&path, chunks)?;

        tracing::debug!(table = %table.key(), rows = row_count, bytes = stats.bytes, "dump written");

        Ok(TableReport {
            table: table.key().to_string(),
            connection: dir_segment,
            path,
            rows: row_count,
            bytes: stats.bytes,
            faked,
        })
    }

    /// Config section a table lives in
    fn scope(&self, connection: Option<&str>) -> Result<&'a DumpConfig> {
        let config = self.config;
        match connection {
            Some(name) if !self.connections.is_default(name) => config
                .connection(name)
                .ok_or_else(|| Error::invalid_config(format!("no config for connection '{}'", name))),
            _ => Ok(config),
        }
    }

    /// Group tables by connection and sort each group with that connection's FK graph
    fn order_tables(&mut self, tables: Vec<TableConfig>) -> Vec<TableConfig> {
        let mut groups: IndexMap<Option<String>, Vec<TableConfig>> = IndexMap::new();
        for table in tables {
            groups
                .entry(table.connection_name.clone())
                .or_default()
                .push(table);
        }

        let mut ordered = Vec::new();
        for (connection, group) in groups {
            let keys: Vec<TableKey> = group.iter().map(TableConfig::key).collect();
            let sorted = match self.graph(connection.as_deref()) {
                Some(graph) => match graph.sort_for_export(&keys) {
                    Ok(sorted) => sorted,
                    Err(e) => {
                        tracing::warn!("{}; exporting in the requested order", e);
                        keys
                    }
                },
                None => keys,
            };

            let mut by_key: HashMap<TableKey, TableConfig> =
                group.into_iter().map(|t| (t.key(), t)).collect();
            ordered.extend(sorted.iter().filter_map(|key| by_key.remove(key)));
        }
        ordered
    }

    /// FK graph of a connection, built once and cached; None when unavailable
    fn graph(&mut self, connection: Option<&str>) -> Option<&DependencyGraph> {
        let name = connection
            .unwrap_or(self.connections.default_name())
            .to_string();
        if !self.graphs.contains_key(&name) {
            let built = self.connections.get_mut(connection).and_then(|conn| {
                let platform = platform::create(conn.platform_name())?;
                DependencyGraph::build(conn, platform.as_ref())
            });
            let graph = match built {
                Ok(graph) => Some(graph),
                Err(e) => {
                    tracing::warn!(connection = %name, "cannot read foreign keys: {}", e);
                    None
                }
            };
            self.graphs.insert(name.clone(), graph);
        }
        self.graphs.get(&name).and_then(Option::as_ref)
    }
}

/// `SELECT *` with where, cascade, order and limit applied
pub fn select_sql(platform: &dyn Platform, table: &TableConfig, scope: &DumpConfig) -> String {
    let mut sql = format!(
        "SELECT * FROM {}",
        platform.full_table_name(&table.schema, &table.table)
    );

    let cascade = CascadeResolver::resolve(platform, table, scope);
    match (&table.where_clause, cascade) {
        (Some(w), Some(c)) => sql.push_str(&format!(" WHERE ({}) AND ({})", w, c)),
        (Some(w), None) => sql.push_str(&format!(" WHERE {}", w)),
        (None, Some(c)) => sql.push_str(&format!(" WHERE {}", c)),
        (None, None) => {}
    }

    if let Some(order_by) = &table.order_by {
        sql.push_str(&format!(" ORDER BY {}", order_by));
    }
    if let Some(limit) = table.limit {
        sql.push(' ');
        sql.push_str(&platform.limit_sql(limit));
    }
    sql
}
