//! Dump config generation from a live database.
//!
//! Small tables (row count at or below the threshold) become full exports,
//! larger ones partial exports limited to the threshold. Partial children of
//! partial parents get `cascade_from` rules from the FK graph, and sampled
//! PII columns get faker entries.

use super::{CascadeRule, DumpConfig, PartialSpec};
use crate::connection::Connection;
use crate::error::Result;
use crate::faker::PatternDetector;
use crate::platform::Platform;
use crate::schema::{DependencyGraph, SchemaInspector, TableKey};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_THRESHOLD: u64 = 1000;

/// Which tables a generation run looks at
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerateMode {
    /// Every table of every user schema
    All,
    Schema(String),
    Table(TableKey),
    /// Only tables the existing config does not mention yet
    New,
}

impl FromStr for GenerateMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        match s {
            "all" => return Ok(GenerateMode::All),
            "new" => return Ok(GenerateMode::New),
            _ => {}
        }
        if let Some(schema) = s.strip_prefix("schema=") {
            if schema.is_empty() {
                return Err("schema= needs a schema name".to_string());
            }
            return Ok(GenerateMode::Schema(schema.to_string()));
        }
        if let Some(table) = s.strip_prefix("table=") {
            return table.parse().map(GenerateMode::Table);
        }
        Err(format!(
            "Unknown mode: '{}'. Expected all, new, schema=<name> or table=<schema.table>",
            s
        ))
    }
}

impl fmt::Display for GenerateMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerateMode::All => write!(f, "all"),
            GenerateMode::New => write!(f, "new"),
            GenerateMode::Schema(s) => write!(f, "schema={}", s),
            GenerateMode::Table(k) => write!(f, "table={}", k),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GenerateOptions {
    pub threshold: u64,
    /// Re-evaluate tables the existing config already covers
    pub force: bool,
    pub no_cascade: bool,
    pub no_faker: bool,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            force: false,
            no_cascade: false,
            no_faker: false,
        }
    }
}

/// What a generation run changed
#[derive(Debug, Clone, Default, Serialize)]
pub struct GenerateReport {
    pub full: Vec<String>,
    pub partial: Vec<String>,
    pub kept: Vec<String>,
    pub excluded: Vec<String>,
    pub cascade_rules: usize,
    pub faked_columns: usize,
}

impl GenerateReport {
    pub fn changed(&self) -> usize {
        self.full.len() + self.partial.len()
    }
}

pub struct ConfigGenerator;

impl ConfigGenerator {
    pub fn generate(
        connection: &mut dyn Connection,
        platform: &dyn Platform,
        existing: DumpConfig,
        mode: &GenerateMode,
        options: &GenerateOptions,
    ) -> Result<(DumpConfig, GenerateReport)> {
        let mut config = existing;
        let mut report = GenerateReport::default();

        let candidates = Self::candidates(connection, platform, &config, mode)?;
        tracing::info!(mode = %mode, tables = candidates.len(), "generating dump config");

        let mut partial_keys = Vec::new();
        for key in candidates {
            if config.is_excluded(&key) {
                report.excluded.push(key.to_string());
                continue;
            }
            if config.table_config(&key).is_some() && !options.force {
                report.kept.push(key.to_string());
                continue;
            }

            let rows = SchemaInspector::new(connection, platform).count_rows(&key)?;
            if rows <= options.threshold {
                tracing::debug!(table = %key, rows, "full export");
                config.set_full(&key);
                report.full.push(key.to_string());
            } else {
                tracing::debug!(table = %key, rows, "partial export");
                config.set_partial(
                    &key,
                    PartialSpec {
                        limit: Some(options.threshold),
                        ..PartialSpec::default()
                    },
                );
                report.partial.push(key.to_string());
                partial_keys.push(key.clone());
            }

            if !options.no_faker {
                match PatternDetector::detect(connection, platform, &key.schema, &key.table) {
                    Ok(columns) => {
                        for (column, pattern) in columns {
                            config.faker.set(&key.schema, &key.table, &column, pattern);
                            report.faked_columns += 1;
                        }
                    }
                    Err(e) => tracing::warn!(table = %key, "pattern detection failed: {}", e),
                }
            }
        }

        if !options.no_cascade && !partial_keys.is_empty() {
            let graph = DependencyGraph::build(connection, platform)?;
            report.cascade_rules = add_cascade_rules(&mut config, &graph, &partial_keys);
        }

        Ok((config, report))
    }

    fn candidates(
        connection: &mut dyn Connection,
        platform: &dyn Platform,
        config: &DumpConfig,
        mode: &GenerateMode,
    ) -> Result<Vec<TableKey>> {
        let mut inspector = SchemaInspector::new(connection, platform);
        match mode {
            GenerateMode::All => all_tables(&mut inspector),
            GenerateMode::Schema(schema) => inspector.list_tables(schema),
            GenerateMode::Table(key) => Ok(vec![key.clone()]),
            GenerateMode::New => Ok(all_tables(&mut inspector)?
                .into_iter()
                .filter(|key| config.table_config(key).is_none())
                .collect()),
        }
    }
}

fn all_tables(inspector: &mut SchemaInspector<'_>) -> Result<Vec<TableKey>> {
    let mut tables = Vec::new();
    for schema in inspector.list_schemas()? {
        tables.extend(inspector.list_tables(&schema)?);
    }
    Ok(tables)
}

/// Cascade rules for each partial table from its partially exported FK parents
fn add_cascade_rules(config: &mut DumpConfig, graph: &DependencyGraph, keys: &[TableKey]) -> usize {
    let mut added = 0;
    for key in keys {
        let Some(parents) = graph.parents(key) else {
            continue;
        };
        let rules: Vec<CascadeRule> = parents
            .iter()
            .filter(|(parent, _)| {
                config
                    .table_config(parent)
                    .is_some_and(|p| !p.is_full_export())
            })
            .map(|(parent, edge)| CascadeRule {
                parent: parent.clone(),
                fk_column: edge.source_column.clone(),
                parent_column: edge.target_column.clone(),
            })
            .collect();

        if let Some(spec) = config.partial_spec_mut(key) {
            added += rules.len();
            spec.cascade_from = rules;
        }
    }
    added
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ForeignKey;

    #[test]
    fn test_mode_parsing() {
        assert_eq!("all".parse::<GenerateMode>().unwrap(), GenerateMode::All);
        assert_eq!("new".parse::<GenerateMode>().unwrap(), GenerateMode::New);
        assert_eq!(
            "schema=billing".parse::<GenerateMode>().unwrap(),
            GenerateMode::Schema("billing".into())
        );
        assert_eq!(
            "table=public.users".parse::<GenerateMode>().unwrap(),
            GenerateMode::Table(TableKey::new("public", "users"))
        );
        assert!("schema=".parse::<GenerateMode>().is_err());
        assert!("table=users".parse::<GenerateMode>().is_err());
        assert!("everything".parse::<GenerateMode>().is_err());
    }

    #[test]
    fn test_cascade_rules_only_from_partial_parents() {
        let users = TableKey::new("public", "users");
        let countries = TableKey::new("public", "countries");
        let orders = TableKey::new("public", "orders");

        let mut config = DumpConfig::default();
        config.set_partial(&users, PartialSpec { limit: Some(10), ..Default::default() });
        config.set_partial(&orders, PartialSpec { limit: Some(10), ..Default::default() });
        config.set_full(&countries);

        let graph = DependencyGraph::from_foreign_keys([
            ForeignKey {
                child: orders.clone(),
                source_column: "user_id".into(),
                parent: users.clone(),
                target_column: "id".into(),
            },
            ForeignKey {
                child: orders.clone(),
                source_column: "country_id".into(),
                parent: countries.clone(),
                target_column: "id".into(),
            },
        ]);

        let added = add_cascade_rules(&mut config, &graph, &[orders.clone(), users.clone()]);
        assert_eq!(added, 1);
        let rules = &config.table_config(&orders).unwrap().cascade_from;
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].parent, users);
        assert_eq!(rules[0].fk_column, "user_id");
        assert_eq!(rules[0].parent_column, "id");
    }
}
