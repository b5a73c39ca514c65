//! Dump configuration model.
//!
//! The YAML layout maps one-to-one onto [`DumpConfig`]:
//!
//! ```yaml
//! full_export:
//!   public: [countries, currencies]
//! partial_export:
//!   public:
//!     users: { limit: 500, where: "is_active = true", order_by: "created_at DESC" }
//!     orders:
//!       limit: 1000
//!       cascade_from:
//!         - { parent: public.users, fk_column: user_id, parent_column: id }
//! faker:
//!   public:
//!     users: { full_name: full_name, email: email }
//! exclude: [audit, public.sessions]
//! includes:
//!   billing: schemas/billing.yaml
//! connections:
//!   analytics: { full_export: { events: [types] } }
//! ```

pub mod generator;
mod loader;

pub use generator::{ConfigGenerator, GenerateMode, GenerateOptions, GenerateReport};
pub use loader::{ConfigLoader, ConfigWriter};

use crate::schema::TableKey;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Default config location relative to the base path
pub const DEFAULT_CONFIG_PATH: &str = "database/dump_config.yaml";

/// PII shape a faked column is replaced with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternType {
    FullName,
    ShortName,
    Email,
    Phone,
    FirstName,
    LastName,
    Patronymic,
    Name,
    Gender,
}

impl fmt::Display for PatternType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PatternType::FullName => "full_name",
            PatternType::ShortName => "short_name",
            PatternType::Email => "email",
            PatternType::Phone => "phone",
            PatternType::FirstName => "first_name",
            PatternType::LastName => "last_name",
            PatternType::Patronymic => "patronymic",
            PatternType::Name => "name",
            PatternType::Gender => "gender",
        };
        f.write_str(s)
    }
}

/// Declares that a child's partial export follows its parent's selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CascadeRule {
    pub parent: TableKey,
    pub fk_column: String,
    pub parent_column: String,
}

/// Column → pattern map for one table
pub type FakerColumns = BTreeMap<String, PatternType>;

/// schema → table → column → pattern
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FakerConfig(BTreeMap<String, BTreeMap<String, FakerColumns>>);

impl FakerConfig {
    pub fn columns(&self, schema: &str, table: &str) -> Option<&FakerColumns> {
        self.0
            .get(schema)
            .and_then(|tables| tables.get(table))
            .filter(|columns| !columns.is_empty())
    }

    pub fn set(&mut self, schema: &str, table: &str, column: &str, pattern: PatternType) {
        self.0
            .entry(schema.to_string())
            .or_default()
            .entry(table.to_string())
            .or_default()
            .insert(column.to_string(), pattern);
    }

    pub fn is_empty(&self) -> bool {
        self.0.values().all(|tables| tables.values().all(|c| c.is_empty()))
    }

    pub fn schemas(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    fn merge(&mut self, other: FakerConfig) {
        for (schema, tables) in other.0 {
            let target = self.0.entry(schema).or_default();
            for (table, columns) in tables {
                target.entry(table).or_default().extend(columns);
            }
        }
    }

    fn only_schema(&self, schema: &str) -> FakerConfig {
        FakerConfig(
            self.0
                .get(schema)
                .map(|tables| BTreeMap::from([(schema.to_string(), tables.clone())]))
                .unwrap_or_default(),
        )
    }
}

/// Per-table settings of a partial export as written in YAML
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartialSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    #[serde(rename = "where", skip_serializing_if = "Option::is_none")]
    pub where_clause: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_by: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cascade_from: Vec<CascadeRule>,
}

/// Resolved export settings of one table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableConfig {
    pub schema: String,
    pub table: String,
    pub limit: Option<u64>,
    pub where_clause: Option<String>,
    pub order_by: Option<String>,
    pub connection_name: Option<String>,
    pub cascade_from: Vec<CascadeRule>,
}

impl TableConfig {
    /// Unconditional export of every row
    pub fn full(key: &TableKey) -> Self {
        Self {
            schema: key.schema.clone(),
            table: key.table.clone(),
            limit: None,
            where_clause: None,
            order_by: None,
            connection_name: None,
            cascade_from: Vec::new(),
        }
    }

    fn from_partial(key: &TableKey, spec: &PartialSpec) -> Self {
        let non_empty = |s: &Option<String>| {
            s.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        Self {
            limit: spec.limit,
            where_clause: non_empty(&spec.where_clause),
            order_by: non_empty(&spec.order_by),
            cascade_from: spec.cascade_from.clone(),
            ..Self::full(key)
        }
    }

    pub fn with_connection(mut self, name: Option<&str>) -> Self {
        self.connection_name = name.map(str::to_string);
        self
    }

    pub fn key(&self) -> TableKey {
        TableKey::new(&self.schema, &self.table)
    }

    /// Full export means no row limit. A `where` or `cascade_from` alone does
    /// not make a table partial.
    pub fn is_full_export(&self) -> bool {
        self.limit.is_none()
    }
}

/// Everything that decides what gets exported and how
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DumpConfig {
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub full_export: BTreeMap<String, Vec<String>>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub partial_export: BTreeMap<String, BTreeMap<String, PartialSpec>>,
    #[serde(skip_serializing_if = "FakerConfig::is_empty")]
    pub faker: FakerConfig,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<String>,
    /// schema → file relative to this config, merged on load
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub includes: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub connections: BTreeMap<String, DumpConfig>,
}

impl DumpConfig {
    /// Settings of a table: partial export first, then full export.
    ///
    /// Excluded tables resolve to None.
    pub fn table_config(&self, key: &TableKey) -> Option<TableConfig> {
        if self.is_excluded(key) {
            return None;
        }
        if let Some(spec) = self
            .partial_export
            .get(&key.schema)
            .and_then(|tables| tables.get(&key.table))
        {
            return Some(TableConfig::from_partial(key, spec));
        }
        let in_full = self
            .full_export
            .get(&key.schema)
            .is_some_and(|tables| tables.iter().any(|t| t == &key.table));
        in_full.then(|| TableConfig::full(key))
    }

    /// Excluded as a whole schema or as `schema.table`
    pub fn is_excluded(&self, key: &TableKey) -> bool {
        let qualified = key.to_string();
        self.exclude
            .iter()
            .any(|entry| entry == &key.schema || entry == &qualified)
    }

    /// Every configured, non-excluded table, sorted
    pub fn tables(&self) -> Vec<TableKey> {
        let full = self
            .full_export
            .iter()
            .flat_map(|(schema, tables)| tables.iter().map(move |t| TableKey::new(schema, t)));
        let partial = self.partial_export.iter().flat_map(|(schema, tables)| {
            tables.keys().map(move |t| TableKey::new(schema, t))
        });
        full.chain(partial)
            .filter(|key| !self.is_excluded(key))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Nested config of a named connection
    pub fn connection(&self, name: &str) -> Option<&DumpConfig> {
        self.connections.get(name)
    }

    /// Record a table as fully exported, replacing any partial entry
    pub fn set_full(&mut self, key: &TableKey) {
        if let Some(tables) = self.partial_export.get_mut(&key.schema) {
            tables.remove(&key.table);
            if tables.is_empty() {
                self.partial_export.remove(&key.schema);
            }
        }
        let tables = self.full_export.entry(key.schema.clone()).or_default();
        if !tables.contains(&key.table) {
            tables.push(key.table.clone());
            tables.sort();
        }
    }

    /// Record a table as partially exported, replacing any full entry
    pub fn set_partial(&mut self, key: &TableKey, spec: PartialSpec) {
        if let Some(tables) = self.full_export.get_mut(&key.schema) {
            tables.retain(|t| t != &key.table);
            if tables.is_empty() {
                self.full_export.remove(&key.schema);
            }
        }
        self.partial_export
            .entry(key.schema.clone())
            .or_default()
            .insert(key.table.clone(), spec);
    }

    pub fn partial_spec_mut(&mut self, key: &TableKey) -> Option<&mut PartialSpec> {
        self.partial_export
            .get_mut(&key.schema)
            .and_then(|tables| tables.get_mut(&key.table))
    }

    /// Schemas mentioned by any section
    pub fn schemas(&self) -> BTreeSet<String> {
        self.full_export
            .keys()
            .chain(self.partial_export.keys())
            .chain(self.faker.schemas())
            .cloned()
            .collect()
    }

    /// Fold another config's sections into this one; `other` wins on conflicts
    pub fn merge(&mut self, other: DumpConfig) {
        for (schema, tables) in other.full_export {
            for table in tables {
                self.set_full(&TableKey::new(&schema, table));
            }
        }
        for (schema, tables) in other.partial_export {
            for (table, spec) in tables {
                self.set_partial(&TableKey::new(&schema, table), spec);
            }
        }
        self.faker.merge(other.faker);
        for entry in other.exclude {
            if !self.exclude.contains(&entry) {
                self.exclude.push(entry);
            }
        }
        for (name, nested) in other.connections {
            self.connections.entry(name).or_default().merge(nested);
        }
    }

    /// The sections of one schema, used when splitting config into files
    pub fn only_schema(&self, schema: &str) -> DumpConfig {
        DumpConfig {
            full_export: self
                .full_export
                .get(schema)
                .map(|t| BTreeMap::from([(schema.to_string(), t.clone())]))
                .unwrap_or_default(),
            partial_export: self
                .partial_export
                .get(schema)
                .map(|t| BTreeMap::from([(schema.to_string(), t.clone())]))
                .unwrap_or_default(),
            faker: self.faker.only_schema(schema),
            ..DumpConfig::default()
        }
    }
}
