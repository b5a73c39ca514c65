//! Schema dependency graph for FK-aware operations.
//!
//! Provides:
//! - Dependency graph construction from live FK metadata
//! - Deterministic topological sorting for export/import order
//! - Cycle reporting for circular FK relationships

use super::cycles::find_cycles;
use super::{ForeignKey, TableKey};
use crate::connection::{column_text, Connection};
use crate::error::{Error, Result};
use crate::platform::Platform;
use std::collections::{BTreeMap, BTreeSet};

/// Column pair of the FK linking a child table to one parent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FkEdge {
    pub source_column: String,
    pub target_column: String,
}

/// Child table → (parent table → FK columns)
pub type AdjacencyMap = BTreeMap<TableKey, BTreeMap<TableKey, FkEdge>>;

/// FK dependency graph of one connection.
///
/// Edges point from a child (the table holding the FK) to its parent (the
/// referenced table). Self-referencing FKs are dropped on construction.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    adjacency: AdjacencyMap,
}

impl DependencyGraph {
    /// Build the graph by running the platform's FK catalog query
    pub fn build(connection: &mut dyn Connection, platform: &dyn Platform) -> Result<Self> {
        let rows = connection.fetch_rows(&platform.foreign_keys_sql())?;
        let mut fks = Vec::with_capacity(rows.len());

        for row in &rows {
            let field = |name: &str| {
                column_text(row, name)
                    .ok_or_else(|| Error::database(format!("FK metadata row lacks '{}'", name)))
            };
            fks.push(ForeignKey {
                child: TableKey::new(field("child_schema")?, field("child_table")?),
                source_column: field("child_column")?,
                parent: TableKey::new(field("parent_schema")?, field("parent_table")?),
                target_column: field("parent_column")?,
            });
        }

        tracing::debug!(edges = fks.len(), "loaded foreign key metadata");
        Ok(Self::from_foreign_keys(fks))
    }

    /// Build from FK column pairs. The first FK seen per (child, parent) wins.
    pub fn from_foreign_keys(fks: impl IntoIterator<Item = ForeignKey>) -> Self {
        let mut adjacency = AdjacencyMap::new();
        for fk in fks {
            if fk.child == fk.parent {
                continue;
            }
            adjacency
                .entry(fk.child)
                .or_default()
                .entry(fk.parent)
                .or_insert(FkEdge {
                    source_column: fk.source_column,
                    target_column: fk.target_column,
                });
        }
        Self { adjacency }
    }

    /// Build from an adjacency map, dropping self references
    pub fn from_adjacency(mut adjacency: AdjacencyMap) -> Self {
        for (child, parents) in adjacency.iter_mut() {
            parents.remove(child);
        }
        adjacency.retain(|_, parents| !parents.is_empty());
        Self { adjacency }
    }

    pub fn adjacency(&self) -> &AdjacencyMap {
        &self.adjacency
    }

    /// Parents referenced by `child`, with the FK columns
    pub fn parents(&self, child: &TableKey) -> Option<&BTreeMap<TableKey, FkEdge>> {
        self.adjacency.get(child)
    }

    pub fn edge_count(&self) -> usize {
        self.adjacency.values().map(|p| p.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.adjacency.is_empty()
    }

    /// Order tables for export: parents before children
    pub fn sort_for_export(&self, keys: &[TableKey]) -> Result<Vec<TableKey>> {
        self.topo_sort(keys)
    }

    /// Order tables for import: parents before children, same as export
    pub fn sort_for_import(&self, keys: &[TableKey]) -> Result<Vec<TableKey>> {
        self.topo_sort(keys)
    }

    /// Kahn's algorithm over the requested keys.
    ///
    /// Only edges with both endpoints in `keys` count; a table whose parent is
    /// not requested is a root. Among ready tables the smallest key goes
    /// first. Fails with [`Error::DependencyCycle`] naming every cycle.
    fn topo_sort(&self, keys: &[TableKey]) -> Result<Vec<TableKey>> {
        let nodes: BTreeSet<TableKey> = keys.iter().cloned().collect();
        let sub = self.restrict(&nodes);

        let mut in_degree: BTreeMap<&TableKey, usize> = nodes.iter().map(|k| (k, 0)).collect();
        let mut children: BTreeMap<&TableKey, Vec<&TableKey>> = BTreeMap::new();
        for (&child, parents) in &sub {
            for &parent in parents {
                if let Some(deg) = in_degree.get_mut(child) {
                    *deg += 1;
                }
                children.entry(parent).or_default().push(child);
            }
        }

        let mut ready: BTreeSet<&TableKey> = in_degree
            .iter()
            .filter(|(_, &deg)| deg == 0)
            .map(|(k, _)| *k)
            .collect();

        let mut order = Vec::with_capacity(nodes.len());
        while let Some(table) = ready.pop_first() {
            order.push(table.clone());

            if let Some(kids) = children.get(table) {
                for &kid in kids {
                    if let Some(deg) = in_degree.get_mut(kid) {
                        *deg -= 1;
                        if *deg == 0 {
                            ready.insert(kid);
                        }
                    }
                }
            }
        }

        if order.len() < nodes.len() {
            let cycles = find_cycles(&sub)
                .into_iter()
                .map(|cycle| cycle.iter().map(|k| k.to_string()).collect())
                .collect();
            return Err(Error::DependencyCycle { cycles });
        }

        Ok(order)
    }

    /// Child → parents restricted to `nodes`, borrowing keys from `nodes`
    fn restrict<'a>(
        &self,
        nodes: &'a BTreeSet<TableKey>,
    ) -> BTreeMap<&'a TableKey, BTreeSet<&'a TableKey>> {
        let mut sub: BTreeMap<&TableKey, BTreeSet<&TableKey>> = BTreeMap::new();
        for child in nodes {
            sub.entry(child).or_default();
            if let Some(parents) = self.adjacency.get(child) {
                for parent in parents.keys() {
                    if let Some(parent) = nodes.get(parent) {
                        sub.entry(child).or_default().insert(parent);
                    }
                }
            }
        }
        sub
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(name: &str) -> TableKey {
        TableKey::new("public", name)
    }

    fn graph(edges: &[(&str, &str)]) -> DependencyGraph {
        DependencyGraph::from_foreign_keys(edges.iter().map(|(child, parent)| ForeignKey {
            child: key(child),
            source_column: format!("{}_id", parent),
            parent: key(parent),
            target_column: "id".to_string(),
        }))
    }

    fn names(order: &[TableKey]) -> Vec<&str> {
        order.iter().map(|k| k.table.as_str()).collect()
    }

    #[test]
    fn test_diamond_sorted_lexicographically() {
        let g = graph(&[("d", "b"), ("d", "c"), ("b", "a"), ("c", "a")]);
        let keys = vec![key("d"), key("c"), key("b"), key("a")];
        let order = g.sort_for_export(&keys).unwrap();
        assert_eq!(names(&order), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_parents_precede_children() {
        let g = graph(&[("order_items", "orders"), ("orders", "users"), ("order_items", "products")]);
        let keys = vec![key("order_items"), key("orders"), key("users"), key("products")];
        let order = g.sort_for_import(&keys).unwrap();
        let pos = |n: &str| order.iter().position(|k| k.table == n).unwrap();
        assert!(pos("users") < pos("orders"));
        assert!(pos("orders") < pos("order_items"));
        assert!(pos("products") < pos("order_items"));
    }

    #[test]
    fn test_external_parent_ignored() {
        let g = graph(&[("orders", "users")]);
        let order = g.sort_for_export(&[key("orders"), key("audit")]).unwrap();
        assert_eq!(names(&order), vec!["audit", "orders"]);
    }

    #[test]
    fn test_self_reference_dropped() {
        let g = graph(&[("categories", "categories")]);
        assert!(g.is_empty());
        let order = g.sort_for_export(&[key("categories")]).unwrap();
        assert_eq!(names(&order), vec!["categories"]);
    }

    #[test]
    fn test_two_node_cycle_reported() {
        let g = graph(&[("a", "b"), ("b", "a")]);
        let err = g.sort_for_export(&[key("a"), key("b")]).unwrap_err();
        match &err {
            Error::DependencyCycle { cycles } => {
                assert_eq!(cycles.len(), 1);
                assert_eq!(cycles[0], vec!["public.a", "public.b"]);
            }
            other => panic!("expected cycle, got {other:?}"),
        }
        assert!(err.to_string().contains("public.a -> public.b -> public.a"));
    }

    #[test]
    fn test_cycle_outside_requested_keys_is_ignored() {
        let g = graph(&[("a", "b"), ("b", "a"), ("c", "a")]);
        let order = g.sort_for_export(&[key("a"), key("c")]).unwrap();
        assert_eq!(names(&order), vec!["a", "c"]);
    }

    #[test]
    fn test_from_adjacency_drops_self_edges() {
        let mut adjacency = AdjacencyMap::new();
        let edge = FkEdge {
            source_column: "parent_id".to_string(),
            target_column: "id".to_string(),
        };
        adjacency
            .entry(key("tree"))
            .or_default()
            .insert(key("tree"), edge.clone());
        adjacency.entry(key("leaf")).or_default().insert(key("tree"), edge);
        let g = DependencyGraph::from_adjacency(adjacency);
        assert_eq!(g.edge_count(), 1);
        assert!(g.parents(&key("tree")).is_none());
    }
}
