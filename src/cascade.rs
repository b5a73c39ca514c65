//! Cascade-where resolution.
//!
//! A child table with `cascade_from` rules only exports rows whose FK points
//! at a row its partially exported parent also exports. The parent's own
//! selection is rebuilt as a subquery, recursively through the parent's own
//! cascade rules.

use crate::config::{DumpConfig, TableConfig};
use crate::platform::Platform;

/// Recursion guard against cyclic hand-written `cascade_from` chains
pub const MAX_CASCADE_DEPTH: usize = 10;

/// Builds the WHERE fragment for one child table.
///
/// A resolver is created per [`CascadeResolver::resolve`] call, so derived
/// table aliases (`alias_1`, `alias_2`, ...) are unique within one fragment.
pub struct CascadeResolver<'a> {
    platform: &'a dyn Platform,
    config: &'a DumpConfig,
    alias_counter: usize,
}

impl<'a> CascadeResolver<'a> {
    /// Fragment restricting `child` to rows whose parents are exported, or None
    pub fn resolve(
        platform: &'a dyn Platform,
        child: &TableConfig,
        config: &'a DumpConfig,
    ) -> Option<String> {
        let mut resolver = Self {
            platform,
            config,
            alias_counter: 0,
        };
        resolver.resolve_at(child, 0)
    }

    fn resolve_at(&mut self, child: &TableConfig, depth: usize) -> Option<String> {
        if child.cascade_from.is_empty() {
            return None;
        }
        if depth >= MAX_CASCADE_DEPTH {
            tracing::warn!(
                table = %child.key(),
                depth,
                "cascade_from nesting too deep, ignoring further parents"
            );
            return None;
        }

        let mut conditions = Vec::new();
        for rule in &child.cascade_from {
            let Some(parent) = self.config.table_config(&rule.parent) else {
                tracing::debug!(
                    table = %child.key(),
                    parent = %rule.parent,
                    "cascade parent not configured, skipping"
                );
                continue;
            };
            if parent.is_full_export() {
                continue;
            }

            let subquery = self.parent_subquery(&parent, &rule.parent_column, depth);
            let fk = self.platform.quote_identifier(&rule.fk_column);
            conditions.push(format!("({fk} IN ({subquery}) OR {fk} IS NULL)"));
        }

        if conditions.is_empty() {
            None
        } else {
            Some(conditions.join(" AND "))
        }
    }

    fn parent_subquery(&mut self, parent: &TableConfig, column: &str, depth: usize) -> String {
        let mut sql = format!(
            "SELECT {} FROM {}",
            self.platform.quote_identifier(column),
            self.platform.full_table_name(&parent.schema, &parent.table)
        );

        let nested = self.resolve_at(parent, depth + 1);
        match (&parent.where_clause, nested) {
            (Some(w), Some(c)) => sql.push_str(&format!(" WHERE ({w}) AND ({c})")),
            (Some(w), None) => sql.push_str(&format!(" WHERE {w}")),
            (None, Some(c)) => sql.push_str(&format!(" WHERE {c}")),
            (None, None) => {}
        }

        if let Some(order_by) = &parent.order_by {
            sql.push_str(&format!(" ORDER BY {order_by}"));
        }

        match parent.limit {
            Some(limit) => {
                sql.push(' ');
                sql.push_str(&self.platform.limit_sql(limit));
                if self.platform.wraps_limited_subquery() {
                    self.alias_counter += 1;
                    sql = format!("SELECT * FROM ({sql}) AS alias_{}", self.alias_counter);
                }
                sql
            }
            None => sql,
        }
    }
}
