//! Scripted in-memory connection shared by the integration tests.

#![allow(dead_code)]

use dbsnap::connection::{Connection, Row, Value};
use dbsnap::platform;
use dbsnap::{Error, Result};
use std::cell::RefCell;
use std::rc::Rc;

/// Every statement a [`MemoryConnection`] saw, shared with the test body
#[derive(Clone, Default)]
pub struct SqlLog(Rc<RefCell<Vec<String>>>);

impl SqlLog {
    pub fn entries(&self) -> Vec<String> {
        self.0.borrow().clone()
    }

    pub fn push(&self, sql: &str) {
        self.0.borrow_mut().push(sql.to_string());
    }

    /// Index of the first entry containing `needle`
    pub fn position(&self, needle: &str) -> Option<usize> {
        self.0.borrow().iter().position(|e| e.contains(needle))
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.position(needle).is_some()
    }

    pub fn count(&self, needle: &str) -> usize {
        self.0.borrow().iter().filter(|e| e.contains(needle)).count()
    }
}

/// Connection answering queries from canned responses.
///
/// A query is answered by the first registered response whose needle occurs
/// in it; `fetch_column` params are appended as `-- params: a,b` before
/// matching. Unmatched queries return no rows.
pub struct MemoryConnection {
    platform_name: String,
    responses: Vec<(String, Vec<Row>)>,
    failures: Vec<String>,
    log: SqlLog,
    in_transaction: bool,
}

impl MemoryConnection {
    pub fn new(platform_name: &str) -> Self {
        Self {
            platform_name: platform_name.to_string(),
            responses: Vec::new(),
            failures: Vec::new(),
            log: SqlLog::default(),
            in_transaction: false,
        }
    }

    pub fn respond(mut self, needle: &str, rows: Vec<Row>) -> Self {
        self.responses.push((needle.to_string(), rows));
        self
    }

    /// Answer `fetch_column` with one single-column row per value
    pub fn respond_column(self, needle: &str, values: Vec<Value>) -> Self {
        let rows = values
            .into_iter()
            .map(|v| row(&[("value", v)]))
            .collect();
        self.respond(needle, rows)
    }

    /// Fail any statement containing `needle`
    pub fn fail_on(mut self, needle: &str) -> Self {
        self.failures.push(needle.to_string());
        self
    }

    pub fn log(&self) -> SqlLog {
        self.log.clone()
    }

    fn check(&self, sql: &str) -> Result<()> {
        self.log.push(sql);
        match self.failures.iter().find(|f| sql.contains(f.as_str())) {
            Some(needle) => Err(Error::database(format!("scripted failure on '{}'", needle))),
            None => Ok(()),
        }
    }

    fn answer(&self, sql: &str) -> Vec<Row> {
        self.responses
            .iter()
            .find(|(needle, _)| sql.contains(needle.as_str()))
            .map(|(_, rows)| rows.clone())
            .unwrap_or_default()
    }
}

impl Connection for MemoryConnection {
    fn platform_name(&self) -> &str {
        &self.platform_name
    }

    fn execute(&mut self, sql: &str) -> Result<u64> {
        self.check(sql)?;
        Ok(0)
    }

    fn fetch_rows(&mut self, sql: &str) -> Result<Vec<Row>> {
        self.check(sql)?;
        Ok(self.answer(sql))
    }

    fn fetch_column(&mut self, sql: &str, params: &[Value]) -> Result<Vec<Value>> {
        let params: Vec<String> = params.iter().map(|p| p.to_string()).collect();
        let sql = format!("{} -- params: {}", sql, params.join(","));
        self.check(&sql)?;
        Ok(self
            .answer(&sql)
            .into_iter()
            .filter_map(|row| row.into_iter().next().map(|(_, v)| v))
            .collect())
    }

    fn quote(&self, value: &Value) -> String {
        match platform::create(&self.platform_name) {
            Ok(p) => p.quote_literal(value),
            Err(_) => value.to_string(),
        }
    }

    fn begin(&mut self) -> Result<()> {
        self.check("BEGIN")?;
        self.in_transaction = true;
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        self.check("COMMIT")?;
        self.in_transaction = false;
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        self.log.push("ROLLBACK");
        self.in_transaction = false;
        Ok(())
    }

    fn in_transaction(&self) -> bool {
        self.in_transaction
    }
}

pub fn row(values: &[(&str, Value)]) -> Row {
    values
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

/// One row of the FK catalog query
pub fn fk(child: &str, column: &str, parent: &str, parent_column: &str) -> Row {
    let (cs, ct) = child.split_once('.').unwrap();
    let (ps, pt) = parent.split_once('.').unwrap();
    row(&[
        ("child_schema", Value::from(cs)),
        ("child_table", Value::from(ct)),
        ("child_column", Value::from(column)),
        ("parent_schema", Value::from(ps)),
        ("parent_table", Value::from(pt)),
        ("parent_column", Value::from(parent_column)),
    ])
}

/// Needle matching the FK catalog query of every platform
pub const FK_QUERY: &str = "parent_column";
