//! Referentially consistent database snapshots.
//!
//! Exports configured tables of PostgreSQL, MySQL/MariaDB or Oracle databases
//! to per-table SQL dump files in foreign key order, optionally replacing PII
//! with deterministic synthetic values, and imports the dumps back inside a
//! single transaction.

pub mod cascade;
pub mod config;
pub mod connection;
pub mod dumper;
pub mod environment;
pub mod error;
pub mod faker;
pub mod filesystem;
pub mod importer;
pub mod platform;
pub mod schema;
pub mod sql;
pub mod writer;

pub use error::{Error, Result};
