//! Error types for dump and import operations.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while exporting or importing dumps
#[derive(Debug, Error)]
pub enum Error {
    #[error("config file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("export of {table} failed: {source}")]
    ExportFailed {
        table: String,
        #[source]
        source: Box<Error>,
    },

    #[error("import of {} failed: {source}", .file.display())]
    ImportFailed {
        file: PathBuf,
        #[source]
        source: Box<Error>,
    },

    #[error("dumps directory not found: {}", .0.display())]
    MissingDumpsDirectory(PathBuf),

    #[error("dumps directory contains no .sql files: {}", .0.display())]
    EmptyDumpsDirectory(PathBuf),

    #[error("import refused: environment '{environment}' is classified as production")]
    ProductionEnvironmentBlocked { environment: String },

    #[error("dependency cycle detected: {}", format_cycles(.cycles))]
    DependencyCycle { cycles: Vec<Vec<String>> },

    #[error("unsupported platform: {0}")]
    UnsupportedPlatform(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("SQL error: {0}")]
    Sql(#[from] sqlx::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid glob pattern: {0}")]
    Glob(String),
}

impl Error {
    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    pub fn export_failed(table: impl Into<String>, source: Error) -> Self {
        Self::ExportFailed {
            table: table.into(),
            source: Box::new(source),
        }
    }

    pub fn import_failed(file: impl Into<PathBuf>, source: Error) -> Self {
        Self::ImportFailed {
            file: file.into(),
            source: Box::new(source),
        }
    }

    /// True for the recoverable cycle error raised by the topological sorter
    pub fn is_dependency_cycle(&self) -> bool {
        matches!(self, Error::DependencyCycle { .. })
    }
}

fn format_cycles(cycles: &[Vec<String>]) -> String {
    cycles
        .iter()
        .map(|cycle| {
            let mut path = cycle.clone();
            if let Some(first) = cycle.first() {
                path.push(first.clone());
            }
            path.join(" -> ")
        })
        .collect::<Vec<_>>()
        .join("; ")
}

pub type Result<T> = std::result::Result<T, Error>;
