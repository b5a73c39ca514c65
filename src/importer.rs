//! Import orchestration.
//!
//! One import runs in a single transaction: platform prologue, the
//! `before_exec` hooks, every dump file parents first, the `after_exec`
//! hooks, then the platform epilogue and commit. The epilogue also runs when
//! anything fails, before the rollback.
//!
//! A named connection reads its dumps from `dumps/<name>/` and its hooks from
//! `before_exec/<name>/` and `after_exec/<name>/`. The default connection only
//! runs the top-level hook scripts.

use crate::connection::Connection;
use crate::environment::Environment;
use crate::error::{Error, Result};
use crate::filesystem::Filesystem;
use crate::platform::{self, Platform};
use crate::schema::{DependencyGraph, TableKey};
use crate::sql::StatementSplitter;
use crate::writer::DumpLayout;
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    pub skip_before: bool,
    pub skip_after: bool,
    /// Only import dumps of this schema
    pub schema: Option<String>,
}

/// What an import executed
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportReport {
    pub before_scripts: Vec<PathBuf>,
    pub dump_files: Vec<PathBuf>,
    pub after_scripts: Vec<PathBuf>,
    pub statements: usize,
}

pub struct DatabaseImporter<'a> {
    connection: &'a mut dyn Connection,
    fs: &'a dyn Filesystem,
    layout: DumpLayout,
    environment: Environment,
    /// Named connection subtree under `dumps/`, None for the default connection
    connection_dir: Option<String>,
}

impl<'a> DatabaseImporter<'a> {
    pub fn new(
        connection: &'a mut dyn Connection,
        fs: &'a dyn Filesystem,
        layout: DumpLayout,
        environment: Environment,
    ) -> Self {
        Self {
            connection,
            fs,
            layout,
            environment,
            connection_dir: None,
        }
    }

    /// Import from `dumps/<name>/` with the hooks of `<name>` instead of the
    /// default connection's tree
    pub fn for_connection(mut self, name: Option<&str>) -> Self {
        self.connection_dir = name.map(str::to_string);
        self
    }

    pub fn import(&mut self, options: &ImportOptions) -> Result<ImportReport> {
        if self.environment.is_production() {
            return Err(Error::ProductionEnvironmentBlocked {
                environment: self.environment.name().to_string(),
            });
        }

        let dumps_dir = self.layout.connection_dir(self.connection_dir.as_deref());
        if !self.fs.is_directory(&dumps_dir) {
            return Err(Error::MissingDumpsDirectory(dumps_dir));
        }
        let dump_files = self.dump_files(&dumps_dir, options.schema.as_deref())?;
        if dump_files.is_empty() {
            return Err(Error::EmptyDumpsDirectory(dumps_dir));
        }

        let platform = platform::create(self.connection.platform_name())?;
        let dump_files = self.order_dump_files(platform.as_ref(), dump_files);

        let before_scripts = if options.skip_before {
            Vec::new()
        } else {
            self.hook_scripts(&self.layout.before_exec_dir(self.connection_dir.as_deref()))?
        };
        let after_scripts = if options.skip_after {
            Vec::new()
        } else {
            self.hook_scripts(&self.layout.after_exec_dir(self.connection_dir.as_deref()))?
        };

        let mut report = ImportReport {
            before_scripts,
            dump_files,
            after_scripts,
            statements: 0,
        };

        tracing::info!(
            environment = %self.environment,
            files = report.dump_files.len(),
            "importing dumps from {}",
            dumps_dir.display()
        );

        self.connection.begin()?;
        let outcome = self.run(platform.as_ref(), &mut report);
        let epilogue = match platform.import_epilogue() {
            Some(sql) => self.connection.execute(sql).map(|_| ()),
            None => Ok(()),
        };

        match (outcome, epilogue) {
            (Ok(()), Ok(())) => {
                self.connection.commit()?;
                tracing::info!(statements = report.statements, "import committed");
                Ok(report)
            }
            (Ok(()), Err(e)) => {
                self.rollback();
                Err(e)
            }
            (Err(e), epilogue) => {
                if let Err(epilogue_err) = epilogue {
                    tracing::warn!("import epilogue failed: {}", epilogue_err);
                }
                self.rollback();
                Err(e)
            }
        }
    }

    fn run(&mut self, platform: &dyn Platform, report: &mut ImportReport) -> Result<()> {
        if let Some(prologue) = platform.import_prologue() {
            self.connection.execute(prologue)?;
        }

        let splitter = StatementSplitter::for_platform(platform.kind());
        let scripts = report
            .before_scripts
            .iter()
            .chain(&report.dump_files)
            .chain(&report.after_scripts)
            .cloned()
            .collect::<Vec<_>>();

        let total = scripts.len();
        for (i, path) in scripts.iter().enumerate() {
            tracing::info!("[{}/{}] {}", i + 1, total, path.display());
            report.statements += self
                .execute_file(&splitter, path)
                .map_err(|e| Error::import_failed(path, e))?;
        }
        Ok(())
    }

    fn execute_file(&mut self, splitter: &StatementSplitter, path: &Path) -> Result<usize> {
        let sql = self.fs.read(path)?;
        let statements = splitter.split(&sql);
        for statement in &statements {
            self.connection.execute(statement)?;
        }
        Ok(statements.len())
    }

    fn rollback(&mut self) {
        if let Err(e) = self.connection.rollback() {
            tracing::error!("rollback failed: {}", e);
        } else {
            tracing::warn!("import rolled back");
        }
    }

    /// `schema/table.sql` files of the dump tree, alphabetical
    fn dump_files(&self, dumps_dir: &Path, schema: Option<&str>) -> Result<Vec<PathBuf>> {
        let pattern = match schema {
            Some(schema) => format!("{}/*.sql", glob::Pattern::escape(schema)),
            None => "*/*.sql".to_string(),
        };
        self.fs.find_files(dumps_dir, &pattern)
    }

    fn hook_scripts(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        if self.fs.is_directory(dir) {
            self.fs.find_files(dir, "*.sql")
        } else {
            Ok(Vec::new())
        }
    }

    /// Reorder dump files parents first; alphabetical order when the FK graph
    /// is unavailable or cyclic
    fn order_dump_files(&mut self, platform: &dyn Platform, files: Vec<PathBuf>) -> Vec<PathBuf> {
        let keyed: Vec<(TableKey, PathBuf)> = files
            .into_iter()
            .filter_map(|path| dump_key(&path).map(|key| (key, path)))
            .collect();
        let keys: Vec<TableKey> = keyed.iter().map(|(k, _)| k.clone()).collect();

        let sorted = DependencyGraph::build(self.connection, platform)
            .and_then(|graph| graph.sort_for_import(&keys));
        let sorted = match sorted {
            Ok(sorted) => sorted,
            Err(e) => {
                tracing::warn!("{}; importing in alphabetical order", e);
                keys
            }
        };

        let mut by_key: std::collections::HashMap<TableKey, PathBuf> = keyed.into_iter().collect();
        sorted.iter().filter_map(|key| by_key.remove(key)).collect()
    }
}

/// `dumps/<schema>/<table>.sql` → `schema.table`
fn dump_key(path: &Path) -> Option<TableKey> {
    let table = path.file_stem()?.to_str()?;
    let schema = path.parent()?.file_name()?.to_str()?;
    Some(TableKey::new(schema, table))
}
