//! Dump file layout and chunked writing.

use crate::error::Result;
use crate::filesystem::Filesystem;
use crate::schema::TableKey;
use std::path::{Path, PathBuf};

pub const DATABASE_DIR: &str = "database";
pub const DUMPS_DIR: &str = "dumps";
pub const BEFORE_EXEC_DIR: &str = "before_exec";
pub const AFTER_EXEC_DIR: &str = "after_exec";

/// Where dumps and hook scripts live under a project base path:
/// `database/dumps/[connection/]schema/table.sql`,
/// `database/before_exec/[connection/]*.sql`,
/// `database/after_exec/[connection/]*.sql`
#[derive(Debug, Clone)]
pub struct DumpLayout {
    database_dir: PathBuf,
}

impl DumpLayout {
    pub fn new(base_path: &Path) -> Self {
        Self {
            database_dir: base_path.join(DATABASE_DIR),
        }
    }

    pub fn database_dir(&self) -> &Path {
        &self.database_dir
    }

    pub fn dumps_dir(&self) -> PathBuf {
        self.database_dir.join(DUMPS_DIR)
    }

    /// Hook scripts run before the dumps of a connection
    pub fn before_exec_dir(&self, connection: Option<&str>) -> PathBuf {
        hook_dir(self.database_dir.join(BEFORE_EXEC_DIR), connection)
    }

    pub fn after_exec_dir(&self, connection: Option<&str>) -> PathBuf {
        hook_dir(self.database_dir.join(AFTER_EXEC_DIR), connection)
    }

    /// Dump root of a connection; the default connection has no subdirectory
    pub fn connection_dir(&self, connection: Option<&str>) -> PathBuf {
        match connection {
            Some(name) => self.dumps_dir().join(name),
            None => self.dumps_dir(),
        }
    }

    pub fn dump_path(&self, connection: Option<&str>, key: &TableKey) -> PathBuf {
        self.connection_dir(connection)
            .join(&key.schema)
            .join(format!("{}.sql", key.table))
    }
}

fn hook_dir(root: PathBuf, connection: Option<&str>) -> PathBuf {
    match connection {
        Some(name) => root.join(name),
        None => root,
    }
}

/// Bytes and chunks written for one dump file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteStats {
    pub chunks: usize,
    pub bytes: u64,
}

/// Streams SQL chunks to a file: the first chunk is written, the rest appended
pub struct DumpWriter<'a> {
    fs: &'a dyn Filesystem,
}

impl<'a> DumpWriter<'a> {
    pub fn new(fs: &'a dyn Filesystem) -> Self {
        Self { fs }
    }

    pub fn write_chunks<I>(&self, path: &Path, chunks: I) -> Result<WriteStats>
    where
        I: IntoIterator<Item = String>,
    {
        let mut stats = WriteStats::default();
        for chunk in chunks {
            if stats.chunks == 0 {
                self.fs.write(path, &chunk)?;
            } else {
                self.fs.append(path, &chunk)?;
            }
            stats.chunks += 1;
            stats.bytes += chunk.len() as u64;
        }

        if stats.chunks == 0 {
            self.fs.write(path, "")?;
        }
        Ok(stats)
    }
}
