//! Filesystem contract used by the dumper, importer and config loader.

use crate::error::{Error, Result};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

pub trait Filesystem {
    fn exists(&self, path: &Path) -> bool;

    fn read(&self, path: &Path) -> Result<String>;

    /// Create or overwrite a file
    fn write(&self, path: &Path, contents: &str) -> Result<()>;

    /// Append to a file, creating it when missing
    fn append(&self, path: &Path, contents: &str) -> Result<()>;

    /// Files under `dir` matching a glob `pattern` relative to it, sorted
    fn find_files(&self, dir: &Path, pattern: &str) -> Result<Vec<PathBuf>>;

    fn is_directory(&self, path: &Path) -> bool;

    /// Create a directory and all missing parents
    fn create_directory(&self, path: &Path) -> Result<()>;

    fn file_size(&self, path: &Path) -> Result<u64>;
}

/// [`Filesystem`] backed by the local disk
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFilesystem;

impl Filesystem for LocalFilesystem {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn read(&self, path: &Path) -> Result<String> {
        Ok(fs::read_to_string(path)?)
    }

    fn write(&self, path: &Path, contents: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, contents)?;
        Ok(())
    }

    fn append(&self, path: &Path, contents: &str) -> Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        file.write_all(contents.as_bytes())?;
        Ok(())
    }

    fn find_files(&self, dir: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
        let full = Path::new(&glob::Pattern::escape(&dir.to_string_lossy())).join(pattern);
        let pattern_str = full.to_string_lossy();

        let mut files = Vec::new();
        let entries = glob::glob(&pattern_str)
            .map_err(|e| Error::Glob(format!("'{}': {}", pattern_str, e)))?;
        for entry in entries {
            let path = entry.map_err(|e| Error::Io(e.into()))?;
            if path.is_file() {
                files.push(path);
            }
        }

        files.sort();
        Ok(files)
    }

    fn is_directory(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn create_directory(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path)?;
        Ok(())
    }

    fn file_size(&self, path: &Path) -> Result<u64> {
        Ok(fs::metadata(path)?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_then_append() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/out.sql");
        let fs = LocalFilesystem;

        fs.write(&path, "a").unwrap();
        fs.append(&path, "b").unwrap();
        assert_eq!(fs.read(&path).unwrap(), "ab");
        assert_eq!(fs.file_size(&path).unwrap(), 2);
    }

    #[test]
    fn test_find_files_sorted_recursive() {
        let dir = TempDir::new().unwrap();
        let fs = LocalFilesystem;
        fs.write(&dir.path().join("b/2.sql"), "").unwrap();
        fs.write(&dir.path().join("a/1.sql"), "").unwrap();
        fs.write(&dir.path().join("a/notes.txt"), "").unwrap();

        let files = fs.find_files(dir.path(), "**/*.sql").unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a/1.sql", "b/2.sql"]);
    }

    #[test]
    fn test_find_files_under_bracketed_directory() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("backup [2024] *");
        let fs = LocalFilesystem;
        fs.write(&base.join("public/users.sql"), "").unwrap();

        let files = fs.find_files(&base, "*/*.sql").unwrap();
        assert_eq!(files, vec![base.join("public/users.sql")]);
    }
}
