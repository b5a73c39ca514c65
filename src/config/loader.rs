//! Reading and writing dump config files.

use super::DumpConfig;
use crate::error::{Error, Result};
use crate::filesystem::Filesystem;
use std::path::{Path, PathBuf};

/// Loads a [`DumpConfig`] and merges its `includes`
pub struct ConfigLoader<'a> {
    fs: &'a dyn Filesystem,
}

impl<'a> ConfigLoader<'a> {
    pub fn new(fs: &'a dyn Filesystem) -> Self {
        Self { fs }
    }

    /// Load a config file. Include paths resolve relative to its directory.
    pub fn load(&self, path: &Path) -> Result<DumpConfig> {
        let mut config = self.parse_file(path)?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        self.resolve_includes(&mut config, base)?;
        tracing::debug!(path = %path.display(), tables = config.tables().len(), "loaded config");
        Ok(config)
    }

    fn parse_file(&self, path: &Path) -> Result<DumpConfig> {
        if !self.fs.exists(path) {
            return Err(Error::ConfigNotFound(path.to_path_buf()));
        }
        let content = self.fs.read(path)?;
        if content.trim().is_empty() {
            return Ok(DumpConfig::default());
        }
        serde_yaml::from_str(&content)
            .map_err(|e| Error::invalid_config(format!("{}: {}", path.display(), e)))
    }

    fn resolve_includes(&self, config: &mut DumpConfig, base: &Path) -> Result<()> {
        for (schema, relative) in config.includes.clone() {
            let include_path = base.join(&relative);
            let included = self.parse_file(&include_path)?;
            let stray: Vec<String> = included
                .schemas()
                .into_iter()
                .filter(|s| s != &schema)
                .collect();
            if !stray.is_empty() {
                tracing::warn!(
                    file = %include_path.display(),
                    schema = %schema,
                    "include also configures schemas {:?}",
                    stray
                );
            }
            config.merge(included);
        }
        for nested in config.connections.values_mut() {
            self.resolve_includes(nested, base)?;
        }
        Ok(())
    }
}

/// Persists a [`DumpConfig`] as one file or as a main file plus one file per schema
pub struct ConfigWriter<'a> {
    fs: &'a dyn Filesystem,
}

impl<'a> ConfigWriter<'a> {
    pub fn new(fs: &'a dyn Filesystem) -> Self {
        Self { fs }
    }

    /// Write `config` to `path`, returning every file written.
    ///
    /// When `split` is set, each schema goes to `<dir>/schemas/<schema>.yaml`
    /// and the main file references them through `includes`.
    pub fn write(&self, path: &Path, config: &DumpConfig, split: bool) -> Result<Vec<PathBuf>> {
        if !split {
            self.fs.write(path, &to_yaml(config)?)?;
            return Ok(vec![path.to_path_buf()]);
        }

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        let mut main = DumpConfig {
            exclude: config.exclude.clone(),
            connections: config.connections.clone(),
            ..DumpConfig::default()
        };
        let mut written = Vec::new();

        for schema in config.schemas() {
            let relative = format!("schemas/{}.yaml", schema);
            let file = base.join(&relative);
            self.fs.write(&file, &to_yaml(&config.only_schema(&schema))?)?;
            main.includes.insert(schema, relative);
            written.push(file);
        }

        self.fs.write(path, &to_yaml(&main)?)?;
        written.insert(0, path.to_path_buf());
        Ok(written)
    }
}

fn to_yaml(config: &DumpConfig) -> Result<String> {
    Ok(serde_yaml::to_string(config)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filesystem::LocalFilesystem;
    use crate::schema::TableKey;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_config_not_found() {
        let dir = TempDir::new().unwrap();
        let fs = LocalFilesystem;
        let err = ConfigLoader::new(&fs)
            .load(&dir.path().join("dump_config.yaml"))
            .unwrap_err();
        assert!(matches!(err, Error::ConfigNotFound(_)));
    }

    #[test]
    fn test_includes_resolve_relative_to_main_file() {
        let dir = TempDir::new().unwrap();
        let fs = LocalFilesystem;
        let main = dir.path().join("dump_config.yaml");
        fs.write(
            &main,
            "full_export:\n  public: [users]\nincludes:\n  billing: schemas/billing.yaml\n",
        )
        .unwrap();
        fs.write(
            &dir.path().join("schemas/billing.yaml"),
            "partial_export:\n  billing:\n    invoices: { limit: 50 }\n",
        )
        .unwrap();

        let config = ConfigLoader::new(&fs).load(&main).unwrap();
        let invoices = config
            .table_config(&TableKey::new("billing", "invoices"))
            .unwrap();
        assert_eq!(invoices.limit, Some(50));
        assert!(config.table_config(&TableKey::new("public", "users")).is_some());
    }

    #[test]
    fn test_missing_include_is_reported() {
        let dir = TempDir::new().unwrap();
        let fs = LocalFilesystem;
        let main = dir.path().join("dump_config.yaml");
        fs.write(&main, "includes:\n  billing: schemas/billing.yaml\n")
            .unwrap();
        let err = ConfigLoader::new(&fs).load(&main).unwrap_err();
        match err {
            Error::ConfigNotFound(path) => assert!(path.ends_with("schemas/billing.yaml")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_split_write_round_trips_through_loader() {
        let dir = TempDir::new().unwrap();
        let fs = LocalFilesystem;
        let main = dir.path().join("dump_config.yaml");
        let mut config = DumpConfig::default();
        config.set_full(&TableKey::new("public", "countries"));
        config.set_full(&TableKey::new("billing", "plans"));
        config.exclude.push("audit".to_string());

        let written = ConfigWriter::new(&fs).write(&main, &config, true).unwrap();
        assert_eq!(written.len(), 3);
        assert!(dir.path().join("schemas/public.yaml").exists());

        let loaded = ConfigLoader::new(&fs).load(&main).unwrap();
        assert_eq!(loaded.tables(), config.tables());
        assert_eq!(loaded.exclude, vec!["audit".to_string()]);
    }
}
