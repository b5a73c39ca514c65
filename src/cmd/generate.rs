//! Generate-config command CLI handler.

use super::GlobalArgs;
use dbsnap::config::{ConfigGenerator, ConfigWriter, DumpConfig, GenerateMode, GenerateOptions};
use dbsnap::error::Error;
use dbsnap::filesystem::LocalFilesystem;
use dbsnap::platform;

#[allow(clippy::too_many_arguments)]
pub fn run(
    global: &GlobalArgs,
    mode: GenerateMode,
    threshold: u64,
    force: bool,
    no_cascade: bool,
    no_faker: bool,
    no_split: bool,
    connection: Option<String>,
    json: bool,
) -> anyhow::Result<()> {
    let fs = LocalFilesystem;
    let config_path = global.config_path();

    let existing = match global.load_config(&fs) {
        Ok(config) => config,
        Err(e) if matches!(e.downcast_ref::<Error>(), Some(Error::ConfigNotFound(_))) => {
            tracing::info!("no config at {}, starting fresh", config_path.display());
            DumpConfig::default()
        }
        Err(e) => return Err(e),
    };

    let mut connections = global.open_connections()?;
    let named = connection
        .as_deref()
        .filter(|name| !connections.is_default(name))
        .map(str::to_string);
    let conn = connections.get_mut(connection.as_deref())?;
    let platform = platform::create(conn.platform_name())?;

    let options = GenerateOptions {
        threshold,
        force,
        no_cascade,
        no_faker,
    };

    // A named connection's tables live in its nested section
    let (config, report) = match &named {
        Some(name) => {
            let mut root = existing;
            let section = root.connections.remove(name).unwrap_or_default();
            let (section, report) =
                ConfigGenerator::generate(conn, platform.as_ref(), section, &mode, &options)?;
            root.connections.insert(name.clone(), section);
            (root, report)
        }
        None => ConfigGenerator::generate(conn, platform.as_ref(), existing, &mode, &options)?,
    };

    let written = ConfigWriter::new(&fs).write(&config_path, &config, !no_split)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        eprintln!(
            "{} full, {} partial, {} kept, {} excluded; {} cascade rules, {} faked columns",
            report.full.len(),
            report.partial.len(),
            report.kept.len(),
            report.excluded.len(),
            report.cascade_rules,
            report.faked_columns
        );
        for path in written {
            eprintln!("  wrote {}", path.display());
        }
    }
    Ok(())
}
