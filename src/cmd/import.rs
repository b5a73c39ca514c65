//! Import command CLI handler.

use super::GlobalArgs;
use dbsnap::environment::Environment;
use dbsnap::filesystem::{Filesystem, LocalFilesystem};
use dbsnap::importer::{DatabaseImporter, ImportOptions, ImportReport};
use dbsnap::writer::DumpLayout;
use serde::Serialize;
use std::time::Instant;

#[derive(Serialize)]
struct ConnectionImport {
    connection: String,
    #[serde(flatten)]
    report: ImportReport,
}

pub fn run(
    global: &GlobalArgs,
    skip_before: bool,
    skip_after: bool,
    schema: Option<String>,
    connection: Option<String>,
    environment: String,
    json: bool,
) -> anyhow::Result<()> {
    let environment = Environment::new(environment);
    if environment.is_production() {
        return Err(dbsnap::Error::ProductionEnvironmentBlocked {
            environment: environment.name().to_string(),
        }
        .into());
    }

    let fs = LocalFilesystem;
    let layout = DumpLayout::new(&global.base_path);
    let mut connections = global.open_connections()?;

    // The default connection owns dumps/<schema>/; named ones their dumps/<name>/ subtree
    let targets: Vec<String> = match &connection {
        Some(name) => vec![name.clone()],
        None => connections
            .names()
            .into_iter()
            .filter(|name| {
                connections.is_default(name) || fs.is_directory(&layout.connection_dir(Some(name)))
            })
            .collect(),
    };

    let options = ImportOptions {
        skip_before,
        skip_after,
        schema,
    };

    let start_time = Instant::now();
    let mut results = Vec::new();
    for name in targets {
        let dir = (!connections.is_default(&name)).then(|| name.clone());
        let conn = connections.get_mut(Some(&name))?;
        let report = DatabaseImporter::new(conn, &fs, layout.clone(), environment.clone())
            .for_connection(dir.as_deref())
            .import(&options)?;
        results.push(ConnectionImport {
            connection: name,
            report,
        });
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        for result in &results {
            eprintln!(
                "{}: {} dump files, {} hook scripts, {} statements",
                result.connection,
                result.report.dump_files.len(),
                result.report.before_scripts.len() + result.report.after_scripts.len(),
                result.report.statements
            );
        }
        eprintln!("Import finished in {:.2?}", start_time.elapsed());
    }
    Ok(())
}
