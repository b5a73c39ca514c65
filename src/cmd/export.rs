//! Export command CLI handler.

use super::GlobalArgs;
use dbsnap::dumper::{DatabaseDumper, ExportReport};
use dbsnap::filesystem::LocalFilesystem;
use dbsnap::schema::TableKey;
use dbsnap::writer::DumpLayout;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Instant;

#[allow(clippy::too_many_arguments)]
pub fn run(
    global: &GlobalArgs,
    target: String,
    schema: Option<String>,
    connection: Option<String>,
    stop_on_error: bool,
    batch_size: usize,
    progress: bool,
    json: bool,
) -> anyhow::Result<()> {
    let fs = LocalFilesystem;
    let config = global.load_config(&fs)?;
    let mut connections = global.open_connections()?;

    let mut dumper = DatabaseDumper::new(
        &mut connections,
        &config,
        &fs,
        DumpLayout::new(&global.base_path),
    )
    .with_batch_size(batch_size);

    let tables = if target == "all" {
        dumper.tables_to_export(schema.as_deref(), connection.as_deref())
    } else {
        let key: TableKey = target.parse().map_err(|e: String| anyhow::anyhow!(e))?;
        vec![dumper.find_table(&key, connection.as_deref())?]
    };

    if tables.is_empty() {
        anyhow::bail!("no tables configured for export in {}", global.config_path().display());
    }

    let pb = if progress && !json {
        let pb = ProgressBar::new(tables.len() as u64);
        pb.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
            )
            .unwrap()
            .progress_chars("█▓▒░  ")
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
        );
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        Some(pb)
    } else {
        None
    };

    if let Some(pb) = &pb {
        let pb = pb.clone();
        dumper = dumper.on_progress(Box::new(move |i, _total, key| {
            pb.set_position(i.saturating_sub(1) as u64);
            pb.set_message(key.to_string());
        }));
    }

    let start_time = Instant::now();
    let report = dumper.export_all(tables, stop_on_error)?;

    if let Some(pb) = pb {
        pb.set_position(pb.length().unwrap_or(0));
        pb.finish_with_message("done");
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report, start_time.elapsed());
    }

    if !report.is_success() {
        anyhow::bail!("{} table(s) failed to export", report.failures.len());
    }
    Ok(())
}

fn print_summary(report: &ExportReport, elapsed: std::time::Duration) {
    for table in &report.tables {
        eprintln!(
            "  {:<40} {:>8} rows  {:>10} bytes{}",
            table.table,
            table.rows,
            table.bytes,
            if table.faked { "  (faked)" } else { "" }
        );
    }
    for failure in &report.failures {
        eprintln!("  {:<40} FAILED: {}", failure.table, failure.error);
    }
    eprintln!();
    eprintln!(
        "Exported {} tables ({} rows) in {:.2?}",
        report.tables.len(),
        report.total_rows(),
        elapsed
    );
}
