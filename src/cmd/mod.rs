mod export;
mod generate;
mod import;

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use dbsnap::config::{ConfigLoader, DumpConfig, GenerateMode, DEFAULT_CONFIG_PATH};
use dbsnap::connection::driver::{redact, SqlxConnection};
use dbsnap::connection::Connections;
use dbsnap::filesystem::Filesystem;
use std::io;
use std::path::PathBuf;

/// Name of the connection given by `--database-url`
pub const DEFAULT_CONNECTION: &str = "default";

#[derive(Parser)]
#[command(name = "dbsnap")]
#[command(version)]
#[command(
    about = "Export FK-consistent, depersonalized database snapshots to SQL dumps and import them back",
    long_about = None
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args)]
pub struct GlobalArgs {
    /// Dump config file (default: <base-path>/database/dump_config.yaml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Project directory holding the database/ tree
    #[arg(long, global = true, default_value = ".")]
    pub base_path: PathBuf,

    /// URL of the default connection (postgres://, mysql://, mariadb://)
    #[arg(long, global = true, env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: Option<String>,

    /// Additional named connection as name=url (repeatable)
    #[arg(long = "connection-url", global = true, value_parser = parse_named_url)]
    pub connection_urls: Vec<(String, String)>,

    /// Verbose output: debug logging and full error chains
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Export configured tables to database/dumps
    Export {
        /// Table to export as schema.table, or "all"
        #[arg(default_value = "all")]
        target: String,

        /// Only export tables of this schema
        #[arg(long)]
        schema: Option<String>,

        /// Only export tables of this connection
        #[arg(long)]
        connection: Option<String>,

        /// Abort on the first failing table
        #[arg(long)]
        stop_on_error: bool,

        /// Rows per INSERT statement
        #[arg(long, default_value_t = dbsnap::sql::DEFAULT_BATCH_SIZE)]
        batch_size: usize,

        /// Show a progress bar
        #[arg(short, long)]
        progress: bool,

        /// Output results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Import database/dumps into the target database in one transaction
    Import {
        /// Do not run database/before_exec/[connection/]*.sql
        #[arg(long)]
        skip_before: bool,

        /// Do not run database/after_exec/[connection/]*.sql
        #[arg(long)]
        skip_after: bool,

        /// Only import dumps of this schema
        #[arg(long)]
        schema: Option<String>,

        /// Only import dumps of this connection
        #[arg(long)]
        connection: Option<String>,

        /// Environment name; production environments refuse imports
        #[arg(long = "env", env = "APP_ENV", default_value = "local")]
        environment: String,

        /// Output results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Generate or extend the dump config from the live schema
    GenerateConfig {
        /// all, new, schema=<name> or table=<schema.table>
        #[arg(default_value = "all")]
        mode: GenerateMode,

        /// Tables with more rows become partial exports limited to this
        #[arg(long, default_value_t = dbsnap::config::generator::DEFAULT_THRESHOLD)]
        threshold: u64,

        /// Re-evaluate tables already present in the config
        #[arg(long)]
        force: bool,

        /// Do not add cascade_from rules
        #[arg(long)]
        no_cascade: bool,

        /// Do not detect PII columns
        #[arg(long)]
        no_faker: bool,

        /// Write a single file instead of one file per schema
        #[arg(long)]
        no_split: bool,

        /// Connection to inspect
        #[arg(long)]
        connection: Option<String>,

        /// Output results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

pub fn run(cli: Cli) -> anyhow::Result<()> {
    let global = cli.global;
    match cli.command {
        Commands::Export {
            target,
            schema,
            connection,
            stop_on_error,
            batch_size,
            progress,
            json,
        } => export::run(
            &global,
            target,
            schema,
            connection,
            stop_on_error,
            batch_size,
            progress,
            json,
        ),
        Commands::Import {
            skip_before,
            skip_after,
            schema,
            connection,
            environment,
            json,
        } => import::run(
            &global,
            skip_before,
            skip_after,
            schema,
            connection,
            environment,
            json,
        ),
        Commands::GenerateConfig {
            mode,
            threshold,
            force,
            no_cascade,
            no_faker,
            no_split,
            connection,
            json,
        } => generate::run(
            &global,
            mode,
            threshold,
            force,
            no_cascade,
            no_faker,
            no_split,
            connection,
            json,
        ),
        Commands::Completions { shell } => {
            generate(shell, &mut Cli::command(), "dbsnap", &mut io::stdout());
            Ok(())
        }
    }
}

impl GlobalArgs {
    pub fn config_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(|| self.base_path.join(DEFAULT_CONFIG_PATH))
    }

    pub fn load_config(&self, fs: &dyn Filesystem) -> anyhow::Result<DumpConfig> {
        Ok(ConfigLoader::new(fs).load(&self.config_path())?)
    }

    /// Open the default connection and every `--connection-url`
    pub fn open_connections(&self) -> anyhow::Result<Connections> {
        let url = self.database_url.as_deref().ok_or_else(|| {
            anyhow::anyhow!("no database URL: pass --database-url or set DATABASE_URL")
        })?;
        tracing::debug!(url = %redact(url), "connecting");
        let mut connections = Connections::new(DEFAULT_CONNECTION, Box::new(SqlxConnection::open(url)?));

        for (name, url) in &self.connection_urls {
            tracing::debug!(connection = %name, url = %redact(url), "connecting");
            connections.add(name.clone(), Box::new(SqlxConnection::open(url)?));
        }
        Ok(connections)
    }
}

fn parse_named_url(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((name, url)) if !name.trim().is_empty() && !url.trim().is_empty() => {
            Ok((name.trim().to_string(), url.trim().to_string()))
        }
        _ => Err(format!("expected name=url, got '{}'", s)),
    }
}
