mod cmd;

use clap::Parser;
use cmd::Cli;
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    let verbose = cli.global.verbose;

    let default_level = if verbose { "dbsnap=debug" } else { "dbsnap=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    if let Err(e) = cmd::run(cli) {
        if verbose {
            eprintln!("{e:?}");
        } else {
            eprintln!("{e}");
        }
        std::process::exit(1);
    }
}
