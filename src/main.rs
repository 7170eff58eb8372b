// keygate — Application Entry Point
//
// Loads configuration, initializes structured logging (with a filter that
// never emits secret values), and dispatches to the command handler.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use keygate::cli::{execute, Cli};
use keygate::config::{Config, LogFormat, DEFAULT_LOG_FILTER};

fn main() {
    let config = Config::from_env();

    // RUST_LOG=keygate=debug for verbose output. Logs go to stderr so the
    // status line on stdout stays clean.
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    match config.log_format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }

    let cli = Cli::parse();

    if let Err(e) = execute(cli.command, &config) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
