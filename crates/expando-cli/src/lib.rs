pub mod cli;
pub mod commands;
pub mod utils;

use clap::Parser;
use cli::Expando;
use commands::handle_command;
use std::process;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter, e.g. `EXPANDO_LOG=debug`.
pub const LOG_ENV_VAR: &str = "EXPANDO_LOG";

pub fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Run the expando CLI application
pub fn run_main() {
    init_logging();

    let args = Expando::parse();
    if let Err(e) = handle_command(args) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
