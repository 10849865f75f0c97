use clap::Parser;
use klip::cli::{Commands, Klip};
use klip::commands::handle_command;
use klip::config::LOG_ENV;
use std::process;
use tracing_subscriber::EnvFilter;

fn main() {
    let args = Klip::parse();

    let default_level = match args.commands {
        Some(Commands::Listen) => "info",
        _ => "warn",
    };
    init_logging(default_level);

    if let Err(e) = handle_command(args.commands) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn init_logging(default_level: &str) {
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
