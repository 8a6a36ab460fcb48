mod bazel;
mod cli;
mod commands;
mod config;
mod error;
mod message;
mod oauth;
mod slack;
mod ui;
mod workspace;

use clap::Parser;
use cli::{Cli, Command};
use std::process;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match config::read_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Cannot read config: {}", e);
            process::exit(1);
        }
    };

    let result = match cli.command {
        Command::Support => commands::support::run(&config, tokio::signal::ctrl_c()).await,
    };

    if let Err(e) = result {
        eprintln!("{}", ui::warn_line("Error:", &e.to_string()));
        process::exit(1);
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        _ => LevelFilter::DEBUG,
    };
    let env_filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}
