#![allow(clippy::print_stdout)]

mod args;
mod handlers;

use crate::args::{Cli, Commands};
use anyhow::{Context, Result};
use clap::Parser;
use nseries::domain::config::EngineConfig;
use nseries::kernel::config::load_config;
use nseries_logger::Logger;
use tracing::{error, info};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config: EngineConfig =
        load_config(cli.config.as_ref()).context("Failed to load configuration")?;
    let _logger = Logger::from_config(env!("CARGO_BIN_NAME"), &config.logging)?;
    info!(version = env!("CARGO_PKG_VERSION"), command = ?cli.command, "Starting nseries");
    let engine = nseries::init(&config)?;

    let result = run(&engine, cli.command);
    if let Err(e) = &result {
        error!("Command failed: {e:#}");
    }
    result
}

fn run(engine: &handlers::Engine, command: Commands) -> Result<()> {
    match command {
        Commands::Next { target, count, suppress } => {
            handlers::next(engine, &target, count, suppress)?;
        },
        Commands::Batch { target, count, simulate } => {
            handlers::batch(engine, &target, count, simulate)?;
        },
        Commands::Peek { target } => handlers::peek(engine, &target)?,
        Commands::Last { target } => handlers::last(engine, &target)?,
        Commands::Lines { series } => handlers::lines(engine, &series)?,
        Commands::Manual { series, document } => {
            handlers::manual(engine, &series, document.as_deref())?;
        },
        Commands::Related { series } => handlers::related(engine, &series)?,
        Commands::Verify { target, document } => {
            handlers::verify(engine, &target, &document)?;
        },
    }

    Ok(())
}
