//! Shakedown CLI - rebuild, unit-test and smoke-test a build tool

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};
use commands::GlobalFlags;

fn main() {
    match run() {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("error: {:#}", e);
            std::process::exit(1);
        }
    }
}

fn run() -> Result<i32> {
    // Parse CLI
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("shakedown=debug")
    } else {
        EnvFilter::new("shakedown=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let flags = GlobalFlags {
        verbose: cli.verbose,
        quiet: cli.quiet,
        color: cli.color,
    };

    // Execute command
    match cli.command {
        Commands::Run(args) => commands::run::execute(args, &flags),
        Commands::Fixture(args) => commands::fixture::execute(args, &flags),
        Commands::Init(args) => commands::init::execute(args, &flags).map(|()| 0),
        Commands::Completions(args) => commands::completions::execute(args).map(|()| 0),
    }
}
