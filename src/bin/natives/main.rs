//! webrtc-natives CLI - builds and packages the native webrtc-java libraries

use std::io::IsTerminal;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};
use natives::core::errors::BuildError;
use natives::ops::StageError;
use natives::util::diagnostic::emit;

fn main() {
    let cli = Cli::parse();
    let color = !cli.no_color && std::io::stderr().is_terminal();

    if let Err(e) = run(cli, color) {
        report(&e, color);
        std::process::exit(1);
    }
}

fn run(cli: Cli, color: bool) -> Result<()> {
    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("natives=debug")
    } else {
        EnvFilter::new("natives=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let config = cli.config.as_deref();

    match cli.command {
        Commands::Platform(args) => commands::platform::execute(args, config),
        Commands::Build(args) => commands::build::execute(args, config, color),
        Commands::Stage(args) => commands::stage::execute(args, config),
        Commands::Package(args) => commands::package::execute(args, config),
        Commands::Aggregate(args) => commands::aggregate::execute(args, config),
        Commands::Clean(args) => commands::clean::execute(args, config),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}

fn report(e: &anyhow::Error, color: bool) {
    if let Some(err) = e.downcast_ref::<StageError>() {
        emit(&err.to_diagnostic(), color);
    } else if let Some(err) = e.downcast_ref::<BuildError>() {
        emit(&err.to_diagnostic(), color);
    } else {
        eprintln!("error: {:#}", e);
    }
}
