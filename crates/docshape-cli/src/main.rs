use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use docshape_cli::{
    cli::{Cli, Commands},
    commands, config,
};

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {:#}", "error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = config::CliConfig::load(cli.config.clone())?;

    // Flags win, then RUST_LOG, then the config file
    let env_filter = match cli.requested_level() {
        Some(level) => EnvFilter::default().add_directive(level.into()),
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
    };
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Translate {
            file,
            renderer,
            compact,
            explain,
        } => commands::translate::execute(&config, file, renderer.map(Into::into), compact, explain),
        Commands::Parse { file } => commands::parse::execute(file),
        Commands::Rules { examples } => commands::rules::execute(&config, examples),
    }
}
