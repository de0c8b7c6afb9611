//! tiercache - layered key-value caches for slow lookups
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use std::process::ExitCode;
use tiercache::cli::{Cli, Commands};
use tiercache::config::ConfigManager;
use tiercache::error::CacheResult;
use tracing::debug;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

fn run() -> CacheResult<()> {
    let cli = Cli::parse();

    // Completions need neither config nor logging
    if let Commands::Completions(args) = cli.command {
        return tiercache::cli::commands::completions(args);
    }

    let config_manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };
    let config = config_manager.load()?;

    // 0 = warn, 1 = info, 2+ = debug
    let filter = match cli.verbose {
        0 => EnvFilter::new("tiercache=warn"),
        1 => EnvFilter::new("tiercache=info"),
        _ => EnvFilter::new("tiercache=debug"),
    };

    if config.general.log_format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .without_time()
            .init();
    }

    debug!("Using config {}", config_manager.path().display());

    match cli.command {
        Commands::Completions(_) => unreachable!("Completions handled above"),
        Commands::Get(args) => tiercache::cli::commands::get(args, &config),
        Commands::Dump(args) => tiercache::cli::commands::dump(args, &config),
        Commands::Export(args) => tiercache::cli::commands::export(args, &config),
        Commands::Import(args) => tiercache::cli::commands::import(args, &config),
        Commands::Config(args) => tiercache::cli::commands::config(args, &config_manager, &config),
    }
}
