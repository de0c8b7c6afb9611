//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use std::path::PathBuf;

/// tiercache - layered key-value caches for slow lookups
///
/// Resolves keys through memory, local SQLite tables and CSV files, and
/// finally rate-limited remote sources, remembering every answer.
#[derive(Parser, Debug)]
#[command(name = "tiercache")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "TIERCACHE_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve keys through a map's layers
    Get(GetArgs),

    /// Print every entry of a map's local store
    Dump(DumpArgs),

    /// Write a map's local store to a CSV file
    Export(TransferArgs),

    /// Load a CSV file into a map's local store
    Import(TransferArgs),

    /// Show or edit configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Arguments for the get command
#[derive(Parser, Debug)]
pub struct GetArgs {
    /// Map name from the configuration
    pub map: String,

    /// Keys to resolve
    #[arg(required = true)]
    pub keys: Vec<String>,

    /// Only consult local layers (no network)
    #[arg(long)]
    pub offline: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "plain")]
    pub format: OutputFormat,
}

/// Arguments for the dump command
#[derive(Parser, Debug)]
pub struct DumpArgs {
    /// Map name from the configuration
    pub map: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

/// Arguments for the export and import commands
#[derive(Parser, Debug)]
pub struct TransferArgs {
    /// Map name from the configuration
    pub map: String,

    /// CSV file to write or read
    pub file: PathBuf,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Write an example configuration file
    Init {
        /// Overwrite existing config
        #[arg(short, long)]
        force: bool,
    },
}

/// Arguments for the completions command
#[derive(Parser, Debug)]
pub struct CompletionsArgs {
    /// Target shell
    #[arg(value_enum)]
    pub shell: Shell,
}

/// Output format for get and dump
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON output
    Json,
    /// Tab-separated key and value, one per line
    Plain,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn get_needs_a_key() {
        assert!(Cli::try_parse_from(["tiercache", "get", "gi2kegg"]).is_err());
        let cli = Cli::try_parse_from(["tiercache", "get", "gi2kegg", "16130957", "-f", "json"]).unwrap();
        match cli.command {
            Commands::Get(args) => {
                assert_eq!(args.keys, vec!["16130957".to_string()]);
                assert!(matches!(args.format, OutputFormat::Json));
                assert!(!args.offline);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn verbosity_counts() {
        let cli = Cli::try_parse_from(["tiercache", "-vv", "config", "path"]).unwrap();
        assert_eq!(cli.verbose, 2);
    }
}
