//! CLI command implementations

pub mod completions;
pub mod config;
pub mod dump;
pub mod get;
pub mod transfer;

pub use completions::execute as completions;
pub use config::execute as config;
pub use dump::execute as dump;
pub use get::execute as get;
pub use transfer::{export, import};

use crate::cli::args::OutputFormat;
use crate::error::CacheResult;
use crate::value::Value;
use console::style;
use serde::Serialize;
use std::collections::BTreeMap;

/// Print resolved entries in the requested format
fn print_entries<V: Value + Serialize>(entries: &[(String, V)], format: OutputFormat) -> CacheResult<()> {
    match format {
        OutputFormat::Table => {
            println!("{:<32} {}", style("KEY").bold(), style("VALUE").bold());
            println!("{}", "-".repeat(64));
            for (key, value) in entries {
                println!("{:<32} {}", key, value.render());
            }
            println!();
            println!("{} entr{}", entries.len(), if entries.len() == 1 { "y" } else { "ies" });
        }
        OutputFormat::Json => {
            let object: BTreeMap<&str, &V> = entries.iter().map(|(k, v)| (k.as_str(), v)).collect();
            println!("{}", serde_json::to_string_pretty(&object)?);
        }
        OutputFormat::Plain => {
            for (key, value) in entries {
                println!("{}\t{}", key, value.render());
            }
        }
    }
    Ok(())
}
