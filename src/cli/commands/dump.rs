//! Dump command - list a map's local store

use crate::cache::OpenMap;
use crate::cli::args::{DumpArgs, OutputFormat};
use crate::cli::output;
use crate::config::{Config, ConfigManager};
use crate::error::CacheResult;
use crate::value::{Scalar, Shape, Value, ValueSet};
use serde::Serialize;

/// Execute the dump command
pub fn execute(args: DumpArgs, config: &Config) -> CacheResult<()> {
    match config.map(&args.map)?.shape {
        Shape::Scalar => dump::<Scalar>(&args, config),
        Shape::Set => dump::<ValueSet>(&args, config),
    }
}

fn dump<V: Value + Serialize>(args: &DumpArgs, config: &Config) -> CacheResult<()> {
    let map = config.map(&args.map)?;
    let opened = OpenMap::<V>::open_local(&args.map, map, &ConfigManager::data_dir(config))?;
    let items = opened.primary_store()?.borrow().items()?;

    if items.is_empty() {
        match args.format {
            OutputFormat::Json => println!("{{}}"),
            OutputFormat::Plain => {}
            OutputFormat::Table => output::step_info(&format!("Map '{}' is empty", args.map)),
        }
        return Ok(());
    }

    super::print_entries(&items, args.format)
}
