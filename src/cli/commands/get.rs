//! Get command - resolve keys through a map

use crate::cache::OpenMap;
use crate::cli::args::GetArgs;
use crate::cli::output;
use crate::config::{Config, ConfigManager};
use crate::error::CacheResult;
use crate::value::{Scalar, Shape, Value, ValueSet};
use serde::Serialize;
use tracing::info;

/// Execute the get command
pub fn execute(args: GetArgs, config: &Config) -> CacheResult<()> {
    match config.map(&args.map)?.shape {
        Shape::Scalar => resolve::<Scalar>(&args, config),
        Shape::Set => resolve::<ValueSet>(&args, config),
    }
}

fn resolve<V: Value + Serialize>(args: &GetArgs, config: &Config) -> CacheResult<()> {
    let map = config.map(&args.map)?;
    let data_dir = ConfigManager::data_dir(config);
    let mut opened = if args.offline {
        OpenMap::<V>::open_local(&args.map, map, &data_dir)?
    } else {
        OpenMap::<V>::open(&args.map, map, &config.remote, &data_dir)?
    };

    let mut found = Vec::with_capacity(args.keys.len());
    for key in &args.keys {
        match opened.cache().get(key) {
            Ok(value) => found.push((key.clone(), value)),
            Err(e) if e.is_not_found() => output::step_warn(&e.to_string()),
            Err(e) => return Err(e),
        }
    }
    opened.finish()?;

    info!("Resolved {}/{} key(s) from {}", found.len(), args.keys.len(), args.map);
    super::print_entries(&found, args.format)
}
