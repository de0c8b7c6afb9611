//! Export and import commands - move entries between a map and a CSV file

use crate::cache::OpenMap;
use crate::cli::args::TransferArgs;
use crate::cli::output;
use crate::config::{Config, ConfigManager};
use crate::error::{CacheError, CacheResult};
use crate::persist::codec::{self, Columns};
use crate::value::{Scalar, Shape, Value, ValueSet};
use std::fs::File;
use std::io::{BufReader, BufWriter};

/// Execute the export command
pub fn export(args: TransferArgs, config: &Config) -> CacheResult<()> {
    match config.map(&args.map)?.shape {
        Shape::Scalar => export_map::<Scalar>(&args, config),
        Shape::Set => export_map::<ValueSet>(&args, config),
    }
}

/// Execute the import command
pub fn import(args: TransferArgs, config: &Config) -> CacheResult<()> {
    match config.map(&args.map)?.shape {
        Shape::Scalar => import_map::<Scalar>(&args, config),
        Shape::Set => import_map::<ValueSet>(&args, config),
    }
}

fn export_map<V: Value>(args: &TransferArgs, config: &Config) -> CacheResult<()> {
    let map = config.map(&args.map)?;
    let opened = OpenMap::<V>::open_local(&args.map, map, &ConfigManager::data_dir(config))?;
    let items = opened.primary_store()?.borrow().items()?;

    let file = File::create(&args.file)
        .map_err(|e| CacheError::io(format!("writing {}", args.file.display()), e))?;
    let columns = Columns {
        key: map.key_column.clone(),
        value: map.value_column.clone(),
    };
    codec::write_rows(BufWriter::new(file), &columns, items.iter().map(|(k, v)| (k, v)))?;

    output::step_ok_detail(
        &format!("Exported {} entries from '{}'", items.len(), args.map),
        &args.file.display().to_string(),
    );
    Ok(())
}

fn import_map<V: Value>(args: &TransferArgs, config: &Config) -> CacheResult<()> {
    let map = config.map(&args.map)?;
    if map.read_only {
        return Err(CacheError::not_writable(&args.map));
    }

    let file = File::open(&args.file)
        .map_err(|e| CacheError::io(format!("reading {}", args.file.display()), e))?;
    let entries = codec::read_rows::<V, _>(BufReader::new(file), &args.file)?;
    let count = entries.len();

    let opened = OpenMap::<V>::open_local(&args.map, map, &ConfigManager::data_dir(config))?;
    opened
        .primary_store()?
        .borrow_mut()
        .extend(entries.into_iter().collect())?;
    opened.finish()?;

    output::step_ok(&format!("Imported {} entries into '{}'", count, args.map));
    Ok(())
}
