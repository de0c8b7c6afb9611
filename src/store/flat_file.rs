//! CSV side-file store
//!
//! Rows are read once when the store is opened and written back in one go on
//! `save()`. Between the two, every mutation only touches memory.

use crate::error::{CacheError, CacheResult};
use crate::persist::codec::{self, Columns};
use crate::persist::PersistOptions;
use crate::store::Store;
use crate::value::Value;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Store whose rows live in a CSV file between runs
#[derive(Debug)]
pub struct FlatFileStore<V> {
    name: String,
    path: Option<PathBuf>,
    columns: Columns,
    entries: BTreeMap<String, V>,
    writable: bool,
    dirty: bool,
}

impl<V: Value> FlatFileStore<V> {
    /// Open a store, naming the side-file after this store type when no path is given
    pub fn open(options: PersistOptions) -> CacheResult<Self> {
        Self::open_for::<Self>(options)
    }

    /// Open a store whose default side-file is named after the owner type `T`
    pub fn open_for<T: ?Sized>(options: PersistOptions) -> CacheResult<Self> {
        let path = options.resolve::<T>();
        let name = match &path {
            Some(path) => format!("csv:{}", path.display()),
            None => "csv:<memory>".to_string(),
        };

        let mut store = Self {
            name,
            path,
            columns: Columns::default(),
            entries: BTreeMap::new(),
            writable: true,
            dirty: false,
        };
        if store.path.is_some() {
            store.reload()?;
        }
        Ok(store)
    }

    /// Use custom header names (only affects what `save` writes)
    pub fn with_columns(mut self, columns: Columns) -> Self {
        self.columns = columns;
        self
    }

    /// Refuse all later writes
    pub fn read_only(mut self) -> Self {
        self.writable = false;
        self
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Whether there are mutations not yet saved
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Replace the in-memory rows with the file's contents
    ///
    /// A missing file means an empty store. A file that exists but cannot be
    /// parsed is `StoreCorrupt`.
    pub fn reload(&mut self) -> CacheResult<()> {
        let path = self.persisted_path()?.to_path_buf();

        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No side-file at {}, starting empty", path.display());
                self.entries.clear();
                self.dirty = false;
                return Ok(());
            }
            Err(e) => {
                return Err(CacheError::io(format!("opening {}", path.display()), e));
            }
        };

        self.entries = codec::read_rows(BufReader::new(file), &path)?;
        self.dirty = false;
        debug!("Loaded {} entries from {}", self.entries.len(), path.display());
        Ok(())
    }

    /// Save and release the store
    pub fn close(mut self) -> CacheResult<()> {
        if self.path.is_some() {
            self.save()?;
        }
        Ok(())
    }

    fn persisted_path(&self) -> CacheResult<&Path> {
        self.path
            .as_deref()
            .ok_or_else(|| CacheError::CacheNotUsed(self.name.clone()))
    }
}

impl<V: Value> Store<V> for FlatFileStore<V> {
    fn name(&self) -> &str {
        &self.name
    }

    fn writable(&self) -> bool {
        self.writable
    }

    fn get(&self, key: &str) -> CacheResult<V> {
        self.entries
            .get(key)
            .cloned()
            .ok_or_else(|| CacheError::not_found(key, format!("absent from {}", self.name)))
    }

    fn put(&mut self, key: &str, value: &V) -> CacheResult<()> {
        if !self.writable {
            return Err(CacheError::not_writable(&self.name));
        }
        let existing = self.entries.remove(key);
        let merged = V::merge(existing, value.clone().normalized());
        self.entries.insert(key.to_string(), merged);
        self.dirty = true;
        Ok(())
    }

    fn delete(&mut self, key: &str) -> CacheResult<()> {
        if !self.writable {
            return Err(CacheError::not_writable(&self.name));
        }
        match self.entries.remove(key) {
            Some(_) => {
                self.dirty = true;
                Ok(())
            }
            None => Err(CacheError::not_found(
                key,
                format!("absent from {}", self.name),
            )),
        }
    }

    fn keys(&self) -> CacheResult<Vec<String>> {
        Ok(self.entries.keys().cloned().collect())
    }

    fn items(&self) -> CacheResult<Vec<(String, V)>> {
        Ok(self
            .entries
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect())
    }

    fn has_unsaved_changes(&self) -> bool {
        self.dirty && self.path.is_some()
    }

    fn save(&mut self) -> CacheResult<()> {
        let path = self.persisted_path()?.to_path_buf();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                CacheError::io(format!("creating directory {}", parent.display()), e)
            })?;
        }

        // Stage in a sibling file, then rename over the target
        let staging = staging_path(&path);
        let file = File::create(&staging)
            .map_err(|e| CacheError::io(format!("writing {}", staging.display()), e))?;
        if let Err(e) = codec::write_rows(BufWriter::new(file), &self.columns, self.entries.iter()) {
            let _ = std::fs::remove_file(&staging);
            return Err(e);
        }
        std::fs::rename(&staging, &path).map_err(|e| {
            CacheError::io(
                format!("replacing {} with {}", path.display(), staging.display()),
                e,
            )
        })?;
        self.dirty = false;

        info!("Saved {} entries to {}", self.entries.len(), path.display());
        Ok(())
    }
}

fn staging_path(path: &Path) -> PathBuf {
    let mut staging = path.as_os_str().to_owned();
    staging.push(".tmp");
    PathBuf::from(staging)
}
