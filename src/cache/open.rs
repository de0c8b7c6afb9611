//! Build a layered cache from a `[maps.<name>]` section

use crate::cache::layer::Layer;
use crate::cache::layered::LayeredCache;
use crate::config::{MapConfig, RemoteConfig};
use crate::error::{CacheError, CacheResult};
use crate::persist::{PersistOptions, SaveGuard};
use crate::remote::{HttpSource, RemoteAdapter, RetryPolicy, Source};
use crate::store::{FlatFileStore, SharedStore, SqliteStore};
use crate::value::Value;
use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;
use tracing::debug;

/// An opened map: its cache, its local stores, and the guards that flush them
pub struct OpenMap<V: Value> {
    name: String,
    cache: LayeredCache<V>,
    stores: Vec<SharedStore<V>>,
    guards: Vec<SaveGuard<V>>,
}

impl<V: Value> OpenMap<V> {
    /// Open every layer a map declares, remote source included
    pub fn open(
        name: &str,
        map: &MapConfig,
        remote: &RemoteConfig,
        data_dir: &Path,
    ) -> CacheResult<Self> {
        let source = match &map.http {
            Some(http) => Some(HttpSource::new(
                name,
                http.clone(),
                remote.contact.as_deref(),
                remote.timeout(),
            )?),
            None => None,
        };
        Self::open_with(name, map, remote, data_dir, source)
    }

    /// Open only the local layers (no remote source, no network)
    pub fn open_local(name: &str, map: &MapConfig, data_dir: &Path) -> CacheResult<Self> {
        Self::open_with::<HttpSource>(name, map, &RemoteConfig::default(), data_dir, None)
    }

    /// Open the local layers and put `source` behind them
    pub fn open_with<S: Source<V> + 'static>(
        name: &str,
        map: &MapConfig,
        remote: &RemoteConfig,
        data_dir: &Path,
        source: Option<S>,
    ) -> CacheResult<Self> {
        if map.shape != V::SHAPE {
            return Err(CacheError::User(format!(
                "map '{}' holds {} values, not {}",
                name,
                map.shape,
                V::SHAPE
            )));
        }

        let mut layers = Vec::new();
        let mut stores: Vec<SharedStore<V>> = Vec::new();
        let mut guards = Vec::new();

        if let Some(path) = map.database_path(data_dir) {
            let mut store = SqliteStore::<V>::open(&path, map.table_spec(name))?;
            if map.read_only {
                store = store.read_only();
            }
            let store: SharedStore<V> = Rc::new(RefCell::new(store));
            layers.push(Layer::store(store.clone()));
            stores.push(store);
        }

        if let Some(path) = map.flat_file_path(data_dir) {
            let mut store = FlatFileStore::<V>::open(PersistOptions::at(path))?;
            if map.read_only {
                store = store.read_only();
            }
            let store: SharedStore<V> = Rc::new(RefCell::new(store));
            if !map.read_only {
                guards.push(SaveGuard::new(store.clone()));
            }
            layers.push(Layer::store(store.clone()));
            stores.push(store);
        }

        if let Some(source) = source {
            let adapter = RemoteAdapter::new(source)
                .with_min_interval(remote.min_interval())
                .with_retry(RetryPolicy {
                    retries: remote.retry,
                    delay: remote.retry_delay(),
                })
                .shared();
            layers.push(Layer::remote(adapter));
        }

        debug!("Opened map '{}' with {} layer(s)", name, layers.len());
        Ok(Self {
            name: name.to_string(),
            cache: LayeredCache::new(layers),
            stores,
            guards,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cache(&mut self) -> &mut LayeredCache<V> {
        &mut self.cache
    }

    /// The first local store, where `dump`/`import`/`export` operate
    pub fn primary_store(&self) -> CacheResult<SharedStore<V>> {
        self.stores
            .first()
            .cloned()
            .ok_or_else(|| CacheError::User(format!("map '{}' has no local store", self.name)))
    }

    /// Flush every flat file, reporting the first failure
    pub fn finish(self) -> CacheResult<()> {
        let mut first_error = None;
        for guard in self.guards {
            if let Err(e) = guard.finish() {
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
