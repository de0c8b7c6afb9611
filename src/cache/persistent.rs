//! A cache over a single SQLite table

use crate::cache::layer::Layer;
use crate::cache::layered::LayeredCache;
use crate::error::CacheResult;
use crate::store::{SharedStore, SqliteStore, Store, TableSpec};
use crate::value::Value;
use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

/// Map whose entries survive the process in a SQLite table
///
/// Reads go through an in-memory mapping; writes reach the table before
/// `set` returns. Enumeration reads the table, not memory.
pub struct PersistentMap<V: Value> {
    cache: LayeredCache<V>,
    store: Rc<RefCell<SqliteStore<V>>>,
}

impl<V: Value> PersistentMap<V> {
    /// Open (or create) `spec.table` in the database at `path`
    pub fn open(path: impl AsRef<Path>, spec: TableSpec) -> CacheResult<Self> {
        Ok(Self::from_store(SqliteStore::open(path, spec)?))
    }

    pub fn from_store(store: SqliteStore<V>) -> Self {
        let store = Rc::new(RefCell::new(store));
        let cache = LayeredCache::new(vec![Layer::store(store.clone() as SharedStore<V>)]);
        Self { cache, store }
    }

    pub fn get(&mut self, key: &str) -> CacheResult<V> {
        self.cache.get(key)
    }

    pub fn lookup(&mut self, key: &str) -> CacheResult<Option<V>> {
        self.cache.lookup(key)
    }

    pub fn set(&mut self, key: &str, value: V) -> CacheResult<()> {
        self.cache.set(key, value)
    }

    /// Remove a key from memory and from the table
    pub fn delete(&mut self, key: &str) -> CacheResult<()> {
        self.cache.purge(key)
    }

    pub fn keys(&self) -> CacheResult<Vec<String>> {
        self.store.borrow().keys()
    }

    pub fn values(&self) -> CacheResult<Vec<V>> {
        self.store.borrow().values()
    }

    pub fn items(&self) -> CacheResult<Vec<(String, V)>> {
        self.store.borrow().items()
    }

    /// The backing store, for layering it into other caches
    pub fn store(&self) -> SharedStore<V> {
        self.store.clone()
    }
}
