//! One participant in a cache's lookup chain

use crate::error::{CacheError, CacheResult};
use crate::remote::SharedAdapter;
use crate::store::SharedStore;
use crate::value::Value;
use std::fmt;

/// What a layer reads from and writes to
pub enum LayerHandle<V: Value> {
    Store(SharedStore<V>),
    Remote(SharedAdapter<V>),
}

/// A store or remote adapter placed in a cache, plus its write permission
///
/// The handle is shared: whoever built the store or adapter keeps its own
/// handle and stays responsible for saving and closing it.
pub struct Layer<V: Value> {
    name: String,
    writable: bool,
    handle: LayerHandle<V>,
}

impl<V: Value> Layer<V> {
    /// Layer over a store, writable when the store is
    pub fn store(store: SharedStore<V>) -> Self {
        let (name, writable) = {
            let inner = store.borrow();
            (inner.name().to_string(), inner.writable())
        };
        Self {
            name,
            writable,
            handle: LayerHandle::Store(store),
        }
    }

    /// Layer over a remote adapter, never writable
    pub fn remote(adapter: SharedAdapter<V>) -> Self {
        let name = format!("remote:{}", adapter.borrow().name());
        Self {
            name,
            writable: false,
            handle: LayerHandle::Remote(adapter),
        }
    }

    /// Stop this layer from receiving writes through the cache
    pub fn read_only(mut self) -> Self {
        self.writable = false;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn writable(&self) -> bool {
        self.writable
    }

    pub fn is_remote(&self) -> bool {
        matches!(self.handle, LayerHandle::Remote(_))
    }

    pub fn handle(&self) -> &LayerHandle<V> {
        &self.handle
    }

    /// Read a key; remote layers go through their retry loop
    pub fn get(&self, key: &str) -> CacheResult<V> {
        match &self.handle {
            LayerHandle::Store(store) => store.borrow().get(key),
            LayerHandle::Remote(adapter) => adapter.borrow_mut().lookup(key),
        }
    }

    /// Write a key, `NotWritable` when the layer refuses writes
    pub fn set(&self, key: &str, value: &V) -> CacheResult<()> {
        match &self.handle {
            LayerHandle::Store(store) if self.writable => store.borrow_mut().put(key, value),
            _ => Err(CacheError::not_writable(&self.name)),
        }
    }

    /// Delete a key, `NotWritable` when the layer refuses writes
    pub fn delete(&self, key: &str) -> CacheResult<()> {
        match &self.handle {
            LayerHandle::Store(store) if self.writable => store.borrow_mut().delete(key),
            _ => Err(CacheError::not_writable(&self.name)),
        }
    }
}

impl<V: Value> fmt::Debug for Layer<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Layer")
            .field("name", &self.name)
            .field("writable", &self.writable)
            .field("remote", &self.is_remote())
            .finish()
    }
}
