//! In-process store

use crate::error::{CacheError, CacheResult};
use crate::store::Store;
use crate::value::Value;
use std::collections::BTreeMap;

/// Store backed by an ordered map, lost when dropped
#[derive(Debug, Clone)]
pub struct MemoryStore<V> {
    name: String,
    entries: BTreeMap<String, V>,
    writable: bool,
}

impl<V: Value> MemoryStore<V> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: BTreeMap::new(),
            writable: true,
        }
    }

    /// Refuse all later writes
    pub fn read_only(mut self) -> Self {
        self.writable = false;
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V: Value> Store<V> for MemoryStore<V> {
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
        Ok(())
    }

    fn delete(&mut self, key: &str) -> CacheResult<()> {
        if !self.writable {
            return Err(CacheError::not_writable(&self.name));
        }
        self.entries
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| CacheError::not_found(key, format!("absent from {}", self.name)))
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
}
