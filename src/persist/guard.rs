//! Scoped flush of a store

use crate::error::CacheResult;
use crate::store::SharedStore;
use crate::value::Value;
use tracing::{debug, warn};

/// Saves a store when the guard is finished or dropped
///
/// `finish` reports the save error to the caller. Dropping the guard on an
/// error path still saves, logging any failure instead. A store without
/// unsaved changes is left untouched either way.
pub struct SaveGuard<V: Value> {
    store: Option<SharedStore<V>>,
}

impl<V: Value> SaveGuard<V> {
    /// Guard a shared store
    pub fn new(store: SharedStore<V>) -> Self {
        Self { store: Some(store) }
    }

    /// Save now and disarm the guard
    pub fn finish(mut self) -> CacheResult<()> {
        if let Some(store) = self.store.take() {
            let mut store = store.borrow_mut();
            if store.has_unsaved_changes() {
                return store.save();
            }
        }
        Ok(())
    }

    /// Disarm without saving
    pub fn dismiss(mut self) {
        self.store = None;
    }
}

impl<V: Value> Drop for SaveGuard<V> {
    fn drop(&mut self) {
        if let Some(store) = self.store.take() {
            let mut store = store.borrow_mut();
            if !store.has_unsaved_changes() {
                return;
            }
            debug!("Saving store {} on scope exit", store.name());
            if let Err(e) = store.save() {
                warn!("Failed to save store {}: {}", store.name(), e);
            }
        }
    }
}
