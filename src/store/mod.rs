//! Backing stores: persisted key to value tables
//!
//! Every store speaks the same contract regardless of where rows live:
//!
//! - `get` returns the value or `NotFound`, never a corruption error
//! - `put` upserts scalars and appends set elements
//! - `delete` removes every row of a key, `NotFound` when there were none
//! - `keys`/`values`/`items` enumerate in a stable order
//!
//! | Store | Rows live in | Durable after |
//! |-------|--------------|---------------|
//! | [`MemoryStore`] | process memory | never |
//! | [`SqliteStore`] | SQLite table | every mutation |
//! | [`FlatFileStore`] | CSV side-file | `save()` |

pub mod flat_file;
pub mod memory;
pub mod sqlite;

pub use flat_file::FlatFileStore;
pub use memory::MemoryStore;
pub use sqlite::{SqliteStore, TableSpec};

use crate::error::CacheResult;
use crate::value::Value;
use std::cell::RefCell;
use std::rc::Rc;

/// A store handle shared between its owner and any caches layered on it
pub type SharedStore<V> = Rc<RefCell<dyn Store<V>>>;

/// A single persisted key to value table
pub trait Store<V: Value> {
    /// Name used in logs and errors
    fn name(&self) -> &str;

    /// Whether `put`/`delete` are accepted
    fn writable(&self) -> bool {
        true
    }

    /// Look up the value of a key
    fn get(&self, key: &str) -> CacheResult<V>;

    /// Record a value (upsert for scalars, append for sets)
    fn put(&mut self, key: &str, value: &V) -> CacheResult<()>;

    /// Remove every row of a key
    fn delete(&mut self, key: &str) -> CacheResult<()>;

    /// All keys
    fn keys(&self) -> CacheResult<Vec<String>>;

    /// All entries
    fn items(&self) -> CacheResult<Vec<(String, V)>>;

    /// All values, in the same order as `items`
    fn values(&self) -> CacheResult<Vec<V>> {
        Ok(self.items()?.into_iter().map(|(_, value)| value).collect())
    }

    /// Flush pending mutations (a no-op for stores that commit on write)
    fn save(&mut self) -> CacheResult<()> {
        Ok(())
    }

    /// Whether `save` has anything to write
    fn has_unsaved_changes(&self) -> bool {
        false
    }

    /// Bulk seed from existing entries
    fn extend(&mut self, entries: Vec<(String, V)>) -> CacheResult<()> {
        for (key, value) in entries {
            self.put(&key, &value)?;
        }
        Ok(())
    }
}
