//! In-memory mapping in front of an ordered chain of layers

use crate::cache::layer::Layer;
use crate::error::{CacheError, CacheResult};
use crate::value::{Shape, Value};
use std::collections::HashMap;
use tracing::{debug, trace};

/// A cache that answers from memory first, then from each layer in order
///
/// A hit found in a deeper layer is copied into memory and back-filled into
/// every earlier writable layer, so cheap layers accumulate what expensive
/// ones resolved.
#[derive(Debug)]
pub struct LayeredCache<V: Value> {
    memory: HashMap<String, V>,
    layers: Vec<Layer<V>>,
}

impl<V: Value> LayeredCache<V> {
    /// Cache with an empty in-memory mapping
    pub fn new(layers: Vec<Layer<V>>) -> Self {
        Self {
            memory: HashMap::new(),
            layers,
        }
    }

    /// Seed the in-memory mapping (layers are not written)
    pub fn with_seed(mut self, seed: impl IntoIterator<Item = (String, V)>) -> Self {
        for (key, value) in seed {
            let merged = V::merge(self.memory.remove(&key), value);
            self.memory.insert(key, merged);
        }
        self
    }

    /// Resolve a key through memory and then every layer
    pub fn get(&mut self, key: &str) -> CacheResult<V> {
        if let Some(value) = self.memory.get(key) {
            trace!("'{}' served from memory", key);
            return Ok(value.clone());
        }

        for (position, layer) in self.layers.iter().enumerate() {
            let value = match layer.get(key) {
                Ok(value) => value,
                Err(e) if e.is_not_found() => {
                    trace!("'{}' missing from {}", key, layer.name());
                    continue;
                }
                Err(e) => return Err(e),
            };

            debug!("'{}' found in {}", key, layer.name());
            self.memory.insert(key.to_string(), value.clone());

            for earlier in &self.layers[..position] {
                match earlier.set(key, &value) {
                    Ok(()) => debug!("Back-filled '{}' into {}", key, earlier.name()),
                    Err(e) if e.is_not_writable() => {}
                    Err(e) => return Err(e),
                }
            }
            return Ok(value);
        }

        Err(CacheError::not_found(
            key,
            "absent from memory and every layer",
        ))
    }

    /// Three-way lookup: `Ok(None)` when the key is absent everywhere
    pub fn lookup(&mut self, key: &str) -> CacheResult<Option<V>> {
        match self.get(key) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Whether a key resolves anywhere (may populate memory like `get`)
    pub fn contains(&mut self, key: &str) -> CacheResult<bool> {
        Ok(self.lookup(key)?.is_some())
    }

    /// Record a value in memory and in every writable layer
    ///
    /// Not transactional: a failing layer leaves earlier writes in place.
    pub fn set(&mut self, key: &str, value: V) -> CacheResult<()> {
        let merged = V::merge(self.memory.remove(key), value.clone());
        self.memory.insert(key.to_string(), merged);

        let mut first_written = None;
        for layer in &self.layers {
            match layer.set(key, &value) {
                Ok(()) => {
                    first_written.get_or_insert(layer);
                }
                Err(e) if e.is_not_writable() => trace!("Skipped read-only {}", layer.name()),
                Err(e) => return Err(e),
            }
        }

        // An appending store may already hold elements memory never saw
        if V::SHAPE == Shape::Set {
            if let Some(layer) = first_written {
                let stored = layer.get(key)?;
                let held = self.memory.remove(key);
                self.memory.insert(key.to_string(), V::merge(held, stored));
            }
        }
        Ok(())
    }

    /// Forget a key: from memory when it is there, otherwise from the layers
    ///
    /// Never fails for an absent key.
    pub fn delete(&mut self, key: &str) -> CacheResult<()> {
        if self.memory.remove(key).is_some() {
            debug!("Deleted '{}' from memory", key);
            return Ok(());
        }
        self.delete_from_layers(key)
    }

    /// Forget a key in memory and in every writable layer
    pub fn purge(&mut self, key: &str) -> CacheResult<()> {
        self.memory.remove(key);
        self.delete_from_layers(key)
    }

    fn delete_from_layers(&self, key: &str) -> CacheResult<()> {
        for layer in &self.layers {
            match layer.delete(key) {
                Ok(()) => debug!("Deleted '{}' from {}", key, layer.name()),
                Err(e) if e.is_not_writable() || e.is_not_found() => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Number of keys held in memory
    pub fn memory_len(&self) -> usize {
        self.memory.len()
    }

    pub fn layers(&self) -> &[Layer<V>] {
        &self.layers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::{FixtureSource, RemoteAdapter};
    use crate::store::{MemoryStore, SharedStore, Store};
    use crate::value::{Scalar, ValueSet};
    use std::cell::RefCell;
    use std::collections::BTreeSet;
    use std::rc::Rc;
    use std::time::Duration;

    fn s(value: &str) -> Scalar {
        Some(value.to_string())
    }

    fn memory_store(name: &str) -> Rc<RefCell<MemoryStore<Scalar>>> {
        Rc::new(RefCell::new(MemoryStore::new(name)))
    }

    fn stub(entries: &[(&str, &str)]) -> FixtureSource<Scalar> {
        entries
            .iter()
            .fold(FixtureSource::new("stub"), |source, (k, v)| source.with_entry(*k, s(v)))
    }

    /// Store whose writes always fail with an I/O error
    struct BrokenStore;

    impl Store<Scalar> for BrokenStore {
        fn name(&self) -> &str {
            "broken"
        }

        fn get(&self, key: &str) -> CacheResult<Scalar> {
            Err(CacheError::not_found(key, "absent from broken"))
        }

        fn put(&mut self, _key: &str, _value: &Scalar) -> CacheResult<()> {
            Err(CacheError::io(
                "writing broken",
                std::io::Error::new(std::io::ErrorKind::PermissionDenied, "disk is read-only"),
            ))
        }

        fn delete(&mut self, key: &str) -> CacheResult<()> {
            Err(CacheError::not_found(key, "absent from broken"))
        }

        fn keys(&self) -> CacheResult<Vec<String>> {
            Ok(Vec::new())
        }

        fn items(&self) -> CacheResult<Vec<(String, Scalar)>> {
            Ok(Vec::new())
        }
    }

    fn broken_layer() -> Layer<Scalar> {
        let store: SharedStore<Scalar> = Rc::new(RefCell::new(BrokenStore));
        Layer::store(store)
    }

    fn remote_layer(source: FixtureSource<Scalar>) -> Layer<Scalar> {
        let adapter = RemoteAdapter::new(source)
            .with_min_interval(Duration::ZERO)
            .shared();
        Layer::remote(adapter)
    }

    #[test]
    fn hit_in_deep_layer_backfills_earlier_layers() {
        let store = memory_store("a");
        let source = stub(&[("X", "Y")]);
        let calls = source.call_counter();
        let mut cache = LayeredCache::new(vec![
            Layer::store(store.clone() as SharedStore<Scalar>),
            remote_layer(source),
        ]);

        assert_eq!(cache.get("X").unwrap(), s("Y"));
        assert_eq!(store.borrow().get("X").unwrap(), s("Y"));
        assert_eq!(cache.get("X").unwrap(), s("Y"));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn backfill_skips_read_only_layers() {
        let frozen = memory_store("frozen");
        let open = memory_store("open");
        let deep = memory_store("deep");
        deep.borrow_mut().put("k", &s("v")).unwrap();

        let mut cache = LayeredCache::new(vec![
            Layer::store(frozen.clone() as SharedStore<Scalar>).read_only(),
            Layer::store(open.clone() as SharedStore<Scalar>),
            Layer::store(deep as SharedStore<Scalar>),
        ]);

        assert_eq!(cache.get("k").unwrap(), s("v"));
        assert!(frozen.borrow().is_empty());
        assert_eq!(open.borrow().get("k").unwrap(), s("v"));
    }

    #[test]
    fn null_is_a_hit() {
        let store = memory_store("a");
        store.borrow_mut().put("k", &None).unwrap();
        let mut cache = LayeredCache::new(vec![Layer::store(store as SharedStore<Scalar>)]);
        assert_eq!(cache.lookup("k").unwrap(), Some(None));
        assert_eq!(cache.lookup("other").unwrap(), None);
    }

    #[test]
    fn miss_everywhere_names_the_key() {
        let mut cache = LayeredCache::new(vec![remote_layer(stub(&[]))]);
        let err = cache.get("Z").unwrap_err();
        assert!(err.is_not_found());
        assert!(err.to_string().contains("'Z'"));
        assert!(!cache.contains("Z").unwrap());
    }

    #[test]
    fn set_skips_read_only_layers() {
        let frozen = memory_store("frozen");
        let open = memory_store("open");
        let mut cache = LayeredCache::new(vec![
            Layer::store(frozen.clone() as SharedStore<Scalar>).read_only(),
            Layer::store(open.clone() as SharedStore<Scalar>),
            remote_layer(stub(&[])),
        ]);

        cache.set("K", s("V")).unwrap();
        assert!(frozen.borrow().is_empty());
        assert_eq!(open.borrow().get("K").unwrap(), s("V"));
        assert_eq!(cache.get("K").unwrap(), s("V"));
        assert_eq!(cache.memory_len(), 1);
    }

    #[test]
    fn seed_is_kept_per_instance() {
        let mut seeded = LayeredCache::<Scalar>::new(Vec::new())
            .with_seed(vec![("a".to_string(), s("1"))]);
        let mut empty = LayeredCache::<Scalar>::new(Vec::new());

        assert_eq!(seeded.get("a").unwrap(), s("1"));
        assert!(empty.get("a").unwrap_err().is_not_found());
    }

    #[test]
    fn delete_is_idempotent() {
        let mut cache = LayeredCache::<Scalar>::new(Vec::new());
        cache.delete("absent-key").unwrap();

        let store = memory_store("a");
        let mut cache = LayeredCache::new(vec![
            Layer::store(store as SharedStore<Scalar>),
            remote_layer(stub(&[])),
        ]);
        cache.delete("absent-key").unwrap();
        cache.delete("absent-key").unwrap();
    }

    #[test]
    fn delete_prefers_memory() {
        let store = memory_store("a");
        let mut cache = LayeredCache::new(vec![Layer::store(store.clone() as SharedStore<Scalar>)]);
        cache.set("k", s("v")).unwrap();

        cache.delete("k").unwrap();
        assert_eq!(cache.memory_len(), 0);
        assert_eq!(store.borrow().get("k").unwrap(), s("v"));

        cache.delete("k").unwrap();
        assert!(store.borrow().get("k").unwrap_err().is_not_found());
    }

    #[test]
    fn purge_removes_everywhere() {
        let store = memory_store("a");
        let mut cache = LayeredCache::new(vec![Layer::store(store.clone() as SharedStore<Scalar>)]);
        cache.set("k", s("v")).unwrap();

        cache.purge("k").unwrap();
        assert_eq!(cache.memory_len(), 0);
        assert!(store.borrow().is_empty());
    }

    #[test]
    fn set_values_accumulate() {
        let store: Rc<RefCell<MemoryStore<ValueSet>>> = Rc::new(RefCell::new(MemoryStore::new("sets")));
        let mut cache = LayeredCache::new(vec![Layer::store(store.clone() as SharedStore<ValueSet>)]);

        cache.set("g", Some(BTreeSet::from(["a".to_string()]))).unwrap();
        cache.set("g", Some(BTreeSet::from(["b".to_string()]))).unwrap();

        let expected = Some(BTreeSet::from(["a".to_string(), "b".to_string()]));
        assert_eq!(cache.get("g").unwrap(), expected);
        assert_eq!(store.borrow().get("g").unwrap(), expected);
    }

    #[test]
    fn set_on_cold_key_sees_stored_elements() {
        let store: Rc<RefCell<MemoryStore<ValueSet>>> = Rc::new(RefCell::new(MemoryStore::new("sets")));
        store.borrow_mut().put("g", &Some(BTreeSet::from(["a".to_string()]))).unwrap();
        let mut cache = LayeredCache::new(vec![Layer::store(store.clone() as SharedStore<ValueSet>)]);

        cache.set("g", Some(BTreeSet::from(["b".to_string()]))).unwrap();

        let expected = Some(BTreeSet::from(["a".to_string(), "b".to_string()]));
        assert_eq!(cache.get("g").unwrap(), expected);
        assert_eq!(store.borrow().get("g").unwrap(), expected);
    }

    #[test]
    fn set_failure_keeps_earlier_writes() {
        let before = memory_store("before");
        let after = memory_store("after");
        let mut cache = LayeredCache::new(vec![
            Layer::store(before.clone() as SharedStore<Scalar>),
            broken_layer(),
            Layer::store(after.clone() as SharedStore<Scalar>),
        ]);

        let err = cache.set("K", s("V")).unwrap_err();
        assert!(matches!(err, CacheError::Io { .. }));
        assert_eq!(before.borrow().get("K").unwrap(), s("V"));
        assert!(after.borrow().is_empty());
    }

    #[test]
    fn backfill_failure_propagates() {
        let front = memory_store("front");
        let deep = memory_store("deep");
        deep.borrow_mut().put("k", &s("v")).unwrap();
        let mut cache = LayeredCache::new(vec![
            Layer::store(front.clone() as SharedStore<Scalar>),
            broken_layer(),
            Layer::store(deep as SharedStore<Scalar>),
        ]);

        let err = cache.get("k").unwrap_err();
        assert!(matches!(err, CacheError::Io { .. }));
        assert_eq!(front.borrow().get("k").unwrap(), s("v"));
    }

    #[test]
    fn exhausted_remote_reads_as_missing() {
        let flaky = FixtureSource::<Scalar>::new("stub").failing_first(1);
        let mut cache = LayeredCache::new(vec![remote_layer(flaky)]);
        assert_eq!(cache.lookup("k").unwrap(), None);
    }
}
