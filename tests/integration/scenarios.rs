//! Library-level scenarios: caches, stores and adapters working together

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;
use std::time::Duration;
use tempfile::TempDir;
use tiercache::cache::{Layer, LayeredCache};
use tiercache::persist::{PersistOptions, SaveGuard};
use tiercache::remote::{Clock, FixtureSource, ManualClock, Page, PagedSource, RemoteAdapter, RetryPolicy};
use tiercache::store::{FlatFileStore, MemoryStore, SharedStore, SqliteStore, Store, TableSpec};
use tiercache::value::{AmbiguityPolicy, Scalar, ValueSet};
use tiercache::CacheError;

fn s(value: &str) -> Scalar {
    Some(value.to_string())
}

fn set(items: &[&str]) -> ValueSet {
    Some(items.iter().map(|i| i.to_string()).collect::<BTreeSet<_>>())
}

fn quiet_adapter(source: FixtureSource<Scalar>) -> Rc<RefCell<RemoteAdapter<Scalar>>> {
    RemoteAdapter::new(source)
        .with_clock(Rc::new(ManualClock::new()))
        .shared()
}

#[test]
fn cascade_populates_earlier_layers_once() {
    let store_a = Rc::new(RefCell::new(MemoryStore::<Scalar>::new("storeA")));
    let source = FixtureSource::new("stub").with_entry("X", s("Y"));
    let calls = source.call_counter();

    let mut cache = LayeredCache::new(vec![
        Layer::store(store_a.clone() as SharedStore<Scalar>),
        Layer::remote(quiet_adapter(source)),
    ]);

    assert_eq!(cache.get("X").unwrap(), s("Y"));
    assert_eq!(store_a.borrow().get("X").unwrap(), s("Y"));
    assert_eq!(cache.get("X").unwrap(), s("Y"));
    assert_eq!(calls.get(), 1);
}

#[test]
fn flat_file_remembers_remote_answers_across_caches() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("gi2kegg.csv");

    {
        let file: SharedStore<Scalar> = Rc::new(RefCell::new(
            FlatFileStore::<Scalar>::open(PersistOptions::at(&path)).unwrap(),
        ));
        let _guard = SaveGuard::new(file.clone());
        let source = FixtureSource::new("kegg").with_entry("16130957", s("eco:b3061"));
        let mut cache = LayeredCache::new(vec![
            Layer::store(file),
            Layer::remote(quiet_adapter(source)),
        ]);
        assert_eq!(cache.get("16130957").unwrap(), s("eco:b3061"));
    }

    let file: SharedStore<Scalar> = Rc::new(RefCell::new(
        FlatFileStore::<Scalar>::open(PersistOptions::at(&path)).unwrap(),
    ));
    let mut cache = LayeredCache::new(vec![Layer::store(file)]);
    assert_eq!(cache.get("16130957").unwrap(), s("eco:b3061"));
}

#[test]
fn set_on_read_only_layer_is_skipped() {
    let frozen = Rc::new(RefCell::new(MemoryStore::<Scalar>::new("frozen").read_only()));
    let mut cache = LayeredCache::new(vec![Layer::store(frozen.clone() as SharedStore<Scalar>)]);

    cache.set("K", s("V")).unwrap();
    assert!(frozen.borrow().is_empty());
    assert_eq!(cache.get("K").unwrap(), s("V"));
}

#[test]
fn miss_everywhere_mentions_the_key() {
    let empty = Rc::new(RefCell::new(MemoryStore::<Scalar>::new("empty")));
    let mut cache = LayeredCache::new(vec![
        Layer::store(empty as SharedStore<Scalar>),
        Layer::remote(quiet_adapter(FixtureSource::new("stub"))),
    ]);

    let err = cache.get("Z").unwrap_err();
    assert!(matches!(err, CacheError::NotFound { .. }));
    assert!(err.to_string().contains("Z"));
}

#[test]
fn delete_of_absent_key_never_fails() {
    let mut empty = LayeredCache::<Scalar>::new(Vec::new());
    empty.delete("absent-key").unwrap();

    let store = Rc::new(RefCell::new(MemoryStore::<Scalar>::new("m")));
    store.borrow_mut().put("present", &s("1")).unwrap();
    let mut cache = LayeredCache::new(vec![
        Layer::store(store as SharedStore<Scalar>),
        Layer::remote(quiet_adapter(FixtureSource::new("stub"))),
    ]);
    cache.delete("absent-key").unwrap();
}

#[test]
fn sqlite_set_store_accumulates() {
    let dir = TempDir::new().unwrap();
    let mut store: SqliteStore<ValueSet> =
        SqliteStore::open(dir.path().join("sets.db"), TableSpec::default()).unwrap();

    store.put("g", &set(&["a"])).unwrap();
    store.put("g", &set(&["b"])).unwrap();
    assert_eq!(store.get("g").unwrap(), set(&["a", "b"]));
}

#[test]
fn consecutive_resolves_respect_min_interval() {
    let clock = Rc::new(ManualClock::new());
    let source = FixtureSource::new("stub")
        .with_entry("a", s("1"))
        .with_entry("b", s("2"));
    let mut adapter = RemoteAdapter::new(source)
        .with_clock(clock.clone())
        .with_min_interval(Duration::from_millis(1500));

    adapter.resolve("a").unwrap();
    let first = clock.now();
    adapter.resolve("b").unwrap();
    assert!(clock.now() - first >= Duration::from_millis(1500));
}

#[test]
fn flaky_remote_recovers_within_retry_budget() {
    let clock = Rc::new(ManualClock::new());
    let source = FixtureSource::new("flaky").with_entry("K00262", s("gdh")).failing_first(2);
    let calls = source.call_counter();
    let adapter = RemoteAdapter::new(source)
        .with_clock(clock.clone())
        .with_retry(RetryPolicy {
            retries: 2,
            delay: Duration::from_secs(2),
        })
        .shared();

    let mut cache = LayeredCache::new(vec![Layer::remote(adapter)]);
    assert_eq!(cache.get("K00262").unwrap(), s("gdh"));
    assert_eq!(calls.get(), 3);
    assert_eq!(
        clock.sleeps().iter().filter(|d| **d == Duration::from_secs(2)).count(),
        2
    );
}

#[test]
fn paged_remote_feeds_set_cache() {
    let source = PagedSource::new("otl", |_key: &str, cursor: Option<&str>| {
        Ok(match cursor {
            None => Page {
                items: vec!["ott1".to_string()],
                next: Some("2".to_string()),
            },
            Some(_) => Page {
                items: vec!["ott2".to_string()],
                next: None,
            },
        })
    })
    .with_policy(AmbiguityPolicy::AllMatches);
    let adapter = RemoteAdapter::<ValueSet>::new(source)
        .with_clock(Rc::new(ManualClock::new()))
        .shared();
    let store = Rc::new(RefCell::new(MemoryStore::<ValueSet>::new("local")));

    let mut cache = LayeredCache::new(vec![
        Layer::store(store.clone() as SharedStore<ValueSet>),
        Layer::remote(adapter),
    ]);
    assert_eq!(cache.get("Fungi").unwrap(), set(&["ott1", "ott2"]));
    assert_eq!(store.borrow().get("Fungi").unwrap(), set(&["ott1", "ott2"]));
}

#[test]
fn null_answers_are_remembered() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nulls.csv");
    {
        let file: SharedStore<Scalar> = Rc::new(RefCell::new(
            FlatFileStore::<Scalar>::open(PersistOptions::at(&path)).unwrap(),
        ));
        let guard = SaveGuard::new(file.clone());
        let source = FixtureSource::new("stub").with_entry("orphan", None);
        let mut cache = LayeredCache::new(vec![
            Layer::store(file),
            Layer::remote(quiet_adapter(source)),
        ]);
        assert_eq!(cache.lookup("orphan").unwrap(), Some(None));
        guard.finish().unwrap();
    }

    let reopened: FlatFileStore<Scalar> = FlatFileStore::open(PersistOptions::at(&path)).unwrap();
    assert_eq!(reopened.get("orphan").unwrap(), None);
    assert!(reopened.get("never-seen").unwrap_err().is_not_found());
}
