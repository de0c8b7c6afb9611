//! Map-backed source for offline use and tests

use crate::error::{CacheError, CacheResult};
use crate::remote::Source;
use crate::value::Value;
use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;

/// Answers from a fixed map, counting calls and optionally failing first
pub struct FixtureSource<V> {
    name: String,
    entries: HashMap<String, V>,
    calls: Rc<Cell<u32>>,
    failures_left: u32,
}

impl<V: Value> FixtureSource<V> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: HashMap::new(),
            calls: Rc::new(Cell::new(0)),
            failures_left: 0,
        }
    }

    pub fn with_entry(mut self, key: impl Into<String>, value: V) -> Self {
        self.entries.insert(key.into(), value);
        self
    }

    /// Fail the next `count` fetches with a transient error
    pub fn failing_first(mut self, count: u32) -> Self {
        self.failures_left = count;
        self
    }

    /// Counter of every fetch, shared so it stays readable after the source is boxed
    pub fn call_counter(&self) -> Rc<Cell<u32>> {
        self.calls.clone()
    }
}

impl<V: Value> Source<V> for FixtureSource<V> {
    fn name(&self) -> &str {
        &self.name
    }

    fn fetch(&mut self, key: &str) -> CacheResult<V> {
        self.calls.set(self.calls.get() + 1);

        if self.failures_left > 0 {
            self.failures_left -= 1;
            return Err(CacheError::remote(&self.name, "simulated outage"));
        }

        self.entries
            .get(key)
            .cloned()
            .ok_or_else(|| CacheError::not_found(key, format!("unknown to {}", self.name)))
    }
}
