//! Remote sources: slow, authoritative, read-only lookups
//!
//! A [`Source`] performs one raw lookup. A [`RemoteAdapter`] wraps it with
//! the two policies every remote layer needs:
//!
//! - a throttle shared by all keys, so requests start at least
//!   `min_interval` apart (default 1 s)
//! - a bounded retry loop for transient failures; once exhausted the last
//!   failure is wrapped into `NotFound`
//!
//! Adapters never cache and never accept writes.

pub mod fixture;
pub mod http;
pub mod paging;
pub mod throttle;

pub use fixture::FixtureSource;
pub use http::{HttpSource, HttpSourceConfig};
pub use paging::{Page, PagedSource, Pages};
pub use throttle::{Clock, ManualClock, SystemClock, Throttle, DEFAULT_MIN_INTERVAL};

use crate::error::{CacheError, CacheResult};
use crate::value::Value;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;
use tracing::{debug, warn};

/// A remote adapter shared between its owner and the caches that use it
pub type SharedAdapter<V> = Rc<RefCell<RemoteAdapter<V>>>;

/// One raw lookup against an external resource
pub trait Source<V: Value> {
    /// Name used in logs and errors
    fn name(&self) -> &str;

    /// Resolve a key, or fail. Must not cache.
    fn fetch(&mut self, key: &str) -> CacheResult<V>;
}

/// How often, and how patiently, a failed lookup is retried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first (0 = exactly one attempt)
    pub retries: u32,

    /// Pause between attempts
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 0,
            delay: Duration::from_secs(1),
        }
    }
}

/// A source with throttling and retries
pub struct RemoteAdapter<V: Value> {
    source: Box<dyn Source<V>>,
    throttle: Throttle,
    retry: RetryPolicy,
    clock: Rc<dyn Clock>,
}

impl<V: Value> RemoteAdapter<V> {
    /// Wrap a source with the default 1 s throttle, no retries, and the system clock
    pub fn new(source: impl Source<V> + 'static) -> Self {
        let clock: Rc<dyn Clock> = Rc::new(SystemClock);
        Self {
            source: Box::new(source),
            throttle: Throttle::new(DEFAULT_MIN_INTERVAL, clock.clone()),
            retry: RetryPolicy::default(),
            clock,
        }
    }

    /// Replace the retry policy
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Replace the minimum spacing between requests
    pub fn with_min_interval(mut self, min_interval: Duration) -> Self {
        self.throttle = Throttle::new(min_interval, self.clock.clone());
        self
    }

    /// Replace the clock (resets the throttle)
    pub fn with_clock(mut self, clock: Rc<dyn Clock>) -> Self {
        self.throttle = Throttle::new(self.throttle.min_interval(), clock.clone());
        self.clock = clock;
        self
    }

    pub fn name(&self) -> &str {
        self.source.name()
    }

    pub fn retry(&self) -> RetryPolicy {
        self.retry
    }

    /// Exactly one attempt, started no sooner than the throttle allows
    pub fn resolve(&mut self, key: &str) -> CacheResult<V> {
        self.throttle.wait();
        debug!("Requesting '{}' from {}", key, self.source.name());
        self.source.fetch(key)
    }

    /// Resolve with retries for transient failures
    ///
    /// `NotFound` and `Ambiguous` answers are final. A transient failure on
    /// the last allowed attempt becomes `NotFound` carrying that failure.
    pub fn lookup(&mut self, key: &str) -> CacheResult<V> {
        let mut attempt: u32 = 0;
        loop {
            match self.resolve(key) {
                Ok(value) => return Ok(value),
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) if attempt >= self.retry.retries => {
                    return Err(CacheError::not_found_after(key, attempt + 1, e));
                }
                Err(e) => {
                    attempt += 1;
                    warn!(
                        "Problem with key '{}': {}. Will try again ({}/{})",
                        key, e, attempt, self.retry.retries
                    );
                    self.clock.sleep(self.retry.delay);
                }
            }
        }
    }

    /// Share the adapter so it can be layered into caches
    pub fn shared(self) -> SharedAdapter<V> {
        Rc::new(RefCell::new(self))
    }
}
