//! Minimum spacing between remote requests

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::{Duration, Instant};
use tracing::trace;

/// Default spacing between two requests of one adapter
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_secs(1);

/// Source of time for throttling and retry back-off
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, duration: Duration);
}

/// Wall-clock time, blocking sleeps
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Virtual time: `sleep` advances the clock instantly and is recorded
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    elapsed: Cell<Duration>,
    sleeps: RefCell<Vec<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            elapsed: Cell::new(Duration::ZERO),
            sleeps: RefCell::new(Vec::new()),
        }
    }

    /// Move time forward without recording a sleep
    pub fn advance(&self, duration: Duration) {
        self.elapsed.set(self.elapsed.get() + duration);
    }

    /// Every sleep requested so far
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.borrow().clone()
    }

    /// Virtual time since the clock was created
    pub fn elapsed(&self) -> Duration {
        self.elapsed.get()
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + self.elapsed.get()
    }

    fn sleep(&self, duration: Duration) {
        self.sleeps.borrow_mut().push(duration);
        self.advance(duration);
    }
}

/// Keeps successive requests at least `min_interval` apart
pub struct Throttle {
    min_interval: Duration,
    last_request: Option<Instant>,
    clock: Rc<dyn Clock>,
}

impl Throttle {
    pub fn new(min_interval: Duration, clock: Rc<dyn Clock>) -> Self {
        Self {
            min_interval,
            last_request: None,
            clock,
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Block until a request may start, then mark it as started
    pub fn wait(&mut self) {
        if let Some(last) = self.last_request {
            let since = self.clock.now().saturating_duration_since(last);
            if since < self.min_interval {
                let pause = self.min_interval - since;
                trace!("Throttling for {:?}", pause);
                self.clock.sleep(pause);
            }
        }
        self.last_request = Some(self.clock.now());
    }
}
