//! Wall-clock abstraction
//!
//! Play history, shuffle weighting and cache throttling all depend on "now".
//! Engines take a [`SharedClock`] so tests can drive time explicitly.

use chrono::Utc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Source of epoch milliseconds
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// Current time as milliseconds since the Unix epoch
    fn now_ms(&self) -> i64;
}

/// Reference-counted clock handle shared by the components of one surface
pub type SharedClock = Arc<dyn Clock>;

/// Clock backed by the system time
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl SystemClock {
    /// Shared handle to the system clock
    pub fn shared() -> SharedClock {
        Arc::new(Self)
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// Manually driven clock for tests and simulations
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ms: AtomicI64,
}

impl ManualClock {
    /// Create a clock frozen at `now_ms`
    pub fn new(now_ms: i64) -> Self {
        Self {
            now_ms: AtomicI64::new(now_ms),
        }
    }

    /// Create a shared clock frozen at `now_ms`
    ///
    /// Returns both the concrete handle (to advance it) and the trait object.
    pub fn shared(now_ms: i64) -> (Arc<Self>, SharedClock) {
        let clock = Arc::new(Self::new(now_ms));
        let shared: SharedClock = clock.clone();
        (clock, shared)
    }

    /// Move the clock forward
    pub fn advance(&self, by: Duration) {
        self.now_ms
            .fetch_add(by.as_millis() as i64, Ordering::SeqCst);
    }

    /// Jump to an absolute time
    pub fn set(&self, now_ms: i64) {
        self.now_ms.store(now_ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}
