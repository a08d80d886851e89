//! Time source for TTL and window arithmetic.
//!
//! Every store that ages its entries reads time through [`Clock`] so tests can
//! move time forward explicitly instead of sleeping.

use std::fmt::Debug;
use std::sync::Arc;
use std::time::Instant;

/// Port for obtaining the current instant.
pub trait Clock: Send + Sync + Debug {
    /// Get the current instant.
    fn now(&self) -> Instant;
}

/// Shared handle to a clock.
pub type SharedClock = Arc<dyn Clock>;

/// System clock backed by `Instant::now()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    pub fn new() -> Self {
        Self
    }

    /// Convenience constructor for the shared form used by the stores.
    pub fn shared() -> SharedClock {
        Arc::new(Self)
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

#[cfg(any(test, feature = "test-helpers"))]
pub use mock::MockClock;

#[cfg(any(test, feature = "test-helpers"))]
mod mock {
    use super::Clock;
    use std::sync::{Arc, Mutex};
    use std::time::{Duration, Instant};

    /// Manually driven clock. Clones share the same time value.
    #[derive(Debug, Clone)]
    pub struct MockClock {
        current_time: Arc<Mutex<Instant>>,
    }

    impl MockClock {
        pub fn new(start: Instant) -> Self {
            Self {
                current_time: Arc::new(Mutex::new(start)),
            }
        }

        /// Advance the clock by a duration.
        pub fn advance(&self, duration: Duration) {
            let mut time = self
                .current_time
                .lock()
                .expect("MockClock mutex poisoned");
            *time += duration;
        }
    }

    impl Clock for MockClock {
        fn now(&self) -> Instant {
            *self.current_time.lock().expect("MockClock mutex poisoned")
        }
    }
}
