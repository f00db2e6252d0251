//! Environment traits injected into effect handlers
//!
//! Effect handlers never reach for ambient globals such as the wall clock;
//! they receive their dependencies through an environment so tests can swap
//! them out.

use chrono::{DateTime, Utc};

/// Clock trait - abstracts time operations for testability
///
/// # Examples
///
/// ```
/// use namespaced_store_core::environment::{Clock, SystemClock};
///
/// let clock = SystemClock;
/// let earlier = clock.now();
/// assert!(clock.now() >= earlier);
/// ```
pub trait Clock: Send + Sync {
    /// Get the current time
    fn now(&self) -> DateTime<Utc>;

    /// Milliseconds elapsed since `start`, never negative
    #[allow(clippy::cast_precision_loss)]
    fn elapsed_ms_since(&self, start: DateTime<Utc>) -> f64 {
        let micros = (self.now() - start).num_microseconds().unwrap_or(0).max(0);
        micros as f64 / 1000.0
    }
}

/// Production clock backed by the system time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
