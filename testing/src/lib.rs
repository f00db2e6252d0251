//! # Namespaced Store Testing
//!
//! Testing utilities and helpers for the namespaced store.
//!
//! This crate provides:
//! - Deterministic clocks implementing [`Clock`]
//! - [`ReducerTest`], a Given-When-Then tester for any reducer
//! - [`ActionRecorder`], which collects every action a store broadcasts
//! - [`init_tracing`] for test log output
//!
//! ## Example
//!
//! ```ignore
//! use namespaced_store_testing::ActionRecorder;
//!
//! #[tokio::test]
//! async fn test_fetch_flow() {
//!     let store = Store::new(AppState::default(), root_reducer);
//!     let recorder = ActionRecorder::start(store.subscribe_actions());
//!
//!     store.dispatch(todo_async.actions().create(TodoAsyncAction::Fetch, None)).await?;
//!
//!     recorder.wait_for("@Todo/set", Duration::from_secs(1)).await;
//!     assert_action_types(&recorder.actions(), &["@TodoAsync/fetch", "@Todo/loading", "@Todo/set"]);
//! }
//! ```

use chrono::{DateTime, Utc};
use namespaced_store_core::environment::Clock;

pub mod recorder;

/// Mock implementations of environment traits
pub mod mocks {
    use super::{Clock, DateTime, Utc};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use namespaced_store_testing::mocks::FixedClock;
    /// use namespaced_store_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// A clock that follows tokio's clock
    ///
    /// Under `tokio::time::pause` it advances exactly as far as the timers
    /// that fired, so elapsed-time measurements become deterministic.
    #[derive(Debug, Clone)]
    pub struct TokioClock {
        base: DateTime<Utc>,
        started: tokio::time::Instant,
    }

    impl TokioClock {
        /// Anchor tokio's current instant at `base`
        #[must_use]
        pub fn new(base: DateTime<Utc>) -> Self {
            Self {
                base,
                started: tokio::time::Instant::now(),
            }
        }
    }

    impl Clock for TokioClock {
        fn now(&self) -> DateTime<Utc> {
            let elapsed = chrono::Duration::from_std(self.started.elapsed())
                .unwrap_or_else(|_| chrono::Duration::zero());
            self.base + elapsed
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

/// Install a test subscriber once; later calls are no-ops
///
/// Honours `RUST_LOG`, printing through the test harness's captured writer.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// Re-export commonly used items
pub use mocks::{test_clock, FixedClock, TokioClock};
pub use recorder::ActionRecorder;
pub use reducer_test::{assertions, ReducerTest};
