//! # Namespaced Store Runtime
//!
//! Runtime for the namespaced store: the host [`Store`] that serializes
//! reducer invocation, and [`AsyncBinding`]s whose workers watch the store's
//! action stream and run effect handlers as cancellable tokio tasks.
//!
//! ## Core Components
//!
//! - **Store**: owns the root state and reducer, broadcasts every dispatched action
//! - **Watch primitives**: `All`, `LatestOnly`, `LeadingOnly` dispatch policies
//! - **`AsyncBinding`**: one namespace's effect handlers and their aggregate worker
//! - **Retry**: opt-in backoff helpers for use inside handlers
//!
//! ## Example
//!
//! ```ignore
//! use namespaced_store_runtime::{AsyncBinding, Store, WatchMode};
//!
//! let cost_async = AsyncBinding::builder("CostAsync")
//!     .effect_with(CostAction::Run, WatchMode::LatestOnly, |_action, ctx| async move {
//!         ctx.delay(Duration::from_secs(1)).await;
//!         ctx.put(set_cost(1000.0)).await?;
//!         Ok(())
//!     })
//!     .build()?;
//!
//! let store = Store::new(AppState::default(), root_reducer);
//! store.run(&cost_async)?;
//! store.dispatch(cost_async.actions().create(CostAction::Run, None)).await?;
//! ```

/// Effect-driven bindings
pub mod async_binding;

/// Retry logic with exponential backoff
pub mod retry;

/// Metric names and recording helpers
pub mod metrics;

/// The host store
pub mod store;

/// Watch modes and the per-effect watcher loop
pub mod watch;

/// Error types for the Store runtime
pub mod error {
    use namespaced_store_core::BindingError;
    use thiserror::Error;

    /// Errors that can occur during Store operations
    #[derive(Error, Debug)]
    pub enum StoreError {
        /// Store is shutting down and not accepting new actions
        ///
        /// Returned by `dispatch()` and `run()` after shutdown initiated.
        #[error("Store is shutting down")]
        ShutdownInProgress,

        /// Shutdown timed out waiting for effects to complete
        ///
        /// Some effect runs were still in flight when the timeout elapsed.
        #[error("Shutdown timed out with {0} effects still running")]
        ShutdownTimeout(usize),

        /// The store behind a dispatcher has been dropped
        #[error("Store has been dropped")]
        StoreDropped,

        /// The effect run was cancelled and may no longer dispatch
        #[error("Effect run was cancelled")]
        Cancelled,

        /// A binding could not be registered
        #[error(transparent)]
        Binding(#[from] BindingError),

        /// A worker task failed
        ///
        /// This typically means a spawned task panicked.
        #[error("Worker task failed: {0}")]
        TaskJoinError(#[from] tokio::task::JoinError),
    }
}

pub use async_binding::{
    effect_handler, AsyncBinding, AsyncBindingBuilder, EffectContext, EffectDescriptor, EffectFuture,
    EffectHandler,
};
pub use error::StoreError;
pub use store::{Dispatcher, Store, StoreConfig, WorkerHandle};
pub use retry::RetryPolicy;
pub use watch::{UnknownWatchMode, WatchMode};
