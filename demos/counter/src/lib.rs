//! Counter demo
//!
//! Three bindings share one store:
//!
//! - `Counter`: an `i64` with `increment` and `decrement`
//! - `CostSync`: the duration of the last simulated operation, in ms
//! - `CostAsync`: `run` waits a second and reports how long it took to
//!   `CostSync`. Runs are `LatestOnly`, so pressing "run" repeatedly only
//!   ever reports once, for the last press.

use namespaced_store_core::environment::Clock;
use namespaced_store_core::{combine_reducers, ActionCreators, BindingError, CombinedReducer, SyncBinding, Value};
use namespaced_store_macros::ActionName;
use namespaced_store_runtime::{AsyncBinding, Store, StoreError, WatchMode, WorkerHandle};
use std::sync::Arc;
use std::time::Duration;

/// How long `CostAsync/run` pretends to work
pub const SIMULATED_LATENCY: Duration = Duration::from_secs(1);

/// Actions of the `Counter` namespace
#[derive(ActionName, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CounterAction {
    /// Add one
    Increment,
    /// Subtract one
    Decrement,
}

/// Actions of the `CostSync` namespace
#[derive(ActionName, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CostSyncAction {
    /// Replace the cost with the payload
    Set,
}

/// Actions of the `CostAsync` namespace
#[derive(ActionName, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CostAsyncAction {
    /// Start a simulated operation
    Run,
}

/// Root state
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppState {
    /// Current count
    pub counter: i64,
    /// Milliseconds the last completed run took
    pub cost: f64,
}

/// The `Counter` binding
///
/// # Errors
///
/// Never fails in practice; the table has no duplicate names.
pub fn counter() -> Result<SyncBinding<i64, CounterAction>, BindingError> {
    SyncBinding::builder("Counter", 0)
        .reducer(CounterAction::Increment, |count, _| count + 1)
        .reducer(CounterAction::Decrement, |count, _| count - 1)
        .build()
}

/// The `CostSync` binding
///
/// A non-numeric payload keeps the current cost.
///
/// # Errors
///
/// Never fails in practice; the table has no duplicate names.
pub fn cost_sync() -> Result<SyncBinding<f64, CostSyncAction>, BindingError> {
    SyncBinding::builder("CostSync", 0.0)
        .reducer(CostSyncAction::Set, |cost, payload| {
            payload.and_then(Value::as_f64).unwrap_or(*cost)
        })
        .build()
}

/// The `CostAsync` binding
///
/// `clock` measures the run; `cost` is where the result is reported.
///
/// # Errors
///
/// Never fails in practice; the table has no duplicate names.
pub fn cost_async(
    clock: Arc<dyn Clock>,
    cost: ActionCreators<CostSyncAction>,
) -> Result<AsyncBinding<CostAsyncAction>, BindingError> {
    AsyncBinding::builder("CostAsync")
        .effect_with(CostAsyncAction::Run, WatchMode::LatestOnly, move |_, ctx| {
            let clock = Arc::clone(&clock);
            let cost = cost.clone();
            async move {
                let started = clock.now();
                ctx.delay(SIMULATED_LATENCY).await;

                let elapsed = clock.elapsed_ms_since(started);
                tracing::debug!(elapsed_ms = elapsed, "Simulated operation finished");
                ctx.put(cost.with_payload(CostSyncAction::Set, &elapsed)?).await?;
                Ok(())
            }
        })
        .build()
}

/// Combine `Counter` under `counter` and `CostSync` under `cost`
///
/// # Errors
///
/// Returns [`BindingError`] if the slices collide.
pub fn root_reducer(
    counter: SyncBinding<i64, CounterAction>,
    cost: SyncBinding<f64, CostSyncAction>,
) -> Result<CombinedReducer<AppState>, BindingError> {
    let root = combine_reducers::<AppState>()
        .slice("counter", |s: &mut AppState| &mut s.counter, counter)?
        .slice("cost", |s: &mut AppState| &mut s.cost, cost)?
        .build();

    root.ensure_unique_action_types()?;
    Ok(root)
}

/// The assembled demo: a store with the `CostAsync` worker running
#[derive(Debug)]
pub struct CounterApp {
    store: Store<AppState>,
    counter: ActionCreators<CounterAction>,
    cost_async: ActionCreators<CostAsyncAction>,
    worker: WorkerHandle,
}

impl CounterApp {
    /// Build every binding, create the store, and start the worker
    ///
    /// Must be called inside a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Binding`] if a binding is misconfigured.
    pub fn start(clock: Arc<dyn Clock>) -> Result<Self, StoreError> {
        let counter = counter()?;
        let cost_sync = cost_sync()?;
        let cost_async = cost_async(clock, cost_sync.actions().clone())?;

        let counter_actions = counter.actions().clone();
        let store = Store::new(AppState::default(), root_reducer(counter, cost_sync)?);
        let worker = store.run(&cost_async)?;

        Ok(Self {
            store,
            counter: counter_actions,
            cost_async: cost_async.actions().clone(),
            worker,
        })
    }

    /// The underlying store
    #[must_use]
    pub const fn store(&self) -> &Store<AppState> {
        &self.store
    }

    /// Dispatch `Counter/increment`
    ///
    /// # Errors
    ///
    /// Fails once the store is shutting down.
    pub async fn increment(&self) -> Result<(), StoreError> {
        self.store.dispatch(self.counter.create(CounterAction::Increment, None)).await
    }

    /// Dispatch `Counter/decrement`
    ///
    /// # Errors
    ///
    /// Fails once the store is shutting down.
    pub async fn decrement(&self) -> Result<(), StoreError> {
        self.store.dispatch(self.counter.create(CounterAction::Decrement, None)).await
    }

    /// Dispatch `CostAsync/run`
    ///
    /// # Errors
    ///
    /// Fails once the store is shutting down.
    pub async fn run(&self) -> Result<(), StoreError> {
        self.store.dispatch(self.cost_async.create(CostAsyncAction::Run, None)).await
    }

    /// Current state
    pub async fn snapshot(&self) -> AppState {
        self.store.state(Clone::clone).await
    }

    /// Stop the worker and wait for in-flight runs
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownTimeout`] if runs do not unwind in time.
    pub async fn shutdown(self, timeout: Duration) -> Result<(), StoreError> {
        self.worker.stop();
        self.store.shutdown(timeout).await
    }
}
