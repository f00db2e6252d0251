//! The host store
//!
//! The store owns the root state and root reducer. Every dispatched action is
//! reduced under the state write lock and then, still under the lock, routed
//! to the watchers of running [`AsyncBinding`]s and broadcast to subscribers.
//! Reducer invocation is therefore strictly serialized and observers see
//! actions in reducer order.
//!
//! Watchers are fed through their own unbounded channels, so a slow watcher
//! never loses a triggering action. The broadcast only serves observers such
//! as [`Store::subscribe_actions`], which may lag.
//!
//! The store is an explicit value: construct it once, clone it (clones share
//! everything) into whatever needs it, and tear it down with
//! [`Store::shutdown`] or by dropping the last clone.

use crate::async_binding::AsyncBinding;
use crate::error::StoreError;
use crate::metrics::StoreMetrics;
use futures::future::BoxFuture;
use namespaced_store_core::{Action, ActionName, ActionType, BindingError, Reducer};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, RwLock};
use tokio::task::{AbortHandle, JoinHandle};

/// Configuration for Store instances
///
/// # Example
///
/// ```
/// use namespaced_store_runtime::StoreConfig;
/// use std::time::Duration;
///
/// let config = StoreConfig::default()
///     .with_broadcast_capacity(4096)
///     .with_shutdown_timeout(Duration::from_secs(5));
/// assert_eq!(config.broadcast_capacity, 4096);
/// ```
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Actions buffered per [`Store::subscribe_actions`] receiver before it
    /// starts lagging; watchers are not affected
    pub broadcast_capacity: usize,
    /// Default timeout used by [`Store::shutdown_default`]
    pub shutdown_timeout: Duration,
}

impl StoreConfig {
    /// Set the observer broadcast capacity
    #[must_use]
    pub const fn with_broadcast_capacity(mut self, capacity: usize) -> Self {
        self.broadcast_capacity = capacity;
        self
    }

    /// Set the default shutdown timeout
    #[must_use]
    pub const fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            broadcast_capacity: 1024,
            shutdown_timeout: Duration::from_secs(30),
        }
    }
}

/// Type-erased dispatch target, so dispatchers need not know the state type
trait DispatchTarget: Send + Sync {
    fn dispatch_action(&self, action: Action) -> BoxFuture<'_, Result<(), StoreError>>;
}

/// Cloneable handle effects use to dispatch actions back into the store
///
/// Holds the store weakly: once the last [`Store`] clone is dropped,
/// dispatching returns [`StoreError::StoreDropped`].
#[derive(Clone)]
pub struct Dispatcher {
    target: Weak<dyn DispatchTarget>,
    in_flight: Arc<AtomicUsize>,
}

impl Dispatcher {
    /// Dispatch an action
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::StoreDropped`] if the store is gone, or
    /// [`StoreError::ShutdownInProgress`] if it is shutting down.
    pub async fn dispatch(&self, action: Action) -> Result<(), StoreError> {
        let Some(target) = self.target.upgrade() else {
            tracing::debug!(action_type = %action.action_type, "Dispatch after store dropped");
            return Err(StoreError::StoreDropped);
        };

        target.dispatch_action(action).await
    }

    /// Mark one effect run as in flight until the guard drops
    pub(crate) fn track_run(&self) -> InFlightGuard {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        InFlightGuard(Arc::clone(&self.in_flight))
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("store_alive", &(self.target.strong_count() > 0))
            .field("in_flight", &self.in_flight.load(Ordering::SeqCst))
            .finish()
    }
}

/// Decrements the in-flight counter on drop, including on abort or panic
pub(crate) struct InFlightGuard(Arc<AtomicUsize>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Handle to a running binding worker
#[derive(Debug)]
pub struct WorkerHandle {
    namespace: String,
    handle: JoinHandle<()>,
}

impl WorkerHandle {
    /// Namespace of the binding this worker runs
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Whether the worker has stopped
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Stop the worker and every effect run it started
    pub fn stop(&self) {
        tracing::debug!(namespace = %self.namespace, "Stopping worker");
        self.handle.abort();
    }

    /// Wait for the worker to end
    ///
    /// Workers end when the store's action stream closes; a stopped worker
    /// resolves immediately.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::TaskJoinError`] if the worker panicked.
    pub async fn join(self) -> Result<(), StoreError> {
        match self.handle.await {
            Ok(()) => Ok(()),
            Err(error) if error.is_cancelled() => Ok(()),
            Err(error) => Err(StoreError::TaskJoinError(error)),
        }
    }
}

/// Delivery channel for one watcher
struct Route {
    action_type: String,
    sender: mpsc::UnboundedSender<Action>,
}

struct StoreInner<S> {
    state: RwLock<S>,
    reducer: Box<dyn Reducer<State = S>>,
    routes: Mutex<Vec<Route>>,
    action_broadcast: broadcast::Sender<Action>,
    shutdown: AtomicBool,
    in_flight: Arc<AtomicUsize>,
    workers: Mutex<Vec<AbortHandle>>,
    effect_types: Mutex<HashSet<ActionType>>,
    config: StoreConfig,
}

impl<S: Send + Sync> StoreInner<S> {
    async fn dispatch(&self, action: Action) -> Result<(), StoreError> {
        if self.shutdown.load(Ordering::Acquire) {
            tracing::warn!(action_type = %action.action_type, "Rejected action: store is shutting down");
            StoreMetrics::record_rejected();
            return Err(StoreError::ShutdownInProgress);
        }

        let mut state = self.state.write().await;
        tracing::trace!("Acquired write lock on state");

        let span = tracing::debug_span!("reducer_execution", action_type = %action.action_type);
        let start = std::time::Instant::now();
        span.in_scope(|| self.reducer.reduce(&mut state, &action));
        StoreMetrics::record_dispatch(start.elapsed());

        // Route and broadcast before releasing the lock so watchers observe
        // reducer order.
        self.route(&action);
        // No receivers is fine: nothing is observing.
        let _ = self.action_broadcast.send(action);
        drop(state);

        Ok(())
    }

    fn route(&self, action: &Action) {
        let mut routes = self.routes.lock().unwrap_or_else(PoisonError::into_inner);
        routes.retain(|route| !route.sender.is_closed());

        for route in routes.iter().filter(|r| r.action_type == action.action_type) {
            // A receiver closing concurrently just means its watcher stopped.
            let _ = route.sender.send(action.clone());
        }
    }

    fn open_route(&self, action_type: &ActionType) -> mpsc::UnboundedReceiver<Action> {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.routes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Route {
                action_type: action_type.to_string(),
                sender,
            });
        receiver
    }
}

impl<S: Send + Sync> DispatchTarget for StoreInner<S> {
    fn dispatch_action(&self, action: Action) -> BoxFuture<'_, Result<(), StoreError>> {
        Box::pin(self.dispatch(action))
    }
}

impl<S> Drop for StoreInner<S> {
    fn drop(&mut self) {
        let workers = self
            .workers
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        for worker in workers.drain(..) {
            worker.abort();
        }
    }
}

/// The Store - host for bindings
///
/// # Example
///
/// ```ignore
/// let store = Store::new(AppState::default(), root_reducer);
/// store.run(&cost_async)?;
///
/// store.dispatch(counter.actions().create(CounterAction::Increment, None)).await?;
/// let count = store.state(|s| s.counter).await;
/// ```
pub struct Store<S> {
    inner: Arc<StoreInner<S>>,
}

impl<S> Clone for Store<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S> std::fmt::Debug for Store<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("config", &self.inner.config)
            .field("shutdown", &self.inner.shutdown.load(Ordering::Acquire))
            .field("in_flight", &self.inner.in_flight.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl<S> Store<S>
where
    S: Send + Sync + 'static,
{
    /// Create a store with default configuration
    #[must_use]
    pub fn new<R>(initial_state: S, reducer: R) -> Self
    where
        R: Reducer<State = S> + 'static,
    {
        Self::with_config(initial_state, reducer, StoreConfig::default())
    }

    /// Create a store with custom configuration
    #[must_use]
    pub fn with_config<R>(initial_state: S, reducer: R, config: StoreConfig) -> Self
    where
        R: Reducer<State = S> + 'static,
    {
        let (action_broadcast, _) = broadcast::channel(config.broadcast_capacity.max(1));

        tracing::debug!(
            broadcast_capacity = config.broadcast_capacity,
            "Store created"
        );

        Self {
            inner: Arc::new(StoreInner {
                state: RwLock::new(initial_state),
                reducer: Box::new(reducer),
                routes: Mutex::new(Vec::new()),
                action_broadcast,
                shutdown: AtomicBool::new(false),
                in_flight: Arc::new(AtomicUsize::new(0)),
                workers: Mutex::new(Vec::new()),
                effect_types: Mutex::new(HashSet::new()),
                config,
            }),
        }
    }

    /// Dispatch an action
    ///
    /// Runs the root reducer under the write lock, then hands the action to
    /// every watcher. Concurrent dispatches serialize at the reducer.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] if the store is shutting down.
    #[tracing::instrument(skip(self, action), fields(action_type = %action.action_type), name = "store_dispatch")]
    pub async fn dispatch(&self, action: Action) -> Result<(), StoreError> {
        self.inner.dispatch(action).await
    }

    /// Read current state via a closure
    ///
    /// ```ignore
    /// let count = store.state(|s| s.counter).await;
    /// ```
    pub async fn state<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&S) -> T,
    {
        let state = self.inner.state.read().await;
        f(&state)
    }

    /// Subscribe to every action dispatched from now on
    ///
    /// The receiver buffers [`StoreConfig::broadcast_capacity`] actions and
    /// reports a lag when it falls further behind.
    #[must_use]
    pub fn subscribe_actions(&self) -> broadcast::Receiver<Action> {
        self.inner.action_broadcast.subscribe()
    }

    /// A weak dispatch handle for effect handlers
    #[must_use]
    pub fn dispatcher(&self) -> Dispatcher {
        let target: Weak<dyn DispatchTarget> = Arc::downgrade(&self.inner) as Weak<dyn DispatchTarget>;

        Dispatcher {
            target,
            in_flight: Arc::clone(&self.inner.in_flight),
        }
    }

    /// Start `binding`'s worker on this store
    ///
    /// Watchers are routed before this returns, so every matching action
    /// dispatched afterwards reaches them.
    ///
    /// # Errors
    ///
    /// - [`StoreError::ShutdownInProgress`] if the store is shutting down
    /// - [`StoreError::Binding`] with [`BindingError::DuplicateActionType`] if
    ///   an already running binding declares one of the same action types
    pub fn run<N: ActionName>(&self, binding: &AsyncBinding<N>) -> Result<WorkerHandle, StoreError> {
        if self.inner.shutdown.load(Ordering::Acquire) {
            return Err(StoreError::ShutdownInProgress);
        }

        {
            let mut registered = self
                .inner
                .effect_types
                .lock()
                .unwrap_or_else(PoisonError::into_inner);

            let declared: Vec<ActionType> = binding.action_types().cloned().collect();
            if let Some(taken) = declared.iter().find(|t| registered.contains(*t)) {
                return Err(BindingError::DuplicateActionType(taken.to_string()).into());
            }
            registered.extend(declared);
        }

        let inner = &self.inner;
        let worker = binding.worker(self.dispatcher(), |action_type| inner.open_route(action_type));
        let handle = tokio::spawn(worker);

        {
            let mut workers = self.inner.workers.lock().unwrap_or_else(PoisonError::into_inner);
            workers.retain(|worker| !worker.is_finished());
            workers.push(handle.abort_handle());
        }

        tracing::info!(namespace = %binding.namespace(), "Worker started");

        Ok(WorkerHandle {
            namespace: binding.namespace().to_string(),
            handle,
        })
    }

    /// Workers started by [`Store::run`] that are still running
    #[must_use]
    pub fn running_workers(&self) -> usize {
        let mut workers = self.inner.workers.lock().unwrap_or_else(PoisonError::into_inner);
        workers.retain(|worker| !worker.is_finished());
        workers.len()
    }

    /// Effect runs currently in flight
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.inner.in_flight.load(Ordering::SeqCst)
    }

    /// Whether shutdown has been initiated
    #[must_use]
    pub fn is_shutting_down(&self) -> bool {
        self.inner.shutdown.load(Ordering::Acquire)
    }

    /// Initiate graceful shutdown of the store
    ///
    /// 1. Stops accepting actions
    /// 2. Stops every worker, cancelling the effect runs they started
    /// 3. Waits for in-flight runs to unwind, up to `timeout`
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownTimeout`] if runs are still in flight
    /// when the timeout expires.
    pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError> {
        tracing::info!("Initiating graceful shutdown");
        self.inner.shutdown.store(true, Ordering::Release);

        let workers: Vec<AbortHandle> = self
            .inner
            .workers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();
        for worker in &workers {
            worker.abort();
        }
        self.inner
            .routes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();

        let start = tokio::time::Instant::now();
        let poll_interval = Duration::from_millis(10);

        loop {
            let pending = self.in_flight();
            if pending == 0 {
                tracing::info!(workers = workers.len(), "Shutdown complete");
                return Ok(());
            }

            if start.elapsed() >= timeout {
                tracing::error!(pending_effects = pending, "Shutdown timeout");
                return Err(StoreError::ShutdownTimeout(pending));
            }

            tracing::debug!(pending_effects = pending, "Waiting for effects to unwind");
            tokio::time::sleep(poll_interval).await;
        }
    }

    /// [`Store::shutdown`] with the configured default timeout
    ///
    /// # Errors
    ///
    /// See [`Store::shutdown`].
    pub async fn shutdown_default(&self) -> Result<(), StoreError> {
        self.shutdown(self.inner.config.shutdown_timeout).await
    }
}
