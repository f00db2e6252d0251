//! Effect-driven bindings
//!
//! An [`AsyncBinding`] owns one namespace and a table of effect handlers keyed
//! by action name. Each entry is either a bare handler (watched with
//! [`WatchMode::All`]) or a handler paired with an explicit mode. The binding
//! derives creators for its names the same way a sync binding does, and
//! produces one aggregate worker that [`Store::run`](crate::Store::run) spawns.
//!
//! Handlers receive the triggering action and an [`EffectContext`] through
//! which they dispatch follow-up actions and wait.

use crate::error::StoreError;
use crate::store::Dispatcher;
use crate::watch::{WatchMode, Watcher};
use futures::future::BoxFuture;
use namespaced_store_core::creators::{map_to_actions, ActionCreators, ActionName};
use namespaced_store_core::{Action, ActionType, BindingError};
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

/// Future returned by an effect handler
pub type EffectFuture = BoxFuture<'static, anyhow::Result<()>>;

/// A type-erased effect handler
pub type EffectHandler = Arc<dyn Fn(Action, EffectContext) -> EffectFuture + Send + Sync>;

/// Box a closure returning a future into an [`EffectHandler`]
pub fn effect_handler<F, Fut>(handler: F) -> EffectHandler
where
    F: Fn(Action, EffectContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Arc::new(move |action, context| Box::pin(handler(action, context)))
}

/// What a handler run can do besides compute
///
/// Cloneable; clones share the run's cancellation signal.
#[derive(Clone)]
pub struct EffectContext {
    dispatcher: Dispatcher,
    action_type: ActionType,
    cancelled: watch::Receiver<bool>,
}

impl EffectContext {
    pub(crate) const fn new(
        dispatcher: Dispatcher,
        action_type: ActionType,
        cancelled: watch::Receiver<bool>,
    ) -> Self {
        Self {
            dispatcher,
            action_type,
            cancelled,
        }
    }

    /// Dispatch an action into the store
    ///
    /// # Errors
    ///
    /// - [`StoreError::Cancelled`] once a newer run has replaced this one
    /// - [`StoreError::ShutdownInProgress`] or [`StoreError::StoreDropped`]
    ///   from the store
    pub async fn put(&self, action: Action) -> Result<(), StoreError> {
        if self.is_cancelled() {
            tracing::debug!(
                action_type = %action.action_type,
                effect = %self.action_type,
                "Dropped put from cancelled run"
            );
            return Err(StoreError::Cancelled);
        }

        self.dispatcher.dispatch(action).await
    }

    /// Suspend the run for `duration`
    pub async fn delay(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    /// Whether a newer run has cancelled this one
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.cancelled.borrow()
    }

    /// Resolve once this run is cancelled
    ///
    /// Never resolves for runs that cannot be cancelled.
    pub async fn cancelled(&self) {
        let mut cancelled = self.cancelled.clone();
        if cancelled.wait_for(|flag| *flag).await.is_err() {
            std::future::pending::<()>().await;
        }
    }

    /// The composed type that triggered this run
    #[must_use]
    pub const fn action_type(&self) -> &ActionType {
        &self.action_type
    }

    /// The underlying dispatcher, for handing to code outside the run
    #[must_use]
    pub const fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }
}

impl std::fmt::Debug for EffectContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectContext")
            .field("action_type", &self.action_type)
            .field("cancelled", &self.is_cancelled())
            .finish_non_exhaustive()
    }
}

/// One entry of an effect table
///
/// Mode names are checked when the binding is built, which is where an
/// unknown mode is reported.
#[derive(Clone)]
pub enum EffectDescriptor {
    /// A bare handler, watched with [`WatchMode::All`]
    Handler(EffectHandler),

    /// A handler with an explicit mode, by name (`watchLatestOnly`, `takeLatest`, ...)
    Moded {
        /// Mode name
        mode: String,
        /// The handler
        handler: EffectHandler,
    },
}

impl std::fmt::Debug for EffectDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Handler(_) => f.write_str("Handler(..)"),
            Self::Moded { mode, .. } => f.debug_struct("Moded").field("mode", mode).finish_non_exhaustive(),
        }
    }
}

/// A validated effect
#[derive(Clone)]
struct Effect<N> {
    name: N,
    action_type: ActionType,
    mode: WatchMode,
    handler: EffectHandler,
}

/// Builder for [`AsyncBinding`]
pub struct AsyncBindingBuilder<N: ActionName> {
    namespace: String,
    effects: Vec<(N, EffectDescriptor)>,
}

impl<N: ActionName> AsyncBindingBuilder<N> {
    /// Register a bare handler for `name`, watched with [`WatchMode::All`]
    #[must_use]
    pub fn effect<F, Fut>(self, name: N, handler: F) -> Self
    where
        F: Fn(Action, EffectContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.effect_descriptor(name, EffectDescriptor::Handler(effect_handler(handler)))
    }

    /// Register a handler for `name` with an explicit mode
    #[must_use]
    pub fn effect_with<F, Fut>(self, name: N, mode: WatchMode, handler: F) -> Self
    where
        F: Fn(Action, EffectContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.effect_descriptor(
            name,
            EffectDescriptor::Moded {
                mode: mode.as_str().to_string(),
                handler: effect_handler(handler),
            },
        )
    }

    /// Register a prebuilt descriptor for `name`
    #[must_use]
    pub fn effect_descriptor(mut self, name: N, descriptor: EffectDescriptor) -> Self {
        self.effects.push((name, descriptor));
        self
    }

    /// Finish the binding
    ///
    /// # Errors
    ///
    /// - [`BindingError::DuplicateName`] if a name was registered twice
    /// - [`BindingError::UnknownWatchMode`] if a descriptor names no known mode
    pub fn build(self) -> Result<AsyncBinding<N>, BindingError> {
        let mut seen = HashSet::with_capacity(self.effects.len());
        let mut effects = Vec::with_capacity(self.effects.len());

        for (name, descriptor) in self.effects {
            if !seen.insert(name) {
                return Err(BindingError::DuplicateName {
                    namespace: self.namespace,
                    name: name.as_str().to_string(),
                });
            }

            let (mode, handler) = match descriptor {
                EffectDescriptor::Handler(handler) => (WatchMode::All, handler),
                EffectDescriptor::Moded { mode, handler } => {
                    let mode = mode.parse::<WatchMode>().map_err(|error| BindingError::UnknownWatchMode {
                        name: name.as_str().to_string(),
                        mode: error.0,
                    })?;
                    (mode, handler)
                },
            };

            effects.push(Effect {
                name,
                action_type: ActionType::compose(self.namespace.as_str(), name.as_str()),
                mode,
                handler,
            });
        }

        let actions = map_to_actions(self.namespace.as_str(), effects.iter().map(|e| e.name));

        tracing::debug!(
            namespace = %self.namespace,
            effects = effects.len(),
            "Async binding created"
        );

        Ok(AsyncBinding {
            namespace: self.namespace,
            effects: Arc::new(effects),
            actions,
        })
    }
}

/// One namespace's effect handlers and action creators
pub struct AsyncBinding<N: ActionName> {
    namespace: String,
    effects: Arc<Vec<Effect<N>>>,
    actions: ActionCreators<N>,
}

impl<N: ActionName> AsyncBinding<N> {
    /// Start a binding for `namespace`
    #[must_use]
    pub fn builder(namespace: impl Into<String>) -> AsyncBindingBuilder<N> {
        AsyncBindingBuilder {
            namespace: namespace.into(),
            effects: Vec::new(),
        }
    }

    /// The binding's namespace
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Action creators, one per registered effect
    #[must_use]
    pub const fn actions(&self) -> &ActionCreators<N> {
        &self.actions
    }

    /// Every composed type this binding watches
    pub fn action_types(&self) -> impl Iterator<Item = &ActionType> {
        self.effects.iter().map(|e| &e.action_type)
    }

    /// The mode `name` is watched with
    #[must_use]
    pub fn mode(&self, name: N) -> Option<WatchMode> {
        self.effects.iter().find(|e| e.name == name).map(|e| e.mode)
    }

    /// The aggregate worker: one watcher per effect, all running concurrently
    ///
    /// Every watcher opens its delivery channel through `route` before this
    /// returns. The worker ends when the store drops those channels; dropping
    /// or aborting it stops every watcher and the runs they own.
    pub(crate) fn worker<F>(&self, dispatcher: Dispatcher, mut route: F) -> BoxFuture<'static, ()>
    where
        F: FnMut(&ActionType) -> mpsc::UnboundedReceiver<Action>,
    {
        let watchers: Vec<Watcher> = self
            .effects
            .iter()
            .map(|effect| Watcher {
                action_type: effect.action_type.clone(),
                mode: effect.mode,
                handler: Arc::clone(&effect.handler),
                dispatcher: dispatcher.clone(),
                actions: route(&effect.action_type),
            })
            .collect();

        Box::pin(async move {
            futures::future::join_all(watchers.into_iter().map(Watcher::run)).await;
        })
    }
}

impl<N: ActionName> Clone for AsyncBinding<N> {
    fn clone(&self) -> Self {
        Self {
            namespace: self.namespace.clone(),
            effects: Arc::clone(&self.effects),
            actions: self.actions.clone(),
        }
    }
}

impl<N: ActionName> std::fmt::Debug for AsyncBinding<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let effects: Vec<_> = self
            .effects
            .iter()
            .map(|e| (e.name.as_str(), e.mode.as_str()))
            .collect();

        f.debug_struct("AsyncBinding")
            .field("namespace", &self.namespace)
            .field("effects", &effects)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::store::Store;
    use namespaced_store_core::Reducer;
    use namespaced_store_macros::ActionName;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(ActionName, Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum Job {
        Run,
        Other,
    }

    /// Records every action type it sees
    struct Log;

    impl Reducer for Log {
        type State = Vec<Action>;

        fn reduce(&self, state: &mut Vec<Action>, action: &Action) {
            state.push(action.clone());
        }
    }

    fn finished(n: u64) -> Action {
        Action::new("@Job/finished", Some(json!(n)))
    }

    fn finished_payloads(log: &[Action]) -> Vec<u64> {
        log.iter()
            .filter(|a| a.action_type == "@Job/finished")
            .filter_map(|a| a.payload.as_ref().and_then(serde_json::Value::as_u64))
            .collect()
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_secs(5)).await;
    }

    fn delayed_job(mode: WatchMode) -> AsyncBinding<Job> {
        AsyncBinding::builder("Job")
            .effect_with(Job::Run, mode, |action, ctx| async move {
                ctx.delay(Duration::from_secs(1)).await;
                let n = action.payload.as_ref().and_then(serde_json::Value::as_u64).unwrap_or(0);
                ctx.put(finished(n)).await?;
                Ok(())
            })
            .build()
            .unwrap()
    }

    #[test]
    fn test_creators_and_modes() {
        let binding = AsyncBinding::builder("Job")
            .effect(Job::Run, |_, _| async { Ok(()) })
            .build()
            .unwrap();

        assert_eq!(binding.actions().create(Job::Run, None).action_type, "@Job/run");
        assert_eq!(binding.mode(Job::Run), Some(WatchMode::All));
        assert_eq!(binding.mode(Job::Other), None);
        assert_eq!(binding.action_types().count(), 1);
    }

    #[test]
    fn test_unknown_mode_rejected_at_build() {
        let result = AsyncBinding::builder("Job")
            .effect_descriptor(
                Job::Run,
                EffectDescriptor::Moded {
                    mode: "takeSometimes".to_string(),
                    handler: effect_handler(|_, _| async { Ok(()) }),
                },
            )
            .build();

        assert_eq!(
            result.unwrap_err(),
            BindingError::UnknownWatchMode {
                name: "run".to_string(),
                mode: "takeSometimes".to_string(),
            }
        );
    }

    #[test]
    fn test_mode_alias_accepted() {
        let binding = AsyncBinding::builder("Job")
            .effect_descriptor(
                Job::Run,
                EffectDescriptor::Moded {
                    mode: "takeLeading".to_string(),
                    handler: effect_handler(|_, _| async { Ok(()) }),
                },
            )
            .build()
            .unwrap();

        assert_eq!(binding.mode(Job::Run), Some(WatchMode::LeadingOnly));
    }

    #[test]
    fn test_duplicate_effect_rejected() {
        let result = AsyncBinding::builder("Job")
            .effect(Job::Run, |_, _| async { Ok(()) })
            .effect(Job::Run, |_, _| async { Ok(()) })
            .build();

        assert!(matches!(result, Err(BindingError::DuplicateName { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_watch_all_runs_every_action() {
        let store = Store::new(Vec::new(), Log);
        let binding = delayed_job(WatchMode::All);
        store.run(&binding).unwrap();

        for n in 0..3 {
            store
                .dispatch(binding.actions().create(Job::Run, Some(json!(n))))
                .await
                .unwrap();
        }
        settle().await;

        let mut done = store.state(|log| finished_payloads(log)).await;
        done.sort_unstable();
        assert_eq!(done, vec![0, 1, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_latest_only_keeps_last_run() {
        let store = Store::new(Vec::new(), Log);
        let binding = delayed_job(WatchMode::LatestOnly);
        store.run(&binding).unwrap();

        for n in 0..3 {
            store
                .dispatch(binding.actions().create(Job::Run, Some(json!(n))))
                .await
                .unwrap();
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        settle().await;

        assert_eq!(store.state(|log| finished_payloads(log)).await, vec![2]);
        assert_eq!(store.in_flight(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_latest_only_sequential_runs_all_complete() {
        let store = Store::new(Vec::new(), Log);
        let binding = delayed_job(WatchMode::LatestOnly);
        store.run(&binding).unwrap();

        for n in 0..2 {
            store
                .dispatch(binding.actions().create(Job::Run, Some(json!(n))))
                .await
                .unwrap();
            settle().await;
        }

        assert_eq!(store.state(|log| finished_payloads(log)).await, vec![0, 1]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_leading_only_ignores_while_active() {
        let store = Store::new(Vec::new(), Log);
        let binding = delayed_job(WatchMode::LeadingOnly);
        store.run(&binding).unwrap();

        for n in 0..3 {
            store
                .dispatch(binding.actions().create(Job::Run, Some(json!(n))))
                .await
                .unwrap();
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        settle().await;
        assert_eq!(store.state(|log| finished_payloads(log)).await, vec![0]);

        store
            .dispatch(binding.actions().create(Job::Run, Some(json!(9))))
            .await
            .unwrap();
        settle().await;
        assert_eq!(store.state(|log| finished_payloads(log)).await, vec![0, 9]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_run_observes_signal() {
        let observed = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&observed);

        let binding = AsyncBinding::builder("Job")
            .effect_with(Job::Run, WatchMode::LatestOnly, move |_, ctx| {
                let seen = Arc::clone(&seen);
                async move {
                    tokio::select! {
                        () = ctx.cancelled() => {
                            seen.fetch_add(1, Ordering::SeqCst);
                        },
                        () = ctx.delay(Duration::from_secs(1)) => {},
                    }
                    Ok(())
                }
            })
            .build()
            .unwrap();

        let store = Store::new(Vec::new(), Log);
        store.run(&binding).unwrap();

        store.dispatch(binding.actions().create(Job::Run, None)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        store.dispatch(binding.actions().create(Job::Run, None)).await.unwrap();
        settle().await;

        // The abort may land before the first run is polled again.
        assert!(observed.load(Ordering::SeqCst) <= 1);
        assert_eq!(store.in_flight(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unrelated_actions_do_not_trigger() {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&runs);

        let binding = AsyncBinding::builder("Job")
            .effect(Job::Run, move |_, _| {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Ok(()) }
            })
            .build()
            .unwrap();

        let store = Store::new(Vec::new(), Log);
        store.run(&binding).unwrap();

        store.dispatch(Action::new("@Other/run", None)).await.unwrap();
        store.dispatch(Action::new("Job/run", None)).await.unwrap();
        store.dispatch(binding.actions().create(Job::Other, None)).await.unwrap();
        settle().await;

        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_put_after_cancel_is_refused() {
        let store = Store::new(Vec::new(), Log);
        let (cancel, cancelled) = watch::channel(false);
        let ctx = EffectContext::new(store.dispatcher(), ActionType::compose("Job", "run"), cancelled);

        ctx.put(finished(1)).await.unwrap();
        cancel.send(true).unwrap();

        assert!(ctx.is_cancelled());
        assert!(matches!(ctx.put(finished(2)).await, Err(StoreError::Cancelled)));
        assert_eq!(store.state(|log| finished_payloads(log)).await, vec![1]);
    }

    #[tokio::test]
    async fn test_handler_error_does_not_stop_worker() {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&runs);

        let binding = AsyncBinding::builder("Job")
            .effect(Job::Run, move |_, _| {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n == 0 {
                        anyhow::bail!("first run fails");
                    }
                    Ok(())
                }
            })
            .build()
            .unwrap();

        let store = Store::new(Vec::new(), Log);
        let worker = store.run(&binding).unwrap();

        store.dispatch(binding.actions().create(Job::Run, None)).await.unwrap();
        store.dispatch(binding.actions().create(Job::Run, None)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(runs.load(Ordering::SeqCst), 2);
        assert!(!worker.is_finished());
    }
}
