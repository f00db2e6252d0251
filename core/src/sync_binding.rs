//! Reducer-driven bindings
//!
//! A [`SyncBinding`] owns one namespace, an initial state, and a table of
//! pure reducers keyed by action name. It derives the namespace's action
//! creators from the table and acts as a single dispatch-table reducer: an
//! incoming action is decomposed, its name looked up, and the matching
//! reducer's result replaces the state. Anything else leaves the state as is,
//! so several bindings can share one combined store without interfering.
//!
//! # Example
//!
//! ```
//! use namespaced_store_core::sync_binding::SyncBinding;
//! use namespaced_store_core::creators::ActionName;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
//! enum Counter { Increment }
//!
//! impl ActionName for Counter {
//!     const ALL: &'static [Self] = &[Self::Increment];
//!     fn as_str(self) -> &'static str { "increment" }
//! }
//!
//! let counter = SyncBinding::builder("Counter", 0_i64)
//!     .reducer(Counter::Increment, |count, _| count + 1)
//!     .build()?;
//!
//! let action = counter.actions().create(Counter::Increment, None);
//! assert_eq!(counter.next_state(None, &action), 1);
//! # Ok::<(), namespaced_store_core::error::BindingError>(())
//! ```

use crate::action::Action;
use crate::action_type::ActionType;
use crate::composition::Reducer;
use crate::creators::{map_to_actions, ActionCreators, ActionName};
use crate::error::BindingError;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// A pure reducer: `(state, payload) -> new state`
pub type ReducerFn<S> = Arc<dyn Fn(&S, Option<&Value>) -> S + Send + Sync>;

/// Builder for [`SyncBinding`]
pub struct SyncBindingBuilder<S, N: ActionName> {
    namespace: String,
    initial_state: S,
    reducers: Vec<(N, ReducerFn<S>)>,
}

impl<S, N: ActionName> SyncBindingBuilder<S, N> {
    /// Register the reducer for `name`
    #[must_use]
    pub fn reducer<F>(mut self, name: N, reducer: F) -> Self
    where
        F: Fn(&S, Option<&Value>) -> S + Send + Sync + 'static,
    {
        self.reducers.push((name, Arc::new(reducer)));
        self
    }

    /// Finish the binding
    ///
    /// # Errors
    ///
    /// Returns [`BindingError::DuplicateName`] if a name was registered twice.
    pub fn build(self) -> Result<SyncBinding<S, N>, BindingError> {
        let mut reducers = HashMap::with_capacity(self.reducers.len());

        for (name, reducer) in self.reducers {
            if reducers.insert(name, reducer).is_some() {
                return Err(BindingError::DuplicateName {
                    namespace: self.namespace,
                    name: name.as_str().to_string(),
                });
            }
        }

        let actions = map_to_actions(self.namespace.as_str(), reducers.keys().copied());

        tracing::debug!(
            namespace = %self.namespace,
            reducers = reducers.len(),
            "Sync binding created"
        );

        Ok(SyncBinding {
            namespace: self.namespace,
            initial_state: self.initial_state,
            reducers: Arc::new(reducers),
            actions,
        })
    }
}

/// One namespace's state, reducers, and action creators
pub struct SyncBinding<S, N: ActionName> {
    namespace: String,
    initial_state: S,
    reducers: Arc<HashMap<N, ReducerFn<S>>>,
    actions: ActionCreators<N>,
}

impl<S, N: ActionName> SyncBinding<S, N> {
    /// Start a binding for `namespace` with `initial_state`
    #[must_use]
    pub fn builder(namespace: impl Into<String>, initial_state: S) -> SyncBindingBuilder<S, N> {
        SyncBindingBuilder {
            namespace: namespace.into(),
            initial_state,
            reducers: Vec::new(),
        }
    }

    /// The binding's namespace
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Action creators, one per registered reducer
    #[must_use]
    pub const fn actions(&self) -> &ActionCreators<N> {
        &self.actions
    }

    /// The state used when the store has none yet
    #[must_use]
    pub const fn initial_state(&self) -> &S {
        &self.initial_state
    }

    /// Resolve the reducer an action routes to, if any
    fn lookup(&self, action: &Action) -> Option<&ReducerFn<S>> {
        let action_type = action.decomposed_type()?;
        if !action_type.is_in(&self.namespace) {
            return None;
        }

        let name = N::from_name(action_type.action_name())?;
        self.reducers.get(&name)
    }

    /// Whether this binding has a reducer for `action`
    #[must_use]
    pub fn handles(&self, action: &Action) -> bool {
        self.lookup(action).is_some()
    }

    /// Compute the next state
    ///
    /// `state` defaults to the initial state. When the action routes to no
    /// reducer the input state is returned unchanged.
    #[must_use]
    pub fn next_state(&self, state: Option<&S>, action: &Action) -> S
    where
        S: Clone,
    {
        let state = state.unwrap_or(&self.initial_state);

        match self.lookup(action) {
            Some(reducer) => reducer(state, action.payload.as_ref()),
            None => state.clone(),
        }
    }
}

impl<S: Clone, N: ActionName> Clone for SyncBinding<S, N> {
    fn clone(&self) -> Self {
        Self {
            namespace: self.namespace.clone(),
            initial_state: self.initial_state.clone(),
            reducers: Arc::clone(&self.reducers),
            actions: self.actions.clone(),
        }
    }
}

impl<S, N: ActionName> std::fmt::Debug for SyncBinding<S, N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.reducers.keys().map(|n| n.as_str()).collect();
        names.sort_unstable();

        f.debug_struct("SyncBinding")
            .field("namespace", &self.namespace)
            .field("reducers", &names)
            .finish_non_exhaustive()
    }
}

impl<S, N> Reducer for SyncBinding<S, N>
where
    S: Send + Sync,
    N: ActionName,
{
    type State = S;

    fn reduce(&self, state: &mut S, action: &Action) {
        if let Some(reducer) = self.lookup(action) {
            tracing::trace!(action_type = %action.action_type, "Applying reducer");
            *state = reducer(state, action.payload.as_ref());
        }
    }

    fn action_types(&self) -> Vec<ActionType> {
        self.actions.action_types().cloned().collect()
    }
}
