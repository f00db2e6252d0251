//! Reducer trait and composition utilities
//!
//! The host store owns a single root state and a single root reducer. Bindings
//! are mounted under named state keys with [`combine_reducers`]:
//!
//! ```
//! use namespaced_store_core::composition::{combine_reducers, Reducer};
//! use namespaced_store_core::creators::ActionName;
//! use namespaced_store_core::sync_binding::SyncBinding;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
//! enum Counter { Increment }
//!
//! impl ActionName for Counter {
//!     const ALL: &'static [Self] = &[Self::Increment];
//!     fn as_str(self) -> &'static str { "increment" }
//! }
//!
//! #[derive(Default)]
//! struct AppState { counter: i64 }
//!
//! let counter = SyncBinding::builder("Counter", 0_i64)
//!     .reducer(Counter::Increment, |c, _| c + 1)
//!     .build()?;
//! let increment = counter.actions().create(Counter::Increment, None);
//!
//! let root = combine_reducers::<AppState>()
//!     .slice("counter", |s: &mut AppState| &mut s.counter, counter)?
//!     .build();
//!
//! let mut state = AppState::default();
//! root.reduce(&mut state, &increment);
//! assert_eq!(state.counter, 1);
//! # Ok::<(), namespaced_store_core::error::BindingError>(())
//! ```

use crate::action::Action;
use crate::action_type::ActionType;
use crate::error::BindingError;
use std::collections::HashSet;
use std::sync::Arc;

/// A reducer over some state
///
/// Reducers run synchronously while the store holds its write lock. They must
/// not block and must be deterministic in `(state, action)`.
pub trait Reducer: Send + Sync {
    /// The state this reducer operates on
    type State;

    /// Apply `action` to `state`
    fn reduce(&self, state: &mut Self::State, action: &Action);

    /// The composed types this reducer reacts to
    fn action_types(&self) -> Vec<ActionType> {
        Vec::new()
    }
}

impl<R: Reducer + ?Sized> Reducer for Arc<R> {
    type State = R::State;

    fn reduce(&self, state: &mut Self::State, action: &Action) {
        (**self).reduce(state, action);
    }

    fn action_types(&self) -> Vec<ActionType> {
        (**self).action_types()
    }
}

impl<R: Reducer + ?Sized> Reducer for Box<R> {
    type State = R::State;

    fn reduce(&self, state: &mut Self::State, action: &Action) {
        (**self).reduce(state, action);
    }

    fn action_types(&self) -> Vec<ActionType> {
        (**self).action_types()
    }
}

/// Projection from the root state to one slice
pub type Lens<Root, S> = fn(&mut Root) -> &mut S;

/// A reducer focused on one field of a larger state
pub struct Scoped<Root, R: Reducer> {
    key: String,
    lens: Lens<Root, R::State>,
    reducer: R,
}

impl<Root, R: Reducer> Scoped<Root, R> {
    /// The state key this slice is mounted under
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl<Root, R> Reducer for Scoped<Root, R>
where
    R: Reducer,
    Root: 'static,
{
    type State = Root;

    fn reduce(&self, state: &mut Root, action: &Action) {
        self.reducer.reduce((self.lens)(state), action);
    }

    fn action_types(&self) -> Vec<ActionType> {
        self.reducer.action_types()
    }
}

/// Focus `reducer` on the slice of `Root` selected by `lens`
#[must_use]
pub fn scope_reducer<Root, R: Reducer>(
    key: impl Into<String>,
    lens: Lens<Root, R::State>,
    reducer: R,
) -> Scoped<Root, R> {
    Scoped {
        key: key.into(),
        lens,
        reducer,
    }
}

type BoxedReducer<Root> = Box<dyn Reducer<State = Root>>;

/// Builder returned by [`combine_reducers`]
pub struct CombineBuilder<Root> {
    keys: HashSet<String>,
    reducers: Vec<BoxedReducer<Root>>,
}

impl<Root: 'static> CombineBuilder<Root> {
    /// Mount `reducer` under `key`
    ///
    /// # Errors
    ///
    /// Returns [`BindingError::DuplicateKey`] if `key` is already mounted.
    pub fn slice<R>(
        mut self,
        key: impl Into<String>,
        lens: Lens<Root, R::State>,
        reducer: R,
    ) -> Result<Self, BindingError>
    where
        R: Reducer + 'static,
    {
        let key = key.into();
        if !self.keys.insert(key.clone()) {
            return Err(BindingError::DuplicateKey(key));
        }

        self.reducers.push(Box::new(scope_reducer(key, lens, reducer)));
        Ok(self)
    }

    /// Add a reducer over the whole root state
    #[must_use]
    pub fn root<R>(mut self, reducer: R) -> Self
    where
        R: Reducer<State = Root> + 'static,
    {
        self.reducers.push(Box::new(reducer));
        self
    }

    /// Finish the combined reducer
    #[must_use]
    pub fn build(self) -> CombinedReducer<Root> {
        CombinedReducer {
            reducers: self.reducers,
        }
    }
}

/// Start combining reducers over `Root`
#[must_use]
pub fn combine_reducers<Root>() -> CombineBuilder<Root> {
    CombineBuilder {
        keys: HashSet::new(),
        reducers: Vec::new(),
    }
}

/// Several reducers over one root state, run in registration order
pub struct CombinedReducer<Root> {
    reducers: Vec<BoxedReducer<Root>>,
}

impl<Root> CombinedReducer<Root> {
    /// Fail if two mounted reducers declare the same composed type
    ///
    /// # Errors
    ///
    /// Returns [`BindingError::DuplicateActionType`] on the first collision.
    pub fn ensure_unique_action_types(&self) -> Result<(), BindingError> {
        let mut seen = HashSet::new();
        for reducer in &self.reducers {
            for action_type in reducer.action_types() {
                if !seen.insert(action_type.clone()) {
                    return Err(BindingError::DuplicateActionType(action_type.to_string()));
                }
            }
        }
        Ok(())
    }
}

impl<Root> std::fmt::Debug for CombinedReducer<Root> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CombinedReducer")
            .field("reducers", &self.reducers.len())
            .finish()
    }
}

impl<Root> Reducer for CombinedReducer<Root> {
    type State = Root;

    fn reduce(&self, state: &mut Root, action: &Action) {
        for reducer in &self.reducers {
            reducer.reduce(state, action);
        }
    }

    fn action_types(&self) -> Vec<ActionType> {
        self.reducers.iter().flat_map(|r| r.action_types()).collect()
    }
}
