//! # Namespaced Store Core
//!
//! Core types for binding "namespace + action name" pairs to action creators
//! and reducers.
//!
//! ## Core Concepts
//!
//! - **`ActionType`**: `(namespace, name)` pair with canonical form `@namespace/name`
//! - **Action**: `{ type, payload }`, routed by its composed type
//! - **Action creators**: derived from the keys of a binding's definition table
//! - **`SyncBinding`**: one namespace's initial state and dispatch-table reducer
//! - **Reducer composition**: bindings mounted under state keys of one root state
//!
//! Effect-driven bindings live in the runtime crate, next to the store that
//! runs them.
//!
//! ## Example
//!
//! ```ignore
//! use namespaced_store_core::prelude::*;
//!
//! #[derive(ActionName, Debug, Clone, Copy, PartialEq, Eq, Hash)]
//! enum CounterAction {
//!     Increment,
//!     Decrement,
//! }
//!
//! let counter = SyncBinding::builder("Counter", 0_i64)
//!     .reducer(CounterAction::Increment, |c, _| c + 1)
//!     .reducer(CounterAction::Decrement, |c, _| c - 1)
//!     .build()?;
//!
//! let increment = counter.actions().create(CounterAction::Increment, None);
//! assert_eq!(increment.action_type, "@Counter/increment");
//! ```

// Lets `#[derive(ActionName)]` name this crate from inside its own tests.
extern crate self as namespaced_store_core;

pub mod action;
pub mod action_type;
pub mod composition;
pub mod creators;
pub mod environment;
pub mod error;
pub mod sync_binding;

pub use action::Action;
pub use action_type::{ActionType, ActionTypeError};
pub use composition::{combine_reducers, scope_reducer, CombinedReducer, Reducer};
pub use creators::{map_to_actions, ActionCreator, ActionCreators, ActionName};
pub use error::BindingError;
pub use sync_binding::SyncBinding;

// Re-export commonly used types
pub use serde_json::{json, Value};

/// Everything a binding definition usually needs
pub mod prelude {
    pub use crate::action::Action;
    pub use crate::action_type::ActionType;
    pub use crate::composition::{combine_reducers, Reducer};
    pub use crate::creators::{ActionCreators, ActionName};
    pub use crate::error::BindingError;
    pub use crate::sync_binding::SyncBinding;
    pub use serde_json::{json, Value};
}
