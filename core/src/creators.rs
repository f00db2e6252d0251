//! Action creators derived from a namespace and a closed set of action names
//!
//! Every binding names its actions with an enumeration implementing
//! [`ActionName`] (usually via `#[derive(ActionName)]`). The factory turns the
//! keys of a definition table into creators that stamp the composed type onto
//! each action.
//!
//! # Example
//!
//! ```
//! use namespaced_store_core::creators::{map_to_actions, ActionName};
//! use namespaced_store_core::action::Action;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
//! enum CounterAction { Increment, Decrement }
//!
//! impl ActionName for CounterAction {
//!     const ALL: &'static [Self] = &[Self::Increment, Self::Decrement];
//!
//!     fn as_str(self) -> &'static str {
//!         match self {
//!             Self::Increment => "increment",
//!             Self::Decrement => "decrement",
//!         }
//!     }
//! }
//!
//! let actions = map_to_actions("Counter", CounterAction::ALL.iter().copied());
//! assert_eq!(
//!     actions.create(CounterAction::Increment, None),
//!     Action::new("@Counter/increment", None),
//! );
//! ```

use crate::action::Action;
use crate::action_type::ActionType;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

/// Closed enumeration of the action names of one namespace
pub trait ActionName: Copy + Eq + Hash + fmt::Debug + Send + Sync + 'static {
    /// Every name, in declaration order
    const ALL: &'static [Self];

    /// The wire name used inside the composed type
    fn as_str(self) -> &'static str;

    /// Resolve a wire name back to its variant
    #[must_use]
    fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|n| n.as_str() == name)
    }
}

/// A single action creator for one composed type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionCreator {
    action_type: ActionType,
}

impl ActionCreator {
    /// The type this creator stamps
    #[must_use]
    pub const fn action_type(&self) -> &ActionType {
        &self.action_type
    }

    /// Build an action with an optional payload
    #[must_use]
    pub fn call(&self, payload: Option<Value>) -> Action {
        Action::of(&self.action_type, payload)
    }
}

/// Mapping from action name to its creator
#[derive(Debug, Clone)]
pub struct ActionCreators<N: ActionName> {
    namespace: String,
    creators: HashMap<N, ActionCreator>,
}

impl<N: ActionName> ActionCreators<N> {
    /// The namespace every creator composes with
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Look up the creator for `name`
    ///
    /// `None` when `name` was not a key of the definition table.
    #[must_use]
    pub fn creator(&self, name: N) -> Option<&ActionCreator> {
        self.creators.get(&name)
    }

    /// Composed type for `name`
    ///
    /// Composed on the fly when `name` is not in the table, so the result is
    /// always the type a binding for this namespace would route.
    #[must_use]
    pub fn action_type(&self, name: N) -> ActionType {
        self.creators.get(&name).map_or_else(
            || ActionType::compose(self.namespace.as_str(), name.as_str()),
            |c| c.action_type.clone(),
        )
    }

    /// Build `{ type: @namespace/name, payload }`
    #[must_use]
    pub fn create(&self, name: N, payload: Option<Value>) -> Action {
        Action::of(&self.action_type(name), payload)
    }

    /// Build an action with a typed payload
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error if `payload` cannot be serialized.
    pub fn with_payload<T: Serialize + ?Sized>(
        &self,
        name: N,
        payload: &T,
    ) -> Result<Action, serde_json::Error> {
        Ok(self.create(name, Some(serde_json::to_value(payload)?)))
    }

    /// Every composed type in this mapping
    pub fn action_types(&self) -> impl Iterator<Item = &ActionType> {
        self.creators.values().map(ActionCreator::action_type)
    }

    /// Number of creators
    #[must_use]
    pub fn len(&self) -> usize {
        self.creators.len()
    }

    /// Whether the mapping is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.creators.is_empty()
    }
}

/// Derive creators for every key of a definition table.
///
/// Only the keys matter; the values of the table (reducers or effect
/// descriptors) are never inspected.
#[must_use]
pub fn map_to_actions<N, I>(namespace: impl Into<String>, keys: I) -> ActionCreators<N>
where
    N: ActionName,
    I: IntoIterator<Item = N>,
{
    let namespace = namespace.into();
    let creators = keys
        .into_iter()
        .map(|name| {
            let action_type = ActionType::compose(namespace.as_str(), name.as_str());
            (name, ActionCreator { action_type })
        })
        .collect();

    ActionCreators {
        namespace,
        creators,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use namespaced_store_macros::ActionName;
    use serde_json::json;

    #[derive(ActionName, Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum TodoAction {
        Set,
        FetchList,
        #[action(name = "remove_item")]
        Remove,
    }

    #[test]
    fn test_derived_names() {
        assert_eq!(TodoAction::Set.as_str(), "set");
        assert_eq!(TodoAction::FetchList.as_str(), "fetchList");
        assert_eq!(TodoAction::Remove.as_str(), "remove_item");
        assert_eq!(TodoAction::from_name("fetchList"), Some(TodoAction::FetchList));
        assert_eq!(TodoAction::from_name("unknown"), None);
    }

    #[test]
    fn test_creators_cover_table_keys_only() {
        let actions = map_to_actions("Todo", [TodoAction::Set, TodoAction::FetchList]);

        assert_eq!(actions.len(), 2);
        assert!(actions.creator(TodoAction::Remove).is_none());
        assert_eq!(
            actions.creator(TodoAction::FetchList).unwrap().call(None),
            Action::new("@Todo/fetchList", None)
        );
    }

    #[test]
    fn test_with_payload() {
        let actions = map_to_actions("Todo", TodoAction::ALL.iter().copied());
        let action = actions.with_payload(TodoAction::Set, &vec![1, 2]).unwrap();

        assert_eq!(action.action_type, "@Todo/set");
        assert_eq!(action.payload, Some(json!([1, 2])));
    }
}
