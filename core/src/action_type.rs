//! Namespaced action types
//!
//! An [`ActionType`] pairs a namespace with an action name. Its canonical
//! string form, `@{namespace}/{action_name}`, is what travels inside an
//! [`Action`](crate::action::Action) and what reducers and watchers route on.
//!
//! # Example
//!
//! ```
//! use namespaced_store_core::action_type::ActionType;
//!
//! let ty = ActionType::compose("Counter", "increment");
//! assert_eq!(ty.to_string(), "@Counter/increment");
//!
//! let parsed = ActionType::decompose("@Counter/increment");
//! assert_eq!(parsed, Some(ty));
//! ```

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Leading sigil of every composed action type.
pub const SIGIL: char = '@';

/// Separator between namespace and action name.
pub const SEPARATOR: char = '/';

/// Errors produced when strictly parsing an action type string.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ActionTypeError {
    /// The string does not start with `@`
    #[error("Action type `{0}` is missing the leading `@`")]
    MissingSigil(String),

    /// The string has no `/` between namespace and action name
    #[error("Action type `{0}` has no `/` separator")]
    MissingSeparator(String),
}

/// Immutable `(namespace, action_name)` pair.
///
/// No validation is performed on construction: callers must not put `/` in
/// the namespace, since [`ActionType::decompose`] splits on the first `/`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActionType {
    namespace: String,
    action_name: String,
}

impl ActionType {
    /// Compose an action type from its two parts.
    #[must_use]
    pub fn compose(namespace: impl Into<String>, action_name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            action_name: action_name.into(),
        }
    }

    /// Decompose a canonical type string.
    ///
    /// Strips the leading `@` and splits on the first `/`. Returns `None` when
    /// either is missing; such a type matches no reducer or watcher.
    #[must_use]
    pub fn decompose(type_string: &str) -> Option<Self> {
        let rest = type_string.strip_prefix(SIGIL)?;
        let (namespace, action_name) = rest.split_once(SEPARATOR)?;

        Some(Self::compose(namespace, action_name))
    }

    /// The namespace part
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// The action name part
    #[must_use]
    pub fn action_name(&self) -> &str {
        &self.action_name
    }

    /// Whether this type belongs to `namespace`
    #[must_use]
    pub fn is_in(&self, namespace: &str) -> bool {
        self.namespace == namespace
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{SIGIL}{}{SEPARATOR}{}", self.namespace, self.action_name)
    }
}

impl FromStr for ActionType {
    type Err = ActionTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some(rest) = s.strip_prefix(SIGIL) else {
            return Err(ActionTypeError::MissingSigil(s.to_string()));
        };

        rest.split_once(SEPARATOR)
            .map(|(namespace, action_name)| Self::compose(namespace, action_name))
            .ok_or_else(|| ActionTypeError::MissingSeparator(s.to_string()))
    }
}

impl Serialize for ActionType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ActionType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
