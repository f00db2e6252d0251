//! The action value carried through the store
//!
//! Actions are plain data: a composed type string plus an optional,
//! caller-defined JSON payload. The binder never looks inside the payload.

use crate::action_type::ActionType;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An action `{ type, payload }`
///
/// `action_type` must be a composed [`ActionType`] string for a binding to
/// route it. Anything else is carried through the store and ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    /// Canonical `@namespace/name` string
    #[serde(rename = "type")]
    pub action_type: String,

    /// Opaque payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

impl Action {
    /// Build an action from a raw type string and payload
    #[must_use]
    pub fn new(action_type: impl Into<String>, payload: Option<Value>) -> Self {
        Self {
            action_type: action_type.into(),
            payload,
        }
    }

    /// Build an action for a composed type
    #[must_use]
    pub fn of(action_type: &ActionType, payload: Option<Value>) -> Self {
        Self::new(action_type.to_string(), payload)
    }

    /// Decompose the type string, `None` if it is not a composed type
    #[must_use]
    pub fn decomposed_type(&self) -> Option<ActionType> {
        ActionType::decompose(&self.action_type)
    }

    /// Whether this action carries exactly `action_type`
    #[must_use]
    pub fn is(&self, action_type: &ActionType) -> bool {
        self.decomposed_type().as_ref() == Some(action_type)
    }

    /// Deserialize the payload into `T`
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error if the payload does not match `T`.
    pub fn payload_as<T: DeserializeOwned>(&self) -> Result<Option<T>, serde_json::Error> {
        self.payload
            .as_ref()
            .map(|value| T::deserialize(value))
            .transpose()
    }
}
