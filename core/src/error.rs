//! Construction-time errors for bindings and reducer composition

use thiserror::Error;

/// Errors raised while building a binding or composing reducers
///
/// All of these are configuration errors: they surface before a store starts,
/// never while dispatching.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BindingError {
    /// The same action name was registered twice in one binding
    #[error("Action `{name}` is already defined in namespace `{namespace}`")]
    DuplicateName {
        /// Namespace of the binding
        namespace: String,
        /// Offending action name
        name: String,
    },

    /// Two slices were mounted under the same state key
    #[error("State key `{0}` is already mounted")]
    DuplicateKey(String),

    /// Two bindings of the same kind declare the same composed type
    #[error("Action type `{0}` is declared by more than one binding")]
    DuplicateActionType(String),

    /// An effect named a watch mode that does not exist
    #[error("Unknown watch mode `{mode}` for effect `{name}`")]
    UnknownWatchMode {
        /// Effect name
        name: String,
        /// The unrecognized mode
        mode: String,
    },
}
