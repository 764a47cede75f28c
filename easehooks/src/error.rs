use std::any::Any;
use thiserror::Error;

/// Reasons a delayed callback's promise can be rejected.
///
/// Cancellation is deliberately absent: a canceled invocation never settles,
/// so there is nothing to report.
#[derive(Error, Debug, Clone, Eq, PartialEq)]
pub enum CallbackError {
    /// The callback returned an error, carried here as its message.
    #[error("{0}")]
    Error(String),

    /// The callback returned None when a value was expected.
    #[error("Callback returned None!")]
    None,

    /// The callback panicked while running.
    #[error("Callback panicked: {0}")]
    Panicked(String),
}

impl CallbackError {
    /// Returns true if this error carries a message from the callback.
    pub fn is_error(&self) -> bool {
        matches!(self, CallbackError::Error(_))
    }

    /// Returns true if the callback produced None.
    pub fn is_none(&self) -> bool {
        matches!(self, CallbackError::None)
    }

    /// Returns true if the callback panicked.
    pub fn is_panicked(&self) -> bool {
        matches!(self, CallbackError::Panicked(_))
    }

    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(message) = payload.downcast_ref::<&str>() {
            (*message).to_string()
        } else if let Some(message) = payload.downcast_ref::<String>() {
            message.clone()
        } else {
            "unknown panic payload".to_string()
        };
        CallbackError::Panicked(message)
    }
}

/// Errors raised by a [`StateStore`](crate::StateStore) whose queue has shut down.
#[derive(Error, Debug, Clone, Eq, PartialEq)]
pub enum StoreError {
    #[error("state store is closed")]
    Closed,
}

/// Errors raised by a [`KeyValueStore`](crate::KeyValueStore).
#[derive(Error, Debug, Clone, Eq, PartialEq)]
pub enum StorageError {
    #[error("storage is unavailable: {0}")]
    Unavailable(String),

    #[error("failed to encode value for key `{key}`: {reason}")]
    Encode { key: String, reason: String },
}
