//! Error types for decoding change notifications.

use batchd_id::IdError;
use thiserror::Error;

/// Errors that can occur when decoding or interpreting notifications.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EventError {
    /// The payload's `kind` tag is missing or not one the cache tracks.
    #[error("unknown object kind: {0}")]
    UnknownKind(String),

    /// The payload does not match the schema for its kind.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// An identifier field failed validation.
    #[error("invalid {field}: {source}")]
    InvalidIdentifier {
        field: &'static str,
        #[source]
        source: IdError,
    },

    /// A resource quantity could not be parsed.
    #[error("invalid quantity {value:?}: {reason}")]
    InvalidQuantity { value: String, reason: &'static str },
}

impl From<serde_json::Error> for EventError {
    fn from(err: serde_json::Error) -> Self {
        EventError::InvalidPayload(err.to_string())
    }
}
