//! Error types for identifier parsing and validation.

use thiserror::Error;

/// Errors that can occur when parsing or validating identifiers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdError {
    /// The identifier string is empty.
    #[error("ID cannot be empty")]
    Empty,

    /// The identifier is longer than the control plane allows.
    #[error("ID too long: {actual} bytes exceeds the limit of {max}")]
    TooLong { max: usize, actual: usize },

    /// The identifier contains whitespace or a control character.
    #[error("invalid character {found:?} at byte {position}")]
    InvalidCharacter { found: char, position: usize },
}

impl IdError {
    /// Returns true if this error indicates the input was empty.
    pub fn is_empty(&self) -> bool {
        matches!(self, IdError::Empty)
    }
}
