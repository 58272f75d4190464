//! # batchd-id
//!
//! Typed identifiers for the objects tracked by the batchd scheduler cache.
//!
//! ## Design Principles
//!
//! - Identifiers are assigned by the control plane; the cache never invents them
//! - Every identifier has one canonical string form with strict parsing
//! - Identifiers are typed so a task key can never be used as a job key
//!
//! ## Identifier Forms
//!
//! - `TaskId`: the workload unit's UID, e.g. `3f6c1d2e-8a3b-4c1d-9e2f-0a1b2c3d4e5f`
//! - `JobId`: a namespaced group key, e.g. `default/train-resnet`
//! - `NodeName`: the node's registered name, e.g. `worker-17`

mod error;
mod macros;
mod types;

pub use error::IdError;
pub use types::*;

/// Longest object name the control plane accepts (DNS subdomain limit).
pub const MAX_ID_LEN: usize = 253;

/// Longest namespace the control plane accepts (DNS label limit).
pub const MAX_NAMESPACE_LEN: usize = 63;

/// Longest job key: a namespace, the separator and an object name.
pub const MAX_JOB_ID_LEN: usize = MAX_NAMESPACE_LEN + 1 + MAX_ID_LEN;

/// Checks the rules shared by every identifier type against `max` bytes.
#[doc(hidden)]
pub fn validate(s: &str, max: usize) -> Result<(), IdError> {
    if s.is_empty() {
        return Err(IdError::Empty);
    }

    if s.len() > max {
        return Err(IdError::TooLong {
            max,
            actual: s.len(),
        });
    }

    if let Some((position, found)) = s
        .char_indices()
        .find(|(_, c)| c.is_whitespace() || c.is_control())
    {
        return Err(IdError::InvalidCharacter { found, position });
    }

    Ok(())
}
