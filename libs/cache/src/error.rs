//! Error types for the scheduler cache.

use batchd_id::TaskId;
use batchd_watch::ConnectError;
use thiserror::Error;

use crate::api::TaskStatus;

/// Errors returned by the scheduler cache.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The control-plane connection could not be established.
    #[error("failed to connect to the control plane: {0}")]
    Connect(#[from] ConnectError),

    /// The requested status change is not allowed; nothing was modified.
    #[error("invalid status transition for task {task}: {from} -> {to}")]
    InvalidTransition {
        task: TaskId,
        from: TaskStatus,
        to: TaskStatus,
    },

    /// The task is not (or no longer) in the cache.
    #[error("task not found: {0}")]
    TaskNotFound(TaskId),
}

impl CacheError {
    /// Returns true for errors caused by the caller's request rather than
    /// the cache's environment.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            CacheError::InvalidTransition { .. } | CacheError::TaskNotFound(_)
        )
    }
}

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;
