//! Change notifications - the envelope the change source delivers.

use serde::{Deserialize, Serialize};

use crate::{ClusterObject, EventError};

/// One change notification for an object of type `T`.
///
/// Per kind, notifications arrive in emission order and at least once;
/// a periodic resync redelivers `Updated` with `old == new`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "object", rename_all = "snake_case")]
pub enum WatchEvent<T> {
    /// The object was created, or listed during the initial sync.
    Added(T),

    /// The object changed (or was resynced).
    Updated { old: T, new: T },

    /// The object was removed; carries its last known state.
    Deleted(T),

    /// Every object from the initial full list has been delivered.
    SyncComplete,
}

impl<T> WatchEvent<T> {
    /// Short label for logging.
    pub fn label(&self) -> &'static str {
        match self {
            WatchEvent::Added(_) => "added",
            WatchEvent::Updated { .. } => "updated",
            WatchEvent::Deleted(_) => "deleted",
            WatchEvent::SyncComplete => "sync_complete",
        }
    }

    /// Converts the carried object(s), failing on the first conversion error.
    pub fn try_map<U, E>(self, mut f: impl FnMut(T) -> Result<U, E>) -> Result<WatchEvent<U>, E> {
        Ok(match self {
            WatchEvent::Added(obj) => WatchEvent::Added(f(obj)?),
            WatchEvent::Updated { old, new } => WatchEvent::Updated {
                old: f(old)?,
                new: f(new)?,
            },
            WatchEvent::Deleted(obj) => WatchEvent::Deleted(f(obj)?),
            WatchEvent::SyncComplete => WatchEvent::SyncComplete,
        })
    }
}

/// A notification whose payload has not been decoded yet.
pub type RawWatchEvent = WatchEvent<serde_json::Value>;

impl RawWatchEvent {
    /// Decodes every payload carried by the notification.
    pub fn decode(self) -> Result<WatchEvent<ClusterObject>, EventError> {
        self.try_map(|raw| ClusterObject::decode(&raw))
    }
}
