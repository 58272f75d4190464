//! Initial-sync flags and the readiness barrier.

use std::sync::Arc;

use batchd_events::ResourceKind;
use tokio::sync::watch;
use tracing::{info, warn};

/// Raised once an informer has applied its initial full list.
///
/// Clones share the same flag. Once raised a flag stays raised.
#[derive(Debug, Clone)]
pub struct SyncFlag {
    kind: ResourceKind,
    state: Arc<watch::Sender<bool>>,
}

impl SyncFlag {
    /// Creates a lowered flag for the given kind.
    pub fn new(kind: ResourceKind) -> Self {
        let (state, _) = watch::channel(false);
        Self {
            kind,
            state: Arc::new(state),
        }
    }

    /// The resource kind this flag tracks.
    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// Raises the flag. Returns true if it was not raised before.
    pub fn mark_synced(&self) -> bool {
        !self.state.send_replace(true)
    }

    /// Returns true once the flag has been raised.
    pub fn has_synced(&self) -> bool {
        *self.state.borrow()
    }

    /// Waits until the flag is raised.
    pub async fn synced(&self) {
        let mut rx = self.state.subscribe();
        // The sender lives in `self`, so this only returns once raised.
        let _ = rx.wait_for(|synced| *synced).await;
    }
}

/// Blocks until every flag is raised or shutdown is signalled.
///
/// Returns `true` if all flags were raised, `false` if shutdown came
/// first. Flags that are already raised win over a pending shutdown.
pub async fn wait_for_cache_sync(mut shutdown: watch::Receiver<bool>, flags: &[SyncFlag]) -> bool {
    let all_synced = async {
        for flag in flags {
            flag.synced().await;
        }
    };

    let synced = tokio::select! {
        biased;
        _ = all_synced => true,
        _ = shutdown.wait_for(|stop| *stop) => false,
    };

    if synced {
        info!(kinds = flags.len(), "Caches synced");
    } else {
        let pending: Vec<_> = flags
            .iter()
            .filter(|f| !f.has_synced())
            .map(|f| f.kind().as_str())
            .collect();
        warn!(?pending, "Shutdown before caches synced");
    }

    synced
}
