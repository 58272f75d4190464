//! The per-kind ingestion loop.

use batchd_events::{ClusterObject, ResourceKind, WatchEvent};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::{ChangeSource, SyncFlag};

/// Drains one change source and hands decoded notifications to a callback.
///
/// Payloads that fail to decode, or whose kind does not match the
/// informer's kind, are dropped with a debug log. The informer's
/// [`SyncFlag`] is raised when the source delivers `SyncComplete`, after
/// every earlier notification has been handed to the callback.
pub struct Informer {
    kind: ResourceKind,
    source: Box<dyn ChangeSource>,
    synced: SyncFlag,
}

impl Informer {
    pub fn new(kind: ResourceKind, source: Box<dyn ChangeSource>) -> Self {
        Self {
            kind,
            source,
            synced: SyncFlag::new(kind),
        }
    }

    /// A handle to this informer's sync flag.
    pub fn sync_flag(&self) -> SyncFlag {
        self.synced.clone()
    }

    /// Runs until shutdown is signalled or the source ends.
    pub async fn run<F>(mut self, mut shutdown: watch::Receiver<bool>, mut apply: F)
    where
        F: FnMut(WatchEvent<ClusterObject>) + Send,
    {
        info!(kind = %self.kind, "Informer starting");

        loop {
            if *shutdown.borrow() {
                break;
            }

            let raw = tokio::select! {
                biased;

                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                    continue;
                }

                next = self.source.recv() => match next {
                    Some(raw) => raw,
                    None => {
                        warn!(kind = %self.kind, "Change source ended");
                        break;
                    }
                },
            };

            let event = match raw.decode() {
                Ok(event) => event,
                Err(e) => {
                    debug!(kind = %self.kind, error = %e, "Dropping malformed notification");
                    continue;
                }
            };

            self.handle(event, &mut apply);
        }

        info!(kind = %self.kind, "Informer stopped");
    }

    fn handle<F>(&self, event: WatchEvent<ClusterObject>, apply: &mut F)
    where
        F: FnMut(WatchEvent<ClusterObject>),
    {
        match &event {
            WatchEvent::SyncComplete => {
                if self.synced.mark_synced() {
                    info!(kind = %self.kind, "Initial sync complete");
                }
                return;
            }
            WatchEvent::Added(obj) | WatchEvent::Deleted(obj) => {
                if obj.kind() != self.kind {
                    debug!(
                        expected = %self.kind,
                        actual = %obj.kind(),
                        "Dropping notification of unexpected kind"
                    );
                    return;
                }
            }
            WatchEvent::Updated { old, new } => {
                if old.kind() != self.kind || new.kind() != self.kind {
                    debug!(
                        expected = %self.kind,
                        old = %old.kind(),
                        new = %new.kind(),
                        "Dropping notification of unexpected kind"
                    );
                    return;
                }
            }
        }

        apply(event);
    }
}
