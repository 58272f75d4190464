//! In-memory change sources.

use std::sync::Mutex;

use async_trait::async_trait;
use batchd_events::{ClusterObject, RawWatchEvent, WatchEvent};
use batchd_watch::{ChangeSource, ChangeSources, ConnectError, Connector, ControlPlaneConfig};
use tokio::sync::mpsc;

/// Receiving end of an in-memory change stream.
pub struct MemorySource {
    rx: mpsc::UnboundedReceiver<RawWatchEvent>,
}

#[async_trait]
impl ChangeSource for MemorySource {
    async fn recv(&mut self) -> Option<RawWatchEvent> {
        self.rx.recv().await
    }
}

/// Sending end of an in-memory change stream.
///
/// Dropping every clone of a feed ends the stream. Send methods return
/// false once the source has been dropped.
#[derive(Debug, Clone)]
pub struct MemoryFeed {
    tx: mpsc::UnboundedSender<RawWatchEvent>,
}

impl MemoryFeed {
    /// Sends a raw notification as-is.
    pub fn send(&self, event: RawWatchEvent) -> bool {
        self.tx.send(event).is_ok()
    }

    pub fn added(&self, obj: impl Into<ClusterObject>) -> bool {
        self.send(WatchEvent::Added(encode(obj.into())))
    }

    pub fn updated(&self, old: impl Into<ClusterObject>, new: impl Into<ClusterObject>) -> bool {
        self.send(WatchEvent::Updated {
            old: encode(old.into()),
            new: encode(new.into()),
        })
    }

    pub fn deleted(&self, obj: impl Into<ClusterObject>) -> bool {
        self.send(WatchEvent::Deleted(encode(obj.into())))
    }

    /// Marks the end of the initial list.
    pub fn synced(&self) -> bool {
        self.send(WatchEvent::SyncComplete)
    }
}

fn encode(obj: ClusterObject) -> serde_json::Value {
    serde_json::to_value(&obj).expect("descriptors serialize to JSON")
}

/// Creates a connected feed/source pair.
pub fn memory_source() -> (MemoryFeed, MemorySource) {
    let (tx, rx) = mpsc::unbounded_channel();
    (MemoryFeed { tx }, MemorySource { rx })
}

/// The feeds behind a [`MemoryConnector`], one per resource kind.
#[derive(Debug, Clone)]
pub struct MemoryFeeds {
    pub pods: MemoryFeed,
    pub nodes: MemoryFeed,
    pub scheduling_specs: MemoryFeed,
}

impl MemoryFeeds {
    /// Marks the initial list complete on every feed.
    pub fn sync_all(&self) {
        self.pods.synced();
        self.nodes.synced();
        self.scheduling_specs.synced();
    }
}

enum Behavior {
    Serve(Mutex<Option<ChangeSources>>),
    Unreachable,
    Unauthorized,
}

/// A [`Connector`] that hands out in-memory sources.
///
/// The sources can be taken once; later connects fail as unreachable.
pub struct MemoryConnector {
    behavior: Behavior,
}

impl MemoryConnector {
    pub fn new() -> (Self, MemoryFeeds) {
        let (pods, pod_source) = memory_source();
        let (nodes, node_source) = memory_source();
        let (scheduling_specs, spec_source) = memory_source();

        let sources = ChangeSources {
            pods: Box::new(pod_source),
            nodes: Box::new(node_source),
            scheduling_specs: Box::new(spec_source),
        };

        (
            Self {
                behavior: Behavior::Serve(Mutex::new(Some(sources))),
            },
            MemoryFeeds {
                pods,
                nodes,
                scheduling_specs,
            },
        )
    }

    /// A connector whose control plane cannot be reached.
    pub fn unreachable() -> Self {
        Self {
            behavior: Behavior::Unreachable,
        }
    }

    /// A connector whose control plane rejects the credentials.
    pub fn unauthorized() -> Self {
        Self {
            behavior: Behavior::Unauthorized,
        }
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect(&self, config: &ControlPlaneConfig) -> Result<ChangeSources, ConnectError> {
        let unreachable = |reason: &str| ConnectError::Unreachable {
            endpoint: config.endpoint.clone(),
            reason: reason.to_string(),
        };

        match &self.behavior {
            Behavior::Serve(sources) => sources
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .take()
                .ok_or_else(|| unreachable("sources already handed out")),
            Behavior::Unreachable => Err(unreachable("connection refused")),
            Behavior::Unauthorized => Err(ConnectError::Unauthorized),
        }
    }
}
