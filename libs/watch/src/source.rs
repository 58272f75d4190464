//! Change sources and the connector that opens them.

use async_trait::async_trait;
use batchd_events::{RawWatchEvent, ResourceKind};
use thiserror::Error;
use tracing::{info, warn};

use crate::ControlPlaneConfig;

/// Errors establishing the control-plane connection.
#[derive(Debug, Error)]
pub enum ConnectError {
    /// The configured endpoint is not a usable URL.
    #[error("invalid control plane endpoint: {0}")]
    InvalidEndpoint(String),

    /// The control plane could not be reached.
    #[error("control plane unreachable at {endpoint}: {reason}")]
    Unreachable { endpoint: String, reason: String },

    /// The control plane rejected the credentials.
    #[error("control plane rejected credentials")]
    Unauthorized,

    /// The connection was not established in time.
    #[error("timed out after {0:?} connecting to the control plane")]
    Timeout(std::time::Duration),
}

/// One ordered stream of notifications for a single resource kind.
///
/// Implementations deliver every notification at least once, in emission
/// order, and emit `SyncComplete` after the initial full list. Payloads
/// are raw JSON; the informer decodes and type-checks them.
#[async_trait]
pub trait ChangeSource: Send {
    /// Receives the next notification, or `None` once the stream has ended.
    async fn recv(&mut self) -> Option<RawWatchEvent>;
}

/// The three change sources the cache consumes.
pub struct ChangeSources {
    pub pods: Box<dyn ChangeSource>,
    pub nodes: Box<dyn ChangeSource>,
    pub scheduling_specs: Box<dyn ChangeSource>,
}

impl ChangeSources {
    /// Splits the bundle into per-kind sources.
    pub fn into_parts(self) -> [(ResourceKind, Box<dyn ChangeSource>); 3] {
        [
            (ResourceKind::Pod, self.pods),
            (ResourceKind::Node, self.nodes),
            (ResourceKind::SchedulingSpec, self.scheduling_specs),
        ]
    }
}

impl std::fmt::Debug for ChangeSources {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeSources").finish_non_exhaustive()
    }
}

/// Opens change sources against a control plane.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Establishes the connection and opens one source per resource kind.
    async fn connect(&self, config: &ControlPlaneConfig) -> Result<ChangeSources, ConnectError>;
}

/// Validates the configuration and connects, bounded by the configured timeout.
pub async fn connect<C>(connector: &C, config: &ControlPlaneConfig) -> Result<ChangeSources, ConnectError>
where
    C: Connector + ?Sized,
{
    if !config.has_valid_endpoint() {
        return Err(ConnectError::InvalidEndpoint(config.endpoint.clone()));
    }

    match tokio::time::timeout(config.connect_timeout, connector.connect(config)).await {
        Ok(Ok(sources)) => {
            info!(endpoint = %config.endpoint, "Connected to control plane");
            Ok(sources)
        }
        Ok(Err(e)) => {
            warn!(endpoint = %config.endpoint, error = %e, "Control plane connection failed");
            Err(e)
        }
        Err(_) => Err(ConnectError::Timeout(config.connect_timeout)),
    }
}
