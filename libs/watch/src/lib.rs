//! Change-ingestion primitives.
//!
//! This library provides the pieces that sit between the control plane's
//! change streams and the scheduler cache:
//!
//! - **Change source**: one ordered, at-least-once stream of notifications
//!   per resource kind, obtained from a [`Connector`].
//! - **Informer**: the loop that drains a change source, drops malformed or
//!   mistyped payloads, and raises a [`SyncFlag`] once the initial list has
//!   been applied.
//! - **Sync barrier**: [`wait_for_cache_sync`] blocks until every flag is
//!   raised or shutdown is signalled.
//! - **Filtered handler**: [`FilteringHandler`] forwards only notifications
//!   whose objects pass a predicate.
//!
//! # Invariants
//!
//! - Notifications of one kind are applied in the order they were received
//! - A sync flag is raised only after every notification before the
//!   `SyncComplete` marker has been applied
//! - Shutdown is a `watch::Receiver<bool>`; `true` (or a dropped sender)
//!   stops every loop at its next await point

mod config;
mod handler;
mod informer;
mod source;
mod sync;

pub use config::ControlPlaneConfig;
pub use handler::{dispatch, FilteringHandler, ResourceHandler};
pub use informer::Informer;
pub use source::{connect, ChangeSource, ChangeSources, ConnectError, Connector};
pub use sync::{wait_for_cache_sync, SyncFlag};

use std::time::Duration;

/// Default time allowed for establishing the control-plane connection.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default control-plane endpoint.
pub const DEFAULT_CONTROL_PLANE_URL: &str = "https://127.0.0.1:6443";
