//! # batchd-cache
//!
//! The in-memory cluster state cache for the batchd scheduler.
//!
//! The cache absorbs change notifications for pods, nodes and scheduling
//! specifications and keeps a consistent model of which tasks exist, which
//! job each belongs to, which node each is bound to, and how much node
//! capacity remains. The placement algorithm reads deep-copied snapshots of
//! that model; the binder reports task progress through status updates.
//!
//! ## Data flow
//!
//! ```text
//! change source -> informer -> admission filter (pods) -> reconciler -> state
//!                                                                      |
//!                                        snapshot / dump  <------------+
//! binder -> update_status -> transition policy -> state
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let cache = SchedulerCache::connect(&CacheConfig::from_env()?, &connector).await?;
//! cache.run(shutdown_rx.clone());
//! if !cache.wait_for_cache_sync(shutdown_rx).await {
//!     return Ok(());
//! }
//! let cluster = cache.snapshot();
//! ```

pub mod api;
mod cache;
mod config;
mod error;
mod filter;
mod ingest;
mod reconciler;
mod state;
mod validation;

pub use cache::{Cache, SchedulerCache};
pub use config::{CacheConfig, DEFAULT_SCHEDULER_NAME};
pub use error::{CacheError, CacheResult};
pub use filter::AdmissionFilter;
pub use ingest::EventRouter;
pub use reconciler::{Reconciler, ResourceEvent};
pub use state::SchedulerState;
pub use validation::{AllowAllTransitions, DefaultTransitionPolicy, TransitionPolicy};
