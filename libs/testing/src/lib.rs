//! Test support for the batchd crates.
//!
//! - [`fixtures`]: builders for pods, nodes and scheduling specifications
//! - [`source`]: in-memory change sources and a connector that hands them out
//! - [`init_tracing`]: installs a log subscriber once per test binary
//!
//! Controlled by `RUST_LOG`; defaults to `warn`.

pub mod fixtures;
pub mod source;

pub use source::{memory_source, MemoryConnector, MemoryFeed, MemoryFeeds, MemorySource};

use std::sync::Once;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Installs a `tracing` subscriber that writes through the test harness.
///
/// Safe to call from every test; only the first call has an effect.
pub fn init_tracing() {
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        let _ = tracing_subscriber::registry()
            .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
            .with(tracing_subscriber::fmt::layer().with_test_writer())
            .try_init();
    });
}
