//! Cache configuration.

use anyhow::{Context, Result};
use batchd_watch::ControlPlaneConfig;

/// Scheduler name used when none is configured.
pub const DEFAULT_SCHEDULER_NAME: &str = "batchd";

/// Scheduler cache configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Pending pods are admitted only if they name this scheduler.
    pub scheduler_name: String,

    /// How to reach the control plane.
    pub control_plane: ControlPlaneConfig,
}

impl CacheConfig {
    pub fn new(scheduler_name: impl Into<String>, control_plane: ControlPlaneConfig) -> Self {
        Self {
            scheduler_name: scheduler_name.into(),
            control_plane,
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let scheduler_name = std::env::var("BATCHD_SCHEDULER_NAME")
            .ok()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_SCHEDULER_NAME.to_string());

        let control_plane =
            ControlPlaneConfig::from_env().context("Invalid control plane configuration")?;

        Ok(Self {
            scheduler_name,
            control_plane,
        })
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self::new(DEFAULT_SCHEDULER_NAME, ControlPlaneConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CacheConfig::default();
        assert_eq!(config.scheduler_name, "batchd");
        assert!(config.control_plane.has_valid_endpoint());
    }
}
