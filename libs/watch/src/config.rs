//! Control-plane connection configuration.

use std::time::Duration;

use anyhow::{Context, Result};

use crate::{DEFAULT_CONNECT_TIMEOUT, DEFAULT_CONTROL_PLANE_URL};

/// How to reach the control plane's change streams.
#[derive(Clone, PartialEq, Eq)]
pub struct ControlPlaneConfig {
    /// Base URL of the control plane API.
    pub endpoint: String,

    /// Bearer token, if the control plane requires one.
    pub token: Option<String>,

    /// Time allowed for the initial connection.
    pub connect_timeout: Duration,
}

impl ControlPlaneConfig {
    /// Creates a configuration for the given endpoint with default settings.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            token: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let endpoint = std::env::var("BATCHD_CONTROL_PLANE_URL")
            .unwrap_or_else(|_| DEFAULT_CONTROL_PLANE_URL.to_string());

        let token = std::env::var("BATCHD_CONTROL_PLANE_TOKEN")
            .ok()
            .filter(|t| !t.is_empty());

        let connect_timeout = match std::env::var("BATCHD_CONNECT_TIMEOUT_SECS") {
            Ok(raw) => Duration::from_secs(
                raw.parse()
                    .with_context(|| format!("Invalid BATCHD_CONNECT_TIMEOUT_SECS: {raw}"))?,
            ),
            Err(_) => DEFAULT_CONNECT_TIMEOUT,
        };

        Ok(Self {
            endpoint,
            token,
            connect_timeout,
        })
    }

    /// Returns true if the endpoint uses a scheme the connectors understand.
    pub fn has_valid_endpoint(&self) -> bool {
        let rest = self
            .endpoint
            .strip_prefix("https://")
            .or_else(|| self.endpoint.strip_prefix("http://"));
        matches!(rest, Some(host) if !host.is_empty())
    }
}

impl Default for ControlPlaneConfig {
    fn default() -> Self {
        Self::new(DEFAULT_CONTROL_PLANE_URL)
    }
}

impl std::fmt::Debug for ControlPlaneConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControlPlaneConfig")
            .field("endpoint", &self.endpoint)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}
