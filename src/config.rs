//! Agent configuration parser
//!
//! Parses `dispatchd.toml` into the agent's runtime settings. Hosts that
//! resolve configuration elsewhere can construct [`AgentConfig`] directly.

use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

/// Agent configuration parsed from `dispatchd.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AgentConfig {
    /// Base URL of the OData job store.
    pub store_url: String,
    /// Discovery URL of the control endpoint.
    pub endpoint_url: String,
    /// Work type used to filter pending job orders.
    #[serde(default = "default_work_type")]
    pub work_type: String,
    /// Label identifying this agent's session on the control endpoint.
    #[serde(default = "default_identity_label")]
    pub identity_label: String,
    /// Seconds between dispatch cycles. Zero is allowed: cycles still
    /// never overlap, they just run back to back.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Bound on each collaborator call, in seconds.
    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,
}

fn default_work_type() -> String {
    "Sender".to_string()
}

fn default_identity_label() -> String {
    "SenderSession".to_string()
}

const fn default_poll_interval_secs() -> u64 {
    60
}

const fn default_call_timeout_secs() -> u64 {
    30
}

impl AgentConfig {
    /// Parse a configuration file from a path.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
    }

    /// Parse configuration content from a string.
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).context("Failed to parse dispatchd.toml")?;
        config.validate()?;
        Ok(config)
    }

    /// The interval between cycles as a [`Duration`].
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// The per-call timeout as a [`Duration`].
    #[must_use]
    pub const fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<()> {
        if self.store_url.trim().is_empty() {
            bail!("store_url cannot be empty");
        }
        if self.endpoint_url.trim().is_empty() {
            bail!("endpoint_url cannot be empty");
        }
        if self.work_type.trim().is_empty() {
            bail!("work_type cannot be empty");
        }
        if self.call_timeout_secs == 0 {
            bail!("call_timeout_secs must be at least 1");
        }
        Ok(())
    }
}
