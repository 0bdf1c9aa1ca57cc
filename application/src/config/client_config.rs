//! Orchestrator configuration.
//!
//! [`ClientConfig`] controls the retry loop, history size, mobile behavior
//! and the servers connected at `initialize()`.

use omnitool_domain::OrchestrationError;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::time::Duration;

/// A tool server the client connects to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub name: String,
    /// Connector kind (e.g., "local")
    #[serde(default = "default_server_kind")]
    pub kind: String,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub env: HashMap<String, String>,
}

fn default_server_kind() -> String {
    "local".to_string()
}

fn default_true() -> bool {
    true
}

impl ServerConfig {
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            endpoint: None,
            enabled: true,
            env: HashMap::new(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn validate(&self) -> Result<(), OrchestrationError> {
        if self.name.trim().is_empty() {
            return Err(OrchestrationError::Configuration(
                "server name must not be empty".to_string(),
            ));
        }
        if self.kind.trim().is_empty() {
            return Err(OrchestrationError::Configuration(format!(
                "server '{}' has no kind",
                self.name
            )));
        }
        Ok(())
    }
}

/// Mobile optimization settings.
///
/// When enabled, discovery hides tools that do not support mobile devices,
/// and calls from mobile/tablet devices are trimmed before dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MobileConfig {
    pub enabled: bool,
    /// Upper bound on a mobile call's timeout
    pub max_timeout_ms: u64,
    /// Retry budget on battery-constrained devices or metered networks
    pub constrained_max_retries: u32,
    /// Drop `null` parameters before sending
    pub strip_null_params: bool,
}

impl Default for MobileConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_timeout_ms: 15_000,
            constrained_max_retries: 0,
            strip_null_params: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base of the exponential backoff between attempts
    pub retry_base_delay_ms: u64,
    /// Capacity of the execution history ring buffer
    pub history_capacity: usize,
    pub mobile: MobileConfig,
    pub servers: Vec<ServerConfig>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            retry_base_delay_ms: 100,
            history_capacity: 1000,
            mobile: MobileConfig::default(),
            servers: Vec::new(),
        }
    }
}

impl ClientConfig {
    // ==================== Builder Methods ====================

    pub fn with_retry_base_delay_ms(mut self, ms: u64) -> Self {
        self.retry_base_delay_ms = ms;
        self
    }

    pub fn with_history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = capacity;
        self
    }

    pub fn with_mobile(mut self, mobile: MobileConfig) -> Self {
        self.mobile = mobile;
        self
    }

    pub fn with_server(mut self, server: ServerConfig) -> Self {
        self.servers.push(server);
        self
    }

    /// Delay before attempt `attempt + 1`, i.e. `base * 2^(attempt-1)`.
    ///
    /// `attempt` is 1-based: the wait after the first failed attempt is `base`.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = 2u64.saturating_pow(attempt.saturating_sub(1));
        Duration::from_millis(self.retry_base_delay_ms.saturating_mul(factor))
    }

    pub fn validate(&self) -> Result<(), OrchestrationError> {
        if self.history_capacity == 0 {
            return Err(OrchestrationError::Configuration(
                "history_capacity must be at least 1".to_string(),
            ));
        }
        if self.mobile.enabled && self.mobile.max_timeout_ms == 0 {
            return Err(OrchestrationError::Configuration(
                "mobile.max_timeout_ms must be greater than 0".to_string(),
            ));
        }

        let mut names = HashSet::new();
        for server in &self.servers {
            server.validate()?;
            if !names.insert(server.name.as_str()) {
                return Err(OrchestrationError::Configuration(format!(
                    "duplicate server name '{}'",
                    server.name
                )));
            }
        }
        Ok(())
    }
}
