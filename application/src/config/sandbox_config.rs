//! Sandbox executor settings.

use omnitool_domain::IsolationLevel;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxConfig {
    /// Isolation applied to environments built for a domain
    pub default_isolation: IsolationLevel,
    /// Prefix of worker thread names (`<prefix>-<call id>`)
    pub worker_thread_prefix: String,
    /// Battery drain estimate, percent per second of full CPU use
    pub battery_drain_per_cpu_second: f64,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            default_isolation: IsolationLevel::Standard,
            worker_thread_prefix: "omnitool-worker".to_string(),
            battery_drain_per_cpu_second: 0.01,
        }
    }
}

impl SandboxConfig {
    pub fn with_isolation(mut self, isolation: IsolationLevel) -> Self {
        self.default_isolation = isolation;
        self
    }
}
