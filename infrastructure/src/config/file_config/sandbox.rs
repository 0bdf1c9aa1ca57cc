//! Sandbox configuration from TOML (`[sandbox]` section)

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileSandboxConfig {
    /// `standard` or `strict` (no network)
    pub isolation: String,
    pub worker_thread_prefix: String,
    /// Battery drain estimate, percent per CPU second
    pub battery_drain_per_cpu_second: f64,
}

impl Default for FileSandboxConfig {
    fn default() -> Self {
        Self {
            isolation: "standard".to_string(),
            worker_thread_prefix: "omnitool-worker".to_string(),
            battery_drain_per_cpu_second: 0.01,
        }
    }
}
