//! Client configuration from TOML (`[client]` section)

use omnitool_application::MobileConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileClientConfig {
    /// Base of the exponential retry backoff
    pub retry_base_delay_ms: u64,
    /// Size of the execution history ring buffer
    pub history_capacity: usize,
    /// Retry budget of calls that do not set their own
    pub default_max_retries: u32,
    pub mobile: MobileConfig,
}

impl Default for FileClientConfig {
    fn default() -> Self {
        Self {
            retry_base_delay_ms: 100,
            history_capacity: 1000,
            default_max_retries: omnitool_domain::tool::call::DEFAULT_MAX_RETRIES,
            mobile: MobileConfig::default(),
        }
    }
}
