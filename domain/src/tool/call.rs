//! Tool call: a single invocation request
//!
//! A [`ToolCall`] is created once per invocation and never mutated in place;
//! transformations (such as the mobile optimization applied by the
//! orchestrator) produce a new value.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::entities::DEFAULT_TOOL_TIMEOUT_MS;

/// Default retry budget for a call
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Kind of device the call originates from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    #[default]
    Desktop,
    Mobile,
    Tablet,
    Server,
}

impl DeviceType {
    pub fn is_mobile(&self) -> bool {
        matches!(self, DeviceType::Mobile | DeviceType::Tablet)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceInfo {
    pub device_type: DeviceType,
    /// Remaining battery, 0-100
    #[serde(skip_serializing_if = "Option::is_none")]
    pub battery_percent: Option<u8>,
    pub low_power_mode: bool,
}

impl DeviceInfo {
    /// Battery below 20% or low-power mode enabled.
    pub fn is_battery_constrained(&self) -> bool {
        self.low_power_mode || self.battery_percent.is_some_and(|b| b < 20)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NetworkType {
    Wifi,
    Ethernet,
    Cellular,
    Offline,
    #[default]
    Unknown,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkInfo {
    pub network_type: NetworkType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bandwidth_kbps: Option<u64>,
}

impl NetworkInfo {
    pub fn is_metered(&self) -> bool {
        matches!(self.network_type, NetworkType::Cellular)
    }
}

/// Caller's security standing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CallSecurity {
    /// Caller clearance (`low`..`critical`)
    pub clearance: String,
    /// Permissions granted to the caller
    pub permissions: Vec<String>,
}

impl Default for CallSecurity {
    fn default() -> Self {
        Self {
            clearance: "low".to_string(),
            permissions: Vec::new(),
        }
    }
}

/// Caller-imposed performance limits
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceConstraints {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_execution_time_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_memory_mb: Option<u64>,
}

/// Where and on whose behalf a call runs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// Domain to run the tool in; `None` runs it in the tool's own domain
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<DeviceInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network: Option<NetworkInfo>,
    pub security: CallSecurity,
    pub constraints: PerformanceConstraints,
}

impl ExecutionContext {
    pub fn is_mobile(&self) -> bool {
        self.device.as_ref().is_some_and(|d| d.device_type.is_mobile())
    }
}

/// A single invocation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub tool_id: String,
    #[serde(default)]
    pub tool_name: String,
    #[serde(default)]
    pub parameters: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub context: ExecutionContext,
    pub timeout_ms: u64,
    pub max_retries: u32,
    pub created_at: DateTime<Utc>,
}

impl ToolCall {
    /// Create a call with a fresh id and default timeout and retry budget.
    pub fn new(tool_id: impl Into<String>) -> Self {
        let tool_id = tool_id.into();
        Self {
            id: format!("call-{}", uuid::Uuid::new_v4()),
            tool_name: tool_id.clone(),
            tool_id,
            parameters: HashMap::new(),
            context: ExecutionContext::default(),
            timeout_ms: DEFAULT_TOOL_TIMEOUT_MS,
            max_retries: DEFAULT_MAX_RETRIES,
            created_at: Utc::now(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_tool_name(mut self, name: impl Into<String>) -> Self {
        self.tool_name = name.into();
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    pub fn with_context(mut self, context: ExecutionContext) -> Self {
        self.context = context;
        self
    }

    pub fn with_target_domain(mut self, domain_id: impl Into<String>) -> Self {
        self.context.target_domain = Some(domain_id.into());
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Get a string parameter
    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.parameters.get(key).and_then(|v| v.as_str())
    }

    /// Get a required string parameter or return an error message
    pub fn require_string(&self, key: &str) -> Result<&str, String> {
        self.get_string(key)
            .ok_or_else(|| format!("Missing required argument: {}", key))
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.parameters.get(key).and_then(|v| v.as_u64())
    }

    /// Total dispatch attempts allowed (`max_retries + 1`).
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}
