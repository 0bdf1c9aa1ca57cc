//! Domain context entities
//!
//! A [`DomainContext`] describes what a target execution domain (web, mobile,
//! desktop, ...) requires from the tools that run inside it. The numeric
//! limits derived from it are held in [`DomainConstraints`], and everything
//! needed to adapt tools into the domain travels together as a
//! [`DomainBundle`].

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::adaptation::AdaptationRule;

/// Ordered security level: `low < medium < high < critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecurityLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl SecurityLevel {
    /// Resolve a label onto the total order.
    ///
    /// Returns `None` for unknown labels; callers treat that as incompatible.
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "low" => Some(SecurityLevel::Low),
            "medium" => Some(SecurityLevel::Medium),
            "high" => Some(SecurityLevel::High),
            "critical" => Some(SecurityLevel::Critical),
            _ => None,
        }
    }

    /// Position in the total order (`low` = 0).
    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn as_str(&self) -> &str {
        match self {
            SecurityLevel::Low => "low",
            SecurityLevel::Medium => "medium",
            SecurityLevel::High => "high",
            SecurityLevel::Critical => "critical",
        }
    }
}

impl std::fmt::Display for SecurityLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Security requirements of a domain.
///
/// `level` stays a free-form label so that unknown values coming from
/// configuration or imported registries can be detected and rejected instead
/// of failing deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityContext {
    /// Security label (`low`, `medium`, `high`, `critical`)
    pub level: String,
    /// Filesystem prefixes tools may touch (empty = unrestricted)
    pub allowed_paths: Vec<String>,
    /// Filesystem prefixes tools must never touch
    pub denied_paths: Vec<String>,
    /// Network domains tools may reach (empty = unrestricted)
    pub allowed_network_domains: Vec<String>,
    /// Network domains tools must never reach
    pub blocked_network_domains: Vec<String>,
}

impl Default for SecurityContext {
    fn default() -> Self {
        Self {
            level: "low".to_string(),
            allowed_paths: Vec::new(),
            denied_paths: vec![
                "/etc/shadow".to_string(),
                "/proc".to_string(),
                "/sys".to_string(),
            ],
            allowed_network_domains: Vec::new(),
            blocked_network_domains: Vec::new(),
        }
    }
}

impl SecurityContext {
    pub fn security_level(&self) -> Option<SecurityLevel> {
        SecurityLevel::parse(&self.level)
    }
}

/// Performance envelope of a domain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceContext {
    pub max_execution_time_ms: u64,
    pub max_memory_mb: u64,
    pub max_cpu_percent: u32,
    pub max_network_bandwidth_kbps: u64,
}

impl Default for PerformanceContext {
    fn default() -> Self {
        Self {
            max_execution_time_ms: 30_000,
            max_memory_mb: 512,
            max_cpu_percent: 100,
            max_network_bandwidth_kbps: 10_000,
        }
    }
}

/// Mobile requirements of a domain
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MobileContext {
    /// Tools adapted into this domain must be mobile-optimized
    pub requires_optimization: bool,
    /// Battery consumption is tracked and reported
    pub battery_aware: bool,
    /// Upper bound on response payload size
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_payload_kb: Option<u64>,
}

/// A target execution domain's requirements
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DomainContext {
    pub id: String,
    pub category: String,
    pub version: String,
    pub security: SecurityContext,
    pub performance: PerformanceContext,
    pub mobile: MobileContext,
    /// Free-form domain parameters
    pub parameters: HashMap<String, serde_json::Value>,
}

impl Default for DomainContext {
    fn default() -> Self {
        Self::new("general", "general", "1.0.0")
    }
}

impl DomainContext {
    pub fn new(
        id: impl Into<String>,
        category: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            category: category.into(),
            version: version.into(),
            security: SecurityContext::default(),
            performance: PerformanceContext::default(),
            mobile: MobileContext::default(),
            parameters: HashMap::new(),
        }
    }

    pub fn with_security_level(mut self, level: impl Into<String>) -> Self {
        self.security.level = level.into();
        self
    }

    pub fn with_security(mut self, security: SecurityContext) -> Self {
        self.security = security;
        self
    }

    pub fn with_performance(mut self, performance: PerformanceContext) -> Self {
        self.performance = performance;
        self
    }

    pub fn with_max_execution_time_ms(mut self, ms: u64) -> Self {
        self.performance.max_execution_time_ms = ms;
        self
    }

    pub fn with_max_memory_mb(mut self, mb: u64) -> Self {
        self.performance.max_memory_mb = mb;
        self
    }

    pub fn with_mobile(mut self, mobile: MobileContext) -> Self {
        self.mobile = mobile;
        self
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    pub fn requires_mobile_optimization(&self) -> bool {
        self.mobile.requires_optimization
    }
}

/// Numeric limits derived from a domain's performance context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainConstraints {
    pub max_execution_time_ms: u64,
    pub max_memory_mb: u64,
    pub max_cpu_percent: u32,
    pub max_network_bandwidth_kbps: u64,
}

impl DomainConstraints {
    pub fn from_context(context: &DomainContext) -> Self {
        let perf = &context.performance;
        Self {
            max_execution_time_ms: perf.max_execution_time_ms,
            max_memory_mb: perf.max_memory_mb,
            max_cpu_percent: perf.max_cpu_percent,
            max_network_bandwidth_kbps: perf.max_network_bandwidth_kbps,
        }
    }
}

/// Everything needed to adapt tools into one domain, loaded and cached as a unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainBundle {
    pub context: DomainContext,
    pub constraints: DomainConstraints,
    /// Adaptation rules, applied in this order
    #[serde(default)]
    pub rules: Vec<AdaptationRule>,
}

impl DomainBundle {
    /// Bundle with constraints derived from the context and no rules.
    pub fn new(context: DomainContext) -> Self {
        let constraints = DomainConstraints::from_context(&context);
        Self {
            context,
            constraints,
            rules: Vec::new(),
        }
    }

    pub fn with_rules(mut self, rules: Vec<AdaptationRule>) -> Self {
        self.rules = rules;
        self
    }

    pub fn id(&self) -> &str {
        &self.context.id
    }
}
