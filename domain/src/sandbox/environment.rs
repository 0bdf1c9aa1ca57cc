//! Execution environments
//!
//! An [`ExecutionEnvironment`] is the resource- and policy-bounded box a call
//! runs in. Its [`ResourceLimits`] always derive from the owning domain's
//! performance context and never exceed it.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::policy::{EnforcementLevel, PolicyType, SecurityPolicy};
use crate::context::entities::{DomainContext, PerformanceContext};

/// Hard resource ceilings of an environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceLimits {
    pub max_execution_time_ms: u64,
    pub max_memory_mb: u64,
    pub max_cpu_percent: u32,
    pub max_network_bandwidth_kbps: u64,
}

impl ResourceLimits {
    /// Limits copied 1:1 from a domain's performance context.
    pub fn from_performance(perf: &PerformanceContext) -> Self {
        Self {
            max_execution_time_ms: perf.max_execution_time_ms,
            max_memory_mb: perf.max_memory_mb,
            max_cpu_percent: perf.max_cpu_percent,
            max_network_bandwidth_kbps: perf.max_network_bandwidth_kbps,
        }
    }

    /// Component-wise minimum with `ceiling`.
    pub fn clamped_to(&self, ceiling: &ResourceLimits) -> Self {
        Self {
            max_execution_time_ms: self.max_execution_time_ms.min(ceiling.max_execution_time_ms),
            max_memory_mb: self.max_memory_mb.min(ceiling.max_memory_mb),
            max_cpu_percent: self.max_cpu_percent.min(ceiling.max_cpu_percent),
            max_network_bandwidth_kbps: self
                .max_network_bandwidth_kbps
                .min(ceiling.max_network_bandwidth_kbps),
        }
    }

    pub fn fits_within(&self, ceiling: &ResourceLimits) -> bool {
        self.clamped_to(ceiling) == *self
    }
}

/// Network access granted to an environment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub enabled: bool,
    pub allowed_domains: Vec<String>,
    pub blocked_domains: Vec<String>,
    pub max_bandwidth_kbps: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            allowed_domains: Vec::new(),
            blocked_domains: Vec::new(),
            max_bandwidth_kbps: 10_000,
        }
    }
}

/// How strictly a worker is separated from the host.
///
/// `Strict` forces networking off regardless of [`NetworkConfig`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IsolationLevel {
    #[default]
    Standard,
    Strict,
}

impl IsolationLevel {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standard" => Some(IsolationLevel::Standard),
            "strict" => Some(IsolationLevel::Strict),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            IsolationLevel::Standard => "standard",
            IsolationLevel::Strict => "strict",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionEnvironment {
    pub id: String,
    pub domain_id: String,
    pub limits: ResourceLimits,
    pub policies: Vec<SecurityPolicy>,
    pub network: NetworkConfig,
    #[serde(default)]
    pub env_vars: HashMap<String, String>,
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default)]
    pub isolation: IsolationLevel,
}

impl ExecutionEnvironment {
    /// Environment id used for a domain's default environment.
    pub fn default_id(domain_id: &str) -> String {
        format!("env-{}", domain_id)
    }

    /// Default environment for a domain.
    ///
    /// Limits come straight from the domain's performance context and the
    /// three baseline policies (resource limits, filesystem, network) are
    /// installed.
    pub fn for_domain(domain: &DomainContext) -> Self {
        let limits = ResourceLimits::from_performance(&domain.performance);
        let security = &domain.security;
        let network = NetworkConfig {
            enabled: true,
            allowed_domains: security.allowed_network_domains.clone(),
            blocked_domains: security.blocked_network_domains.clone(),
            max_bandwidth_kbps: limits.max_network_bandwidth_kbps,
        };

        Self {
            id: Self::default_id(&domain.id),
            domain_id: domain.id.clone(),
            policies: baseline_policies(domain, &limits),
            limits,
            network,
            env_vars: HashMap::new(),
            capabilities: Vec::new(),
            isolation: IsolationLevel::default(),
        }
    }

    pub fn with_isolation(mut self, isolation: IsolationLevel) -> Self {
        self.isolation = isolation;
        self
    }

    pub fn with_policy(mut self, policy: SecurityPolicy) -> Self {
        self.policies.push(policy);
        self
    }

    pub fn with_env_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_vars.insert(key.into(), value.into());
        self
    }

    /// Clamp limits (and the network bandwidth cap) to `ceiling`.
    pub fn clamp_to(mut self, ceiling: &ResourceLimits) -> Self {
        self.limits = self.limits.clamped_to(ceiling);
        self.network.max_bandwidth_kbps = self
            .network
            .max_bandwidth_kbps
            .min(self.limits.max_network_bandwidth_kbps);
        self
    }

    pub fn network_enabled(&self) -> bool {
        self.network.enabled && self.isolation != IsolationLevel::Strict
    }
}

fn baseline_policies(domain: &DomainContext, limits: &ResourceLimits) -> Vec<SecurityPolicy> {
    let security = &domain.security;

    let resources = SecurityPolicy::new("resource-limits", "Resource limits", PolicyType::Enforcement)
        .with_rule("max_memory_mb", limits.max_memory_mb)
        .with_rule("max_cpu_percent", limits.max_cpu_percent)
        .with_rule("max_execution_time_ms", limits.max_execution_time_ms);

    let mut filesystem = SecurityPolicy::new("filesystem", "Filesystem access", PolicyType::Enforcement)
        .with_rule("denied_paths", security.denied_paths.clone());
    if !security.allowed_paths.is_empty() {
        filesystem = filesystem.with_rule("allowed_paths", security.allowed_paths.clone());
    }

    let mut network = SecurityPolicy::new("network", "Network access", PolicyType::Enforcement)
        .with_rule("blocked_domains", security.blocked_network_domains.clone())
        .with_rule("max_bandwidth_kbps", limits.max_network_bandwidth_kbps);
    if !security.allowed_network_domains.is_empty() {
        network = network.with_rule("allowed_domains", security.allowed_network_domains.clone());
    }

    vec![resources, filesystem, network]
        .into_iter()
        .map(|p| p.with_enforcement(EnforcementLevel::Standard))
        .collect()
}
