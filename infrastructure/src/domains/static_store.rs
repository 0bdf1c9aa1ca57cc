//! In-process domain catalog
//!
//! Ships the built-in domains (`general`, `web`, `mobile`, `desktop`,
//! `server`) and accepts extra domains declared in configuration. Each
//! domain is served with the default adaptation rules of its category.

use async_trait::async_trait;
use omnitool_application::{DomainStore, DomainStoreError};
use omnitool_domain::{
    DomainBundle, DomainContext, MobileContext, PerformanceContext, SecurityLevel, default_rules_for,
};
use std::collections::BTreeMap;
use tracing::debug;

pub struct StaticDomainStore {
    domains: BTreeMap<String, DomainContext>,
}

impl StaticDomainStore {
    /// Store with the built-in domains only.
    pub fn new() -> Self {
        let domains = builtin_domains()
            .into_iter()
            .map(|d| (d.id.clone(), d))
            .collect();
        Self { domains }
    }

    /// Add a domain, replacing a built-in with the same id.
    pub fn with_domain(mut self, domain: DomainContext) -> Self {
        self.domains.insert(domain.id.clone(), domain);
        self
    }

    pub fn with_domains(self, domains: impl IntoIterator<Item = DomainContext>) -> Self {
        domains.into_iter().fold(self, Self::with_domain)
    }

    pub fn contains(&self, domain_id: &str) -> bool {
        self.domains.contains_key(domain_id)
    }
}

impl Default for StaticDomainStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DomainStore for StaticDomainStore {
    async fn load_bundle(&self, domain_id: &str) -> Result<Option<DomainBundle>, DomainStoreError> {
        let Some(context) = self.domains.get(domain_id) else {
            return Ok(None);
        };
        if context.security.security_level().is_none() {
            return Err(DomainStoreError::Corrupt {
                id: domain_id.to_string(),
                message: format!("unknown security level '{}'", context.security.level),
            });
        }

        let rules = default_rules_for(&context.category);
        debug!(domain = domain_id, rules = rules.len(), "Domain bundle loaded");
        Ok(Some(DomainBundle::new(context.clone()).with_rules(rules)))
    }

    async fn list_domains(&self) -> Vec<String> {
        self.domains.keys().cloned().collect()
    }
}

fn builtin_domains() -> Vec<DomainContext> {
    let limits = |time_ms: u64, memory_mb: u64, cpu: u32, kbps: u64| PerformanceContext {
        max_execution_time_ms: time_ms,
        max_memory_mb: memory_mb,
        max_cpu_percent: cpu,
        max_network_bandwidth_kbps: kbps,
    };

    vec![
        DomainContext::new("general", "general", "1.0.0")
            .with_security_level(SecurityLevel::Medium.as_str())
            .with_performance(limits(30_000, 512, 100, 10_000)),
        DomainContext::new("web", "web", "1.0.0")
            .with_security_level(SecurityLevel::Medium.as_str())
            .with_performance(limits(30_000, 256, 80, 10_000)),
        DomainContext::new("mobile", "mobile", "1.0.0")
            .with_security_level(SecurityLevel::High.as_str())
            .with_performance(limits(10_000, 128, 50, 2_000))
            .with_mobile(MobileContext {
                requires_optimization: true,
                battery_aware: true,
                max_payload_kb: Some(512),
            }),
        DomainContext::new("desktop", "desktop", "1.0.0")
            .with_security_level(SecurityLevel::Medium.as_str())
            .with_performance(limits(60_000, 1_024, 100, 50_000)),
        DomainContext::new("server", "server", "1.0.0")
            .with_security_level(SecurityLevel::High.as_str())
            .with_performance(limits(120_000, 2_048, 100, 100_000)),
    ]
}
