//! Domain context handler
//!
//! Decides whether a tool may run in a target domain and rewrites its
//! contract to fit. Domain bundles (context + constraints + rules) are fetched
//! from the [`DomainStore`] once and cached as a unit, so readers never
//! observe a context without its matching rules.
//!
//! # Usage
//!
//! ```ignore
//! let handler = DomainContextHandler::new(store);
//!
//! if handler.can_adapt_tool(&tool, "mobile").await {
//!     let adapted = handler.adapt_tool_for_domain(&tool, "mobile").await?;
//! }
//! ```

use crate::ports::domain_store::DomainStore;
use omnitool_domain::{
    AdaptationMetrics, AdaptationRule, CompatibilityReport, DomainBundle, OrchestrationError, Tool,
    adapt_tool,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Instant;
use tracing::{debug, info};

pub struct DomainContextHandler {
    store: Arc<dyn DomainStore>,
    bundles: RwLock<HashMap<String, Arc<DomainBundle>>>,
    /// Rules registered at runtime, appended after the store's rules
    registered_rules: RwLock<HashMap<String, Vec<AdaptationRule>>>,
    metrics: Mutex<AdaptationMetrics>,
}

impl DomainContextHandler {
    pub fn new(store: Arc<dyn DomainStore>) -> Self {
        Self {
            store,
            bundles: RwLock::new(HashMap::new()),
            registered_rules: RwLock::new(HashMap::new()),
            metrics: Mutex::new(AdaptationMetrics::default()),
        }
    }

    /// Load (or return the cached) bundle for a domain.
    ///
    /// Unknown domains and store failures are configuration errors.
    pub async fn configure_for_domain(&self, domain_id: &str) -> Result<Arc<DomainBundle>, OrchestrationError> {
        if let Some(bundle) = self.cached(domain_id) {
            self.with_metrics(|m| m.domain_cache_hits += 1);
            return Ok(bundle);
        }

        let started = Instant::now();
        let bundle = self
            .store
            .load_bundle(domain_id)
            .await
            .map_err(|e| OrchestrationError::Configuration(e.to_string()))?
            .ok_or_else(|| OrchestrationError::Configuration(format!("Unknown domain: {}", domain_id)))?;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        let bundle = Arc::new(self.with_registered_rules(bundle));
        let bundle = match self.bundles.write() {
            Ok(mut bundles) => bundles
                .entry(domain_id.to_string())
                .or_insert(bundle)
                .clone(),
            Err(_) => bundle,
        };

        self.with_metrics(|m| {
            m.domain_loads += 1;
            m.total_load_ms += elapsed_ms;
        });
        info!(domain = domain_id, rules = bundle.rules.len(), elapsed_ms, "Domain configured");
        Ok(bundle)
    }

    /// Whether `tool` may be adapted into `target_domain`.
    ///
    /// Never fails: an unknown domain or any other error yields `false`.
    pub async fn can_adapt_tool(&self, tool: &Tool, target_domain: &str) -> bool {
        let bundle = match self.configure_for_domain(target_domain).await {
            Ok(bundle) => bundle,
            Err(e) => {
                debug!(tool = %tool.id, domain = target_domain, error = %e, "Cannot load target domain");
                return false;
            }
        };

        let report = CompatibilityReport::check(tool, &bundle.context);
        if !report.is_compatible() {
            debug!(
                tool = %tool.id,
                domain = target_domain,
                failed = ?report.failures(),
                "Tool is not compatible with domain"
            );
        }
        report.is_compatible()
    }

    /// Produce a copy of `tool` adapted to `target_domain`. The source is not modified.
    pub async fn adapt_tool_for_domain(&self, tool: &Tool, target_domain: &str) -> Result<Tool, OrchestrationError> {
        let bundle = self.configure_for_domain(target_domain).await?;

        let started = Instant::now();
        let adapted = adapt_tool(tool, &bundle);
        let elapsed_us = started.elapsed().as_micros() as u64;

        self.with_metrics(|m| {
            m.adaptations += 1;
            m.total_adaptation_us += elapsed_us;
        });
        debug!(
            tool = %tool.id,
            domain = target_domain,
            timeout_ms = adapted.timeout_ms,
            "Tool adapted"
        );
        Ok(adapted)
    }

    /// Register a rule for a domain. It runs after the domain's own rules,
    /// in registration order.
    pub fn register_adaptation_rule(&self, domain_id: &str, rule: AdaptationRule) {
        if let Ok(mut rules) = self.registered_rules.write() {
            rules.entry(domain_id.to_string()).or_default().push(rule.clone());
        }
        if let Ok(mut bundles) = self.bundles.write()
            && let Some(current) = bundles.get(domain_id)
        {
            let mut updated = DomainBundle::clone(current);
            updated.rules.push(rule);
            bundles.insert(domain_id.to_string(), Arc::new(updated));
        }
    }

    /// Replace a domain's cached bundle.
    pub fn update_domain(&self, bundle: DomainBundle) {
        let id = bundle.id().to_string();
        let bundle = Arc::new(self.with_registered_rules(bundle));
        if let Ok(mut bundles) = self.bundles.write() {
            bundles.insert(id, bundle);
        }
    }

    pub fn evict(&self, domain_id: &str) -> bool {
        self.bundles
            .write()
            .map(|mut bundles| bundles.remove(domain_id).is_some())
            .unwrap_or(false)
    }

    pub fn clear(&self) {
        if let Ok(mut bundles) = self.bundles.write() {
            bundles.clear();
        }
    }

    pub fn cached_domains(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .bundles
            .read()
            .map(|b| b.keys().cloned().collect())
            .unwrap_or_default();
        ids.sort();
        ids
    }

    pub fn metrics(&self) -> AdaptationMetrics {
        self.metrics.lock().map(|m| m.clone()).unwrap_or_default()
    }

    fn cached(&self, domain_id: &str) -> Option<Arc<DomainBundle>> {
        self.bundles.read().ok()?.get(domain_id).cloned()
    }

    fn with_registered_rules(&self, mut bundle: DomainBundle) -> DomainBundle {
        if let Ok(rules) = self.registered_rules.read()
            && let Some(extra) = rules.get(bundle.id())
        {
            bundle.rules.extend(extra.iter().cloned());
        }
        bundle
    }

    fn with_metrics(&self, f: impl FnOnce(&mut AdaptationMetrics)) {
        if let Ok(mut metrics) = self.metrics.lock() {
            f(&mut metrics);
        }
    }
}
