//! Tool discovery and the tool/capability caches

use super::mobile::filter_for_mobile;
use super::{UniversalClient, lock, read, write};
use crate::ports::tool_transport::ToolTransport;
use futures::future::join_all;
use omnitool_domain::{OrchestrationError, Tool, ToolCapability, UpdateEvent};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

impl UniversalClient {
    /// All tools reachable through the connected servers, sorted by id.
    ///
    /// Served from the cache when it is non-empty. Otherwise every server is
    /// queried concurrently; servers that fail are logged and skipped. When
    /// mobile mode is on, tools without mobile support are hidden.
    pub async fn discover_all_available_tools(&self) -> Result<Vec<Tool>, OrchestrationError> {
        self.ensure_initialized()?;

        let cached = self.cached_tools();
        if !cached.is_empty() {
            lock(&self.stats).discovery.record_hit();
            debug!(tools = cached.len(), "Tool cache hit");
            return Ok(filter_for_mobile(cached, &read(&self.config).mobile));
        }

        let started = Instant::now();
        let transports: Vec<(String, Arc<dyn ToolTransport>)> = read(&self.connections)
            .iter()
            .map(|(name, c)| (name.clone(), c.transport.clone()))
            .collect();

        let results = join_all(transports.iter().map(|(name, transport)| async move {
            (name.clone(), transport.discover_tools().await)
        }))
        .await;

        let mut merged: HashMap<String, Tool> = HashMap::new();
        let mut declared: HashMap<String, HashSet<String>> = HashMap::new();
        let mut results = results;
        // deterministic winner when two servers declare the same id
        results.sort_by(|a, b| a.0.cmp(&b.0));

        for (server, result) in results {
            match result {
                Ok(tools) => {
                    let ids = declared.entry(server.clone()).or_default();
                    for mut tool in tools {
                        if tool.server_name.is_empty() {
                            tool.server_name = server.clone();
                        }
                        ids.insert(tool.id.clone());
                        merged.entry(tool.id.clone()).or_insert(tool);
                    }
                }
                Err(e) => {
                    warn!(server = %server, error = %e, "Tool discovery failed for server, skipping");
                }
            }
        }

        {
            let mut connections = write(&self.connections);
            for (name, ids) in declared {
                if let Some(connection) = connections.get_mut(&name) {
                    connection.declared_tools = ids;
                }
            }
        }
        {
            let mut cache = write(&self.tools);
            for (id, tool) in merged {
                cache.insert(id, tool);
            }
        }

        let elapsed_ms = started.elapsed().as_millis() as u64;
        lock(&self.stats).discovery.record_miss(elapsed_ms);

        let tools = self.cached_tools();
        info!(tools = tools.len(), servers = transports.len(), elapsed_ms, "Discovered tools");
        Ok(filter_for_mobile(tools, &read(&self.config).mobile))
    }

    pub fn get_tool(&self, tool_id: &str) -> Option<Tool> {
        read(&self.tools).get(tool_id).cloned()
    }

    /// Cached tools sorted by id, without the mobile filter.
    pub fn cached_tools(&self) -> Vec<Tool> {
        let mut tools: Vec<Tool> = read(&self.tools).values().cloned().collect();
        tools.sort_by(|a, b| a.id.cmp(&b.id));
        tools
    }

    /// Drop a tool from the cache and from every server's declarations.
    pub fn unregister_tool(&self, tool_id: &str) -> bool {
        let removed = write(&self.tools).remove(tool_id).is_some();
        if removed {
            for connection in write(&self.connections).values_mut() {
                connection.declared_tools.remove(tool_id);
            }
            debug!(tool = tool_id, "Tool unregistered");
        }
        removed
    }

    /// Tools tagged with a capability, or listed by the registered capability.
    pub fn tools_for_capability(&self, capability_id: &str) -> Vec<Tool> {
        let listed: HashSet<String> = read(&self.capabilities)
            .get(capability_id)
            .map(|c| c.tool_ids.iter().cloned().collect())
            .unwrap_or_default();

        self.cached_tools()
            .into_iter()
            .filter(|t| t.has_capability(capability_id) || listed.contains(&t.id))
            .collect()
    }

    /// Tools whose category, or current domain category, is `category`.
    pub fn tools_for_domain(&self, category: &str) -> Vec<Tool> {
        self.cached_tools()
            .into_iter()
            .filter(|t| t.category == category || t.domain.category == category)
            .collect()
    }

    pub fn register_tool_capability(&self, capability: ToolCapability) -> Result<(), OrchestrationError> {
        if capability.id.trim().is_empty() || capability.name.trim().is_empty() {
            return Err(OrchestrationError::ToolRegistration(
                "capability id and name must not be empty".to_string(),
            ));
        }

        let capability_id = capability.id.clone();
        write(&self.capabilities).insert(capability_id.clone(), capability);
        info!(capability = %capability_id, "Capability registered");
        self.publish(UpdateEvent::CapabilityRegistered { capability_id });
        Ok(())
    }

    pub fn get_capability(&self, capability_id: &str) -> Option<ToolCapability> {
        read(&self.capabilities).get(capability_id).cloned()
    }

    pub fn capabilities(&self) -> Vec<ToolCapability> {
        let mut caps: Vec<ToolCapability> = read(&self.capabilities).values().cloned().collect();
        caps.sort_by(|a, b| a.id.cmp(&b.id));
        caps
    }

    /// Empty the tool cache so the next discovery queries the servers again.
    pub fn clear_tool_cache(&self, reason: &str) {
        write(&self.tools).clear();
        info!(reason, "Tool cache cleared");
        self.publish(UpdateEvent::CacheCleared {
            reason: reason.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use omnitool_domain::{MobileProfile, OrchestrationError, Tool, ToolCapability, UpdateEvent};
    use std::sync::atomic::Ordering;
    use std::sync::{Arc, Mutex};

    fn tools() -> Vec<Tool> {
        vec![
            Tool::new("b.write", "write").with_category("desktop").with_capability("fs"),
            Tool::new("a.read", "read").with_capability("fs"),
            Tool::new("c.web", "web").with_category("web").with_mobile(MobileProfile {
                supported: false,
                ..Default::default()
            }),
        ]
    }

    #[tokio::test]
    async fn test_discovery_requires_initialize() {
        let harness = Harness::new(tools());
        let err = harness.client.discover_all_available_tools().await.unwrap_err();
        assert_eq!(err, OrchestrationError::NotInitialized);
    }

    #[tokio::test]
    async fn test_discovery_is_idempotent_and_cached() {
        let harness = Harness::new(tools());
        harness.client.initialize().await.unwrap();

        let first = harness.client.discover_all_available_tools().await.unwrap();
        let second = harness.client.discover_all_available_tools().await.unwrap();

        assert_eq!(first, second);
        let ids: Vec<&str> = first.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["a.read", "b.write", "c.web"]);
        assert_eq!(first[0].server_name, "mock");
        assert_eq!(harness.transport.discoveries.load(Ordering::SeqCst), 1);

        let metrics = harness.client.get_performance_metrics();
        assert_eq!(metrics.discovery.cache_misses, 1);
        assert_eq!(metrics.discovery.cache_hits, 1);
    }

    #[tokio::test]
    async fn test_failed_server_is_skipped() {
        let config = Harness::config().with_server(crate::config::ServerConfig::new("down", "broken"));
        let harness = Harness::ready_from(tools(), config).await;
        // the broken server never connected; the mock one still serves
        assert_eq!(harness.client.connected_servers(), vec!["mock"]);
        assert_eq!(harness.client.cached_tools().len(), 3);
    }

    #[tokio::test]
    async fn test_discovery_failure_yields_empty_not_error() {
        let harness = Harness::new(tools());
        harness.transport.fail_discovery.store(true, Ordering::SeqCst);
        harness.client.initialize().await.unwrap();
        assert!(harness.client.discover_all_available_tools().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mobile_filter() {
        let harness = Harness::ready_mobile(tools()).await;
        let visible = harness.client.discover_all_available_tools().await.unwrap();
        assert_eq!(visible.len(), 2);
        assert!(visible.iter().all(|t| t.mobile.supported));
        // cache keeps everything
        assert_eq!(harness.client.cached_tools().len(), 3);
    }

    #[tokio::test]
    async fn test_indices_and_unregister() {
        let harness = Harness::ready(tools()).await;
        assert_eq!(harness.client.tools_for_capability("fs").len(), 2);
        assert_eq!(harness.client.tools_for_domain("web")[0].id, "c.web");
        // default domain category is general
        assert_eq!(harness.client.tools_for_domain("general").len(), 3);

        assert!(harness.client.unregister_tool("a.read"));
        assert!(!harness.client.unregister_tool("a.read"));
        assert_eq!(harness.client.tools_for_capability("fs").len(), 1);
    }

    #[tokio::test]
    async fn test_register_capability() {
        let harness = Harness::ready(tools()).await;
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        harness
            .client
            .subscribe(Arc::new(move |e: &UpdateEvent| sink.lock().unwrap().push(e.clone())));

        harness
            .client
            .register_tool_capability(ToolCapability::new("web", "Web access").with_tool("c.web"))
            .unwrap();
        assert!(
            harness
                .client
                .register_tool_capability(ToolCapability::new("", "nameless"))
                .is_err()
        );

        assert_eq!(harness.client.tools_for_capability("web")[0].id, "c.web");
        assert_eq!(
            *events.lock().unwrap(),
            vec![UpdateEvent::CapabilityRegistered {
                capability_id: "web".into()
            }]
        );
    }

    #[tokio::test]
    async fn test_clear_cache_forces_rediscovery() {
        let harness = Harness::ready(tools()).await;
        harness.client.clear_tool_cache("test");
        harness.client.discover_all_available_tools().await.unwrap();
        assert_eq!(harness.transport.discoveries.load(Ordering::SeqCst), 2);
    }
}
