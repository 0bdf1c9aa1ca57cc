//! Server lifecycle and client configuration updates
//!
//! Every mutation of the server set invalidates the tool cache.

use super::connections::{ConnectionStats, ServerConnection};
use super::{UniversalClient, lock, read, write};
use crate::config::{ClientConfig, ServerConfig};
use omnitool_domain::{OrchestrationError, UpdateEvent};
use tracing::info;

impl UniversalClient {
    /// Connect a new server.
    pub async fn add_mcp_server(&self, config: ServerConfig) -> Result<(), OrchestrationError> {
        config.validate()?;
        if self.has_server(&config.name) {
            return Err(duplicate_server(&config.name));
        }

        let transport = if config.enabled {
            let transport = self
                .connector
                .connect(&config)
                .await
                .map_err(|e| OrchestrationError::Connection(format!("{}: {}", config.name, e)))?;
            Some(transport)
        } else {
            None
        };

        // Another add of the same name may have finished while we were connecting
        let claimed = {
            let mut client_config = write(&self.config);
            if client_config.servers.iter().any(|s| s.name == config.name) {
                false
            } else {
                if let Some(transport) = &transport {
                    write(&self.connections)
                        .entry(config.name.clone())
                        .or_insert_with(|| ServerConnection::new(config.clone(), transport.clone()));
                }
                client_config.servers.push(config.clone());
                true
            }
        };
        if !claimed {
            if let Some(transport) = transport {
                transport.close().await;
            }
            return Err(duplicate_server(&config.name));
        }

        let server_name = config.name;
        info!(server = %server_name, "Server added");

        self.clear_tool_cache(&format!("server '{}' added", server_name));
        self.publish(UpdateEvent::ServerAdded { server_name });
        Ok(())
    }

    pub async fn remove_mcp_server(&self, name: &str) -> Result<(), OrchestrationError> {
        if !self.has_server(name) {
            return Err(OrchestrationError::Configuration(format!("unknown server '{}'", name)));
        }

        let removed = write(&self.connections).remove(name);
        if let Some(connection) = removed {
            connection.transport.close().await;
        }
        write(&self.config).servers.retain(|s| s.name != name);
        info!(server = name, "Server removed");

        self.clear_tool_cache(&format!("server '{}' removed", name));
        self.publish(UpdateEvent::ServerRemoved {
            server_name: name.to_string(),
        });
        Ok(())
    }

    /// Replace a server's configuration and reconnect it.
    ///
    /// Connection statistics start over. A disabled server is disconnected
    /// but keeps its configuration.
    pub async fn update_mcp_server_config(&self, config: ServerConfig) -> Result<(), OrchestrationError> {
        config.validate()?;
        if !self.has_server(&config.name) {
            return Err(OrchestrationError::Configuration(format!(
                "unknown server '{}'",
                config.name
            )));
        }

        let replacement = if config.enabled {
            let transport = self
                .connector
                .connect(&config)
                .await
                .map_err(|e| OrchestrationError::Connection(format!("{}: {}", config.name, e)))?;
            Some(ServerConnection::new(config.clone(), transport))
        } else {
            None
        };

        let previous = {
            let mut connections = write(&self.connections);
            match replacement {
                Some(connection) => connections.insert(config.name.clone(), connection),
                None => connections.remove(&config.name),
            }
        };
        if let Some(previous) = previous {
            previous.transport.close().await;
        }

        let server_name = config.name.clone();
        {
            let mut client_config = write(&self.config);
            if let Some(slot) = client_config.servers.iter_mut().find(|s| s.name == server_name) {
                *slot = config;
            }
        }
        info!(server = %server_name, "Server configuration updated");

        self.clear_tool_cache(&format!("server '{}' updated", server_name));
        self.publish(UpdateEvent::ServerConfigUpdated { server_name });
        Ok(())
    }

    /// Names of connected servers, sorted.
    pub fn connected_servers(&self) -> Vec<String> {
        let mut names: Vec<String> = read(&self.connections).keys().cloned().collect();
        names.sort();
        names
    }

    pub fn connection_stats(&self, name: &str) -> Option<ConnectionStats> {
        read(&self.connections).get(name).map(|c| c.stats.clone())
    }

    /// Replace retry, history and mobile settings. Servers are managed
    /// through the server lifecycle methods and are left untouched.
    pub fn update_configuration(&self, update: ClientConfig) -> Result<(), OrchestrationError> {
        let mut next = self.config_snapshot();
        next.retry_base_delay_ms = update.retry_base_delay_ms;
        next.history_capacity = update.history_capacity;
        next.mobile = update.mobile;
        next.validate()?;

        let capacity = next.history_capacity;
        *write(&self.config) = next;
        {
            let mut history = lock(&self.history);
            while history.len() > capacity {
                history.pop_front();
            }
        }
        info!(history_capacity = capacity, "Client configuration updated");
        self.publish(UpdateEvent::ConfigurationUpdated {
            setting: "client".to_string(),
        });
        Ok(())
    }

    fn has_server(&self, name: &str) -> bool {
        read(&self.config).servers.iter().any(|s| s.name == name)
    }
}

fn duplicate_server(name: &str) -> OrchestrationError {
    OrchestrationError::Configuration(format!("server '{}' already exists", name))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use crate::config::{ClientConfig, MobileConfig, ServerConfig};
    use omnitool_domain::{OrchestrationError, Tool, ToolCall, UpdateEvent};
    use std::sync::atomic::Ordering;
    use std::sync::{Arc, Mutex};

    fn record_events(harness: &Harness) -> Arc<Mutex<Vec<String>>> {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        harness.client.subscribe(Arc::new(move |e: &UpdateEvent| {
            sink.lock().unwrap().push(e.event_type().to_string())
        }));
        events
    }

    #[tokio::test]
    async fn test_initialize_is_idempotent() {
        let harness = Harness::new(vec![]);
        harness.client.initialize().await.unwrap();
        harness.client.initialize().await.unwrap();
        assert_eq!(harness.connector.connects.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_initialize_rejects_bad_config() {
        let config = ClientConfig::default().with_history_capacity(0);
        let harness = Harness::with_config(vec![], config);
        let err = harness.client.initialize().await.unwrap_err();
        assert!(matches!(err, OrchestrationError::Configuration(_)));
        assert!(!harness.client.is_initialized());
    }

    #[tokio::test]
    async fn test_add_and_remove_server() {
        let harness = Harness::ready(vec![Tool::new("echo", "echo")]).await;
        let events = record_events(&harness);

        harness
            .client
            .add_mcp_server(ServerConfig::new("second", "mock"))
            .await
            .unwrap();
        assert_eq!(harness.client.connected_servers(), vec!["mock", "second"]);
        assert!(harness.client.cached_tools().is_empty());

        let dup = harness.client.add_mcp_server(ServerConfig::new("second", "mock")).await;
        assert!(matches!(dup, Err(OrchestrationError::Configuration(_))));

        harness.client.remove_mcp_server("second").await.unwrap();
        assert!(matches!(
            harness.client.remove_mcp_server("second").await,
            Err(OrchestrationError::Configuration(_))
        ));

        assert_eq!(
            *events.lock().unwrap(),
            vec!["cache_cleared", "server_added", "cache_cleared", "server_removed"]
        );
    }

    #[tokio::test]
    async fn test_concurrent_adds_of_one_name_admit_one() {
        let harness = Harness::ready(vec![]).await;
        harness.connector.connect_delay_ms.store(20, Ordering::SeqCst);
        let events = record_events(&harness);

        let (first, second) = tokio::join!(
            harness.client.add_mcp_server(ServerConfig::new("second", "mock")),
            harness.client.add_mcp_server(ServerConfig::new("second", "mock")),
        );

        assert_eq!(first.is_ok() as u8 + second.is_ok() as u8, 1, "{:?} / {:?}", first, second);
        let loser = if first.is_err() { first } else { second };
        assert!(matches!(loser, Err(OrchestrationError::Configuration(_))));
        assert_eq!(harness.connector.connects.load(Ordering::SeqCst), 3);

        let servers: Vec<String> = harness.client.config_snapshot().servers.into_iter().map(|s| s.name).collect();
        assert_eq!(servers, vec!["mock", "second"]);
        assert_eq!(harness.client.connected_servers(), vec!["mock", "second"]);
        assert_eq!(*events.lock().unwrap(), vec!["cache_cleared", "server_added"]);
    }

    #[tokio::test]
    async fn test_connection_failure_is_connection_error() {
        let harness = Harness::ready(vec![]).await;
        let err = harness
            .client
            .add_mcp_server(ServerConfig::new("remote", "broken"))
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestrationError::Connection(_)));
        assert_eq!(harness.client.connected_servers(), vec!["mock"]);
    }

    #[tokio::test]
    async fn test_update_server_config() {
        let harness = Harness::ready(vec![Tool::new("echo", "echo")]).await;
        harness
            .client
            .execute_tool_with_universal_adapter(ToolCall::new("echo"))
            .await
            .unwrap();
        assert_eq!(harness.client.connection_stats("mock").unwrap().calls, 1);

        harness
            .client
            .update_mcp_server_config(ServerConfig::new("mock", "mock").with_env("MODE", "fast"))
            .await
            .unwrap();
        assert_eq!(harness.client.connection_stats("mock").unwrap().calls, 0);
        assert_eq!(harness.client.config_snapshot().servers[0].env["MODE"], "fast");

        harness
            .client
            .update_mcp_server_config(ServerConfig::new("mock", "mock").disabled())
            .await
            .unwrap();
        assert!(harness.client.connected_servers().is_empty());

        let unknown = harness
            .client
            .update_mcp_server_config(ServerConfig::new("ghost", "mock"))
            .await;
        assert!(matches!(unknown, Err(OrchestrationError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_update_configuration_shrinks_history() {
        let harness = Harness::ready(vec![Tool::new("echo", "echo")]).await;
        for _ in 0..5 {
            harness
                .client
                .execute_tool_with_universal_adapter(ToolCall::new("echo"))
                .await
                .unwrap();
        }
        let events = record_events(&harness);

        let update = ClientConfig::default()
            .with_history_capacity(2)
            .with_mobile(MobileConfig {
                enabled: true,
                ..Default::default()
            });
        harness.client.update_configuration(update).unwrap();

        assert_eq!(harness.client.execution_history().len(), 2);
        let config = harness.client.config_snapshot();
        assert!(config.mobile.enabled);
        assert_eq!(config.servers.len(), 1);
        assert_eq!(*events.lock().unwrap(), vec!["configuration_updated"]);

        assert!(
            harness
                .client
                .update_configuration(ClientConfig::default().with_history_capacity(0))
                .is_err()
        );
    }
}
