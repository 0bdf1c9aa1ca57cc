//! Update events published by the orchestrator

use serde::{Deserialize, Serialize};

/// Change notification delivered to subscribers.
///
/// Serialized with a snake_case `type` tag, e.g.
/// `{"type":"server_added","server_name":"local"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UpdateEvent {
    CapabilityRegistered { capability_id: String },
    CacheCleared { reason: String },
    ServerAdded { server_name: String },
    ServerRemoved { server_name: String },
    ServerConfigUpdated { server_name: String },
    ConfigurationUpdated { setting: String },
    RegistryImported { tools: usize, capabilities: usize },
}

impl UpdateEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            UpdateEvent::CapabilityRegistered { .. } => "capability_registered",
            UpdateEvent::CacheCleared { .. } => "cache_cleared",
            UpdateEvent::ServerAdded { .. } => "server_added",
            UpdateEvent::ServerRemoved { .. } => "server_removed",
            UpdateEvent::ServerConfigUpdated { .. } => "server_config_updated",
            UpdateEvent::ConfigurationUpdated { .. } => "configuration_updated",
            UpdateEvent::RegistryImported { .. } => "registry_imported",
        }
    }
}

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubscriptionId(pub u64);

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}
