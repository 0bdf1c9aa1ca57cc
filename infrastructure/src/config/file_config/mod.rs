//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! They are deserialized directly and use application/domain types where
//! the shapes coincide (`[[servers]]`, `[[domains]]`, `[client.mobile]`).

mod client;
mod logging;
mod sandbox;

pub use client::FileClientConfig;
pub use logging::FileLoggingConfig;
pub use sandbox::FileSandboxConfig;

use omnitool_application::{ClientConfig, SandboxConfig, ServerConfig};
use omnitool_domain::{DomainContext, IsolationLevel, SecurityLevel};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// Errors that can occur during configuration validation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigValidationError {
    #[error("client.history_capacity cannot be 0")]
    ZeroHistoryCapacity,

    #[error("client.mobile.max_timeout_ms cannot be 0")]
    ZeroMobileTimeout,

    #[error("server name cannot be empty")]
    EmptyServerName,

    #[error("server '{0}' is declared more than once")]
    DuplicateServer(String),

    #[error("sandbox.isolation: unknown value '{0}' (expected standard or strict)")]
    UnknownIsolation(String),

    #[error("domain '{id}': {reason}")]
    InvalidDomain { id: String, reason: String },
}

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Orchestrator settings
    pub client: FileClientConfig,
    /// Sandbox executor settings
    pub sandbox: FileSandboxConfig,
    /// Tool servers connected at startup
    pub servers: Vec<ServerConfig>,
    /// Extra domains on top of the built-in catalog
    pub domains: Vec<DomainContext>,
    pub logging: FileLoggingConfig,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            client: FileClientConfig::default(),
            sandbox: FileSandboxConfig::default(),
            servers: vec![ServerConfig::new("local", "local")],
            domains: Vec::new(),
            logging: FileLoggingConfig::default(),
        }
    }
}

impl FileConfig {
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.client.history_capacity == 0 {
            return Err(ConfigValidationError::ZeroHistoryCapacity);
        }
        if self.client.mobile.enabled && self.client.mobile.max_timeout_ms == 0 {
            return Err(ConfigValidationError::ZeroMobileTimeout);
        }

        let mut names = HashSet::new();
        for server in &self.servers {
            if server.name.trim().is_empty() {
                return Err(ConfigValidationError::EmptyServerName);
            }
            if !names.insert(server.name.as_str()) {
                return Err(ConfigValidationError::DuplicateServer(server.name.clone()));
            }
        }

        if IsolationLevel::parse(&self.sandbox.isolation).is_none() {
            return Err(ConfigValidationError::UnknownIsolation(self.sandbox.isolation.clone()));
        }

        for domain in &self.domains {
            validate_domain(domain)?;
        }
        Ok(())
    }

    pub fn to_client_config(&self) -> ClientConfig {
        ClientConfig {
            retry_base_delay_ms: self.client.retry_base_delay_ms,
            history_capacity: self.client.history_capacity,
            mobile: self.client.mobile.clone(),
            servers: self.servers.clone(),
        }
    }

    /// Unknown isolation labels fall back to the default; `validate` reports them.
    pub fn to_sandbox_config(&self) -> SandboxConfig {
        SandboxConfig {
            default_isolation: IsolationLevel::parse(&self.sandbox.isolation).unwrap_or_default(),
            worker_thread_prefix: self.sandbox.worker_thread_prefix.clone(),
            battery_drain_per_cpu_second: self.sandbox.battery_drain_per_cpu_second,
        }
    }
}

fn validate_domain(domain: &DomainContext) -> Result<(), ConfigValidationError> {
    let invalid = |reason: String| ConfigValidationError::InvalidDomain {
        id: domain.id.clone(),
        reason,
    };

    if domain.id.trim().is_empty() {
        return Err(invalid("id cannot be empty".to_string()));
    }
    if domain.category.trim().is_empty() {
        return Err(invalid("category cannot be empty".to_string()));
    }
    if SecurityLevel::parse(&domain.security.level).is_none() {
        return Err(invalid(format!("unknown security level '{}'", domain.security.level)));
    }
    if domain.version.split('.').any(|part| part.parse::<u64>().is_err()) {
        return Err(invalid(format!("version '{}' is not numeric", domain.version)));
    }
    if domain.performance.max_execution_time_ms == 0 {
        return Err(invalid("performance.max_execution_time_ms cannot be 0".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_full_config() {
        let toml_str = r#"
[client]
retry_base_delay_ms = 250
history_capacity = 50
default_max_retries = 4

[client.mobile]
enabled = true
max_timeout_ms = 8000

[sandbox]
isolation = "strict"
worker_thread_prefix = "tool"

[[servers]]
name = "tools"
kind = "local"
env = { LANG = "C" }

[[domains]]
id = "kiosk"
category = "mobile"
version = "1.2.0"

[domains.security]
level = "high"

[domains.performance]
max_execution_time_ms = 5000

[logging]
execution_log = "/tmp/omnitool/executions.jsonl"
"#;

        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert!(config.validate().is_ok());

        let client = config.to_client_config();
        assert_eq!(client.retry_base_delay_ms, 250);
        assert_eq!(client.history_capacity, 50);
        assert!(client.mobile.enabled);
        assert_eq!(client.mobile.max_timeout_ms, 8000);
        assert_eq!(client.servers.len(), 1);
        assert_eq!(client.servers[0].env["LANG"], "C");
        assert_eq!(config.client.default_max_retries, 4);

        let sandbox = config.to_sandbox_config();
        assert_eq!(sandbox.default_isolation, IsolationLevel::Strict);
        assert_eq!(sandbox.worker_thread_prefix, "tool");

        let kiosk = &config.domains[0];
        assert_eq!(kiosk.security.level, "high");
        assert_eq!(kiosk.performance.max_execution_time_ms, 5000);
        // unspecified limits keep their defaults
        assert_eq!(kiosk.performance.max_memory_mb, 512);
        assert!(config.logging.execution_log.is_some());
    }

    #[test]
    fn test_default_config() {
        let config = FileConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.servers.len(), 1);
        assert_eq!(config.servers[0].kind, "local");
        assert_eq!(config.to_client_config(), ClientConfig {
            servers: config.servers.clone(),
            ..ClientConfig::default()
        });
    }

    #[test]
    fn test_validate_duplicate_server() {
        let toml_str = r#"
[[servers]]
name = "a"

[[servers]]
name = "a"
"#;
        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(
            config.validate(),
            Err(ConfigValidationError::DuplicateServer("a".to_string()))
        );
    }

    #[test]
    fn test_validate_unknown_isolation() {
        let toml_str = r#"
[sandbox]
isolation = "paranoid"
"#;
        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigValidationError::UnknownIsolation(_))
        ));
        assert_eq!(config.to_sandbox_config().default_isolation, IsolationLevel::Standard);
    }

    #[test]
    fn test_validate_bad_domain() {
        let toml_str = r#"
[[domains]]
id = "odd"
category = "general"
version = "one"
"#;
        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigValidationError::InvalidDomain { .. })
        ));
    }

    #[test]
    fn test_validate_zero_history() {
        let toml_str = r#"
[client]
history_capacity = 0
"#;
        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.validate(), Err(ConfigValidationError::ZeroHistoryCapacity));
    }
}
