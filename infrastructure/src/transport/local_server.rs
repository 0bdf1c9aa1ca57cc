//! In-process tool server and its connector

use super::builtin;
use async_trait::async_trait;
use omnitool_application::{ServerConfig, ServerConnector, ToolTransport, TransportError};
use omnitool_domain::{Tool, ToolCall};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Server kind handled by [`LocalServerConnector`]
pub const LOCAL_SERVER_KIND: &str = "local";

/// Serves the built-in tools from inside the process.
///
/// Tool ids are `<server name>.<tool>`, so two local servers with different
/// names expose disjoint ids.
pub struct LocalToolServer {
    name: String,
    tools: Vec<Tool>,
    /// Extra environment for `run_command`
    env: HashMap<String, String>,
}

impl LocalToolServer {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            tools: builtin::definitions(&name),
            name,
            env: HashMap::new(),
        }
    }

    pub fn with_env(mut self, env: HashMap<String, String>) -> Self {
        self.env = env;
        self
    }

    /// Built-in name of a tool id served here (`local.echo` → `echo`).
    fn builtin_name<'a>(&self, tool_id: &'a str) -> Option<&'a str> {
        tool_id
            .strip_prefix(self.name.as_str())
            .and_then(|rest| rest.strip_prefix('.'))
    }
}

#[async_trait]
impl ToolTransport for LocalToolServer {
    fn server_name(&self) -> &str {
        &self.name
    }

    async fn discover_tools(&self) -> Result<Vec<Tool>, TransportError> {
        Ok(self.tools.clone())
    }

    async fn call(&self, tool: &Tool, call: &ToolCall) -> Result<Value, TransportError> {
        let name = self
            .builtin_name(&tool.id)
            .ok_or_else(|| TransportError::ToolNotFound(tool.id.clone()))?;
        debug!(server = %self.name, tool = name, call_id = %call.id, "Local tool call");

        match name {
            builtin::ECHO => builtin::echo(call),
            builtin::DELAY => builtin::delay(call).await,
            builtin::READ_FILE => builtin::read_file(call).await,
            builtin::RUN_COMMAND => builtin::run_command(call, &self.env).await,
            _ => Err(TransportError::ToolNotFound(tool.id.clone())),
        }
    }
}

/// Opens [`LocalToolServer`]s for servers of kind `local`.
#[derive(Debug, Clone, Default)]
pub struct LocalServerConnector;

#[async_trait]
impl ServerConnector for LocalServerConnector {
    async fn connect(&self, config: &ServerConfig) -> Result<Arc<dyn ToolTransport>, TransportError> {
        if config.kind != LOCAL_SERVER_KIND {
            return Err(TransportError::Connection(format!(
                "unsupported server kind '{}' for server '{}'",
                config.kind, config.name
            )));
        }
        Ok(Arc::new(LocalToolServer::new(&config.name).with_env(config.env.clone())))
    }
}
