//! Sandbox port
//!
//! Runs one call inside a resource- and policy-bounded
//! [`ExecutionEnvironment`]. Every outcome, including policy rejections and
//! timeouts, is reported as a [`ToolResult`].

use async_trait::async_trait;
use omnitool_domain::{
    DomainContext, ExecutionEnvironment, OrchestrationError, ResourceUsage, Tool, ToolCall,
    ToolResult,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::tool_transport::ToolTransport;

/// One sandboxed dispatch
pub struct SandboxRequest<'a> {
    pub call: &'a ToolCall,
    pub tool: &'a Tool,
    pub domain: &'a DomainContext,
    /// Use this environment instead of the domain default
    pub environment: Option<ExecutionEnvironment>,
    pub transport: Arc<dyn ToolTransport>,
    /// Cancelled by `cancel_call`; the worker stops cooperatively
    pub cancel: CancellationToken,
}

impl<'a> SandboxRequest<'a> {
    pub fn new(
        call: &'a ToolCall,
        tool: &'a Tool,
        domain: &'a DomainContext,
        transport: Arc<dyn ToolTransport>,
    ) -> Self {
        Self {
            call,
            tool,
            domain,
            environment: None,
            transport,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_environment(mut self, environment: ExecutionEnvironment) -> Self {
        self.environment = Some(environment);
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

#[async_trait]
pub trait SandboxPort: Send + Sync {
    async fn execute_in_sandbox(&self, request: SandboxRequest<'_>) -> ToolResult;

    fn get_environment(&self, environment_id: &str) -> Option<ExecutionEnvironment>;

    /// Replace an environment by id. Limits are clamped to the cached
    /// environment's ceiling when one exists.
    fn update_environment(&self, environment: ExecutionEnvironment) -> Result<(), OrchestrationError>;

    fn remove_environment(&self, environment_id: &str) -> bool;

    fn get_resource_usage(&self, environment_id: &str) -> Option<ResourceUsage>;
}
