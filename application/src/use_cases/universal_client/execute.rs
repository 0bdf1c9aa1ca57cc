//! Execution pipeline and retry loop

use super::connections::select_connection;
use super::{UniversalClient, lock, read, write};
use crate::ports::sandbox::SandboxRequest;
use crate::ports::tool_transport::ToolTransport;
use omnitool_domain::{
    DomainContext, ErrorType, OrchestrationError, ResultMetadata, Tool, ToolCall, ToolError, ToolResult, codes,
};
use std::collections::hash_map::Entry;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

impl UniversalClient {
    /// Validate, adapt, dispatch and record one call.
    ///
    /// Returns `Err` only when the client is not initialized; every other
    /// outcome is a [`ToolResult`].
    pub async fn execute_tool_with_universal_adapter(&self, call: ToolCall) -> Result<ToolResult, OrchestrationError> {
        self.ensure_initialized()?;

        let started = Instant::now();
        let cancel = CancellationToken::new();
        let registered = match lock(&self.in_flight).entry(call.id.clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(cancel.clone());
                true
            }
        };

        // A duplicate id must not replace or release the running call's token
        let result = if registered {
            let call_id = call.id.clone();
            let result = self.run_pipeline(call, cancel).await;
            lock(&self.in_flight).remove(&call_id);
            result
        } else {
            warn!(call_id = %call.id, tool = %call.tool_id, "Rejected call with an id already in flight");
            ToolResult::failure(
                ToolError::validation(
                    ErrorType::ToolExecution,
                    format!("Call id '{}' is already in flight", call.id),
                ),
                ResultMetadata::for_call(&call.id, &call.tool_id),
            )
        };

        self.record_execution(&result, started.elapsed());
        Ok(result)
    }

    async fn run_pipeline(&self, call: ToolCall, cancel: CancellationToken) -> ToolResult {
        let reject = |call: &ToolCall, error: ToolError| {
            debug!(call_id = %call.id, tool = %call.tool_id, code = %error.code, "Call rejected before dispatch");
            ToolResult::failure(error, ResultMetadata::for_call(&call.id, &call.tool_id))
        };

        let Some(tool) = self.get_tool(&call.tool_id) else {
            return reject(&call, ToolError::tool_not_found(&call.tool_id));
        };

        let (tool, call) = match call.context.target_domain.clone() {
            Some(target) if target != tool.domain.id => match self.adapt_for_target(&tool, call.clone(), &target).await {
                Ok(adapted) => adapted,
                Err(error) => return reject(&call, error),
            },
            _ => (tool, call),
        };

        if let Err(error) = self.validator.validate(&call, &tool) {
            return reject(&call, error);
        }

        let call = super::mobile::optimize_call(call, &read(&self.config).mobile);

        let Some((server_name, transport)) = self.select_transport(&tool) else {
            return reject(&call, ToolError::no_server(&tool.id));
        };

        let domain = tool.domain.clone();
        self.execute_with_retry(&call, &tool, &domain, &server_name, transport, cancel)
            .await
    }

    /// Adapt `tool` into `target` and fit the call's timeout to the adapted contract.
    async fn adapt_for_target(&self, tool: &Tool, mut call: ToolCall, target: &str) -> Result<(Tool, ToolCall), ToolError> {
        if !self.domains.can_adapt_tool(tool, target).await {
            return Err(ToolError::domain_incompatible(format!(
                "Tool '{}' cannot run in domain '{}'",
                tool.id, target
            )));
        }
        let adapted = self
            .domains
            .adapt_tool_for_domain(tool, target)
            .await
            .map_err(|e| ToolError::domain_incompatible(e.to_string()))?;

        call.timeout_ms = call.timeout_ms.min(adapted.timeout_ms);
        Ok((adapted, call))
    }

    fn select_transport(&self, tool: &Tool) -> Option<(String, Arc<dyn ToolTransport>)> {
        let connections = read(&self.connections);
        select_connection(&connections, &tool.id, &tool.server_name)
            .map(|c| (c.name().to_string(), c.transport.clone()))
    }

    /// Up to `max_retries + 1` sandboxed attempts with exponential backoff.
    /// Only retryable failures are retried.
    async fn execute_with_retry(
        &self,
        call: &ToolCall,
        tool: &Tool,
        domain: &DomainContext,
        server_name: &str,
        transport: Arc<dyn ToolTransport>,
        cancel: CancellationToken,
    ) -> ToolResult {
        let max_attempts = call.max_attempts();
        let mut attempt = 0;

        loop {
            attempt += 1;
            let started = Instant::now();
            let request = SandboxRequest::new(call, tool, domain, transport.clone()).with_cancel(cancel.clone());
            let mut result = self.sandbox.execute_in_sandbox(request).await;

            let dispatched = result
                .error()
                .is_none_or(|e| e.code != codes::SANDBOX_EXECUTION_ERROR);
            if dispatched {
                self.record_connection_outcome(server_name, result.is_success(), started.elapsed());
            }

            let metadata = result.metadata_mut();
            metadata.attempts = attempt;
            metadata.server_name = Some(server_name.to_string());

            if result.is_success() || !result.is_retryable() || attempt >= max_attempts || cancel.is_cancelled() {
                if attempt > 1 {
                    info!(call_id = %call.id, attempts = attempt, success = result.is_success(), "Call finished after retries");
                }
                return result;
            }

            let delay = read(&self.config).backoff_delay(attempt);
            warn!(
                call_id = %call.id,
                attempt,
                max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %result.error().map(|e| e.message.as_str()).unwrap_or_default(),
                "Retrying tool call"
            );
            lock(&self.stats).retries += 1;

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = cancel.cancelled() => {
                    let mut metadata = ResultMetadata::for_call(&call.id, &call.tool_id);
                    metadata.attempts = attempt;
                    metadata.server_name = Some(server_name.to_string());
                    return ToolResult::failure(ToolError::cancelled(&call.id), metadata);
                }
            }
        }
    }

    fn record_connection_outcome(&self, server_name: &str, success: bool, elapsed: Duration) {
        if let Some(connection) = write(&self.connections).get_mut(server_name) {
            connection.stats.record(success, elapsed.as_millis() as u64);
        }
    }
}
