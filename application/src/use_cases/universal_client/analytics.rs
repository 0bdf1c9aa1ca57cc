//! Execution history, metrics and usage analytics

use super::{UniversalClient, lock, read};
use crate::ports::execution_logger::ExecutionLogEntry;
use omnitool_domain::{ExecutionRecord, PerformanceMetrics, TimeRange, ToolResult, ToolUsageAnalytics};
use std::time::Duration;
use tracing::info;

impl UniversalClient {
    /// Append to the history ring buffer, update counters and write the execution log.
    pub(super) fn record_execution(&self, result: &ToolResult, elapsed: Duration) {
        let elapsed_ms = elapsed.as_millis() as u64;
        let record = ExecutionRecord::from_result(result, elapsed_ms);

        {
            let mut stats = lock(&self.stats);
            stats.executions += 1;
            if record.success {
                stats.successes += 1;
            } else {
                stats.failures += 1;
            }
            stats.total_execution_ms += elapsed_ms;
        }

        self.logger
            .record(&ExecutionLogEntry::tool_call(record.clone(), result));

        info!(
            call_id = %record.call_id,
            tool = %record.tool_id,
            success = record.success,
            attempts = record.attempts,
            elapsed_ms,
            "Tool call finished"
        );

        let capacity = read(&self.config).history_capacity;
        let mut history = lock(&self.history);
        history.push_back(record);
        while history.len() > capacity {
            history.pop_front();
        }
    }

    /// History records, oldest first.
    pub fn execution_history(&self) -> Vec<ExecutionRecord> {
        lock(&self.history).iter().cloned().collect()
    }

    pub fn get_performance_metrics(&self) -> PerformanceMetrics {
        let stats = lock(&self.stats).clone();
        let (average, success_rate) = if stats.executions == 0 {
            (0.0, 0.0)
        } else {
            (
                stats.total_execution_ms as f64 / stats.executions as f64,
                stats.successes as f64 / stats.executions as f64,
            )
        };

        PerformanceMetrics {
            total_executions: stats.executions,
            successful_executions: stats.successes,
            failed_executions: stats.failures,
            total_retries: stats.retries,
            average_execution_time_ms: average,
            success_rate,
            tools_cached: read(&self.tools).len(),
            capabilities_cached: read(&self.capabilities).len(),
            servers_connected: read(&self.connections).len(),
            discovery: stats.discovery,
            adaptation: self.domains.metrics(),
        }
    }

    pub fn get_tool_usage_analytics(&self, range: TimeRange) -> ToolUsageAnalytics {
        let history = lock(&self.history);
        ToolUsageAnalytics::from_records(history.iter(), range)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use crate::ports::execution_logger::ExecutionLogEntry;
    use omnitool_domain::{TimeRange, Tool, ToolCall, codes};
    use std::sync::Arc;
    use std::sync::atomic::Ordering;

    #[tokio::test]
    async fn test_history_is_bounded() {
        let config = Harness::config().with_history_capacity(3);
        let harness = Harness::ready_from(vec![Tool::new("echo", "echo")], config).await;
        for i in 0..5 {
            harness
                .client
                .execute_tool_with_universal_adapter(ToolCall::new("echo").with_id(format!("call-{}", i)))
                .await
                .unwrap();
        }
        let history = harness.client.execution_history();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].call_id, "call-2");
        assert_eq!(history[2].call_id, "call-4");
    }

    #[tokio::test]
    async fn test_metrics_and_usage() {
        let harness = Harness::ready(vec![Tool::new("echo", "echo"), Tool::new("flaky", "flaky")]).await;
        harness
            .client
            .execute_tool_with_universal_adapter(ToolCall::new("echo"))
            .await
            .unwrap();
        harness.transport.fail_permanent.store(true, Ordering::SeqCst);
        harness
            .client
            .execute_tool_with_universal_adapter(ToolCall::new("flaky"))
            .await
            .unwrap();

        let metrics = harness.client.get_performance_metrics();
        assert_eq!(metrics.total_executions, 2);
        assert_eq!(metrics.successful_executions, 1);
        assert_eq!(metrics.success_rate, 0.5);
        assert_eq!(metrics.tools_cached, 2);
        assert_eq!(metrics.servers_connected, 1);

        let usage = harness.client.get_tool_usage_analytics(TimeRange::all_time());
        assert_eq!(usage.total_calls, 2);
        assert_eq!(usage.tool("flaky").unwrap().failures, 1);
    }

    #[tokio::test]
    async fn test_execution_log_written() {
        let logger = Arc::new(MemoryLogger::default());
        let client = Harness::new(vec![Tool::new("echo", "echo")]).client.with_logger(logger.clone());
        client.initialize().await.unwrap();
        client.discover_all_available_tools().await.unwrap();

        client
            .execute_tool_with_universal_adapter(ToolCall::new("echo").with_id("call-log"))
            .await
            .unwrap();

        let entries = logger.entries();
        assert_eq!(entries.len(), 1);
        let ExecutionLogEntry::ToolCall(call) = &entries[0] else {
            panic!("expected a tool_call entry, got {:?}", entries[0]);
        };
        assert_eq!(call.record.call_id, "call-log");
        assert_eq!(call.record.tool_id, "echo");
        assert!(call.record.success);
        assert_eq!(call.record.attempts, 1);
        assert_eq!(call.environment_id.as_deref(), Some("env-general"));
    }
}
