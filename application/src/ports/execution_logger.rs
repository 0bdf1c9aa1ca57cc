//! Port for the execution log
//!
//! Separate from `tracing` diagnostics: the execution log is an audit trail
//! with one typed [`ExecutionLogEntry`] per terminal call or registry import.

use omnitool_domain::{ExecutionMetrics, ExecutionRecord, RegistryFormat, ToolResult};
use serde::{Deserialize, Serialize};

/// One execution log entry, tagged by `type` when serialized
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExecutionLogEntry {
    /// A call reached its terminal result
    ToolCall(CallLogRecord),
    /// A registry snapshot was merged into the caches
    RegistryImported {
        format: RegistryFormat,
        tools: usize,
        capabilities: usize,
    },
}

impl ExecutionLogEntry {
    pub fn tool_call(record: ExecutionRecord, result: &ToolResult) -> Self {
        let metadata = result.metadata();
        ExecutionLogEntry::ToolCall(CallLogRecord {
            record,
            environment_id: metadata.environment_id.clone(),
            metrics: result.metrics().clone(),
            warnings: metadata.warnings.clone(),
        })
    }

    pub fn call_id(&self) -> Option<&str> {
        match self {
            ExecutionLogEntry::ToolCall(call) => Some(&call.record.call_id),
            ExecutionLogEntry::RegistryImported { .. } => None,
        }
    }
}

/// Terminal call: the history record plus where it ran and what it cost
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallLogRecord {
    #[serde(flatten)]
    pub record: ExecutionRecord,
    pub environment_id: Option<String>,
    pub metrics: ExecutionMetrics,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// Sink for execution log entries.
///
/// Recording must not fail the call being recorded; adapters report their
/// own I/O problems.
pub trait ExecutionLogger: Send + Sync {
    fn record(&self, entry: &ExecutionLogEntry);
}

/// Discards every entry.
pub struct NoExecutionLogger;

impl ExecutionLogger for NoExecutionLogger {
    fn record(&self, _entry: &ExecutionLogEntry) {}
}
