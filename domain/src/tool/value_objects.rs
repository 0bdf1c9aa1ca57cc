//! Tool domain value objects: immutable result and error types
//!
//! Every call produces exactly one [`ToolResult`], either `Success` or
//! `Failure`. The [`ToolError`] inside a failure carries a stable error
//! `code`, an [`ErrorType`] from the orchestration taxonomy, and a
//! `retryable` flag that drives the orchestrator's retry loop.

use serde::{Deserialize, Serialize};

use crate::core::error::ErrorType;

/// Stable error codes
pub mod codes {
    pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
    pub const TOOL_NOT_FOUND: &str = "TOOL_NOT_FOUND";
    pub const DOMAIN_INCOMPATIBLE: &str = "DOMAIN_INCOMPATIBLE";
    pub const NO_SERVER_AVAILABLE: &str = "NO_SERVER_AVAILABLE";
    pub const SANDBOX_EXECUTION_ERROR: &str = "SANDBOX_EXECUTION_ERROR";
    pub const EXECUTION_TIMEOUT: &str = "EXECUTION_TIMEOUT";
    pub const TOOL_EXECUTION_ERROR: &str = "TOOL_EXECUTION_ERROR";
    pub const WORKER_FAILURE: &str = "WORKER_FAILURE";
    pub const CANCELLED: &str = "CANCELLED";
}

/// Error carried by a failed tool result.
///
/// | Code | Type | Retryable |
/// |------|------|-----------|
/// | `VALIDATION_ERROR` | varies by check | No |
/// | `TOOL_NOT_FOUND` | ToolDiscoveryError | No |
/// | `DOMAIN_INCOMPATIBLE` | ConfigurationError | No |
/// | `NO_SERVER_AVAILABLE` | ConnectionError | No |
/// | `SANDBOX_EXECUTION_ERROR` | AuthorizationError | No |
/// | `EXECUTION_TIMEOUT` | ResourceLimitError | Yes |
/// | `TOOL_EXECUTION_ERROR` | ToolExecutionError | transport decides |
/// | `WORKER_FAILURE` | ToolExecutionError | No |
/// | `CANCELLED` | ToolExecutionError | No |
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolError {
    pub code: String,
    pub message: String,
    #[serde(rename = "type")]
    pub error_type: ErrorType,
    pub retryable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ToolError {
    pub fn new(
        code: impl Into<String>,
        message: impl Into<String>,
        error_type: ErrorType,
        retryable: bool,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            error_type,
            retryable,
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    // Common error constructors
    pub fn validation(error_type: ErrorType, message: impl Into<String>) -> Self {
        Self::new(codes::VALIDATION_ERROR, message, error_type, false)
    }

    pub fn tool_not_found(tool_id: impl Into<String>) -> Self {
        Self::new(
            codes::TOOL_NOT_FOUND,
            format!("Tool not found: {}", tool_id.into()),
            ErrorType::ToolDiscovery,
            false,
        )
    }

    pub fn domain_incompatible(message: impl Into<String>) -> Self {
        Self::new(
            codes::DOMAIN_INCOMPATIBLE,
            message,
            ErrorType::Configuration,
            false,
        )
    }

    pub fn no_server(tool_id: impl Into<String>) -> Self {
        Self::new(
            codes::NO_SERVER_AVAILABLE,
            format!("No connected server serves tool: {}", tool_id.into()),
            ErrorType::Connection,
            false,
        )
    }

    /// Sandbox constraint or policy violation. Never retryable.
    pub fn sandbox_violation(message: impl Into<String>) -> Self {
        Self::new(
            codes::SANDBOX_EXECUTION_ERROR,
            message,
            ErrorType::Authorization,
            false,
        )
    }

    pub fn timeout(timeout_ms: u64) -> Self {
        Self::new(
            codes::EXECUTION_TIMEOUT,
            format!("Execution timed out after {}ms", timeout_ms),
            ErrorType::ResourceLimit,
            true,
        )
    }

    pub fn execution_failed(message: impl Into<String>, retryable: bool) -> Self {
        Self::new(
            codes::TOOL_EXECUTION_ERROR,
            message,
            ErrorType::ToolExecution,
            retryable,
        )
    }

    pub fn worker_failure(message: impl Into<String>) -> Self {
        Self::new(codes::WORKER_FAILURE, message, ErrorType::ToolExecution, false)
    }

    pub fn cancelled(call_id: impl Into<String>) -> Self {
        Self::new(
            codes::CANCELLED,
            format!("Call cancelled: {}", call_id.into()),
            ErrorType::ToolExecution,
            false,
        )
    }
}

impl std::fmt::Display for ToolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(details) = &self.details {
            write!(f, " ({})", details)?;
        }
        Ok(())
    }
}

impl std::error::Error for ToolError {}

/// Bookkeeping about where and how a call ran
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResultMetadata {
    pub call_id: String,
    pub tool_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment_id: Option<String>,
    /// Dispatch attempts made (0 if the call never left validation)
    pub attempts: u32,
    /// Non-blocking policy findings
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl ResultMetadata {
    pub fn for_call(call_id: impl Into<String>, tool_id: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            tool_id: tool_id.into(),
            ..Default::default()
        }
    }
}

/// Resource consumption of one execution
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionMetrics {
    pub execution_time_ms: u64,
    pub cpu_time_ms: u64,
    pub memory_mb: u64,
    pub network_bytes: u64,
    pub disk_bytes: u64,
    /// Estimated battery drain in percent of a full charge
    pub battery_consumption: f64,
}

/// Outcome of a call: exactly one of success or failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ToolResult {
    Success {
        data: serde_json::Value,
        metadata: ResultMetadata,
        metrics: ExecutionMetrics,
    },
    Failure {
        error: ToolError,
        metadata: ResultMetadata,
        metrics: ExecutionMetrics,
    },
}

impl ToolResult {
    pub fn success(data: serde_json::Value, metadata: ResultMetadata) -> Self {
        ToolResult::Success {
            data,
            metadata,
            metrics: ExecutionMetrics::default(),
        }
    }

    pub fn failure(error: ToolError, metadata: ResultMetadata) -> Self {
        ToolResult::Failure {
            error,
            metadata,
            metrics: ExecutionMetrics::default(),
        }
    }

    pub fn with_metrics(mut self, new_metrics: ExecutionMetrics) -> Self {
        match &mut self {
            ToolResult::Success { metrics, .. } | ToolResult::Failure { metrics, .. } => {
                *metrics = new_metrics;
            }
        }
        self
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ToolResult::Success { .. })
    }

    pub fn data(&self) -> Option<&serde_json::Value> {
        match self {
            ToolResult::Success { data, .. } => Some(data),
            ToolResult::Failure { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&ToolError> {
        match self {
            ToolResult::Success { .. } => None,
            ToolResult::Failure { error, .. } => Some(error),
        }
    }

    pub fn metadata(&self) -> &ResultMetadata {
        match self {
            ToolResult::Success { metadata, .. } | ToolResult::Failure { metadata, .. } => metadata,
        }
    }

    pub fn metadata_mut(&mut self) -> &mut ResultMetadata {
        match self {
            ToolResult::Success { metadata, .. } | ToolResult::Failure { metadata, .. } => metadata,
        }
    }

    pub fn metrics(&self) -> &ExecutionMetrics {
        match self {
            ToolResult::Success { metrics, .. } | ToolResult::Failure { metrics, .. } => metrics,
        }
    }

    /// A failure whose error is classified as retryable.
    pub fn is_retryable(&self) -> bool {
        self.error().is_some_and(|e| e.retryable)
    }
}
