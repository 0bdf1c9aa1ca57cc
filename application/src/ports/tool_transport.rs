//! Tool transport port
//!
//! A transport performs the actual call against one tool server. The
//! orchestrator never talks to a server directly; it hands a transport to the
//! sandbox, which invokes it from an isolated worker.

use async_trait::async_trait;
use omnitool_domain::{ErrorType, Tool, ToolCall, ToolError, codes};
use serde_json::Value;
use thiserror::Error;

/// Errors raised by a transport
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Tool not found on server: {0}")]
    ToolNotFound(String),

    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    #[error("Tool failed: {message}")]
    ToolFailed { message: String, retryable: bool },

    #[error("Timeout")]
    Timeout,

    #[error("Cancelled")]
    Cancelled,

    #[error("Transport closed")]
    Closed,
}

impl TransportError {
    /// Transient failures worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            TransportError::Connection(_) | TransportError::Timeout | TransportError::Closed => true,
            TransportError::ToolFailed { retryable, .. } => *retryable,
            TransportError::ToolNotFound(_)
            | TransportError::InvalidParams(_)
            | TransportError::Cancelled => false,
        }
    }

    pub fn error_type(&self) -> ErrorType {
        match self {
            TransportError::Connection(_) | TransportError::Closed => ErrorType::Connection,
            TransportError::ToolNotFound(_) => ErrorType::ToolDiscovery,
            TransportError::Timeout => ErrorType::ResourceLimit,
            TransportError::InvalidParams(_)
            | TransportError::ToolFailed { .. }
            | TransportError::Cancelled => ErrorType::ToolExecution,
        }
    }

    pub fn to_tool_error(&self) -> ToolError {
        let code = match self {
            TransportError::Cancelled => codes::CANCELLED,
            _ => codes::TOOL_EXECUTION_ERROR,
        };
        ToolError::new(code, self.to_string(), self.error_type(), self.is_retryable())
    }
}

/// Connection to one tool server
#[async_trait]
pub trait ToolTransport: Send + Sync {
    /// Name of the server behind this transport
    fn server_name(&self) -> &str;

    /// List the tools the server declares
    async fn discover_tools(&self) -> Result<Vec<Tool>, TransportError>;

    /// Invoke a tool and return its raw JSON output
    async fn call(&self, tool: &Tool, call: &ToolCall) -> Result<Value, TransportError>;

    /// Release server resources. Default is a no-op.
    async fn close(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_classification() {
        assert!(TransportError::Timeout.is_retryable());
        assert!(TransportError::Connection("reset".into()).is_retryable());
        assert!(!TransportError::InvalidParams("x".into()).is_retryable());
        assert!(
            TransportError::ToolFailed {
                message: "busy".into(),
                retryable: true
            }
            .is_retryable()
        );
    }

    #[test]
    fn test_to_tool_error_keeps_retryability() {
        let err = TransportError::Closed.to_tool_error();
        assert_eq!(err.code, codes::TOOL_EXECUTION_ERROR);
        assert_eq!(err.error_type, ErrorType::Connection);
        assert!(err.retryable);

        let cancelled = TransportError::Cancelled.to_tool_error();
        assert_eq!(cancelled.code, codes::CANCELLED);
        assert!(!cancelled.retryable);
    }
}
