//! Domain error types
//!
//! [`OrchestrationError`] is returned by operations that fail as a whole
//! (configuration, server lifecycle, registration). Business-level execution
//! failures never surface as errors; they become a
//! [`ToolResult::Failure`](crate::tool::value_objects::ToolResult) whose
//! [`ToolError`](crate::tool::value_objects::ToolError) carries an
//! [`ErrorType`] from the same taxonomy.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which resource a limit violation refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Timeout,
    Memory,
    Cpu,
    Bandwidth,
}

impl ResourceKind {
    pub fn as_str(&self) -> &str {
        match self {
            ResourceKind::Timeout => "timeout",
            ResourceKind::Memory => "memory",
            ResourceKind::Cpu => "cpu",
            ResourceKind::Bandwidth => "bandwidth",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error taxonomy for the orchestration runtime
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OrchestrationError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Tool discovery failed: {0}")]
    ToolDiscovery(String),

    #[error("Tool execution failed: {0}")]
    ToolExecution(String),

    #[error("Tool registration failed: {0}")]
    ToolRegistration(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Resource limit exceeded ({kind}): {message}")]
    ResourceLimit { kind: ResourceKind, message: String },

    #[error("Authorization denied: {0}")]
    Authorization(String),

    #[error("Client not initialized. Call initialize() first.")]
    NotInitialized,
}

impl OrchestrationError {
    /// The taxonomy entry for this error, if it has one.
    ///
    /// `NotInitialized` is a client-state error and is never carried inside
    /// a tool result.
    pub fn error_type(&self) -> Option<ErrorType> {
        match self {
            OrchestrationError::Configuration(_) => Some(ErrorType::Configuration),
            OrchestrationError::ToolDiscovery(_) => Some(ErrorType::ToolDiscovery),
            OrchestrationError::ToolExecution(_) => Some(ErrorType::ToolExecution),
            OrchestrationError::ToolRegistration(_) => Some(ErrorType::ToolRegistration),
            OrchestrationError::Connection(_) => Some(ErrorType::Connection),
            OrchestrationError::ResourceLimit { .. } => Some(ErrorType::ResourceLimit),
            OrchestrationError::Authorization(_) => Some(ErrorType::Authorization),
            OrchestrationError::NotInitialized => None,
        }
    }

    pub fn is_not_initialized(&self) -> bool {
        matches!(self, OrchestrationError::NotInitialized)
    }
}

/// Error type tag carried by a failed [`ToolResult`](crate::ToolResult).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorType {
    #[serde(rename = "ConfigurationError")]
    Configuration,
    #[serde(rename = "ToolDiscoveryError")]
    ToolDiscovery,
    #[serde(rename = "ToolExecutionError")]
    ToolExecution,
    #[serde(rename = "ToolRegistrationError")]
    ToolRegistration,
    #[serde(rename = "ConnectionError")]
    Connection,
    #[serde(rename = "ResourceLimitError")]
    ResourceLimit,
    #[serde(rename = "AuthorizationError")]
    Authorization,
}

impl ErrorType {
    pub fn as_str(&self) -> &str {
        match self {
            ErrorType::Configuration => "ConfigurationError",
            ErrorType::ToolDiscovery => "ToolDiscoveryError",
            ErrorType::ToolExecution => "ToolExecutionError",
            ErrorType::ToolRegistration => "ToolRegistrationError",
            ErrorType::Connection => "ConnectionError",
            ErrorType::ResourceLimit => "ResourceLimitError",
            ErrorType::Authorization => "AuthorizationError",
        }
    }
}

impl std::fmt::Display for ErrorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
