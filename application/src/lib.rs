//! Application layer for omnitool
//!
//! This crate contains the orchestrator use cases, port definitions, and
//! client configuration. It depends only on the domain layer.

pub mod config;
pub mod ports;
pub mod use_cases;

// Re-export commonly used types
pub use config::{ClientConfig, MobileConfig, SandboxConfig, ServerConfig};
pub use ports::{
    domain_store::{DomainStore, DomainStoreError},
    execution_logger::{CallLogRecord, ExecutionLogEntry, ExecutionLogger, NoExecutionLogger},
    sandbox::{SandboxPort, SandboxRequest},
    server_connector::ServerConnector,
    tool_transport::{ToolTransport, TransportError},
};
pub use use_cases::domain_handler::DomainContextHandler;
pub use use_cases::universal_client::{
    ConnectionStats, ImportSummary, ServerConnection, UniversalClient, UpdateBus, UpdateCallback,
};
