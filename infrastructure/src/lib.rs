//! Infrastructure layer for omnitool
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer: the sandbox executor, the in-process tool
//! server, the static domain catalog, JSONL execution logging and
//! configuration file loading.

pub mod config;
pub mod domains;
pub mod logging;
pub mod sandbox;
pub mod transport;

// Re-export commonly used types
pub use config::{
    ConfigLoader, ConfigSource, ConfigValidationError, FileClientConfig, FileConfig,
    FileLoggingConfig, FileSandboxConfig,
};
pub use domains::StaticDomainStore;
pub use logging::JsonlExecutionLogger;
pub use sandbox::SandboxExecutor;
pub use transport::{LOCAL_SERVER_KIND, LocalServerConnector, LocalToolServer};

#[cfg(test)]
mod wiring_tests;
