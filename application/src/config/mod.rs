//! Application-level configuration.
//!
//! - [`ClientConfig`]: orchestrator retry, history, mobile and server settings
//! - [`SandboxConfig`]: sandbox executor defaults

pub mod client_config;
pub mod sandbox_config;

pub use client_config::{ClientConfig, MobileConfig, ServerConfig};
pub use sandbox_config::SandboxConfig;
