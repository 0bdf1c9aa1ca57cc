//! Port definitions (interfaces for external adapters)
//!
//! Ports define the contracts that infrastructure adapters must implement.

pub mod domain_store;
pub mod execution_logger;
pub mod sandbox;
pub mod server_connector;
pub mod tool_transport;
