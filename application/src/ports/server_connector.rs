//! Server connector port
//!
//! Opens a [`ToolTransport`] for a configured server. Implementations decide
//! which server kinds they support.

use async_trait::async_trait;
use std::sync::Arc;

use super::tool_transport::{ToolTransport, TransportError};
use crate::config::ServerConfig;

#[async_trait]
pub trait ServerConnector: Send + Sync {
    async fn connect(&self, config: &ServerConfig) -> Result<Arc<dyn ToolTransport>, TransportError>;
}
