//! Domain store port
//!
//! Supplies a domain's context, constraints and adaptation rules as one
//! [`DomainBundle`].

use async_trait::async_trait;
use omnitool_domain::DomainBundle;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainStoreError {
    #[error("Domain store unavailable: {0}")]
    Unavailable(String),

    #[error("Corrupt domain definition '{id}': {message}")]
    Corrupt { id: String, message: String },
}

#[async_trait]
pub trait DomainStore: Send + Sync {
    /// Look up a domain bundle. `Ok(None)` means the domain is unknown.
    async fn load_bundle(&self, domain_id: &str) -> Result<Option<DomainBundle>, DomainStoreError>;

    /// Ids of every domain the store knows about.
    async fn list_domains(&self) -> Vec<String> {
        Vec::new()
    }
}
