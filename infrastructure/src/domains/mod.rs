//! Domain catalog adapters

mod static_store;

pub use static_store::StaticDomainStore;
