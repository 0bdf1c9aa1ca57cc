//! Use cases
//!
//! Application-level operations that orchestrate domain logic.

pub mod domain_handler;
pub mod universal_client;
