//! Core domain concepts shared across all subdomains.
//!
//! - [`error::OrchestrationError`]: the error taxonomy used by every layer
//! - [`error::ErrorType`]: the same taxonomy as carried inside a failed result

pub mod error;
