//! Sandboxed execution
//!
//! [`SandboxExecutor`] implements the
//! [`SandboxPort`](omnitool_application::SandboxPort): it validates a call
//! against its [`ExecutionEnvironment`](omnitool_domain::ExecutionEnvironment),
//! runs it on a dedicated worker thread and supervises the deadline.

mod executor;
mod worker;

pub use executor::SandboxExecutor;
