//! Tool domain module
//!
//! Defines what a tool is, how it is invoked and what an invocation returns.
//!
//! ```text
//! ┌──────────────┐    ┌──────────────┐    ┌──────────────┐
//! │ Tool         │───▶│ ToolCall     │───▶│ ToolResult   │
//! │ (registry)   │    │ (invocation) │    │ (outcome)    │
//! └──────────────┘    └──────────────┘    └──────────────┘
//! ```
//!
//! # Key Types
//!
//! - [`Tool`]: schema, performance profile, security and mobile flags
//! - [`ToolCall`]: parameters plus the caller's [`ExecutionContext`](call::ExecutionContext)
//! - [`ToolResult`]: `Success` or `Failure`, never both
//! - [`ToolValidator`]: pure validation of a call against its tool
//!
//! # Architecture
//!
//! - **Domain** (this module): pure definitions, no I/O
//! - **Application** (`UniversalClient`): validation, retry, history
//! - **Infrastructure** (`SandboxExecutor`): isolated execution

pub mod call;
pub mod entities;
pub mod traits;
pub mod value_objects;

pub use call::{ExecutionContext, ToolCall};
pub use entities::{Tool, ToolCapability, ToolSchema};
pub use traits::{DefaultToolValidator, ToolValidator};
pub use value_objects::{ToolError, ToolResult};
