//! Execution log adapters.
//!
//! [`JsonlExecutionLogger`] appends typed
//! [`ExecutionLogEntry`](omnitool_application::ExecutionLogEntry) records to a
//! JSONL file through the [`ExecutionLogger`](omnitool_application::ExecutionLogger) port.

mod jsonl_logger;

pub use jsonl_logger::JsonlExecutionLogger;
