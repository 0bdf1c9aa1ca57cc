//! Worker threads
//!
//! Each dispatched call runs on its own OS thread with a private
//! current-thread runtime. The call and tool cross the thread boundary as
//! JSON and the result comes back the same way; nothing mutable is shared
//! with the supervisor except the cancellation token.

use omnitool_application::{ToolTransport, TransportError};
use omnitool_domain::{Tool, ToolCall};
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Message sent to a worker
pub(super) struct WorkerJob {
    pub tool_json: String,
    pub call_json: String,
    pub transport: Arc<dyn ToolTransport>,
    pub cancel: CancellationToken,
}

impl WorkerJob {
    pub fn new(
        tool: &Tool,
        call: &ToolCall,
        transport: Arc<dyn ToolTransport>,
        cancel: CancellationToken,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            tool_json: serde_json::to_string(tool)?,
            call_json: serde_json::to_string(call)?,
            transport,
            cancel,
        })
    }
}

/// Serialized tool output, or the transport's error
pub(super) type WorkerReply = Result<String, TransportError>;

/// Spawn a named worker thread for `job`.
///
/// The receiver resolves once the worker replies. If the worker dies
/// without replying (panic, runtime failure) the sender is dropped and the
/// receiver yields `RecvError`.
pub(super) fn spawn(name: String, job: WorkerJob) -> std::io::Result<oneshot::Receiver<WorkerReply>> {
    let (tx, rx) = oneshot::channel();
    std::thread::Builder::new().name(name).spawn(move || {
        let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
            Ok(rt) => rt,
            Err(e) => {
                let _ = tx.send(Err(TransportError::ToolFailed {
                    message: format!("worker runtime failed to start: {}", e),
                    retryable: false,
                }));
                return;
            }
        };
        let reply = runtime.block_on(run(job));
        // Supervisor may have given up already
        let _ = tx.send(reply);
    })?;
    Ok(rx)
}

async fn run(job: WorkerJob) -> WorkerReply {
    let tool: Tool = serde_json::from_str(&job.tool_json).map_err(decode_error)?;
    let call: ToolCall = serde_json::from_str(&job.call_json).map_err(decode_error)?;
    debug!(call_id = %call.id, tool = %tool.id, "Worker started");

    let output = tokio::select! {
        _ = job.cancel.cancelled() => return Err(TransportError::Cancelled),
        result = job.transport.call(&tool, &call) => result?,
    };

    serde_json::to_string(&output).map_err(decode_error)
}

fn decode_error(e: serde_json::Error) -> TransportError {
    TransportError::ToolFailed {
        message: format!("worker message could not be decoded: {}", e),
        retryable: false,
    }
}
