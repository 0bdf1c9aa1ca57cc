//! Built-in tools of the local server: echo, delay, read_file, run_command

use omnitool_application::TransportError;
use omnitool_domain::{
    BatteryImpact, FieldType, MobileProfile, PerformanceProfile, SchemaField, SecurityRequirements,
    Tool, ToolCall,
};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};

/// Tool name constants
pub const ECHO: &str = "echo";
pub const DELAY: &str = "delay";
pub const READ_FILE: &str = "read_file";
pub const RUN_COMMAND: &str = "run_command";

/// Maximum file size to read (10 MB)
const MAX_READ_SIZE: u64 = 10 * 1024 * 1024;

/// Maximum command output kept (1 MB)
const MAX_OUTPUT_SIZE: usize = 1024 * 1024;

/// Longest accepted `delay`
const MAX_DELAY_MS: u64 = 600_000;

/// Permission a caller needs to spawn processes
pub const PROCESS_PERMISSION: &str = "process.spawn";

/// Definitions of every built-in tool, ids prefixed with `server`.
pub fn definitions(server: &str) -> Vec<Tool> {
    let id = |name: &str| format!("{}.{}", server, name);

    vec![
        Tool::new(id(ECHO), ECHO)
            .with_description("Return the call parameters unchanged")
            .with_category("general")
            .with_server(server)
            .with_capability("diagnostics")
            .with_output_field(SchemaField::new("echo", FieldType::Object, true))
            .with_performance(PerformanceProfile {
                avg_execution_time_ms: 1,
                memory_usage_mb: 1,
                cpu_usage_percent: 1,
                network_kbps: 0,
            })
            .with_mobile(MobileProfile {
                optimized: true,
                supported: true,
                battery_impact: BatteryImpact::Low,
                offline_capable: true,
            }),
        Tool::new(id(DELAY), DELAY)
            .with_description("Sleep for the given number of milliseconds")
            .with_category("general")
            .with_server(server)
            .with_capability("diagnostics")
            .with_input_field(
                SchemaField::new("ms", FieldType::Integer, true).with_description("Milliseconds to sleep"),
            )
            .with_performance(PerformanceProfile {
                avg_execution_time_ms: 1_000,
                memory_usage_mb: 1,
                cpu_usage_percent: 1,
                network_kbps: 0,
            }),
        Tool::new(id(READ_FILE), READ_FILE)
            .with_description("Read the contents of a file at the specified path")
            .with_category("filesystem")
            .with_server(server)
            .with_capability("filesystem.read")
            .with_input_field(
                SchemaField::new("path", FieldType::String, true).with_description("Path to the file to read"),
            )
            .with_input_field(
                SchemaField::new("offset", FieldType::Integer, false)
                    .with_description("Line number to start reading from (0-indexed)"),
            )
            .with_input_field(
                SchemaField::new("limit", FieldType::Integer, false)
                    .with_description("Maximum number of lines to read"),
            )
            .with_output_field(SchemaField::new("content", FieldType::String, true))
            .with_performance(PerformanceProfile {
                avg_execution_time_ms: 20,
                memory_usage_mb: 16,
                cpu_usage_percent: 5,
                network_kbps: 0,
            })
            .with_mobile(MobileProfile {
                optimized: true,
                supported: true,
                battery_impact: BatteryImpact::Low,
                offline_capable: true,
            }),
        Tool::new(id(RUN_COMMAND), RUN_COMMAND)
            .with_description("Execute a shell command and return its output. Use with caution.")
            .with_category("system")
            .with_server(server)
            .with_capability("process.exec")
            .with_timeout_ms(60_000)
            .with_input_field(
                SchemaField::new("command", FieldType::String, true).with_description("The command to execute"),
            )
            .with_input_field(
                SchemaField::new("working_dir", FieldType::String, false)
                    .with_description("Working directory for the command"),
            )
            .with_output_field(SchemaField::new("exit_code", FieldType::Integer, true))
            .with_output_field(SchemaField::new("stdout", FieldType::String, true))
            .with_output_field(SchemaField::new("stderr", FieldType::String, true))
            .with_performance(PerformanceProfile {
                avg_execution_time_ms: 2_000,
                memory_usage_mb: 64,
                cpu_usage_percent: 50,
                network_kbps: 0,
            })
            .with_security(SecurityRequirements {
                min_level: "medium".to_string(),
                permissions: vec![PROCESS_PERMISSION.to_string()],
                requires_authentication: false,
            })
            .with_mobile(MobileProfile {
                optimized: false,
                supported: false,
                battery_impact: BatteryImpact::High,
                offline_capable: true,
            }),
    ]
}

pub fn echo(call: &ToolCall) -> Result<Value, TransportError> {
    Ok(json!({ "echo": call.parameters }))
}

pub async fn delay(call: &ToolCall) -> Result<Value, TransportError> {
    let ms = call
        .get_u64("ms")
        .ok_or_else(|| TransportError::InvalidParams("Missing required argument: ms".to_string()))?;
    if ms > MAX_DELAY_MS {
        return Err(TransportError::InvalidParams(format!(
            "delay of {}ms exceeds the maximum of {}ms",
            ms, MAX_DELAY_MS
        )));
    }
    tokio::time::sleep(Duration::from_millis(ms)).await;
    Ok(json!({ "slept_ms": ms }))
}

pub async fn read_file(call: &ToolCall) -> Result<Value, TransportError> {
    let path_str = call.require_string("path").map_err(TransportError::InvalidParams)?;
    let path = Path::new(path_str);

    let metadata = tokio::fs::metadata(path).await.map_err(|e| failed(format!("{}: {}", path_str, e)))?;
    if !metadata.is_file() {
        return Err(TransportError::InvalidParams(format!("'{}' is not a file", path_str)));
    }
    if metadata.len() > MAX_READ_SIZE {
        return Err(TransportError::InvalidParams(format!(
            "File too large ({} bytes). Maximum size is {} bytes",
            metadata.len(),
            MAX_READ_SIZE
        )));
    }

    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| failed(format!("Failed to read file: {}", e)))?;

    let offset = call.get_u64("offset").unwrap_or(0) as usize;
    let limit = call.get_u64("limit").map(|l| l as usize);
    let content = if offset > 0 || limit.is_some() {
        let lines = content.lines().skip(offset);
        let selected: Vec<&str> = match limit {
            Some(limit) => lines.take(limit).collect(),
            None => lines.collect(),
        };
        selected.join("\n")
    } else {
        content
    };

    Ok(json!({
        "path": path_str,
        "bytes": content.len(),
        "content": content,
    }))
}

/// Run through `sh -c` (`cmd /C` on Windows).
///
/// The child is killed when the future is dropped, so a cancelled or
/// timed-out sandbox worker does not leave the process behind.
pub async fn run_command(call: &ToolCall, env: &HashMap<String, String>) -> Result<Value, TransportError> {
    let started = Instant::now();
    let command_str = call.require_string("command").map_err(TransportError::InvalidParams)?;

    let mut cmd = if cfg!(target_os = "windows") {
        let mut c = tokio::process::Command::new("cmd");
        c.args(["/C", command_str]);
        c
    } else {
        let mut c = tokio::process::Command::new("sh");
        c.args(["-c", command_str]);
        c
    };

    if let Some(dir) = call.get_string("working_dir") {
        let path = Path::new(dir);
        if !path.is_dir() {
            return Err(TransportError::InvalidParams(format!(
                "Working directory does not exist: {}",
                dir
            )));
        }
        cmd.current_dir(path);
    }

    cmd.envs(env)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let output = cmd
        .output()
        .await
        .map_err(|e| failed(format!("Failed to spawn command: {}", e)))?;

    let exit_code = output.status.code().unwrap_or(-1);
    let stdout = truncate(String::from_utf8_lossy(&output.stdout).into_owned());
    let stderr = truncate(String::from_utf8_lossy(&output.stderr).into_owned());

    if !output.status.success() {
        return Err(failed(format!(
            "Command exited with code {}: {}",
            exit_code,
            stderr.trim()
        )));
    }

    Ok(json!({
        "exit_code": exit_code,
        "stdout": stdout,
        "stderr": stderr,
        "duration_ms": started.elapsed().as_millis() as u64,
    }))
}

fn failed(message: String) -> TransportError {
    TransportError::ToolFailed {
        message,
        retryable: false,
    }
}

fn truncate(mut output: String) -> String {
    if output.len() > MAX_OUTPUT_SIZE {
        let mut cut = MAX_OUTPUT_SIZE;
        while !output.is_char_boundary(cut) {
            cut -= 1;
        }
        output.truncate(cut);
        output.push_str("\n... (output truncated)");
    }
    output
}
