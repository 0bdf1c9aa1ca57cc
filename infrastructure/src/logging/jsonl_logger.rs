//! Append-only JSONL execution log.
//!
//! One [`ExecutionLogEntry`] per line, stamped with `logged_at`. Lines are
//! written whole through a [`LineWriter`], so concurrent writers sharing the
//! file never interleave inside a record.

use chrono::{DateTime, Utc};
use omnitool_application::{ExecutionLogEntry, ExecutionLogger};
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::{self, LineWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use tracing::{debug, warn};

#[derive(Serialize)]
struct LogLine<'a> {
    logged_at: DateTime<Utc>,
    #[serde(flatten)]
    entry: &'a ExecutionLogEntry,
}

pub struct JsonlExecutionLogger {
    path: PathBuf,
    sink: Mutex<LineWriter<File>>,
    written: AtomicU64,
}

impl JsonlExecutionLogger {
    /// Open `path` for appending, creating it and its parent directories.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        debug!(path = %path.display(), "Execution log opened");

        Ok(Self {
            path: path.to_path_buf(),
            sink: Mutex::new(LineWriter::new(file)),
            written: AtomicU64::new(0),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Entries written by this instance.
    pub fn entries_written(&self) -> u64 {
        self.written.load(Ordering::Relaxed)
    }

    fn append(&self, entry: &ExecutionLogEntry) -> io::Result<()> {
        let mut line = serde_json::to_vec(&LogLine {
            logged_at: Utc::now(),
            entry,
        })?;
        line.push(b'\n');

        let mut sink = self.sink.lock().unwrap_or_else(PoisonError::into_inner);
        sink.write_all(&line)?;
        self.written.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

impl ExecutionLogger for JsonlExecutionLogger {
    fn record(&self, entry: &ExecutionLogEntry) {
        if let Err(e) = self.append(entry) {
            warn!(
                path = %self.path.display(),
                call_id = entry.call_id().unwrap_or("-"),
                "Could not write execution log entry: {}",
                e
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use omnitool_domain::{
        ExecutionMetrics, ExecutionRecord, RegistryFormat, ResultMetadata, ToolError, ToolResult,
    };
    use serde_json::{Value, json};

    fn lines(path: &Path) -> Vec<Value> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    fn failed_call(call_id: &str) -> ExecutionLogEntry {
        let mut metadata = ResultMetadata::for_call(call_id, "local.delay");
        metadata.environment_id = Some("env-lite".to_string());
        metadata.attempts = 3;
        let result = ToolResult::failure(ToolError::timeout(500), metadata);
        ExecutionLogEntry::tool_call(ExecutionRecord::from_result(&result, 1_520), &result)
    }

    #[test]
    fn test_lines_are_tagged_and_stamped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("executions.jsonl");
        let logger = JsonlExecutionLogger::open(&path).unwrap();

        logger.record(&failed_call("call-1"));
        logger.record(&ExecutionLogEntry::RegistryImported {
            format: RegistryFormat::Json,
            tools: 4,
            capabilities: 2,
        });
        assert_eq!(logger.entries_written(), 2);

        let lines = lines(&path);
        assert_eq!(lines.len(), 2);
        assert!(lines.iter().all(|line| line["logged_at"].is_string()));

        assert_eq!(lines[0]["type"], "tool_call");
        assert_eq!(lines[0]["call_id"], "call-1");
        assert_eq!(lines[0]["environment_id"], "env-lite");
        assert_eq!(lines[0]["attempts"], 3);
        assert_eq!(lines[0]["error_code"], "EXECUTION_TIMEOUT");
        assert_eq!(lines[0]["execution_time_ms"], 1_520);

        assert_eq!(lines[1]["type"], "registry_imported");
        assert_eq!(lines[1]["format"], "json");
        assert_eq!(lines[1]["tools"], 4);
    }

    #[test]
    fn test_lines_read_back_as_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("executions.jsonl");
        let entry = failed_call("call-7");
        JsonlExecutionLogger::open(&path).unwrap().record(&entry);

        let mut line = lines(&path).remove(0);
        line.as_object_mut().unwrap().remove("logged_at");
        let parsed: ExecutionLogEntry = serde_json::from_value(line).unwrap();
        assert_eq!(parsed, entry);
    }

    #[test]
    fn test_reopening_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("executions.jsonl");

        for id in ["call-1", "call-2"] {
            JsonlExecutionLogger::open(&path).unwrap().record(&failed_call(id));
        }

        let ids: Vec<Value> = lines(&path).into_iter().map(|l| l["call_id"].clone()).collect();
        assert_eq!(ids, vec![json!("call-1"), json!("call-2")]);
    }

    #[test]
    fn test_open_fails_when_parent_is_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "x").unwrap();

        assert!(JsonlExecutionLogger::open(blocker.join("executions.jsonl")).is_err());
    }

    #[test]
    fn test_warnings_and_metrics_are_kept() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("executions.jsonl");
        let logger = JsonlExecutionLogger::open(&path).unwrap();

        let mut metadata = ResultMetadata::for_call("call-3", "local.echo");
        metadata.warnings = vec!["policy 'audit-net' warned".to_string()];
        let result = ToolResult::success(json!({"ok": true}), metadata)
            .with_metrics(ExecutionMetrics {
                execution_time_ms: 12,
                memory_mb: 8,
                ..Default::default()
            });
        logger.record(&ExecutionLogEntry::tool_call(ExecutionRecord::from_result(&result, 12), &result));

        let line = &lines(&path)[0];
        assert_eq!(line["warnings"], json!(["policy 'audit-net' warned"]));
        assert_eq!(line["metrics"]["memory_mb"], 8);
        assert!(line["error_code"].is_null());
    }
}
