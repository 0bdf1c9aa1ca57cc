//! Logging configuration from TOML (`[logging]` section)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLoggingConfig {
    /// JSONL execution log, one line per finished call
    pub execution_log: Option<PathBuf>,
    /// Diagnostic log file (overridden by `--log-file`)
    pub file: Option<PathBuf>,
}
