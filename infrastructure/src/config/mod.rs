//! Configuration file loading for omnitool
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. `OMNITOOL_*` environment variables
//! 2. `--config <path>` specified file
//! 3. Project root: `./omnitool.toml`
//! 4. XDG config: `$XDG_CONFIG_HOME/omnitool/config.toml`
//! 5. Default values

mod file_config;
mod loader;

pub use file_config::{
    ConfigValidationError, FileClientConfig, FileConfig, FileLoggingConfig, FileSandboxConfig,
};
pub use loader::{ConfigLoader, ConfigSource, ENV_PREFIX, PROJECT_CONFIG_FILE};
