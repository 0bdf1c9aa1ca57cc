//! CLI command definitions

use clap::{Parser, Subcommand, ValueEnum};
use omnitool_domain::RegistryFormat;
use std::path::PathBuf;

/// Registry serialization format
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum FormatArg {
    /// Authoritative JSON
    Json,
    /// Same shape as JSON
    Yaml,
    /// One row per tool, lossy
    Csv,
}

impl From<FormatArg> for RegistryFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Json => RegistryFormat::Json,
            FormatArg::Yaml => RegistryFormat::Yaml,
            FormatArg::Csv => RegistryFormat::Csv,
        }
    }
}

/// CLI arguments for omnitool
#[derive(Parser, Debug)]
#[command(name = "omnitool")]
#[command(author, version, about = "Universal tool orchestration with sandboxed execution")]
#[command(long_about = r#"
omnitool discovers tools from the configured servers, adapts them across
execution domains and runs every call inside a resource- and
policy-bounded sandbox.

Configuration files are loaded from (in priority order):
1. OMNITOOL_* environment variables (OMNITOOL_CLIENT__HISTORY_CAPACITY=10)
2. --config <path>     Explicit config file
3. ./omnitool.toml     Project-level config
4. ~/.config/omnitool/config.toml   Global config

Example:
  omnitool discover
  omnitool call local.echo -p text=hello
  omnitool call local.read_file -p path=README.md --target-domain mobile
  omnitool can-adapt local.read_file web
  omnitool export --format yaml
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Write diagnostic logs to this file instead of stderr
    #[arg(long, value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// Path to configuration file
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long, global = true)]
    pub no_config: bool,

    /// Enable mobile mode (mobile tool filter and call optimization)
    #[arg(long, global = true)]
    pub mobile: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List every tool the configured servers expose
    Discover {
        /// Only tools carrying this capability
        #[arg(long, value_name = "CAPABILITY")]
        capability: Option<String>,
    },

    /// Execute a tool call
    Call {
        /// Tool id (e.g. local.echo)
        tool: String,

        /// Parameter as key=value; values are parsed as JSON when possible
        #[arg(short, long = "param", value_name = "KEY=VALUE")]
        params: Vec<String>,

        /// Adapt the tool to this domain before running it
        #[arg(long, value_name = "DOMAIN")]
        target_domain: Option<String>,

        /// Call timeout in milliseconds
        #[arg(long, value_name = "MS")]
        timeout_ms: Option<u64>,

        /// Retries after the first attempt
        #[arg(long, value_name = "N")]
        retries: Option<u32>,

        /// Caller clearance (low, medium, high, critical)
        #[arg(long, default_value = "low")]
        clearance: String,

        /// Granted permission (can be specified multiple times)
        #[arg(long = "permission", value_name = "PERMISSION")]
        permissions: Vec<String>,
    },

    /// Check whether a tool can be adapted to a domain
    CanAdapt {
        /// Tool id
        tool: String,
        /// Target domain id
        domain: String,
    },

    /// Export the tool registry
    Export {
        #[arg(short, long, value_enum, default_value = "json")]
        format: FormatArg,

        /// Write to this file instead of stdout
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },

    /// Validate and import a tool registry file
    Import {
        /// Registry file
        path: PathBuf,

        #[arg(short, long, value_enum, default_value = "json")]
        format: FormatArg,
    },

    /// Show performance metrics after discovery
    Metrics,

    /// List known domains
    Domains,

    /// Show configuration file locations
    ConfigSources,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_call() {
        let cli = Cli::parse_from([
            "omnitool",
            "-vv",
            "call",
            "local.echo",
            "-p",
            "text=hi",
            "--param",
            "n=3",
            "--target-domain",
            "mobile",
            "--permission",
            "process.spawn",
        ]);
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Command::Call {
                tool,
                params,
                target_domain,
                permissions,
                clearance,
                ..
            } => {
                assert_eq!(tool, "local.echo");
                assert_eq!(params, ["text=hi", "n=3"]);
                assert_eq!(target_domain.as_deref(), Some("mobile"));
                assert_eq!(permissions, ["process.spawn"]);
                assert_eq!(clearance, "low");
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_export_format() {
        let cli = Cli::parse_from(["omnitool", "export", "--format", "csv", "--no-config"]);
        assert!(cli.no_config);
        assert!(matches!(
            cli.command,
            Command::Export {
                format: FormatArg::Csv,
                output: None
            }
        ));
    }
}
