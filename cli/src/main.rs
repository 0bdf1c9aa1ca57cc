//! CLI entrypoint for omnitool
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

mod commands;

use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;
use commands::{Cli, Command};
use omnitool_application::{DomainStore, UniversalClient};
use omnitool_domain::{
    DeviceInfo, DeviceType, ExecutionContext, RegistryFormat, ToolCall, ToolResult,
};
use omnitool_infrastructure::{
    ConfigLoader, FileConfig, JsonlExecutionLogger, LocalServerConnector, SandboxExecutor,
    StaticDomainStore,
};
use serde_json::Value;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut file_config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_ref())
            .map_err(|e| anyhow!("failed to load configuration: {}", e))?
    };
    if cli.mobile {
        file_config.client.mobile.enabled = true;
    }

    let log_file = cli.log_file.clone().or_else(|| file_config.logging.file.clone());
    let _log_guard = init_logging(cli.verbose, log_file.as_deref())?;

    file_config.validate().context("invalid configuration")?;

    match cli.command {
        Command::ConfigSources => {
            print_config_sources(cli.config.as_ref());
            Ok(())
        }
        command => run(command, cli.mobile, &file_config).await,
    }
}

async fn run(command: Command, mobile: bool, file_config: &FileConfig) -> Result<()> {
    info!("Starting omnitool");

    // === Dependency Injection ===
    let store = Arc::new(StaticDomainStore::new().with_domains(file_config.domains.clone()));
    let sandbox = Arc::new(SandboxExecutor::new(file_config.to_sandbox_config()));
    let mut client = UniversalClient::new(
        file_config.to_client_config(),
        Arc::new(LocalServerConnector),
        sandbox,
        store.clone(),
    );
    if let Some(path) = &file_config.logging.execution_log {
        match JsonlExecutionLogger::open(path) {
            Ok(logger) => client = client.with_logger(Arc::new(logger)),
            Err(e) => warn!("Execution log disabled, cannot open {}: {}", path.display(), e),
        }
    }
    client.initialize().await?;

    match command {
        Command::Discover { capability } => {
            let tools = client.discover_all_available_tools().await?;
            let tools = match capability {
                Some(capability) => client.tools_for_capability(&capability),
                None => tools,
            };
            print_json(&tools)?;
        }

        Command::Call {
            tool,
            params,
            target_domain,
            timeout_ms,
            retries,
            clearance,
            permissions,
        } => {
            client.discover_all_available_tools().await?;

            let mut context = ExecutionContext {
                target_domain,
                ..Default::default()
            };
            context.security.clearance = clearance;
            context.security.permissions = permissions;
            if mobile {
                context.device = Some(DeviceInfo {
                    device_type: DeviceType::Mobile,
                    ..Default::default()
                });
            }

            let mut call = ToolCall::new(&tool)
                .with_context(context)
                .with_max_retries(retries.unwrap_or(file_config.client.default_max_retries));
            if let Some(ms) = timeout_ms {
                call = call.with_timeout_ms(ms);
            }
            for param in &params {
                let (key, value) = parse_param(param)?;
                call = call.with_param(key, value);
            }

            let result = client.execute_tool_with_universal_adapter(call).await?;
            print_json(&result)?;
            if let ToolResult::Failure { error, .. } = &result {
                bail!("{} ({})", error.message, error.code);
            }
        }

        Command::CanAdapt { tool, domain } => {
            client.discover_all_available_tools().await?;
            let tool = client
                .get_tool(&tool)
                .ok_or_else(|| anyhow!("unknown tool '{}'", tool))?;

            let handler = client.domain_handler();
            if handler.can_adapt_tool(&tool, &domain).await {
                let adapted = handler.adapt_tool_for_domain(&tool, &domain).await?;
                println!("compatible: {} -> {}", tool.id, domain);
                print_json(&adapted)?;
            } else {
                println!("incompatible: {} -> {}", tool.id, domain);
            }
        }

        Command::Export { format, output } => {
            client.discover_all_available_tools().await?;
            let data = client.export_tool_registry(RegistryFormat::from(format))?;
            match output {
                Some(path) => {
                    std::fs::write(&path, data)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    println!("Registry written to {}", path.display());
                }
                None => print!("{}", data),
            }
        }

        Command::Import { path, format } => {
            let data = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let summary = client.import_tool_registry(&data, RegistryFormat::from(format))?;
            println!(
                "Imported {} tools and {} capabilities from {}",
                summary.tools,
                summary.capabilities,
                path.display()
            );
        }

        Command::Metrics => {
            client.discover_all_available_tools().await?;
            print_json(&client.get_performance_metrics())?;
        }

        Command::Domains => {
            for domain in store.list_domains().await {
                println!("{}", domain);
            }
        }

        Command::ConfigSources => print_config_sources(None),
    }

    Ok(())
}

/// Initialize logging based on verbosity level.
///
/// The returned guard flushes the file writer on drop and must live until exit.
fn init_logging(verbose: u8, log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = match verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"), // -vvv or more
    };

    match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            let (writer, guard) = tracing_appender::non_blocking(file);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(false)
                .with_ansi(false)
                .with_writer(writer)
                .init();
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
            Ok(None)
        }
    }
}

/// `key=value`; the value is JSON when it parses as JSON, a string otherwise.
fn parse_param(param: &str) -> Result<(String, Value)> {
    let Some((key, raw)) = param.split_once('=') else {
        bail!("parameter '{}' must be KEY=VALUE", param);
    };
    if key.trim().is_empty() {
        bail!("parameter '{}' has an empty key", param);
    }
    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((key.trim().to_string(), value))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_config_sources(config_path: Option<&PathBuf>) {
    println!("Configuration sources (in priority order):");
    for source in ConfigLoader::config_sources(config_path) {
        let mark = if source.found { "FOUND" } else { "     " };
        println!("  [{}] {:<8} {}", mark, format!("{}:", source.label), source.location);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_param_values() {
        assert_eq!(parse_param("n=3").unwrap(), ("n".to_string(), Value::from(3)));
        assert_eq!(
            parse_param("text=hello world").unwrap(),
            ("text".to_string(), Value::from("hello world"))
        );
        assert_eq!(parse_param("flag=true").unwrap().1, Value::Bool(true));
        assert_eq!(parse_param("empty=").unwrap().1, Value::from(""));
        assert!(parse_param("novalue").is_err());
        assert!(parse_param("=3").is_err());
    }

    #[test]
    fn test_default_file_config_builds_client_config() {
        let config = FileConfig::default();
        let client = config.to_client_config();
        assert_eq!(client.servers.len(), 1);
        assert_eq!(client.servers[0].kind, omnitool_infrastructure::LOCAL_SERVER_KIND);
    }
}
