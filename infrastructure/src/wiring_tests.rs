//! End-to-end wiring: client + local server + sandbox + static domains

use crate::{LOCAL_SERVER_KIND, LocalServerConnector, SandboxExecutor, StaticDomainStore};
use omnitool_application::{ClientConfig, SandboxConfig, ServerConfig, UniversalClient};
use omnitool_domain::{DomainContext, ExecutionContext, ToolCall, codes};
use serde_json::json;
use std::sync::Arc;

async fn client() -> UniversalClient {
    let store = StaticDomainStore::new()
        .with_domain(DomainContext::new("lite", "web", "1.0.0").with_max_execution_time_ms(500));
    let client = UniversalClient::new(
        ClientConfig::default().with_server(ServerConfig::new("local", LOCAL_SERVER_KIND)),
        Arc::new(LocalServerConnector),
        Arc::new(SandboxExecutor::new(SandboxConfig::default())),
        Arc::new(store),
    );
    client.initialize().await.unwrap();
    client.discover_all_available_tools().await.unwrap();
    client
}

fn targeting(call: ToolCall, domain: &str) -> ToolCall {
    call.with_context(ExecutionContext {
        target_domain: Some(domain.to_string()),
        ..Default::default()
    })
}

#[tokio::test]
async fn test_discovers_builtin_tools() {
    let client = client().await;

    let ids: Vec<String> = client.cached_tools().into_iter().map(|t| t.id).collect();
    assert!(ids.contains(&"local.echo".to_string()));
    assert!(ids.contains(&"local.run_command".to_string()));
    assert_eq!(client.tools_for_capability("diagnostics").len(), 2);
}

#[tokio::test]
async fn test_echo_runs_through_sandbox() {
    let client = client().await;

    let call = ToolCall::new("local.echo").with_param("text", "hi").with_timeout_ms(1_000);
    let result = client.execute_tool_with_universal_adapter(call).await.unwrap();

    assert!(result.is_success(), "{:?}", result.error());
    assert_eq!(result.data(), Some(&json!({"echo": {"text": "hi"}})));
    assert_eq!(result.metadata().server_name.as_deref(), Some("local"));
    assert_eq!(client.get_performance_metrics().successful_executions, 1);
}

#[tokio::test]
async fn test_open_schema_tool_keeps_its_params_across_domains() {
    let client = client().await;

    let call = targeting(
        ToolCall::new("local.echo").with_param("text", "hi").with_timeout_ms(500),
        "lite",
    );
    let result = client.execute_tool_with_universal_adapter(call).await.unwrap();

    assert!(result.is_success(), "{:?}", result.error());
    assert_eq!(result.data(), Some(&json!({"echo": {"text": "hi"}})));
    assert_eq!(result.metadata().environment_id.as_deref(), Some("env-lite"));
}

#[tokio::test]
async fn test_cross_domain_call_is_bounded_by_target_limits() {
    let client = client().await;

    let call = targeting(
        ToolCall::new("local.delay").with_param("ms", 2_000).with_max_retries(0),
        "lite",
    );
    let result = client.execute_tool_with_universal_adapter(call).await.unwrap();

    let error = result.error().unwrap();
    assert_eq!(error.code, codes::EXECUTION_TIMEOUT);
    assert_eq!(result.metadata().environment_id.as_deref(), Some("env-lite"));
}

#[tokio::test]
async fn test_low_security_tool_cannot_move_into_mobile() {
    let client = client().await;

    let call = targeting(ToolCall::new("local.echo").with_timeout_ms(1_000), "mobile");
    let result = client.execute_tool_with_universal_adapter(call).await.unwrap();

    assert_eq!(result.error().unwrap().code, codes::DOMAIN_INCOMPATIBLE);
}

#[tokio::test]
async fn test_run_command_requires_permission() {
    let client = client().await;

    let call = ToolCall::new("local.run_command")
        .with_param("command", "echo hi")
        .with_timeout_ms(1_000);
    let result = client.execute_tool_with_universal_adapter(call).await.unwrap();

    assert_eq!(result.error().unwrap().code, codes::VALIDATION_ERROR);
}
