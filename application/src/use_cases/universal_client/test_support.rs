//! Mock ports shared by the client tests

use super::UniversalClient;
use crate::config::{ClientConfig, MobileConfig, ServerConfig};
use crate::ports::domain_store::{DomainStore, DomainStoreError};
use crate::ports::execution_logger::{ExecutionLogEntry, ExecutionLogger};
use crate::ports::sandbox::{SandboxPort, SandboxRequest};
use crate::ports::server_connector::ServerConnector;
use crate::ports::tool_transport::{ToolTransport, TransportError};
use async_trait::async_trait;
use omnitool_domain::context::adaptation::mobile_rules;
use omnitool_domain::{
    DomainBundle, DomainContext, ExecutionEnvironment, MobileContext, OrchestrationError,
    ResourceUsage, ResultMetadata, Tool, ToolCall, ToolError, ToolResult,
};
use serde_json::{Value, json};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Keeps every execution log entry in memory
#[derive(Default)]
pub struct MemoryLogger(pub Mutex<Vec<ExecutionLogEntry>>);

impl MemoryLogger {
    pub fn entries(&self) -> Vec<ExecutionLogEntry> {
        self.0.lock().unwrap().clone()
    }
}

impl ExecutionLogger for MemoryLogger {
    fn record(&self, entry: &ExecutionLogEntry) {
        self.0.lock().unwrap().push(entry.clone());
    }
}

pub struct MockTransport {
    pub name: String,
    pub tools: Mutex<Vec<Tool>>,
    pub calls: AtomicUsize,
    pub discoveries: AtomicUsize,
    /// Remaining retryable failures; `u32::MAX` fails forever
    pub fail_retryable: AtomicU32,
    pub fail_permanent: AtomicBool,
    pub fail_discovery: AtomicBool,
}

impl MockTransport {
    pub fn new(name: &str, tools: Vec<Tool>) -> Self {
        Self {
            name: name.to_string(),
            tools: Mutex::new(tools),
            calls: AtomicUsize::new(0),
            discoveries: AtomicUsize::new(0),
            fail_retryable: AtomicU32::new(0),
            fail_permanent: AtomicBool::new(false),
            fail_discovery: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl ToolTransport for MockTransport {
    fn server_name(&self) -> &str {
        &self.name
    }

    async fn discover_tools(&self) -> Result<Vec<Tool>, TransportError> {
        self.discoveries.fetch_add(1, Ordering::SeqCst);
        if self.fail_discovery.load(Ordering::SeqCst) {
            return Err(TransportError::Connection("server down".into()));
        }
        Ok(self.tools.lock().unwrap().clone())
    }

    async fn call(&self, _tool: &Tool, call: &ToolCall) -> Result<Value, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_permanent.load(Ordering::SeqCst) {
            return Err(TransportError::InvalidParams("bad input".into()));
        }
        let remaining = self.fail_retryable.load(Ordering::SeqCst);
        if remaining > 0 {
            if remaining != u32::MAX {
                self.fail_retryable.fetch_sub(1, Ordering::SeqCst);
            }
            return Err(TransportError::Connection("flaky".into()));
        }
        Ok(json!({ "echo": call.parameters }))
    }
}

/// What the sandbox was asked to run
#[derive(Debug, Clone)]
pub struct Seen {
    pub domain_id: String,
    pub tool_timeout_ms: u64,
    pub call_timeout_ms: u64,
}

#[derive(Default)]
pub struct MockSandbox {
    pub requests: AtomicUsize,
    pub reject_all: AtomicBool,
    pub last_seen: Mutex<Option<Seen>>,
}

#[async_trait]
impl SandboxPort for MockSandbox {
    async fn execute_in_sandbox(&self, request: SandboxRequest<'_>) -> ToolResult {
        self.requests.fetch_add(1, Ordering::SeqCst);
        *self.last_seen.lock().unwrap() = Some(Seen {
            domain_id: request.domain.id.clone(),
            tool_timeout_ms: request.tool.timeout_ms,
            call_timeout_ms: request.call.timeout_ms,
        });

        let mut metadata = ResultMetadata::for_call(&request.call.id, &request.call.tool_id);
        metadata.environment_id = Some(ExecutionEnvironment::default_id(&request.domain.id));

        if self.reject_all.load(Ordering::SeqCst) {
            return ToolResult::failure(ToolError::sandbox_violation("blocked by policy 'deny-all'"), metadata);
        }
        if request.cancel.is_cancelled() {
            return ToolResult::failure(ToolError::cancelled(&request.call.id), metadata);
        }
        match request.transport.call(request.tool, request.call).await {
            Ok(data) => ToolResult::success(data, metadata),
            Err(e) => ToolResult::failure(e.to_tool_error(), metadata),
        }
    }

    fn get_environment(&self, _environment_id: &str) -> Option<ExecutionEnvironment> {
        None
    }

    fn update_environment(&self, _environment: ExecutionEnvironment) -> Result<(), OrchestrationError> {
        Ok(())
    }

    fn remove_environment(&self, _environment_id: &str) -> bool {
        false
    }

    fn get_resource_usage(&self, _environment_id: &str) -> Option<ResourceUsage> {
        None
    }
}

/// Connects every server to the shared mock transport, except kind `broken`.
pub struct MockConnector {
    pub transport: Arc<MockTransport>,
    pub connects: AtomicUsize,
    /// Milliseconds each connect waits before answering
    pub connect_delay_ms: AtomicU64,
}

#[async_trait]
impl ServerConnector for MockConnector {
    async fn connect(&self, config: &ServerConfig) -> Result<Arc<dyn ToolTransport>, TransportError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let delay = self.connect_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
        }
        if config.kind == "broken" {
            return Err(TransportError::Connection(format!("cannot reach {}", config.name)));
        }
        Ok(self.transport.clone())
    }
}

pub struct MockDomainStore;

#[async_trait]
impl DomainStore for MockDomainStore {
    async fn load_bundle(&self, domain_id: &str) -> Result<Option<DomainBundle>, DomainStoreError> {
        Ok(match domain_id {
            "mobile" => Some(
                DomainBundle::new(
                    DomainContext::new("mobile", "mobile", "1.0.0")
                        .with_security_level("high")
                        .with_max_execution_time_ms(10_000)
                        .with_mobile(MobileContext {
                            requires_optimization: true,
                            ..Default::default()
                        }),
                )
                .with_rules(mobile_rules()),
            ),
            "web" => Some(DomainBundle::new(DomainContext::new("web", "web", "1.0.0"))),
            "general" => Some(DomainBundle::new(DomainContext::default())),
            _ => None,
        })
    }
}

pub struct Harness {
    pub client: UniversalClient,
    pub transport: Arc<MockTransport>,
    pub sandbox: Arc<MockSandbox>,
    pub connector: Arc<MockConnector>,
}

impl Harness {
    pub fn with_config(tools: Vec<Tool>, config: ClientConfig) -> Self {
        let transport = Arc::new(MockTransport::new("mock", tools));
        let sandbox = Arc::new(MockSandbox::default());
        let connector = Arc::new(MockConnector {
            transport: transport.clone(),
            connects: AtomicUsize::new(0),
            connect_delay_ms: AtomicU64::new(0),
        });
        let client = UniversalClient::new(config, connector.clone(), sandbox.clone(), Arc::new(MockDomainStore));
        Self {
            client,
            transport,
            sandbox,
            connector,
        }
    }

    pub fn config() -> ClientConfig {
        ClientConfig::default()
            .with_retry_base_delay_ms(1)
            .with_server(ServerConfig::new("mock", "mock"))
    }

    pub fn new(tools: Vec<Tool>) -> Self {
        Self::with_config(tools, Self::config())
    }

    pub async fn ready_from(tools: Vec<Tool>, config: ClientConfig) -> Self {
        let harness = Self::with_config(tools, config);
        harness.client.initialize().await.unwrap();
        harness.client.discover_all_available_tools().await.unwrap();
        harness
    }

    pub async fn ready(tools: Vec<Tool>) -> Self {
        Self::ready_from(tools, Self::config()).await
    }

    pub async fn ready_with_base_delay(tools: Vec<Tool>, base_ms: u64) -> Self {
        Self::ready_from(tools, Self::config().with_retry_base_delay_ms(base_ms)).await
    }

    pub async fn ready_mobile(tools: Vec<Tool>) -> Self {
        let config = Self::config().with_mobile(MobileConfig {
            enabled: true,
            ..Default::default()
        });
        Self::ready_from(tools, config).await
    }
}
