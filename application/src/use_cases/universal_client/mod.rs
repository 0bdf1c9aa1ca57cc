//! Universal client: tool discovery, validation, dispatch and bookkeeping
//!
//! [`UniversalClient`] is the orchestrator. It owns the tool and capability
//! caches, the server connections, a bounded execution history and the
//! update channel. Every method takes `&self`; independent calls may run
//! concurrently.
//!
//! # Execution pipeline
//!
//! ```text
//! ToolCall
//!   │ lookup ─────────────── TOOL_NOT_FOUND
//!   │ adapt (cross-domain) ── DOMAIN_INCOMPATIBLE
//!   │ validate ───────────── VALIDATION_ERROR
//!   │ mobile optimization
//!   │ select connection ──── NO_SERVER_AVAILABLE
//!   │ sandbox + retry ────── (sandbox / transport failures)
//!   ▼
//! ToolResult (recorded in history, logged, returned)
//! ```
//!
//! Business failures are returned as `ToolResult::Failure`; the only error
//! surfaced by `execute_tool_with_universal_adapter` is
//! [`OrchestrationError::NotInitialized`].
//!
//! # Submodules
//!
//! - `discovery`: tool discovery and the tool/capability caches
//! - `servers`: server lifecycle and client configuration updates
//! - `execute`: the execution pipeline and retry loop
//! - `registry_io`: registry export/import
//! - `analytics`: history, metrics and usage analytics
//! - `connections` / `mobile` / `updates`: supporting pieces

mod analytics;
mod connections;
mod discovery;
mod execute;
mod mobile;
mod registry_io;
mod servers;
mod updates;

pub use connections::{ConnectionStats, ServerConnection};
pub use registry_io::ImportSummary;
pub use updates::{UpdateBus, UpdateCallback};

use crate::config::ClientConfig;
use crate::ports::domain_store::DomainStore;
use crate::ports::execution_logger::{ExecutionLogger, NoExecutionLogger};
use crate::ports::sandbox::SandboxPort;
use crate::ports::server_connector::ServerConnector;
use crate::use_cases::domain_handler::DomainContextHandler;
use omnitool_domain::{
    DefaultToolValidator, DiscoveryMetrics, ExecutionRecord, OrchestrationError, SubscriptionId,
    Tool, ToolCapability, ToolValidator, UpdateEvent,
};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Counters behind `get_performance_metrics`
#[derive(Debug, Clone, Default)]
struct ClientStats {
    executions: u64,
    successes: u64,
    failures: u64,
    retries: u64,
    total_execution_ms: u64,
    discovery: DiscoveryMetrics,
}

pub struct UniversalClient {
    config: RwLock<ClientConfig>,
    connector: Arc<dyn ServerConnector>,
    sandbox: Arc<dyn SandboxPort>,
    domains: Arc<DomainContextHandler>,
    validator: Arc<dyn ToolValidator>,
    logger: Arc<dyn ExecutionLogger>,

    initialized: AtomicBool,
    init_lock: tokio::sync::Mutex<()>,

    tools: RwLock<HashMap<String, Tool>>,
    capabilities: RwLock<HashMap<String, ToolCapability>>,
    connections: RwLock<HashMap<String, ServerConnection>>,
    history: Mutex<VecDeque<ExecutionRecord>>,
    stats: Mutex<ClientStats>,
    updates: UpdateBus,
    /// Cancellation tokens of calls currently executing, by call id
    in_flight: Mutex<HashMap<String, CancellationToken>>,
}

impl UniversalClient {
    pub fn new(
        config: ClientConfig,
        connector: Arc<dyn ServerConnector>,
        sandbox: Arc<dyn SandboxPort>,
        domain_store: Arc<dyn DomainStore>,
    ) -> Self {
        Self {
            config: RwLock::new(config),
            connector,
            sandbox,
            domains: Arc::new(DomainContextHandler::new(domain_store)),
            validator: Arc::new(DefaultToolValidator),
            logger: Arc::new(NoExecutionLogger),
            initialized: AtomicBool::new(false),
            init_lock: tokio::sync::Mutex::new(()),
            tools: RwLock::new(HashMap::new()),
            capabilities: RwLock::new(HashMap::new()),
            connections: RwLock::new(HashMap::new()),
            history: Mutex::new(VecDeque::new()),
            stats: Mutex::new(ClientStats::default()),
            updates: UpdateBus::new(),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    // ==================== Builder Methods ====================

    pub fn with_logger(mut self, logger: Arc<dyn ExecutionLogger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn with_validator(mut self, validator: Arc<dyn ToolValidator>) -> Self {
        self.validator = validator;
        self
    }

    /// Share a domain handler with other components.
    pub fn with_domain_handler(mut self, domains: Arc<DomainContextHandler>) -> Self {
        self.domains = domains;
        self
    }

    // ==================== Lifecycle ====================

    /// Validate the configuration and connect every enabled server.
    ///
    /// Idempotent: concurrent and repeated calls connect servers once.
    /// Servers that fail to connect are logged and skipped.
    pub async fn initialize(&self) -> Result<(), OrchestrationError> {
        if self.is_initialized() {
            return Ok(());
        }
        let _guard = self.init_lock.lock().await;
        if self.is_initialized() {
            return Ok(());
        }

        let config = self.config_snapshot();
        config.validate()?;

        for server in config.servers.iter().filter(|s| s.enabled) {
            match self.connector.connect(server).await {
                Ok(transport) => {
                    info!(server = %server.name, kind = %server.kind, "Server connected");
                    write(&self.connections)
                        .insert(server.name.clone(), ServerConnection::new(server.clone(), transport));
                }
                Err(e) => {
                    warn!(server = %server.name, error = %e, "Failed to connect server, skipping");
                }
            }
        }

        self.initialized.store(true, Ordering::Release);
        info!(servers = read(&self.connections).len(), "Client initialized");
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    fn ensure_initialized(&self) -> Result<(), OrchestrationError> {
        if self.is_initialized() {
            Ok(())
        } else {
            Err(OrchestrationError::NotInitialized)
        }
    }

    // ==================== Accessors ====================

    pub fn config_snapshot(&self) -> ClientConfig {
        read(&self.config).clone()
    }

    pub fn domain_handler(&self) -> &Arc<DomainContextHandler> {
        &self.domains
    }

    pub fn sandbox(&self) -> &Arc<dyn SandboxPort> {
        &self.sandbox
    }

    // ==================== Update Channel ====================

    pub fn subscribe(&self, callback: UpdateCallback) -> SubscriptionId {
        self.updates.subscribe(callback)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.updates.unsubscribe(id)
    }

    fn publish(&self, event: UpdateEvent) {
        self.updates.publish(&event);
    }

    // ==================== Cancellation ====================

    /// Cancel an in-flight call. Returns `false` if no such call is running.
    ///
    /// The worker is signalled cooperatively; the call resolves to a
    /// `CANCELLED` failure once the sandbox observes the token.
    pub fn cancel_call(&self, call_id: &str) -> bool {
        match lock(&self.in_flight).get(call_id) {
            Some(token) => {
                info!(call_id, "Cancelling call");
                token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn in_flight_calls(&self) -> Vec<String> {
        let mut ids: Vec<String> = lock(&self.in_flight).keys().cloned().collect();
        ids.sort();
        ids
    }
}

// Poisoned locks are recovered: every cached value is replaced whole, so a
// panic mid-update cannot leave a half-written entry behind.

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod test_support;
