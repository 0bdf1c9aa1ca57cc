//! Sandbox executor: constraint validation, worker dispatch and deadline supervision

use super::worker::{self, WorkerJob, WorkerReply};
use async_trait::async_trait;
use omnitool_application::{SandboxConfig, SandboxPort, SandboxRequest};
use omnitool_domain::{
    ExecutionEnvironment, ExecutionMetrics, OrchestrationError, PolicyOutcome, PolicySubject,
    ResourceUsage, ResultMetadata, SandboxExecution, Tool, ToolCall, ToolError, ToolResult,
    UsageSnapshot, evaluate_policies,
};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError, RwLock};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// How the supervised worker ended
enum WorkerOutcome {
    Replied(WorkerReply),
    /// Worker dropped its channel without replying
    Lost,
    DeadlineExceeded,
    Cancelled,
}

/// Runs tool calls in isolated worker threads.
///
/// Environments are cached by id. A request without an explicit environment
/// uses the domain's default environment (`env-<domain>`), built on first
/// use from the domain's performance and security context.
pub struct SandboxExecutor {
    config: SandboxConfig,
    environments: RwLock<HashMap<String, ExecutionEnvironment>>,
    usage: Mutex<UsageSnapshot>,
}

impl SandboxExecutor {
    pub fn new(config: SandboxConfig) -> Self {
        Self {
            config,
            environments: RwLock::new(HashMap::new()),
            usage: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }

    /// Usage of every environment that has run at least one call.
    pub fn usage_snapshot(&self) -> UsageSnapshot {
        self.usage.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Resolve the environment for a request.
    ///
    /// Supplied and cached environments are both clamped to the ceiling of
    /// the request's domain, so a domain tightened after the cache was warmed
    /// still bounds the call.
    fn resolve_environment(&self, request: &SandboxRequest<'_>) -> ExecutionEnvironment {
        let base = ExecutionEnvironment::for_domain(request.domain).with_isolation(self.config.default_isolation);

        if let Some(env) = &request.environment {
            return env.clone().clamp_to(&base.limits);
        }

        let mut environments = self.environments.write().unwrap_or_else(PoisonError::into_inner);
        let ceiling = base.limits;
        environments
            .entry(base.id.clone())
            .or_insert(base)
            .clone()
            .clamp_to(&ceiling)
    }

    fn record_usage(&self, environment_id: &str, metrics: &ExecutionMetrics, execution: &SandboxExecution) {
        let mut usage = self.usage.lock().unwrap_or_else(PoisonError::into_inner);
        usage
            .entry(environment_id.to_string())
            .or_insert_with(|| ResourceUsage::new(environment_id))
            .record(metrics, &execution.state);
    }

    fn adjust_active(&self, environment_id: &str, dispatched: bool) {
        let mut usage = self.usage.lock().unwrap_or_else(PoisonError::into_inner);
        let entry = usage
            .entry(environment_id.to_string())
            .or_insert_with(|| ResourceUsage::new(environment_id));
        if dispatched {
            entry.active += 1;
        } else {
            entry.active = entry.active.saturating_sub(1);
        }
    }

    async fn supervise(
        &self,
        receiver: tokio::sync::oneshot::Receiver<WorkerReply>,
        deadline: Duration,
        cancel: &CancellationToken,
    ) -> WorkerOutcome {
        tokio::select! {
            reply = tokio::time::timeout(deadline, receiver) => match reply {
                Ok(Ok(reply)) => WorkerOutcome::Replied(reply),
                Ok(Err(_)) => WorkerOutcome::Lost,
                Err(_) => WorkerOutcome::DeadlineExceeded,
            },
            _ = cancel.cancelled() => WorkerOutcome::Cancelled,
        }
    }

    fn estimate_metrics(
        &self,
        tool: &Tool,
        subject: &PolicySubject,
        execution_time_ms: u64,
        payload_bytes: u64,
    ) -> ExecutionMetrics {
        let cpu_time_ms = execution_time_ms * u64::from(tool.performance.cpu_usage_percent) / 100;
        ExecutionMetrics {
            execution_time_ms,
            cpu_time_ms,
            memory_mb: tool.performance.memory_usage_mb,
            network_bytes: if subject.uses_network() { payload_bytes } else { 0 },
            disk_bytes: if subject.paths.is_empty() { 0 } else { payload_bytes },
            battery_consumption: cpu_time_ms as f64 / 1000.0 * self.config.battery_drain_per_cpu_second,
        }
    }
}

/// Pre-dispatch checks, in order: timeout, memory, network isolation, policies.
fn validate_constraints(
    call: &ToolCall,
    tool: &Tool,
    env: &ExecutionEnvironment,
    subject: &PolicySubject,
) -> Result<PolicyOutcome, String> {
    if call.timeout_ms > env.limits.max_execution_time_ms {
        return Err(format!(
            "Call timeout {}ms exceeds environment limit {}ms",
            call.timeout_ms, env.limits.max_execution_time_ms
        ));
    }
    if tool.performance.memory_usage_mb > env.limits.max_memory_mb {
        return Err(format!(
            "Estimated memory {}MB exceeds environment limit {}MB",
            tool.performance.memory_usage_mb, env.limits.max_memory_mb
        ));
    }
    if subject.uses_network() && !env.network_enabled() {
        return Err(format!(
            "Network access is disabled in environment '{}' ({})",
            env.id,
            env.isolation.as_str()
        ));
    }

    let outcome = evaluate_policies(&env.policies, subject);
    match outcome.denied {
        Some(reason) => Err(reason),
        None => Ok(outcome),
    }
}

#[async_trait]
impl SandboxPort for SandboxExecutor {
    async fn execute_in_sandbox(&self, request: SandboxRequest<'_>) -> ToolResult {
        let call = request.call;
        let tool = request.tool;
        let env = self.resolve_environment(&request);

        let mut execution = SandboxExecution::new(&call.id, &env.id);
        let mut metadata = ResultMetadata::for_call(&call.id, &call.tool_id);
        metadata.environment_id = Some(env.id.clone());
        metadata.server_name = Some(request.transport.server_name().to_string());

        let base_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("/"));
        let subject = PolicySubject::from_call(call, tool, &base_dir);
        let outcome = match validate_constraints(call, tool, &env, &subject) {
            Ok(outcome) => outcome,
            Err(reason) => {
                warn!(call_id = %call.id, environment = %env.id, reason = %reason, "Sandbox rejected call");
                execution.mark_failed(reason.clone());
                self.record_usage(&env.id, &ExecutionMetrics::default(), &execution);
                return ToolResult::failure(ToolError::sandbox_violation(reason), metadata);
            }
        };
        execution.mark_validated();

        for advisory in &outcome.advisories {
            info!(call_id = %call.id, environment = %env.id, advisory = %advisory, "Policy advisory");
        }
        metadata.warnings.extend(outcome.warnings.iter().cloned());

        // Terminate policies can only shorten the environment deadline
        let env_deadline_ms = env.limits.max_execution_time_ms;
        let kill_deadline_ms = outcome.termination_deadline_ms.filter(|ms| *ms < env_deadline_ms);
        let deadline_ms = kill_deadline_ms.unwrap_or(env_deadline_ms);

        let worker_cancel = request.cancel.child_token();
        let job = match WorkerJob::new(tool, call, request.transport.clone(), worker_cancel.clone()) {
            Ok(job) => job,
            Err(e) => {
                execution.mark_failed(e.to_string());
                self.record_usage(&env.id, &ExecutionMetrics::default(), &execution);
                return ToolResult::failure(
                    ToolError::worker_failure(format!("Could not encode worker message: {}", e)),
                    metadata,
                );
            }
        };

        let thread_name = format!("{}-{}", self.config.worker_thread_prefix, call.id);
        let started = Instant::now();
        let receiver = match worker::spawn(thread_name, job) {
            Ok(rx) => rx,
            Err(e) => {
                execution.mark_failed(e.to_string());
                self.record_usage(&env.id, &ExecutionMetrics::default(), &execution);
                return ToolResult::failure(
                    ToolError::worker_failure(format!("Could not spawn worker: {}", e)),
                    metadata,
                );
            }
        };
        execution.mark_dispatched();
        self.adjust_active(&env.id, true);
        debug!(call_id = %call.id, environment = %env.id, deadline_ms, "Call dispatched to worker");

        let worker_outcome = self
            .supervise(receiver, Duration::from_millis(deadline_ms), &request.cancel)
            .await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        let (result, metrics) = match worker_outcome {
            WorkerOutcome::Replied(Ok(encoded)) => match serde_json::from_str(&encoded) {
                Ok(data) => {
                    execution.mark_completed();
                    let metrics = self.estimate_metrics(tool, &subject, elapsed_ms, encoded.len() as u64);
                    (ToolResult::success(data, metadata), metrics)
                }
                Err(e) => {
                    execution.mark_failed(e.to_string());
                    let metrics = self.estimate_metrics(tool, &subject, elapsed_ms, 0);
                    let error = ToolError::worker_failure(format!("Could not decode worker reply: {}", e));
                    (ToolResult::failure(error, metadata), metrics)
                }
            },
            WorkerOutcome::Replied(Err(e)) => {
                execution.mark_failed(e.to_string());
                let metrics = self.estimate_metrics(tool, &subject, elapsed_ms, 0);
                (ToolResult::failure(e.to_tool_error(), metadata), metrics)
            }
            WorkerOutcome::Lost => {
                execution.mark_failed("worker exited without a reply");
                let metrics = self.estimate_metrics(tool, &subject, elapsed_ms, 0);
                let error = ToolError::worker_failure("Worker exited without a reply");
                (ToolResult::failure(error, metadata), metrics)
            }
            WorkerOutcome::DeadlineExceeded => {
                worker_cancel.cancel();
                let metrics = self.estimate_metrics(tool, &subject, deadline_ms, 0);
                let error = match kill_deadline_ms {
                    Some(ms) => {
                        execution.mark_failed(format!("terminated by policy after {}ms", ms));
                        ToolError::sandbox_violation(format!("Execution terminated by policy after {}ms", ms))
                    }
                    None => {
                        execution.mark_timed_out(deadline_ms);
                        ToolError::timeout(deadline_ms)
                    }
                };
                warn!(call_id = %call.id, environment = %env.id, deadline_ms, "Worker deadline exceeded");
                (ToolResult::failure(error, metadata), metrics)
            }
            WorkerOutcome::Cancelled => {
                worker_cancel.cancel();
                execution.mark_failed("cancelled");
                let metrics = self.estimate_metrics(tool, &subject, elapsed_ms, 0);
                (ToolResult::failure(ToolError::cancelled(&call.id), metadata), metrics)
            }
        };

        self.adjust_active(&env.id, false);
        self.record_usage(&env.id, &metrics, &execution);
        debug!(
            call_id = %call.id,
            state = execution.state.name(),
            elapsed_ms,
            "Sandbox execution finished"
        );
        result.with_metrics(metrics)
    }

    fn get_environment(&self, environment_id: &str) -> Option<ExecutionEnvironment> {
        self.environments
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(environment_id)
            .cloned()
    }

    fn update_environment(&self, environment: ExecutionEnvironment) -> Result<(), OrchestrationError> {
        if environment.id.trim().is_empty() {
            return Err(OrchestrationError::Configuration(
                "environment id must not be empty".to_string(),
            ));
        }
        let mut environments = self.environments.write().unwrap_or_else(PoisonError::into_inner);
        // New ids are bounded by their domain's default environment when it is known
        let ceiling = environments
            .get(&environment.id)
            .or_else(|| environments.get(&ExecutionEnvironment::default_id(&environment.domain_id)))
            .map(|current| current.limits);
        let environment = match ceiling {
            Some(limits) => environment.clamp_to(&limits),
            None => environment,
        };
        info!(environment = %environment.id, policies = environment.policies.len(), "Environment updated");
        environments.insert(environment.id.clone(), environment);
        Ok(())
    }

    fn remove_environment(&self, environment_id: &str) -> bool {
        self.environments
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(environment_id)
            .is_some()
    }

    fn get_resource_usage(&self, environment_id: &str) -> Option<ResourceUsage> {
        self.usage
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(environment_id)
            .cloned()
    }
}
