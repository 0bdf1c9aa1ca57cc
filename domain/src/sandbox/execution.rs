//! Sandbox execution state machine.
//!
//! ```text
//! Created ──> ConstraintsValidated ──> Dispatched ──> Completed
//!    │                                     ├────────> Failed
//!    └──> Failed (rejected)                └────────> TimedOut
//! ```
//!
//! Transitions out of order are no-ops, so a late worker reply cannot
//! overwrite a timeout that already fired.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::tool::value_objects::ExecutionMetrics;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SandboxState {
    Created,
    ConstraintsValidated,
    Dispatched { started_at: u64 },
    Completed { started_at: u64, finished_at: u64 },
    Failed { reason: String },
    TimedOut { started_at: u64, timeout_ms: u64 },
}

impl SandboxState {
    pub fn name(&self) -> &'static str {
        match self {
            SandboxState::Created => "created",
            SandboxState::ConstraintsValidated => "constraints_validated",
            SandboxState::Dispatched { .. } => "dispatched",
            SandboxState::Completed { .. } => "completed",
            SandboxState::Failed { .. } => "failed",
            SandboxState::TimedOut { .. } => "timed_out",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SandboxState::Completed { .. } | SandboxState::Failed { .. } | SandboxState::TimedOut { .. }
        )
    }
}

/// One call's passage through the sandbox
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SandboxExecution {
    pub call_id: String,
    pub environment_id: String,
    pub state: SandboxState,
}

impl SandboxExecution {
    pub fn new(call_id: impl Into<String>, environment_id: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            environment_id: environment_id.into(),
            state: SandboxState::Created,
        }
    }

    pub fn mark_validated(&mut self) {
        if self.state == SandboxState::Created {
            self.state = SandboxState::ConstraintsValidated;
        }
    }

    pub fn mark_dispatched(&mut self) {
        if self.state == SandboxState::ConstraintsValidated {
            self.state = SandboxState::Dispatched {
                started_at: current_timestamp(),
            };
        }
    }

    pub fn mark_completed(&mut self) {
        if let SandboxState::Dispatched { started_at } = self.state {
            self.state = SandboxState::Completed {
                started_at,
                finished_at: current_timestamp(),
            };
        }
    }

    /// Allowed from any non-terminal state.
    pub fn mark_failed(&mut self, reason: impl Into<String>) {
        if !self.state.is_terminal() {
            self.state = SandboxState::Failed {
                reason: reason.into(),
            };
        }
    }

    pub fn mark_timed_out(&mut self, timeout_ms: u64) {
        if let SandboxState::Dispatched { started_at } = self.state {
            self.state = SandboxState::TimedOut {
                started_at,
                timeout_ms,
            };
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}

/// Accumulated resource usage of one environment
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceUsage {
    pub environment_id: String,
    pub executions: u64,
    pub active: u64,
    pub failures: u64,
    pub timeouts: u64,
    pub total_execution_time_ms: u64,
    pub total_cpu_time_ms: u64,
    pub peak_memory_mb: u64,
    pub total_network_bytes: u64,
    pub total_disk_bytes: u64,
    pub total_battery_consumption: f64,
}

impl ResourceUsage {
    pub fn new(environment_id: impl Into<String>) -> Self {
        Self {
            environment_id: environment_id.into(),
            ..Default::default()
        }
    }

    pub fn record(&mut self, metrics: &ExecutionMetrics, state: &SandboxState) {
        self.executions += 1;
        match state {
            SandboxState::Failed { .. } => self.failures += 1,
            SandboxState::TimedOut { .. } => self.timeouts += 1,
            _ => {}
        }
        self.total_execution_time_ms += metrics.execution_time_ms;
        self.total_cpu_time_ms += metrics.cpu_time_ms;
        self.peak_memory_mb = self.peak_memory_mb.max(metrics.memory_mb);
        self.total_network_bytes += metrics.network_bytes;
        self.total_disk_bytes += metrics.disk_bytes;
        self.total_battery_consumption += metrics.battery_consumption;
    }

    pub fn average_execution_time_ms(&self) -> f64 {
        if self.executions == 0 {
            0.0
        } else {
            self.total_execution_time_ms as f64 / self.executions as f64
        }
    }
}

/// Point-in-time usage of every environment, keyed by environment id.
pub type UsageSnapshot = HashMap<String, ResourceUsage>;

fn current_timestamp() -> u64 {
    chrono::Utc::now().timestamp_millis().max(0) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let mut exec = SandboxExecution::new("call-1", "env-web");
        assert_eq!(exec.state, SandboxState::Created);

        exec.mark_validated();
        exec.mark_dispatched();
        assert_eq!(exec.state.name(), "dispatched");

        exec.mark_completed();
        assert!(exec.is_terminal());
        assert_eq!(exec.state.name(), "completed");
    }

    #[test]
    fn test_rejected_before_dispatch() {
        let mut exec = SandboxExecution::new("call-1", "env-web");
        exec.mark_failed("policy 'deny-all'");
        assert!(matches!(exec.state, SandboxState::Failed { ref reason } if reason.contains("deny-all")));
    }

    #[test]
    fn test_cannot_skip_validation() {
        let mut exec = SandboxExecution::new("call-1", "env-web");
        exec.mark_dispatched();
        assert_eq!(exec.state, SandboxState::Created);
    }

    #[test]
    fn test_timeout_is_sticky() {
        let mut exec = SandboxExecution::new("call-1", "env-web");
        exec.mark_validated();
        exec.mark_dispatched();
        exec.mark_timed_out(500);
        exec.mark_completed();
        exec.mark_failed("late");
        assert!(matches!(exec.state, SandboxState::TimedOut { timeout_ms: 500, .. }));
    }

    #[test]
    fn test_usage_accumulates() {
        let mut usage = ResourceUsage::new("env-web");
        let metrics = ExecutionMetrics {
            execution_time_ms: 100,
            cpu_time_ms: 10,
            memory_mb: 64,
            network_bytes: 20,
            disk_bytes: 0,
            battery_consumption: 0.5,
        };
        usage.record(&metrics, &SandboxState::Completed { started_at: 0, finished_at: 100 });
        usage.record(
            &ExecutionMetrics {
                memory_mb: 32,
                execution_time_ms: 300,
                ..metrics.clone()
            },
            &SandboxState::TimedOut { started_at: 0, timeout_ms: 300 },
        );

        assert_eq!(usage.executions, 2);
        assert_eq!(usage.timeouts, 1);
        assert_eq!(usage.peak_memory_mb, 64);
        assert_eq!(usage.average_execution_time_ms(), 200.0);
        assert_eq!(usage.total_battery_consumption, 1.0);
    }
}
