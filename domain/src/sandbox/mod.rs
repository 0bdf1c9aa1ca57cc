//! Sandbox model: environments, policies and the execution state machine

pub mod environment;
pub mod execution;
pub mod policy;

pub use environment::{ExecutionEnvironment, IsolationLevel, NetworkConfig, ResourceLimits};
pub use execution::{ResourceUsage, SandboxExecution, SandboxState, UsageSnapshot};
pub use policy::{
    EnforcementLevel, PolicyDecision, PolicyOutcome, PolicySubject, PolicyType, SecurityPolicy,
    evaluate_policies,
};
