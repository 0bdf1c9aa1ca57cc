//! Domain layer for omnitool
//!
//! Pure data model and rules of the tool orchestration runtime. No I/O, no
//! async, no logging: everything here is deterministic and unit tested in
//! place.
//!
//! # Core Concepts
//!
//! ## Tools and calls
//!
//! - [`Tool`]: an invocable capability exposed by a tool server
//! - [`ToolCall`] → [`ToolResult`]: exactly one `Success` or `Failure` per call
//!
//! ## Domains
//!
//! A [`DomainContext`] describes an execution domain (web, mobile, ...).
//! Tools move between domains through compatibility checks and
//! data-driven [`AdaptationRule`]s.
//!
//! ## Sandbox
//!
//! An [`ExecutionEnvironment`] bounds a call with [`ResourceLimits`] and
//! [`SecurityPolicy`]s; [`SandboxExecution`] tracks its lifecycle.

pub mod analytics;
pub mod context;
pub mod core;
pub mod event;
pub mod registry;
pub mod sandbox;
pub mod tool;

// Re-export commonly used types
pub use analytics::{
    AdaptationMetrics, DiscoveryMetrics, ExecutionRecord, PerformanceMetrics, TimeRange,
    ToolUsageAnalytics, ToolUsageStats,
};
pub use context::{
    AdaptationRule, CompatibilityReport, DomainBundle, DomainConstraints, DomainContext,
    MobileContext, PerformanceContext, RuleAction, RuleCondition, SecurityContext, SecurityLevel,
    adapt_tool, default_rules_for,
};
pub use core::error::{ErrorType, OrchestrationError, ResourceKind};
pub use event::{SubscriptionId, UpdateEvent};
pub use registry::{RegistryFormat, RegistrySnapshot};
pub use sandbox::{
    EnforcementLevel, ExecutionEnvironment, IsolationLevel, NetworkConfig, PolicyDecision,
    PolicyOutcome, PolicySubject, PolicyType, ResourceLimits, ResourceUsage, SandboxExecution,
    SandboxState, SecurityPolicy, UsageSnapshot, evaluate_policies,
};
pub use tool::{
    call::{DeviceInfo, DeviceType, NetworkInfo, NetworkType},
    entities::{
        BatteryImpact, FieldType, MobileProfile, PerformanceProfile, SchemaField,
        SecurityRequirements,
    },
    value_objects::{ExecutionMetrics, ResultMetadata, codes},
    DefaultToolValidator, ExecutionContext, Tool, ToolCall, ToolCapability, ToolError,
    ToolResult, ToolSchema, ToolValidator,
};
