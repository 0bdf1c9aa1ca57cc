//! Domain contexts and tool adaptation
//!
//! - [`entities`]: [`DomainContext`], [`DomainConstraints`], [`DomainBundle`]
//! - [`compatibility`]: category, version and security checks
//! - [`adaptation`]: data-driven [`AdaptationRule`]s and [`adapt_tool`]

pub mod adaptation;
pub mod compatibility;
pub mod entities;

pub use adaptation::{AdaptationRule, RuleAction, RuleCondition, adapt_tool, default_rules_for};
pub use compatibility::CompatibilityReport;
pub use entities::{
    DomainBundle, DomainConstraints, DomainContext, MobileContext, PerformanceContext,
    SecurityContext, SecurityLevel,
};
