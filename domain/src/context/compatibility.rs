//! Tool/domain compatibility checks
//!
//! A tool may be adapted into a target domain only if all three checks pass:
//!
//! | Check | Source | Target | Rule |
//! |-------|--------|--------|------|
//! | Category | `tool.category` | `domain.category` | target listed under source in [`CATEGORY_ADJACENCY`] |
//! | Version | `tool.version` | `domain.version` | equal majors, source ≥ target at every shared index |
//! | Security | `tool.domain.security.level` | `domain.security.level` | source ≥ target on `low < medium < high < critical` |
//!
//! Every check fails closed: an unknown category, a non-numeric version
//! component or an unknown security label makes the check fail.

use serde::{Deserialize, Serialize};

use super::entities::{DomainContext, SecurityLevel};
use crate::tool::entities::Tool;

/// Which target categories each source category may be adapted into.
///
/// The table is deliberately not symmetric: a web tool can be adapted for
/// mobile, but a mobile tool cannot be adapted for the web.
pub const CATEGORY_ADJACENCY: &[(&str, &[&str])] = &[
    ("general", &["general", "web", "mobile", "desktop", "server"]),
    ("web", &["web", "general", "mobile"]),
    ("mobile", &["mobile", "general"]),
    ("desktop", &["desktop", "general", "web"]),
    ("server", &["server", "general", "web"]),
];

pub fn categories_compatible(source: &str, target: &str) -> bool {
    CATEGORY_ADJACENCY
        .iter()
        .find(|(category, _)| *category == source)
        .is_some_and(|(_, targets)| targets.contains(&target))
}

/// Split a dotted version into numeric components.
///
/// Returns `None` if the version is empty or any component is not a number.
pub fn parse_version(version: &str) -> Option<Vec<u64>> {
    let trimmed = version.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed
        .split('.')
        .map(|part| part.parse::<u64>().ok())
        .collect()
}

pub fn versions_compatible(source: &str, target: &str) -> bool {
    let (Some(source), Some(target)) = (parse_version(source), parse_version(target)) else {
        return false;
    };
    if source[0] != target[0] {
        return false;
    }
    source.iter().zip(target.iter()).all(|(s, t)| s >= t)
}

pub fn security_compatible(source: &str, target: &str) -> bool {
    match (SecurityLevel::parse(source), SecurityLevel::parse(target)) {
        (Some(source), Some(target)) => source.index() >= target.index(),
        _ => false,
    }
}

/// Outcome of the three compatibility checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompatibilityReport {
    pub category: bool,
    pub version: bool,
    pub security: bool,
}

impl CompatibilityReport {
    pub fn check(tool: &Tool, target: &DomainContext) -> Self {
        Self {
            category: categories_compatible(&tool.category, &target.category),
            version: versions_compatible(&tool.version, &target.version),
            security: security_compatible(&tool.domain.security.level, &target.security.level),
        }
    }

    pub fn is_compatible(&self) -> bool {
        self.category && self.version && self.security
    }

    /// Names of the failed checks, for diagnostics.
    pub fn failures(&self) -> Vec<&'static str> {
        let mut failed = Vec::new();
        if !self.category {
            failed.push("category");
        }
        if !self.version {
            failed.push("version");
        }
        if !self.security {
            failed.push("security");
        }
        failed
    }
}
