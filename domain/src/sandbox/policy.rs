//! Security policies and their evaluation
//!
//! A [`SecurityPolicy`] is a named rule map with a [`PolicyType`] deciding
//! what a rule violation means:
//!
//! | Type | Pre-dispatch outcome |
//! |------|----------------------|
//! | `enforcement` | deny on any violated rule |
//! | `block` | always deny |
//! | `warning` | never deny; violations become result warnings |
//! | `advisory` | never deny; violations are reported for logging only |
//! | `terminate` | never deny; `max_execution_time_ms` arms a runtime kill deadline |
//!
//! Evaluation is pure: it takes a [`PolicySubject`] (what the call would do)
//! and returns a [`PolicyOutcome`].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use crate::tool::call::ToolCall;
use crate::tool::entities::Tool;

/// Rule keys understood by the evaluator
pub mod rules {
    pub const MAX_MEMORY_MB: &str = "max_memory_mb";
    pub const MAX_CPU_PERCENT: &str = "max_cpu_percent";
    pub const MAX_EXECUTION_TIME_MS: &str = "max_execution_time_ms";
    pub const MAX_BANDWIDTH_KBPS: &str = "max_bandwidth_kbps";
    pub const ALLOWED_PATHS: &str = "allowed_paths";
    pub const DENIED_PATHS: &str = "denied_paths";
    pub const ALLOWED_DOMAINS: &str = "allowed_domains";
    pub const BLOCKED_DOMAINS: &str = "blocked_domains";
    pub const NETWORK_ENABLED: &str = "network_enabled";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyType {
    Enforcement,
    Advisory,
    Warning,
    Block,
    Terminate,
}

impl PolicyType {
    pub fn as_str(&self) -> &str {
        match self {
            PolicyType::Enforcement => "enforcement",
            PolicyType::Advisory => "advisory",
            PolicyType::Warning => "warning",
            PolicyType::Block => "block",
            PolicyType::Terminate => "terminate",
        }
    }
}

/// How unknown rule keys are treated.
///
/// `Strict` counts them as violations, `Standard` ignores them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnforcementLevel {
    #[default]
    Standard,
    Strict,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityPolicy {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub policy_type: PolicyType,
    #[serde(default)]
    pub rules: BTreeMap<String, Value>,
    #[serde(default)]
    pub enforcement: EnforcementLevel,
}

impl SecurityPolicy {
    pub fn new(id: impl Into<String>, name: impl Into<String>, policy_type: PolicyType) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            policy_type,
            rules: BTreeMap::new(),
            enforcement: EnforcementLevel::default(),
        }
    }

    pub fn with_rule(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.rules.insert(key.into(), value.into());
        self
    }

    pub fn with_enforcement(mut self, enforcement: EnforcementLevel) -> Self {
        self.enforcement = enforcement;
        self
    }

    /// Runtime kill deadline armed by a `terminate` policy.
    pub fn termination_deadline_ms(&self) -> Option<u64> {
        if self.policy_type != PolicyType::Terminate {
            return None;
        }
        self.rules.get(rules::MAX_EXECUTION_TIME_MS).and_then(Value::as_u64)
    }

    /// Rule violations of this policy against `subject`, regardless of type.
    pub fn violations(&self, subject: &PolicySubject) -> Vec<String> {
        self.rules
            .iter()
            .filter_map(|(key, value)| check_rule(key, value, subject, self.enforcement))
            .collect()
    }

    pub fn evaluate(&self, subject: &PolicySubject) -> PolicyDecision {
        match self.policy_type {
            PolicyType::Block => PolicyDecision::Deny(format!("blocked by policy '{}'", self.id)),
            PolicyType::Terminate => PolicyDecision::Allow,
            PolicyType::Enforcement => {
                let violations = self.violations(subject);
                if violations.is_empty() {
                    PolicyDecision::Allow
                } else {
                    PolicyDecision::Deny(format!("policy '{}': {}", self.id, violations.join("; ")))
                }
            }
            PolicyType::Warning => non_blocking(self.violations(subject), PolicyDecision::Warn),
            PolicyType::Advisory => non_blocking(self.violations(subject), PolicyDecision::Advise),
        }
    }
}

fn non_blocking(violations: Vec<String>, wrap: fn(Vec<String>) -> PolicyDecision) -> PolicyDecision {
    if violations.is_empty() {
        PolicyDecision::Allow
    } else {
        wrap(violations)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PolicyDecision {
    Allow,
    Advise(Vec<String>),
    Warn(Vec<String>),
    Deny(String),
}

/// What a call would do inside an environment, as seen by policy rules.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PolicySubject {
    pub timeout_ms: u64,
    pub memory_mb: u64,
    pub cpu_percent: u32,
    pub bandwidth_kbps: u64,
    pub paths: Vec<String>,
    pub hosts: Vec<String>,
}

impl PolicySubject {
    /// Build the subject from the call parameters and the tool's profile.
    ///
    /// Path parameters are keys named `path`, `file`, `working_dir` or ending
    /// in `_path` / `_dir`. They are recorded absolute and normalized, with
    /// relative paths resolved against `base_dir` (the directory the tool
    /// resolves them against).
    /// URL parameters are keys named `url`, ending in `_url`, or any string
    /// value starting with `http://` / `https://`.
    pub fn from_call(call: &ToolCall, tool: &Tool, base_dir: &Path) -> Self {
        let mut paths = Vec::new();
        let mut hosts = Vec::new();

        for (key, value) in &call.parameters {
            let Some(text) = value.as_str() else {
                continue;
            };
            if is_path_key(key) {
                paths.push(resolve_path(text, base_dir));
            }
            let looks_like_url = text.starts_with("http://") || text.starts_with("https://");
            if (key == "url" || key.ends_with("_url") || looks_like_url)
                && let Some(host) = extract_host(text)
            {
                hosts.push(host);
            }
        }
        paths.sort();
        hosts.sort();

        Self {
            timeout_ms: call.timeout_ms,
            memory_mb: tool.performance.memory_usage_mb,
            cpu_percent: tool.performance.cpu_usage_percent,
            bandwidth_kbps: tool.performance.network_kbps,
            paths,
            hosts,
        }
    }

    pub fn uses_network(&self) -> bool {
        !self.hosts.is_empty()
    }
}

/// Combined result of evaluating every policy of an environment
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PolicyOutcome {
    /// First denying policy, if any
    pub denied: Option<String>,
    pub warnings: Vec<String>,
    pub advisories: Vec<String>,
    /// Earliest kill deadline armed by `terminate` policies
    pub termination_deadline_ms: Option<u64>,
}

impl PolicyOutcome {
    pub fn is_denied(&self) -> bool {
        self.denied.is_some()
    }
}

/// Evaluate policies in order, stopping at the first denial.
pub fn evaluate_policies(policies: &[SecurityPolicy], subject: &PolicySubject) -> PolicyOutcome {
    let mut outcome = PolicyOutcome::default();

    for policy in policies {
        if let Some(deadline) = policy.termination_deadline_ms() {
            outcome.termination_deadline_ms = Some(
                outcome
                    .termination_deadline_ms
                    .map_or(deadline, |current| current.min(deadline)),
            );
        }
        match policy.evaluate(subject) {
            PolicyDecision::Allow => {}
            PolicyDecision::Advise(found) => outcome.advisories.extend(found),
            PolicyDecision::Warn(found) => outcome.warnings.extend(found),
            PolicyDecision::Deny(reason) => {
                outcome.denied = Some(reason);
                return outcome;
            }
        }
    }
    outcome
}

fn check_rule(
    key: &str,
    value: &Value,
    subject: &PolicySubject,
    enforcement: EnforcementLevel,
) -> Option<String> {
    match key {
        rules::MAX_MEMORY_MB => exceeds(key, subject.memory_mb, value),
        rules::MAX_CPU_PERCENT => exceeds(key, u64::from(subject.cpu_percent), value),
        rules::MAX_EXECUTION_TIME_MS => exceeds(key, subject.timeout_ms, value),
        rules::MAX_BANDWIDTH_KBPS => exceeds(key, subject.bandwidth_kbps, value),
        rules::ALLOWED_PATHS => {
            let allowed = string_list(value);
            if allowed.is_empty() {
                return None;
            }
            subject
                .paths
                .iter()
                .find(|p| !allowed.iter().any(|prefix| path_within(p, prefix)))
                .map(|p| format!("path '{}' is outside the allowed paths", p))
        }
        rules::DENIED_PATHS => {
            let denied = string_list(value);
            subject
                .paths
                .iter()
                .find(|p| denied.iter().any(|prefix| path_within(p, prefix)))
                .map(|p| format!("path '{}' is denied", p))
        }
        rules::ALLOWED_DOMAINS => {
            let allowed = string_list(value);
            if allowed.is_empty() {
                return None;
            }
            subject
                .hosts
                .iter()
                .find(|h| !allowed.iter().any(|d| host_matches(h, d)))
                .map(|h| format!("host '{}' is not in the allowed domains", h))
        }
        rules::BLOCKED_DOMAINS => {
            let blocked = string_list(value);
            subject
                .hosts
                .iter()
                .find(|h| blocked.iter().any(|d| host_matches(h, d)))
                .map(|h| format!("host '{}' is blocked", h))
        }
        rules::NETWORK_ENABLED => match value.as_bool() {
            Some(false) if subject.uses_network() => Some("network access is disabled".to_string()),
            _ => None,
        },
        _ if enforcement == EnforcementLevel::Strict => Some(format!("unknown rule '{}'", key)),
        _ => None,
    }
}

fn exceeds(key: &str, actual: u64, limit: &Value) -> Option<String> {
    let limit = limit.as_u64()?;
    (actual > limit).then(|| format!("{} exceeded: {} > {}", key, actual, limit))
}

fn string_list(value: &Value) -> Vec<&str> {
    match value {
        Value::String(s) => vec![s.as_str()],
        Value::Array(items) => items.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    }
}

fn is_path_key(key: &str) -> bool {
    matches!(key, "path" | "file" | "working_dir") || key.ends_with("_path") || key.ends_with("_dir")
}

/// Absolute, lexically normalized form of `path`.
///
/// Relative paths are joined onto `base_dir` first; `..` never climbs above `/`.
pub fn resolve_path(path: &str, base_dir: &Path) -> String {
    let absolute = Path::new("/").join(base_dir).join(path);
    normalize(&absolute).to_string_lossy().into_owned()
}

/// Lexically normalize a path, resolving `.` and `..` without touching the filesystem.
fn normalize(path: impl AsRef<Path>) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.as_ref().components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Component-wise prefix match (`/etc/shadow` does not cover `/etc/shadowed`).
pub fn path_within(path: &str, prefix: &str) -> bool {
    normalize(path).starts_with(normalize(prefix))
}

/// `host` equals `domain` or is a subdomain of it.
pub fn host_matches(host: &str, domain: &str) -> bool {
    let host = host.trim_end_matches('.').to_ascii_lowercase();
    let domain = domain.trim_start_matches("*.").trim_end_matches('.').to_ascii_lowercase();
    host == domain || host.ends_with(&format!(".{}", domain))
}

/// Host part of a URL-ish string (`https://user@api.example.com:8443/x` → `api.example.com`).
pub fn extract_host(url: &str) -> Option<String> {
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    let authority = rest.split(['/', '?', '#']).next()?;
    let host_port = authority.rsplit_once('@').map_or(authority, |(_, h)| h);
    let host = match host_port.rsplit_once(':') {
        Some((host, port)) if port.chars().all(|c| c.is_ascii_digit()) => host,
        _ => host_port,
    };
    if host.is_empty() {
        None
    } else {
        Some(host.to_ascii_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn subject() -> PolicySubject {
        PolicySubject {
            timeout_ms: 5_000,
            memory_mb: 64,
            cpu_percent: 10,
            bandwidth_kbps: 100,
            paths: vec!["/tmp/work/a.txt".to_string()],
            hosts: vec!["api.example.com".to_string()],
        }
    }

    #[test]
    fn test_block_denies_regardless_of_rules() {
        let policy = SecurityPolicy::new("deny-all", "Deny all", PolicyType::Block);
        assert!(matches!(policy.evaluate(&subject()), PolicyDecision::Deny(_)));

        let permissive = policy.with_rule(rules::MAX_MEMORY_MB, 1_000_000);
        assert!(matches!(permissive.evaluate(&subject()), PolicyDecision::Deny(_)));
    }

    #[test]
    fn test_enforcement_numeric_rules() {
        let ok = SecurityPolicy::new("r", "r", PolicyType::Enforcement)
            .with_rule(rules::MAX_MEMORY_MB, 128)
            .with_rule(rules::MAX_EXECUTION_TIME_MS, 10_000);
        assert_eq!(ok.evaluate(&subject()), PolicyDecision::Allow);

        let tight = SecurityPolicy::new("r", "r", PolicyType::Enforcement).with_rule(rules::MAX_MEMORY_MB, 32);
        match tight.evaluate(&subject()) {
            PolicyDecision::Deny(reason) => assert!(reason.contains("max_memory_mb")),
            other => panic!("expected deny, got {:?}", other),
        }
    }

    #[test]
    fn test_path_rules() {
        let denied = SecurityPolicy::new("fs", "fs", PolicyType::Enforcement)
            .with_rule(rules::DENIED_PATHS, json!(["/tmp/work"]));
        assert!(matches!(denied.evaluate(&subject()), PolicyDecision::Deny(_)));

        let allowed = SecurityPolicy::new("fs", "fs", PolicyType::Enforcement)
            .with_rule(rules::ALLOWED_PATHS, json!(["/tmp"]));
        assert_eq!(allowed.evaluate(&subject()), PolicyDecision::Allow);

        let mut escaping = subject();
        escaping.paths = vec!["/tmp/../etc/passwd".to_string()];
        assert!(matches!(allowed.evaluate(&escaping), PolicyDecision::Deny(_)));
    }

    #[test]
    fn test_path_within_is_component_wise() {
        assert!(path_within("/etc/shadow", "/etc/shadow"));
        assert!(path_within("/proc/1/status", "/proc"));
        assert!(!path_within("/etc/shadowed", "/etc/shadow"));
    }

    #[test]
    fn test_domain_rules() {
        let blocked = SecurityPolicy::new("net", "net", PolicyType::Enforcement)
            .with_rule(rules::BLOCKED_DOMAINS, json!(["example.com"]));
        assert!(matches!(blocked.evaluate(&subject()), PolicyDecision::Deny(_)));

        let allowed = SecurityPolicy::new("net", "net", PolicyType::Enforcement)
            .with_rule(rules::ALLOWED_DOMAINS, json!(["other.org"]));
        assert!(matches!(allowed.evaluate(&subject()), PolicyDecision::Deny(_)));

        let offline = SecurityPolicy::new("net", "net", PolicyType::Enforcement)
            .with_rule(rules::NETWORK_ENABLED, false);
        assert!(matches!(offline.evaluate(&subject()), PolicyDecision::Deny(_)));
    }

    #[test]
    fn test_host_helpers() {
        assert_eq!(
            extract_host("https://user@API.example.com:8443/v1?q=1").as_deref(),
            Some("api.example.com")
        );
        assert_eq!(extract_host("https:///nohost"), None);
        assert!(host_matches("api.example.com", "example.com"));
        assert!(!host_matches("badexample.com", "example.com"));
    }

    #[test]
    fn test_warning_and_advisory_never_deny() {
        let warn = SecurityPolicy::new("w", "w", PolicyType::Warning).with_rule(rules::MAX_MEMORY_MB, 1);
        assert!(matches!(warn.evaluate(&subject()), PolicyDecision::Warn(v) if v.len() == 1));

        let advise = SecurityPolicy::new("a", "a", PolicyType::Advisory).with_rule(rules::MAX_MEMORY_MB, 1);
        assert!(matches!(advise.evaluate(&subject()), PolicyDecision::Advise(_)));
    }

    #[test]
    fn test_terminate_arms_deadline_without_denying() {
        let policies = vec![
            SecurityPolicy::new("t1", "t1", PolicyType::Terminate).with_rule(rules::MAX_EXECUTION_TIME_MS, 2_000),
            SecurityPolicy::new("t2", "t2", PolicyType::Terminate).with_rule(rules::MAX_EXECUTION_TIME_MS, 500),
        ];
        let outcome = evaluate_policies(&policies, &subject());
        assert!(!outcome.is_denied());
        assert_eq!(outcome.termination_deadline_ms, Some(500));
    }

    #[test]
    fn test_strict_enforcement_rejects_unknown_rules() {
        let standard = SecurityPolicy::new("s", "s", PolicyType::Enforcement).with_rule("max_gpu", 1);
        assert_eq!(standard.evaluate(&subject()), PolicyDecision::Allow);

        let strict = standard.with_enforcement(EnforcementLevel::Strict);
        assert!(matches!(strict.evaluate(&subject()), PolicyDecision::Deny(_)));
    }

    #[test]
    fn test_subject_from_call_params() {
        let call = ToolCall::new("fetch")
            .with_timeout_ms(1_000)
            .with_param("url", "https://api.example.com/v1")
            .with_param("callback", "http://hooks.internal:8080/x")
            .with_param("output_path", "/tmp/out.json")
            .with_param("count", 3);
        let tool = Tool::new("fetch", "fetch");

        let subject = PolicySubject::from_call(&call, &tool, Path::new("/srv"));
        assert_eq!(subject.timeout_ms, 1_000);
        assert_eq!(subject.hosts, vec!["api.example.com", "hooks.internal"]);
        assert_eq!(subject.paths, vec!["/tmp/out.json"]);
        assert_eq!(subject.memory_mb, tool.performance.memory_usage_mb);
    }

    #[test]
    fn test_relative_paths_resolve_against_base_dir() {
        assert_eq!(resolve_path("data/a.txt", Path::new("/srv/app")), "/srv/app/data/a.txt");
        assert_eq!(resolve_path("../../../../../etc/shadow", Path::new("/srv/app")), "/etc/shadow");
        assert_eq!(resolve_path("/tmp/./x/../y", Path::new("/srv/app")), "/tmp/y");
    }

    #[test]
    fn test_parent_segments_cannot_escape_denied_paths() {
        let filesystem = SecurityPolicy::new("fs", "fs", PolicyType::Enforcement)
            .with_rule(rules::DENIED_PATHS, json!(["/etc/shadow"]));
        let tool = Tool::new("read", "read");

        let call = ToolCall::new("read").with_param("path", "../../../../../../../../etc/shadow");
        let subject = PolicySubject::from_call(&call, &tool, Path::new("/home/user/project"));
        assert_eq!(subject.paths, vec!["/etc/shadow"]);
        assert!(matches!(filesystem.evaluate(&subject), PolicyDecision::Deny(_)));

        let sandboxed = SecurityPolicy::new("fs", "fs", PolicyType::Enforcement)
            .with_rule(rules::ALLOWED_PATHS, json!(["/home/user/project"]));
        let call = ToolCall::new("read").with_param("path", "src/main.rs");
        let subject = PolicySubject::from_call(&call, &tool, Path::new("/home/user/project"));
        assert_eq!(sandboxed.evaluate(&subject), PolicyDecision::Allow);
    }

    #[test]
    fn test_working_dir_is_a_path_parameter() {
        let filesystem = SecurityPolicy::new("fs", "fs", PolicyType::Enforcement)
            .with_rule(rules::DENIED_PATHS, json!(["/proc"]));
        let call = ToolCall::new("run_command")
            .with_param("command", "cat status")
            .with_param("working_dir", "/proc/1")
            .with_param("cache_dir", "cache");
        let subject = PolicySubject::from_call(&call, &Tool::new("run_command", "run_command"), Path::new("/srv"));

        assert_eq!(subject.paths, vec!["/proc/1", "/srv/cache"]);
        assert!(matches!(filesystem.evaluate(&subject), PolicyDecision::Deny(_)));
    }

    #[test]
    fn test_evaluate_stops_at_first_denial() {
        let policies = vec![
            SecurityPolicy::new("w", "w", PolicyType::Warning).with_rule(rules::MAX_MEMORY_MB, 1),
            SecurityPolicy::new("b", "b", PolicyType::Block),
            SecurityPolicy::new("w2", "w2", PolicyType::Warning).with_rule(rules::MAX_CPU_PERCENT, 1),
        ];
        let outcome = evaluate_policies(&policies, &subject());
        assert!(outcome.denied.as_deref().is_some_and(|r| r.contains("'b'")));
        assert_eq!(outcome.warnings.len(), 1);
    }
}
