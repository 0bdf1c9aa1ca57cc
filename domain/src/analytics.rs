//! Execution history records and the metrics derived from them

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::tool::value_objects::ToolResult;

/// One terminal call, as kept in the orchestrator's history ring buffer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub call_id: String,
    pub tool_id: String,
    pub server_name: Option<String>,
    pub success: bool,
    pub error_code: Option<String>,
    pub attempts: u32,
    pub execution_time_ms: u64,
    pub timestamp: DateTime<Utc>,
}

impl ExecutionRecord {
    pub fn from_result(result: &ToolResult, execution_time_ms: u64) -> Self {
        let metadata = result.metadata();
        Self {
            call_id: metadata.call_id.clone(),
            tool_id: metadata.tool_id.clone(),
            server_name: metadata.server_name.clone(),
            success: result.is_success(),
            error_code: result.error().map(|e| e.code.clone()),
            attempts: metadata.attempts,
            execution_time_ms,
            timestamp: Utc::now(),
        }
    }
}

/// Inclusive time window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Window ending now and spanning `duration`.
    pub fn last(duration: Duration) -> Self {
        let end = Utc::now();
        Self {
            start: end - duration,
            end,
        }
    }

    pub fn all_time() -> Self {
        Self {
            start: DateTime::<Utc>::MIN_UTC,
            end: DateTime::<Utc>::MAX_UTC,
        }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at <= self.end
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryMetrics {
    pub discoveries: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub last_discovery_ms: u64,
    pub total_discovery_ms: u64,
}

impl DiscoveryMetrics {
    pub fn record_hit(&mut self) {
        self.cache_hits += 1;
    }

    pub fn record_miss(&mut self, elapsed_ms: u64) {
        self.cache_misses += 1;
        self.discoveries += 1;
        self.last_discovery_ms = elapsed_ms;
        self.total_discovery_ms += elapsed_ms;
    }

    pub fn average_discovery_ms(&self) -> f64 {
        if self.discoveries == 0 {
            0.0
        } else {
            self.total_discovery_ms as f64 / self.discoveries as f64
        }
    }
}

/// Latency counters of domain loading and adaptation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdaptationMetrics {
    pub domain_loads: u64,
    pub domain_cache_hits: u64,
    pub total_load_ms: u64,
    pub adaptations: u64,
    pub total_adaptation_us: u64,
}

/// Snapshot returned by `get_performance_metrics`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub total_executions: u64,
    pub successful_executions: u64,
    pub failed_executions: u64,
    pub total_retries: u64,
    pub average_execution_time_ms: f64,
    pub success_rate: f64,
    pub tools_cached: usize,
    pub capabilities_cached: usize,
    pub servers_connected: usize,
    pub discovery: DiscoveryMetrics,
    pub adaptation: AdaptationMetrics,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolUsageStats {
    pub tool_id: String,
    pub calls: u64,
    pub successes: u64,
    pub failures: u64,
    pub average_execution_time_ms: f64,
    pub last_used: DateTime<Utc>,
}

impl ToolUsageStats {
    pub fn success_rate(&self) -> f64 {
        if self.calls == 0 {
            0.0
        } else {
            self.successes as f64 / self.calls as f64
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolUsageAnalytics {
    pub range: TimeRange,
    pub total_calls: u64,
    /// Sorted by call count, most used first (ties by tool id)
    pub tools: Vec<ToolUsageStats>,
}

impl ToolUsageAnalytics {
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a ExecutionRecord>, range: TimeRange) -> Self {
        let mut by_tool: BTreeMap<&str, (u64, u64, u64, DateTime<Utc>)> = BTreeMap::new();
        let mut total_calls = 0;

        for record in records.into_iter().filter(|r| range.contains(r.timestamp)) {
            total_calls += 1;
            let entry = by_tool
                .entry(record.tool_id.as_str())
                .or_insert((0, 0, 0, record.timestamp));
            entry.0 += 1;
            if record.success {
                entry.1 += 1;
            }
            entry.2 += record.execution_time_ms;
            entry.3 = entry.3.max(record.timestamp);
        }

        let mut tools: Vec<ToolUsageStats> = by_tool
            .into_iter()
            .map(|(tool_id, (calls, successes, total_ms, last_used))| ToolUsageStats {
                tool_id: tool_id.to_string(),
                calls,
                successes,
                failures: calls - successes,
                average_execution_time_ms: total_ms as f64 / calls as f64,
                last_used,
            })
            .collect();
        tools.sort_by(|a, b| b.calls.cmp(&a.calls).then_with(|| a.tool_id.cmp(&b.tool_id)));

        Self {
            range,
            total_calls,
            tools,
        }
    }

    pub fn tool(&self, tool_id: &str) -> Option<&ToolUsageStats> {
        self.tools.iter().find(|t| t.tool_id == tool_id)
    }
}
