//! Server connections and connection selection

use crate::config::ServerConfig;
use crate::ports::tool_transport::ToolTransport;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Running statistics of one connection
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConnectionStats {
    pub calls: u64,
    pub successes: u64,
    pub total_latency_ms: u64,
}

impl ConnectionStats {
    /// Untried connections count as fully successful.
    pub fn success_rate(&self) -> f64 {
        if self.calls == 0 {
            1.0
        } else {
            self.successes as f64 / self.calls as f64
        }
    }

    pub fn average_latency_ms(&self) -> f64 {
        if self.calls == 0 {
            0.0
        } else {
            self.total_latency_ms as f64 / self.calls as f64
        }
    }

    /// `0.7 * success_rate + 0.3 / (1 + avg_latency_s)`, in `[0, 1]`.
    pub fn performance_score(&self) -> f64 {
        0.7 * self.success_rate() + 0.3 / (1.0 + self.average_latency_ms() / 1000.0)
    }

    pub fn record(&mut self, success: bool, latency_ms: u64) {
        self.calls += 1;
        if success {
            self.successes += 1;
        }
        self.total_latency_ms += latency_ms;
    }
}

#[derive(Clone)]
pub struct ServerConnection {
    pub config: ServerConfig,
    pub transport: Arc<dyn ToolTransport>,
    /// Tool ids this server declared at the last discovery
    pub declared_tools: HashSet<String>,
    pub stats: ConnectionStats,
}

impl ServerConnection {
    pub fn new(config: ServerConfig, transport: Arc<dyn ToolTransport>) -> Self {
        Self {
            config,
            transport,
            declared_tools: HashSet::new(),
            stats: ConnectionStats::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }
}

/// Pick the connection serving `tool_id` with the highest performance score.
///
/// Candidates are connections that declared the tool; if none did, the
/// connection named `fallback_server` is used. Ties go to the
/// lexicographically smallest server name.
pub fn select_connection<'a>(
    connections: &'a HashMap<String, ServerConnection>,
    tool_id: &str,
    fallback_server: &str,
) -> Option<&'a ServerConnection> {
    let best = connections
        .values()
        .filter(|c| c.declared_tools.contains(tool_id))
        .max_by(|a, b| {
            a.stats
                .performance_score()
                .total_cmp(&b.stats.performance_score())
                .then_with(|| b.name().cmp(a.name()))
        });

    best.or_else(|| connections.get(fallback_server))
}
