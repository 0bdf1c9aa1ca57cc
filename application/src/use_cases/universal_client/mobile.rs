//! Mobile optimization of discovery results and calls

use crate::config::MobileConfig;
use omnitool_domain::{Tool, ToolCall};

/// Tools visible when mobile mode is on: only those that support mobile devices.
pub fn filter_for_mobile(tools: Vec<Tool>, config: &MobileConfig) -> Vec<Tool> {
    if !config.enabled {
        return tools;
    }
    tools.into_iter().filter(|t| t.mobile.supported).collect()
}

/// Trim a call issued from a mobile or tablet device.
///
/// - timeout capped at `max_timeout_ms`
/// - retry budget capped on battery-constrained devices and metered networks
/// - `null` parameters dropped
///
/// Calls from other devices, or with mobile mode off, pass through unchanged.
pub fn optimize_call(mut call: ToolCall, config: &MobileConfig) -> ToolCall {
    if !config.enabled || !call.context.is_mobile() {
        return call;
    }

    call.timeout_ms = call.timeout_ms.min(config.max_timeout_ms);

    let context = &call.context;
    let constrained = context.device.as_ref().is_some_and(|d| d.is_battery_constrained())
        || context.network.as_ref().is_some_and(|n| n.is_metered());
    if constrained {
        call.max_retries = call.max_retries.min(config.constrained_max_retries);
    }

    if config.strip_null_params {
        call.parameters.retain(|_, value| !value.is_null());
    }
    call
}
