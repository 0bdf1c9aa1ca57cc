//! Tool domain traits
//!
//! Contains pure domain logic for validating a call against the tool it
//! targets. Every check is I/O free; the orchestrator turns a failed check
//! into a `Failure` result without dispatching the call.

use std::collections::HashSet;

use super::call::ToolCall;
use super::entities::{BatteryImpact, Tool};
use super::value_objects::ToolError;
use crate::context::entities::SecurityLevel;
use crate::core::error::ErrorType;

/// Validator for tool calls
pub trait ToolValidator: Send + Sync {
    /// Validate a tool call against its tool
    fn validate(&self, call: &ToolCall, tool: &Tool) -> Result<(), ToolError>;
}

/// Default implementation of ToolValidator
///
/// Runs, in order: schema, security, resource and mobile checks. The first
/// failing check wins.
#[derive(Debug, Clone, Default)]
pub struct DefaultToolValidator;

impl ToolValidator for DefaultToolValidator {
    fn validate(&self, call: &ToolCall, tool: &Tool) -> Result<(), ToolError> {
        validate_schema(call, tool)?;
        validate_security(call, tool)?;
        validate_resources(call, tool)?;
        validate_mobile(call, tool)?;
        Ok(())
    }
}

/// Required parameters present, no unknown parameters, declared types match.
///
/// Open schemas (no fields, or `additional_properties`) accept undeclared
/// parameters; declared ones are still type checked.
pub fn validate_schema(call: &ToolCall, tool: &Tool) -> Result<(), ToolError> {
    let schema = &tool.input_schema;

    for field in schema.required_fields() {
        if !call.parameters.contains_key(&field.name) {
            return Err(ToolError::validation(
                ErrorType::ToolExecution,
                format!(
                    "Missing required parameter '{}' for tool '{}'",
                    field.name, tool.id
                ),
            ));
        }
    }

    let known: HashSet<&str> = schema.fields.iter().map(|f| f.name.as_str()).collect();
    for (name, value) in &call.parameters {
        if !schema.is_open() && !known.contains(name.as_str()) {
            return Err(ToolError::validation(
                ErrorType::ToolExecution,
                format!("Unknown parameter '{}' for tool '{}'", name, tool.id),
            ));
        }
        if let Some(field) = schema.field(name)
            && !field.field_type.matches(value)
        {
            return Err(ToolError::validation(
                ErrorType::ToolExecution,
                format!(
                    "Parameter '{}' for tool '{}' must be of type {}",
                    name,
                    tool.id,
                    field.field_type.as_str()
                ),
            ));
        }
    }

    Ok(())
}

/// Authentication, clearance and permissions.
pub fn validate_security(call: &ToolCall, tool: &Tool) -> Result<(), ToolError> {
    let requirements = &tool.security;
    let security = &call.context.security;

    if requirements.requires_authentication && call.context.user_id.is_none() {
        return Err(ToolError::validation(
            ErrorType::Authorization,
            format!("Tool '{}' requires an authenticated caller", tool.id),
        ));
    }

    let required = SecurityLevel::parse(&requirements.min_level);
    let clearance = SecurityLevel::parse(&security.clearance);
    match (required, clearance) {
        (Some(required), Some(clearance)) if clearance >= required => {}
        (Some(required), Some(clearance)) => {
            return Err(ToolError::validation(
                ErrorType::Authorization,
                format!(
                    "Caller clearance '{}' is below '{}' required by tool '{}'",
                    clearance, required, tool.id
                ),
            ));
        }
        _ => {
            return Err(ToolError::validation(
                ErrorType::Authorization,
                format!(
                    "Unknown security label (required '{}', clearance '{}')",
                    requirements.min_level, security.clearance
                ),
            ));
        }
    }

    if let Some(missing) = requirements
        .permissions
        .iter()
        .find(|p| !security.permissions.contains(p))
    {
        return Err(ToolError::validation(
            ErrorType::Authorization,
            format!("Missing permission '{}' for tool '{}'", missing, tool.id),
        ));
    }

    Ok(())
}

/// Call timeout and the tool's footprint against tool and caller limits.
pub fn validate_resources(call: &ToolCall, tool: &Tool) -> Result<(), ToolError> {
    if call.timeout_ms == 0 {
        return Err(ToolError::validation(
            ErrorType::ResourceLimit,
            "Call timeout must be greater than zero",
        ));
    }

    if call.timeout_ms > tool.timeout_ms {
        return Err(ToolError::validation(
            ErrorType::ResourceLimit,
            format!(
                "Call timeout {}ms exceeds tool '{}' timeout {}ms",
                call.timeout_ms, tool.id, tool.timeout_ms
            ),
        ));
    }

    let constraints = &call.context.constraints;
    if let Some(max) = constraints.max_execution_time_ms
        && call.timeout_ms > max
    {
        return Err(ToolError::validation(
            ErrorType::ResourceLimit,
            format!(
                "Call timeout {}ms exceeds caller limit {}ms",
                call.timeout_ms, max
            ),
        ));
    }
    if let Some(max) = constraints.max_memory_mb
        && tool.performance.memory_usage_mb > max
    {
        return Err(ToolError::validation(
            ErrorType::ResourceLimit,
            format!(
                "Tool '{}' needs {}MB, caller allows {}MB",
                tool.id, tool.performance.memory_usage_mb, max
            ),
        ));
    }

    Ok(())
}

/// Mobile support and battery budget when the caller is on a mobile device.
pub fn validate_mobile(call: &ToolCall, tool: &Tool) -> Result<(), ToolError> {
    let Some(device) = call.context.device.as_ref() else {
        return Ok(());
    };
    if !device.device_type.is_mobile() {
        return Ok(());
    }

    if !tool.mobile.supported {
        return Err(ToolError::validation(
            ErrorType::ResourceLimit,
            format!("Tool '{}' is not supported on mobile devices", tool.id),
        ));
    }

    if device.is_battery_constrained() && tool.mobile.battery_impact == BatteryImpact::High {
        return Err(ToolError::validation(
            ErrorType::ResourceLimit,
            format!(
                "Tool '{}' has high battery impact and the device is battery constrained",
                tool.id
            ),
        ));
    }

    if matches!(
        call.context.network.as_ref().map(|n| n.network_type),
        Some(crate::tool::call::NetworkType::Offline)
    ) && !tool.mobile.offline_capable
    {
        return Err(ToolError::validation(
            ErrorType::ResourceLimit,
            format!("Tool '{}' cannot run while the device is offline", tool.id),
        ));
    }

    Ok(())
}
