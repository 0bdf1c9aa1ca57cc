//! Tool domain entities

use serde::{Deserialize, Serialize};

use crate::context::entities::DomainContext;

/// Default tool timeout (30 seconds)
pub const DEFAULT_TOOL_TIMEOUT_MS: u64 = 30_000;

fn default_tool_timeout_ms() -> u64 {
    DEFAULT_TOOL_TIMEOUT_MS
}

/// Value type of a schema field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    Integer,
    Boolean,
    Object,
    Array,
    #[default]
    Any,
}

impl FieldType {
    /// Whether a JSON value has this type.
    pub fn matches(&self, value: &serde_json::Value) -> bool {
        use serde_json::Value;
        match self {
            FieldType::String => value.is_string(),
            FieldType::Number => value.is_number(),
            FieldType::Integer => value.is_i64() || value.is_u64(),
            FieldType::Boolean => value.is_boolean(),
            FieldType::Object => value.is_object(),
            FieldType::Array => value.is_array(),
            FieldType::Any => !matches!(value, Value::Null),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            FieldType::String => "string",
            FieldType::Number => "number",
            FieldType::Integer => "integer",
            FieldType::Boolean => "boolean",
            FieldType::Object => "object",
            FieldType::Array => "array",
            FieldType::Any => "any",
        }
    }
}

/// One field of a tool's input or output schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaField {
    pub name: String,
    #[serde(default)]
    pub field_type: FieldType,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

impl SchemaField {
    pub fn new(name: impl Into<String>, field_type: FieldType, required: bool) -> Self {
        Self {
            name: name.into(),
            field_type,
            required,
            description: String::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Ordered set of schema fields
///
/// A schema with no fields accepts any parameters. `additional_properties`
/// keeps a schema open once fields have been declared on it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolSchema {
    #[serde(default)]
    pub fields: Vec<SchemaField>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub additional_properties: bool,
}

impl ToolSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field(mut self, field: SchemaField) -> Self {
        self.add_field(field);
        self
    }

    pub fn field(&self, name: &str) -> Option<&SchemaField> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    /// Add a field, replacing an existing field of the same name.
    pub fn add_field(&mut self, field: SchemaField) {
        match self.fields.iter_mut().find(|f| f.name == field.name) {
            Some(existing) => *existing = field,
            None => self.fields.push(field),
        }
    }

    /// Remove a field by name. Returns whether it existed.
    pub fn remove_field(&mut self, name: &str) -> bool {
        let before = self.fields.len();
        self.fields.retain(|f| f.name != name);
        self.fields.len() != before
    }

    /// Parameters not declared in `fields` are accepted.
    pub fn is_open(&self) -> bool {
        self.fields.is_empty() || self.additional_properties
    }

    pub fn required_fields(&self) -> impl Iterator<Item = &SchemaField> {
        self.fields.iter().filter(|f| f.required)
    }
}

/// Expected resource footprint of a tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceProfile {
    pub avg_execution_time_ms: u64,
    pub memory_usage_mb: u64,
    pub cpu_usage_percent: u32,
    pub network_kbps: u64,
}

impl Default for PerformanceProfile {
    fn default() -> Self {
        Self {
            avg_execution_time_ms: 1_000,
            memory_usage_mb: 64,
            cpu_usage_percent: 10,
            network_kbps: 0,
        }
    }
}

/// What a caller must hold to invoke the tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityRequirements {
    /// Minimum caller clearance (`low`..`critical`)
    pub min_level: String,
    /// Permissions the caller must have been granted
    pub permissions: Vec<String>,
    /// Caller must be identified (user id present)
    pub requires_authentication: bool,
}

impl Default for SecurityRequirements {
    fn default() -> Self {
        Self {
            min_level: "low".to_string(),
            permissions: Vec::new(),
            requires_authentication: false,
        }
    }
}

/// Battery cost class of a tool on mobile devices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BatteryImpact {
    Low,
    #[default]
    Medium,
    High,
}

/// Mobile-related flags of a tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MobileProfile {
    /// Tool has been optimized for mobile execution
    pub optimized: bool,
    /// Tool may run on mobile devices at all
    pub supported: bool,
    pub battery_impact: BatteryImpact,
    pub offline_capable: bool,
}

impl Default for MobileProfile {
    fn default() -> Self {
        Self {
            optimized: false,
            supported: true,
            battery_impact: BatteryImpact::Medium,
            offline_capable: false,
        }
    }
}

/// An invocable capability exposed by a tool server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tool {
    /// Unique id (e.g., "local.echo")
    pub id: String,
    /// Human-readable name
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Source category (`web`, `mobile`, `desktop`, `general`, ...)
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default = "default_version")]
    pub version: String,
    /// Server that declared this tool
    #[serde(default)]
    pub server_name: String,
    /// Domain the tool currently targets
    #[serde(default)]
    pub domain: DomainContext,
    #[serde(default)]
    pub input_schema: ToolSchema,
    #[serde(default)]
    pub output_schema: ToolSchema,
    #[serde(default)]
    pub performance: PerformanceProfile,
    #[serde(default)]
    pub security: SecurityRequirements,
    #[serde(default)]
    pub mobile: MobileProfile,
    #[serde(default = "default_tool_timeout_ms")]
    pub timeout_ms: u64,
    /// Capability tags used for capability lookups
    #[serde(default)]
    pub capabilities: Vec<String>,
}

fn default_category() -> String {
    "general".to_string()
}

fn default_version() -> String {
    "1.0.0".to_string()
}

impl Tool {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            category: default_category(),
            version: default_version(),
            server_name: String::new(),
            domain: DomainContext::default(),
            input_schema: ToolSchema::default(),
            output_schema: ToolSchema::default(),
            performance: PerformanceProfile::default(),
            security: SecurityRequirements::default(),
            mobile: MobileProfile::default(),
            timeout_ms: DEFAULT_TOOL_TIMEOUT_MS,
            capabilities: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_server(mut self, server_name: impl Into<String>) -> Self {
        self.server_name = server_name.into();
        self
    }

    pub fn with_domain(mut self, domain: DomainContext) -> Self {
        self.domain = domain;
        self
    }

    pub fn with_input_field(mut self, field: SchemaField) -> Self {
        self.input_schema.add_field(field);
        self
    }

    pub fn with_output_field(mut self, field: SchemaField) -> Self {
        self.output_schema.add_field(field);
        self
    }

    pub fn with_performance(mut self, performance: PerformanceProfile) -> Self {
        self.performance = performance;
        self
    }

    pub fn with_security(mut self, security: SecurityRequirements) -> Self {
        self.security = security;
        self
    }

    pub fn with_mobile(mut self, mobile: MobileProfile) -> Self {
        self.mobile = mobile;
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_capability(mut self, capability: impl Into<String>) -> Self {
        self.capabilities.push(capability.into());
        self
    }

    pub fn has_capability(&self, capability: &str) -> bool {
        self.capabilities.iter().any(|c| c == capability)
    }
}

/// A named capability grouping one or more tools
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCapability {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Tools providing this capability
    #[serde(default)]
    pub tool_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl ToolCapability {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            tool_ids: Vec::new(),
            category: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_tool(mut self, tool_id: impl Into<String>) -> Self {
        self.tool_ids.push(tool_id.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_field_type_matches() {
        assert!(FieldType::String.matches(&json!("x")));
        assert!(!FieldType::String.matches(&json!(1)));
        assert!(FieldType::Integer.matches(&json!(3)));
        assert!(!FieldType::Integer.matches(&json!(3.5)));
        assert!(FieldType::Number.matches(&json!(3.5)));
        assert!(FieldType::Any.matches(&json!({"a": 1})));
        assert!(!FieldType::Any.matches(&json!(null)));
    }

    #[test]
    fn test_schema_add_replaces_existing() {
        let mut schema = ToolSchema::new()
            .with_field(SchemaField::new("path", FieldType::String, true));
        schema.add_field(SchemaField::new("path", FieldType::Any, false));

        assert_eq!(schema.fields.len(), 1);
        assert_eq!(schema.field("path").unwrap().field_type, FieldType::Any);
        assert!(schema.remove_field("path"));
        assert!(!schema.remove_field("path"));
    }

    #[test]
    fn test_tool_builder() {
        let tool = Tool::new("local.echo", "echo")
            .with_category("web")
            .with_version("1.2.0")
            .with_timeout_ms(60_000)
            .with_capability("text")
            .with_input_field(SchemaField::new("message", FieldType::String, true));

        assert_eq!(tool.category, "web");
        assert_eq!(tool.timeout_ms, 60_000);
        assert!(tool.has_capability("text"));
        assert_eq!(tool.input_schema.required_fields().count(), 1);
    }

    #[test]
    fn test_minimal_tool_json() {
        let tool: Tool = serde_json::from_str(
            r#"{"id": "t1", "name": "Tool One", "serverName": "ignored"}"#,
        )
        .unwrap();
        assert_eq!(tool.id, "t1");
        assert_eq!(tool.category, "general");
        assert_eq!(tool.timeout_ms, DEFAULT_TOOL_TIMEOUT_MS);
        assert!(tool.mobile.supported);
    }
}
