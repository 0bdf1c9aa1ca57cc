//! Tool registry snapshots for export and import
//!
//! JSON is the authoritative interchange format. YAML carries the same shape.
//! CSV is a lossy one-row-per-tool view: it keeps identity, category,
//! version, server, timeout and capability tags, and drops schemas,
//! profiles and capability definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::str::FromStr;

use crate::core::error::OrchestrationError;
use crate::tool::entities::{Tool, ToolCapability};

pub const REGISTRY_FORMAT_VERSION: &str = "1.0";

pub const CSV_HEADER: [&str; 8] = [
    "id",
    "name",
    "description",
    "category",
    "version",
    "server_name",
    "timeout_ms",
    "capabilities",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistryFormat {
    Json,
    Yaml,
    Csv,
}

impl RegistryFormat {
    pub fn as_str(&self) -> &str {
        match self {
            RegistryFormat::Json => "json",
            RegistryFormat::Yaml => "yaml",
            RegistryFormat::Csv => "csv",
        }
    }
}

impl std::fmt::Display for RegistryFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RegistryFormat {
    type Err = OrchestrationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(RegistryFormat::Json),
            "yaml" | "yml" => Ok(RegistryFormat::Yaml),
            "csv" => Ok(RegistryFormat::Csv),
            other => Err(OrchestrationError::Configuration(format!(
                "unsupported registry format '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    #[serde(default)]
    pub tools: Vec<Tool>,
    #[serde(default)]
    pub capabilities: Vec<ToolCapability>,
}

impl RegistrySnapshot {
    pub fn new(tools: Vec<Tool>, capabilities: Vec<ToolCapability>) -> Self {
        Self {
            version: REGISTRY_FORMAT_VERSION.to_string(),
            exported_at: Utc::now(),
            tools,
            capabilities,
        }
    }

    /// Shape checks run before anything is merged.
    pub fn validate(&self) -> Result<(), OrchestrationError> {
        let invalid = |msg: String| Err(OrchestrationError::ToolRegistration(msg));

        let major = self.version.split('.').next().unwrap_or_default();
        if major != "1" {
            return invalid(format!("unsupported registry version '{}'", self.version));
        }

        let mut seen = HashSet::new();
        for (index, tool) in self.tools.iter().enumerate() {
            if tool.id.trim().is_empty() || tool.name.trim().is_empty() {
                return invalid(format!("tool #{} has an empty id or name", index));
            }
            if !seen.insert(tool.id.as_str()) {
                return invalid(format!("duplicate tool id '{}'", tool.id));
            }
        }

        for capability in &self.capabilities {
            if capability.id.trim().is_empty() || capability.name.trim().is_empty() {
                return invalid("capability with an empty id or name".to_string());
            }
        }
        Ok(())
    }

    pub fn to_csv(&self) -> String {
        let mut out = CSV_HEADER.join(",");
        out.push('\n');
        for tool in &self.tools {
            let timeout = tool.timeout_ms.to_string();
            let capabilities = tool.capabilities.join(";");
            let row = [
                tool.id.as_str(),
                tool.name.as_str(),
                tool.description.as_str(),
                tool.category.as_str(),
                tool.version.as_str(),
                tool.server_name.as_str(),
                timeout.as_str(),
                capabilities.as_str(),
            ];
            let line: Vec<String> = row.iter().map(|f| csv_escape(f)).collect();
            out.push_str(&line.join(","));
            out.push('\n');
        }
        out
    }

    /// Best-effort CSV import. Columns are matched by header name; unknown
    /// columns are ignored and missing ones fall back to tool defaults.
    pub fn from_csv(data: &str) -> Result<Self, OrchestrationError> {
        let mut records = parse_csv(data)?.into_iter();
        let header = records
            .next()
            .ok_or_else(|| OrchestrationError::ToolRegistration("empty CSV registry".to_string()))?;

        let column = |name: &str| header.iter().position(|h| h.trim() == name);
        let (Some(id_col), Some(name_col)) = (column("id"), column("name")) else {
            return Err(OrchestrationError::ToolRegistration(
                "CSV registry needs 'id' and 'name' columns".to_string(),
            ));
        };

        let mut tools = Vec::new();
        for (line, record) in records.enumerate() {
            if record.iter().all(|f| f.trim().is_empty()) {
                continue;
            }
            let get = |col: Option<usize>| col.and_then(|c| record.get(c)).map(|s| s.trim().to_string());

            let mut tool = Tool::new(
                get(Some(id_col)).unwrap_or_default(),
                get(Some(name_col)).unwrap_or_default(),
            );
            if let Some(description) = get(column("description")) {
                tool.description = description;
            }
            if let Some(category) = get(column("category")).filter(|s| !s.is_empty()) {
                tool.category = category;
            }
            if let Some(version) = get(column("version")).filter(|s| !s.is_empty()) {
                tool.version = version;
            }
            if let Some(server) = get(column("server_name")) {
                tool.server_name = server;
            }
            if let Some(timeout) = get(column("timeout_ms")).filter(|s| !s.is_empty()) {
                tool.timeout_ms = timeout.parse().map_err(|_| {
                    OrchestrationError::ToolRegistration(format!(
                        "row {}: invalid timeout_ms '{}'",
                        line + 2,
                        timeout
                    ))
                })?;
            }
            if let Some(caps) = get(column("capabilities")) {
                tool.capabilities = caps
                    .split(';')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect();
            }
            tools.push(tool);
        }

        Ok(Self::new(tools, Vec::new()))
    }
}

fn csv_escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// RFC 4180 style reader: quoted fields may contain commas, quotes and newlines.
fn parse_csv(data: &str) -> Result<Vec<Vec<String>>, OrchestrationError> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = data.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    field.push('"');
                    chars.next();
                }
                '"' => in_quotes = false,
                _ => field.push(c),
            }
            continue;
        }
        match c {
            '"' => in_quotes = true,
            ',' => record.push(std::mem::take(&mut field)),
            '\r' => {}
            '\n' => {
                record.push(std::mem::take(&mut field));
                records.push(std::mem::take(&mut record));
            }
            _ => field.push(c),
        }
    }

    if in_quotes {
        return Err(OrchestrationError::ToolRegistration(
            "unterminated quoted field in CSV registry".to_string(),
        ));
    }
    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        records.push(record);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> RegistrySnapshot {
        RegistrySnapshot::new(
            vec![
                Tool::new("local.echo", "echo")
                    .with_description("Echo, with \"quotes\"")
                    .with_server("local")
                    .with_capability("text")
                    .with_capability("debug"),
                Tool::new("local.delay", "delay").with_category("server").with_timeout_ms(5_000),
            ],
            vec![ToolCapability::new("text", "Text processing")],
        )
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!("YAML".parse::<RegistryFormat>().unwrap(), RegistryFormat::Yaml);
        assert_eq!("yml".parse::<RegistryFormat>().unwrap(), RegistryFormat::Yaml);
        assert!("xml".parse::<RegistryFormat>().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_shapes() {
        assert!(snapshot().validate().is_ok());

        let mut dup = snapshot();
        dup.tools.push(Tool::new("local.echo", "again"));
        assert!(dup.validate().is_err());

        let mut empty = snapshot();
        empty.tools[0].name = " ".to_string();
        assert!(empty.validate().is_err());

        let mut version = snapshot();
        version.version = "2.0".to_string();
        assert!(version.validate().is_err());
    }

    #[test]
    fn test_csv_keeps_tool_identity() {
        let csv = snapshot().to_csv();
        assert!(csv.starts_with("id,name,description"));
        assert!(csv.contains("\"Echo, with \"\"quotes\"\"\""));

        let back = RegistrySnapshot::from_csv(&csv).unwrap();
        assert_eq!(back.tools.len(), 2);
        assert_eq!(back.tools[0].description, "Echo, with \"quotes\"");
        assert_eq!(back.tools[0].capabilities, vec!["text", "debug"]);
        assert_eq!(back.tools[1].category, "server");
        assert_eq!(back.tools[1].timeout_ms, 5_000);
        assert!(back.capabilities.is_empty());
    }

    #[test]
    fn test_csv_header_only_needs_id_and_name() {
        let back = RegistrySnapshot::from_csv("name,id\nEcho,local.echo\n").unwrap();
        assert_eq!(back.tools[0].id, "local.echo");
        assert_eq!(back.tools[0].category, "general");

        assert!(RegistrySnapshot::from_csv("id,label\nx,y\n").is_err());
        assert!(RegistrySnapshot::from_csv("id,name\n\"open,x\n").is_err());
    }
}
