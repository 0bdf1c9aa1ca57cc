//! Registry export and import
//!
//! JSON is authoritative; YAML carries the same shape; CSV is a lossy
//! one-row-per-tool view. Imports are validated as a whole before anything
//! is merged, then merged into the caches by id.

use super::{UniversalClient, write};
use crate::ports::execution_logger::ExecutionLogEntry;
use omnitool_domain::{OrchestrationError, RegistryFormat, RegistrySnapshot, UpdateEvent};
use serde::Serialize;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub tools: usize,
    pub capabilities: usize,
}

impl UniversalClient {
    pub fn export_tool_registry(&self, format: RegistryFormat) -> Result<String, OrchestrationError> {
        let snapshot = RegistrySnapshot::new(self.cached_tools(), self.capabilities());
        let encoded = match format {
            RegistryFormat::Json => serde_json::to_string_pretty(&snapshot)
                .map_err(|e| OrchestrationError::ToolRegistration(format!("JSON export failed: {}", e)))?,
            RegistryFormat::Yaml => serde_yaml::to_string(&snapshot)
                .map_err(|e| OrchestrationError::ToolRegistration(format!("YAML export failed: {}", e)))?,
            RegistryFormat::Csv => snapshot.to_csv(),
        };
        info!(
            format = %format,
            tools = snapshot.tools.len(),
            capabilities = snapshot.capabilities.len(),
            "Registry exported"
        );
        Ok(encoded)
    }

    pub fn import_tool_registry(&self, data: &str, format: RegistryFormat) -> Result<ImportSummary, OrchestrationError> {
        let snapshot: RegistrySnapshot = match format {
            RegistryFormat::Json => serde_json::from_str(data)
                .map_err(|e| OrchestrationError::ToolRegistration(format!("invalid JSON registry: {}", e)))?,
            RegistryFormat::Yaml => serde_yaml::from_str(data)
                .map_err(|e| OrchestrationError::ToolRegistration(format!("invalid YAML registry: {}", e)))?,
            RegistryFormat::Csv => RegistrySnapshot::from_csv(data)?,
        };
        snapshot.validate()?;

        let summary = ImportSummary {
            tools: snapshot.tools.len(),
            capabilities: snapshot.capabilities.len(),
        };
        {
            let mut tools = write(&self.tools);
            for tool in snapshot.tools {
                tools.insert(tool.id.clone(), tool);
            }
        }
        {
            let mut capabilities = write(&self.capabilities);
            for capability in snapshot.capabilities {
                capabilities.insert(capability.id.clone(), capability);
            }
        }

        info!(format = %format, tools = summary.tools, capabilities = summary.capabilities, "Registry imported");
        self.logger.record(&ExecutionLogEntry::RegistryImported {
            format,
            tools: summary.tools,
            capabilities: summary.capabilities,
        });
        self.publish(UpdateEvent::RegistryImported {
            tools: summary.tools,
            capabilities: summary.capabilities,
        });
        Ok(summary)
    }
}
