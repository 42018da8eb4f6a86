//! Tool Registry — stores and retrieves tool definitions

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    pub name: String,
    pub namespace: String,
    pub description: String,
    pub input_schema: Value,
    pub risk_level: RiskLevel,
    /// Refused unless the call carries `confirm_deletion: true`.
    pub requires_confirmation: bool,
}

/// In-memory tool registry, kept in registration order
pub struct Registry {
    tools: IndexMap<String, ToolDefinition>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            tools: IndexMap::new(),
        }
    }

    /// Registry holding every built-in tool.
    pub fn builtin() -> Self {
        let mut reg = Self::new();
        crate::system::register_connection_tool(&mut reg);
        crate::app::register_tools(&mut reg);
        crate::fs::register_tools(&mut reg);
        crate::zfs::register_tools(&mut reg);
        crate::system::register_tools(&mut reg);
        reg
    }

    /// Register a tool definition
    pub fn register_tool(&mut self, tool: ToolDefinition) {
        info!("Registered tool: {} (ns: {})", tool.name, tool.namespace);
        self.tools.insert(tool.name.clone(), tool);
    }

    /// Get a tool by name
    pub fn get_tool(&self, name: &str) -> Option<&ToolDefinition> {
        self.tools.get(name)
    }

    /// List tools, optionally filtered by namespace
    pub fn list_tools(&self, namespace: &str) -> Vec<&ToolDefinition> {
        self.tools
            .values()
            .filter(|t| namespace.is_empty() || t.namespace == namespace)
            .collect()
    }

    /// Get total tool count
    pub fn tool_count(&self) -> usize {
        self.tools.len()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

/// Helper to create a ToolDefinition
pub fn make_tool(
    name: &str,
    namespace: &str,
    description: &str,
    input_schema: Value,
    risk_level: RiskLevel,
) -> ToolDefinition {
    ToolDefinition {
        name: name.to_string(),
        namespace: namespace.to_string(),
        description: description.to_string(),
        input_schema,
        risk_level,
        requires_confirmation: risk_level == RiskLevel::Critical,
    }
}
