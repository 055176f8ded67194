//! Tool System - Capabilities the model can request mid-turn
//!
//! Information Hiding:
//! - Tool execution details hidden behind trait
//! - Tool parameters and schemas hidden in implementations
//! - Registry implementation details hidden from consumers
//! - Failures are reported as result payloads, never as faults

pub mod lookup;
pub mod registry;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;

pub use lookup::{InventoryLookupTool, LOOKUP_TOOL_NAME};
pub use registry::ToolRegistry;

/// Tool parameter schema definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolParameter {
    pub name: String,
    pub param_type: String,
    pub description: String,
    pub required: bool,
}

/// Tool metadata - describes what the tool does and how to use it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolMetadata {
    pub name: String,
    pub description: String,
    pub parameters: Vec<ToolParameter>,
}

impl ToolMetadata {
    /// JSON schema of the arguments object, as function calling expects it
    pub fn parameters_schema(&self) -> Value {
        let mut properties = Map::new();
        for param in &self.parameters {
            properties.insert(
                param.name.clone(),
                json!({
                    "type": param.param_type,
                    "description": param.description,
                }),
            );
        }

        let required: Vec<&str> = self
            .parameters
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

impl fmt::Display for ToolMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.description)
    }
}

/// Result of a tool execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub success: bool,
    pub output: Value,
}

impl ToolResult {
    pub fn success(output: Value) -> Self {
        Self {
            success: true,
            output,
        }
    }

    pub fn failure(output: Value) -> Self {
        Self {
            success: false,
            output,
        }
    }

    /// Text placed in the tool-result message
    pub fn to_content(&self) -> String {
        self.output.to_string()
    }
}

/// Tool trait - All tools must implement this
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get tool metadata (name, description, parameters)
    fn metadata(&self) -> ToolMetadata;

    /// Execute the tool with given arguments
    async fn execute(&self, args: Value) -> Result<ToolResult>;

    /// Validate arguments before execution (optional)
    fn validate(&self, _args: &Value) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameters_schema() {
        let metadata = ToolMetadata {
            name: "lookup".to_string(),
            description: "Find items".to_string(),
            parameters: vec![
                ToolParameter {
                    name: "query".to_string(),
                    param_type: "string".to_string(),
                    description: "What to look for".to_string(),
                    required: true,
                },
                ToolParameter {
                    name: "n".to_string(),
                    param_type: "integer".to_string(),
                    description: "How many".to_string(),
                    required: false,
                },
            ],
        };

        let schema = metadata.parameters_schema();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"]["n"]["type"], "integer");
        assert_eq!(schema["required"], json!(["query"]));
        assert_eq!(metadata.to_string(), "lookup: Find items");
    }
}
