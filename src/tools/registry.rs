//! Tool Registry
//!
//! Information Hiding:
//! - Tool storage and lookup implementation hidden
//! - Dispatch of model tool calls, including unknown names, kept in one place

use super::{Tool, ToolMetadata, ToolResult};
use crate::core::ToolCall;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;

/// Tool registry for managing available tools
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a new tool
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.metadata().name.clone();
        tracing::info!("Registering tool: {}", name);
        self.tools.insert(name, tool);
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Check if a tool exists
    pub fn has_tool(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Get all tool names
    pub fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// Get all tool metadata
    pub fn list_tools(&self) -> Vec<ToolMetadata> {
        let mut tools: Vec<ToolMetadata> = self.tools.values().map(|tool| tool.metadata()).collect();
        tools.sort_by(|a, b| a.name.cmp(&b.name));
        tools
    }

    /// Run one model tool call; every outcome becomes a `ToolResult`
    pub async fn execute_call(&self, call: &ToolCall) -> ToolResult {
        let Some(tool) = self.get(&call.name) else {
            tracing::warn!("Model requested unknown tool '{}'", call.name);
            return ToolResult::failure(json!({
                "error": format!("Unknown tool '{}'", call.name),
                "available": self.tool_names(),
            }));
        };

        match tool.execute(call.arguments.clone()).await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!("Tool '{}' failed: {:#}", call.name, e);
                ToolResult::failure(json!({
                    "error": "Tool execution failed",
                    "details": e.to_string(),
                }))
            }
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
