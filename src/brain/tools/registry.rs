//! Tool registry.

use super::error::{Result, ToolError};
use super::r#trait::{Tool, ToolResult};
use crate::brain::provider;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Name-indexed set of tools available to the agent.
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, replacing any tool with the same name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        if self.tools.insert(name.clone(), tool).is_some() {
            tracing::warn!("Tool '{}' registered twice, keeping the latest", name);
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn has_tool(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn count(&self) -> usize {
        self.tools.len()
    }

    /// Definitions for every registered tool, sorted by name.
    pub fn definitions(&self) -> Vec<provider::Tool> {
        self.tools.values().map(|t| t.definition()).collect()
    }

    pub async fn execute(&self, name: &str, input: Value) -> Result<ToolResult> {
        let tool = self
            .get(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;
        tracing::debug!("Executing tool '{}'", name);
        tool.execute(input).await
    }
}
