//! Tool registry: the operation surface consumed by the dispatch layer.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use crate::applescript::OutlookAutomation;
use crate::attachments::AttachmentPolicy;

pub mod calendar;
pub mod contacts;
pub mod mail;

/// Definition surfaced to the dispatch layer for introspection.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// Trait for executing tools
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    async fn execute(&self, tool_name: &str, input: Value) -> Result<String>;
    fn list_tools(&self) -> Vec<ToolDefinition>;
}

/// Individual tool handler
#[async_trait]
pub trait ToolHandler: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn input_schema(&self) -> Value;
    async fn execute(&self, input: Value) -> Result<String>;
}

/// Registry of available tools
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn ToolHandler>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool handler
    pub fn register(&mut self, handler: Arc<dyn ToolHandler>) {
        let name = handler.name().to_string();
        debug!("Registering tool: {}", name);
        self.tools.insert(name, handler);
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn ToolHandler>> {
        self.tools.get(name).cloned()
    }

    /// Number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if registry is empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolExecutor for ToolRegistry {
    async fn execute(&self, tool_name: &str, input: Value) -> Result<String> {
        debug!("Executing tool: {} with input: {:?}", tool_name, input);

        let handler = self
            .tools
            .get(tool_name)
            .ok_or_else(|| anyhow!("Unknown tool: {}", tool_name))?;

        match handler.execute(input).await {
            Ok(result) => {
                debug!("Tool {} succeeded", tool_name);
                Ok(result)
            }
            Err(e) => {
                warn!("Tool {} failed: {}", tool_name, e);
                Err(e)
            }
        }
    }

    fn list_tools(&self) -> Vec<ToolDefinition> {
        self.tools
            .values()
            .map(|handler| ToolDefinition {
                name: handler.name().to_string(),
                description: handler.description().to_string(),
                input_schema: handler.input_schema(),
            })
            .collect()
    }
}

/// Helper function to create a JSON schema for tool input
pub fn json_schema(properties: Value, required: Vec<&str>) -> Value {
    serde_json::json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

/// Build the full Outlook tool set over one automation runner.
pub fn outlook_tools(
    runner: Arc<dyn OutlookAutomation>,
    policy: AttachmentPolicy,
) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(mail::UnreadEmailsTool::new(runner.clone())));
    registry.register(Arc::new(mail::ReadEmailsTool::new(runner.clone())));
    registry.register(Arc::new(mail::SearchEmailsTool::new(runner.clone())));
    registry.register(Arc::new(mail::SendEmailTool::new(runner.clone(), policy)));
    registry.register(Arc::new(mail::ListMailFoldersTool::new(runner.clone())));
    registry.register(Arc::new(calendar::TodaysEventsTool::new(runner.clone())));
    registry.register(Arc::new(calendar::UpcomingEventsTool::new(runner.clone())));
    registry.register(Arc::new(calendar::SearchCalendarTool::new(runner.clone())));
    registry.register(Arc::new(calendar::CreateCalendarEventTool::new(
        runner.clone(),
    )));
    registry.register(Arc::new(contacts::ListContactsTool::new(runner.clone())));
    registry.register(Arc::new(contacts::SearchContactsTool::new(runner)));
    registry
}

/// Default and ceiling for the `limit` parameter shared by the listing
/// tools. The cap is applied inside the generated script.
pub(crate) const DEFAULT_LIMIT: u64 = 10;
pub(crate) const MAX_LIMIT: u64 = 50;

pub(crate) fn limit_from(input: &Value) -> u64 {
    input
        .get("limit")
        .and_then(|v| v.as_u64())
        .unwrap_or(DEFAULT_LIMIT)
        .min(MAX_LIMIT)
}

pub(crate) fn required_str<'a>(input: &'a Value, key: &str) -> Result<&'a str> {
    input
        .get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| anyhow!("Missing '{}' parameter", key))
}
