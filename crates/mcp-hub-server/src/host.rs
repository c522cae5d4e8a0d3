// crates/mcp-hub-server/src/host.rs
// ============================================================================
// Module: Tool Host
// Description: Named handler tables that tool-calling clients invoke.
// Purpose: Provide replaceable, concurrently callable tool handlers.
// Dependencies: async-trait, mcp-hub-core, serde, serde_json
// ============================================================================

//! ## Overview
//! A [`ToolHost`] maps tool names to [`ToolHandler`] implementations plus the
//! descriptor advertised in listings. Adding a tool under an existing name
//! replaces it; removing an absent tool is not an error. Calls clone the
//! handler out of the table and await it with no lock held.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::RwLock;

use async_trait::async_trait;
use mcp_hub_core::Arguments;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Tool call failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ToolCallError {
    /// No tool is registered under the name.
    #[error("unknown tool: {0}")]
    UnknownTool(String),
    /// The handler ran and failed.
    #[error("{0}")]
    Handler(String),
    /// The handler table lock is poisoned.
    #[error("tool host lock poisoned")]
    Poisoned,
}

/// Async tool handler.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Runs the tool with the caller's arguments.
    async fn call(&self, args: Arguments) -> Result<Value, ToolCallError>;
}

/// Tool metadata advertised to clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDescriptor {
    /// Name clients call the tool by.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// JSON schema of accepted arguments.
    pub input_schema: Value,
}

/// Descriptor plus handler.
#[derive(Clone)]
struct HostedTool {
    /// Advertised metadata.
    descriptor: ToolDescriptor,
    /// Call target.
    handler: Arc<dyn ToolHandler>,
}

// ============================================================================
// SECTION: Tool Host
// ============================================================================

/// One named handler table.
pub struct ToolHost {
    /// Server label reported by `initialize`.
    label: String,
    /// Hosted tools keyed by name.
    tools: RwLock<BTreeMap<String, HostedTool>>,
}

impl ToolHost {
    /// Creates an empty host.
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            tools: RwLock::new(BTreeMap::new()),
        }
    }

    /// Returns the host label.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Adds or replaces a tool. Returns true when a tool was replaced.
    ///
    /// # Errors
    ///
    /// Returns [`ToolCallError::Poisoned`] when the table lock is poisoned.
    pub fn add_tool(
        &self,
        descriptor: ToolDescriptor,
        handler: Arc<dyn ToolHandler>,
    ) -> Result<bool, ToolCallError> {
        let mut tools = self.tools.write().map_err(|_| ToolCallError::Poisoned)?;
        let name = descriptor.name.clone();
        let replaced = tools
            .insert(
                name,
                HostedTool {
                    descriptor,
                    handler,
                },
            )
            .is_some();
        drop(tools);
        Ok(replaced)
    }

    /// Removes a tool. Returns true when a tool was removed.
    ///
    /// # Errors
    ///
    /// Returns [`ToolCallError::Poisoned`] when the table lock is poisoned.
    pub fn remove_tool(&self, name: &str) -> Result<bool, ToolCallError> {
        let mut tools = self.tools.write().map_err(|_| ToolCallError::Poisoned)?;
        Ok(tools.remove(name).is_some())
    }

    /// Returns true when a tool is hosted under the name.
    ///
    /// # Errors
    ///
    /// Returns [`ToolCallError::Poisoned`] when the table lock is poisoned.
    pub fn contains(&self, name: &str) -> Result<bool, ToolCallError> {
        let tools = self.tools.read().map_err(|_| ToolCallError::Poisoned)?;
        Ok(tools.contains_key(name))
    }

    /// Lists hosted tool descriptors in name order.
    ///
    /// # Errors
    ///
    /// Returns [`ToolCallError::Poisoned`] when the table lock is poisoned.
    pub fn list_tools(&self) -> Result<Vec<ToolDescriptor>, ToolCallError> {
        let tools = self.tools.read().map_err(|_| ToolCallError::Poisoned)?;
        Ok(tools.values().map(|tool| tool.descriptor.clone()).collect())
    }

    /// Calls a hosted tool.
    ///
    /// # Errors
    ///
    /// Returns [`ToolCallError::UnknownTool`] when nothing is hosted under the
    /// name, or the handler's own error.
    pub async fn call_tool(&self, name: &str, args: Arguments) -> Result<Value, ToolCallError> {
        let handler = {
            let tools = self.tools.read().map_err(|_| ToolCallError::Poisoned)?;
            tools
                .get(name)
                .map(|tool| Arc::clone(&tool.handler))
                .ok_or_else(|| ToolCallError::UnknownTool(name.to_string()))?
        };
        handler.call(args).await
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
