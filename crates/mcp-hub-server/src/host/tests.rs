// crates/mcp-hub-server/src/host/tests.rs
// ============================================================================
// Module: Tool Host Tests
// Description: Unit tests for handler table semantics.
// Purpose: Validate replace-on-add, tolerant removal, and call routing.
// Dependencies: tokio
// ============================================================================

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::sync::Arc;

use async_trait::async_trait;
use mcp_hub_core::Arguments;
use serde_json::Value;
use serde_json::json;

use super::ToolCallError;
use super::ToolDescriptor;
use super::ToolHandler;
use super::ToolHost;

struct Constant(Value);

#[async_trait]
impl ToolHandler for Constant {
    async fn call(&self, _args: Arguments) -> Result<Value, ToolCallError> {
        Ok(self.0.clone())
    }
}

struct EchoArgs;

#[async_trait]
impl ToolHandler for EchoArgs {
    async fn call(&self, args: Arguments) -> Result<Value, ToolCallError> {
        Ok(Value::Object(args))
    }
}

fn descriptor(name: &str) -> ToolDescriptor {
    ToolDescriptor {
        name: name.to_string(),
        description: String::new(),
        input_schema: json!({"type": "object", "properties": {}}),
    }
}

#[tokio::test]
async fn add_replaces_existing_handler() {
    let host = ToolHost::new("test");
    assert!(!host.add_tool(descriptor("a"), Arc::new(Constant(json!(1)))).unwrap());
    assert!(host.add_tool(descriptor("a"), Arc::new(Constant(json!(2)))).unwrap());
    assert_eq!(host.list_tools().unwrap().len(), 1);
    assert_eq!(host.call_tool("a", Arguments::new()).await.unwrap(), json!(2));
}

#[tokio::test]
async fn call_passes_arguments() {
    let host = ToolHost::new("test");
    host.add_tool(descriptor("echo"), Arc::new(EchoArgs)).unwrap();
    let mut args = Arguments::new();
    args.insert("x".to_string(), json!(5));
    assert_eq!(host.call_tool("echo", args).await.unwrap(), json!({"x": 5}));
}

#[tokio::test]
async fn unknown_tool_is_reported() {
    let host = ToolHost::new("test");
    let err = host.call_tool("missing", Arguments::new()).await.unwrap_err();
    assert_eq!(err, ToolCallError::UnknownTool("missing".to_string()));
}

#[test]
fn remove_tolerates_absent_tools() {
    let host = ToolHost::new("test");
    assert!(!host.remove_tool("ghost").unwrap());
    host.add_tool(descriptor("a"), Arc::new(EchoArgs)).unwrap();
    assert!(host.remove_tool("a").unwrap());
    assert!(!host.contains("a").unwrap());
}

#[test]
fn listing_is_name_ordered() {
    let host = ToolHost::new("test");
    for name in ["c", "a", "b"] {
        host.add_tool(descriptor(name), Arc::new(EchoArgs)).unwrap();
    }
    let names: Vec<String> = host.list_tools().unwrap().into_iter().map(|tool| tool.name).collect();
    assert_eq!(names, vec!["a", "b", "c"]);
    assert_eq!(host.label(), "test");
}
