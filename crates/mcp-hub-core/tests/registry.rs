// crates/mcp-hub-core/tests/registry.rs
// ============================================================================
// Module: Registry Tests
// Description: Tests for the in-memory backend/tool registry.
// Purpose: Validate idempotent upserts, cascading deletes, and snapshots.
// Dependencies: mcp-hub-core
// ============================================================================
//! ## Overview
//! Exercises the registry CRUD contract, including concurrent access from
//! several threads.

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

use std::thread;

use mcp_hub_core::BackendConfig;
use mcp_hub_core::BackendId;
use mcp_hub_core::HttpMethod;
use mcp_hub_core::Registry;
use mcp_hub_core::RegistryStats;
use mcp_hub_core::ToolBinding;
use mcp_hub_core::ToolName;

fn echo_backend() -> BackendConfig {
    BackendConfig::new("Echo", "https://example.test")
}

fn get_item() -> ToolBinding {
    let mut binding = ToolBinding::new("get_item", HttpMethod::Get, "/items/{id}");
    binding.argument_mapping.path.insert("id".to_string(), "itemId".to_string());
    binding
}

/// Verifies repeated identical upserts leave the listing unchanged.
#[test]
fn upsert_backend_is_idempotent() {
    let registry = Registry::new();
    registry.upsert_backend(BackendId::new("echo"), echo_backend()).unwrap();
    let first = registry.list_backends().unwrap();
    registry.upsert_backend(BackendId::new("echo"), echo_backend()).unwrap();
    let second = registry.list_backends().unwrap();
    assert_eq!(first, second);
    assert_eq!(second.len(), 1);
}

/// Verifies upsert replaces an existing definition.
#[test]
fn upsert_backend_overwrites() {
    let registry = Registry::new();
    let id = BackendId::new("echo");
    registry.upsert_backend(id.clone(), echo_backend()).unwrap();
    let mut updated = echo_backend();
    updated.active = false;
    registry.upsert_backend(id.clone(), updated).unwrap();
    assert!(!registry.backend(&id).unwrap().unwrap().active);
}

/// Verifies deleting a backend removes its tools.
#[test]
fn delete_backend_cascades_to_tools() {
    let registry = Registry::new();
    let id = BackendId::new("echo");
    registry.upsert_backend(id.clone(), echo_backend()).unwrap();
    registry.upsert_tool(id.clone(), ToolName::new("get_item"), get_item()).unwrap();
    let removed = registry.delete_backend(&id).unwrap();
    assert!(removed.is_some());
    assert!(registry.list_backends().unwrap().is_empty());
    assert!(registry.list_tools(&id).unwrap().is_empty());
    assert!(registry.tool(&id, &ToolName::new("get_item")).unwrap().is_none());
}

/// Verifies deletes of missing ids are no-ops.
#[test]
fn delete_missing_ids_is_noop() {
    let registry = Registry::new();
    let id = BackendId::new("ghost");
    assert!(registry.delete_backend(&id).unwrap().is_none());
    assert!(registry.delete_tool(&id, &ToolName::new("nothing")).unwrap().is_none());
    assert_eq!(registry.stats().unwrap(), RegistryStats::default());
}

/// Verifies snapshots are independent of later mutation.
#[test]
fn snapshots_are_independent_copies() {
    let registry = Registry::new();
    let id = BackendId::new("echo");
    registry.upsert_backend(id.clone(), echo_backend()).unwrap();
    registry.upsert_tool(id.clone(), ToolName::new("get_item"), get_item()).unwrap();

    let mut snapshot = registry.list_tools(&id).unwrap();
    snapshot.get_mut(&ToolName::new("get_item")).unwrap().active = false;
    snapshot.clear();

    let tool = registry.tool(&id, &ToolName::new("get_item")).unwrap().unwrap();
    assert!(tool.active);

    registry.delete_tool(&id, &ToolName::new("get_item")).unwrap();
    let backends = registry.list_backends().unwrap();
    assert!(backends.contains_key(&id));
}

/// Verifies lookup needs both the backend and the tool.
#[test]
fn lookup_requires_backend_and_tool() {
    let registry = Registry::new();
    let id = BackendId::new("echo");
    let name = ToolName::new("get_item");
    registry.upsert_tool(id.clone(), name.clone(), get_item()).unwrap();
    assert!(registry.lookup(&id, &name).unwrap().is_none());

    registry.upsert_backend(id.clone(), echo_backend()).unwrap();
    let (backend, binding) = registry.lookup(&id, &name).unwrap().unwrap();
    assert_eq!(backend.base_url, "https://example.test");
    assert_eq!(binding.path_template, "/items/{id}");
}

/// Verifies stats count active flags and skip orphaned tools.
#[test]
fn stats_count_active_entries() {
    let registry = Registry::new();
    let echo = BackendId::new("echo");
    let mut idle = echo_backend();
    idle.active = false;
    registry.upsert_backend(echo.clone(), echo_backend()).unwrap();
    registry.upsert_backend(BackendId::new("idle"), idle).unwrap();
    registry.upsert_tool(echo.clone(), ToolName::new("get_item"), get_item()).unwrap();
    let mut disabled = get_item();
    disabled.active = false;
    registry.upsert_tool(echo, ToolName::new("disabled"), disabled).unwrap();
    registry.upsert_tool(BackendId::new("orphan"), ToolName::new("x"), get_item()).unwrap();

    let stats = registry.stats().unwrap();
    assert_eq!(stats.backend_count, 2);
    assert_eq!(stats.active_backend_count, 1);
    assert_eq!(stats.tool_count, 2);
    assert_eq!(stats.active_tool_count, 1);

    let wire = serde_json::to_value(stats).unwrap();
    assert_eq!(wire, serde_json::json!({"servers": 2, "activeServers": 1, "tools": 2, "activeTools": 1}));
}

/// Verifies concurrent writers and readers never corrupt the store.
#[test]
fn concurrent_upserts_and_reads() {
    let registry = Registry::new();
    let handles: Vec<_> = (0 .. 8)
        .map(|worker| {
            let registry = registry.clone();
            thread::spawn(move || {
                let id = BackendId::new(format!("backend-{worker}"));
                registry.upsert_backend(id.clone(), echo_backend()).unwrap();
                for index in 0 .. 25 {
                    registry
                        .upsert_tool(id.clone(), ToolName::new(format!("tool-{index}")), get_item())
                        .unwrap();
                    let _ = registry.list_backends().unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    let stats = registry.stats().unwrap();
    assert_eq!(stats.backend_count, 8);
    assert_eq!(stats.tool_count, 200);
}
