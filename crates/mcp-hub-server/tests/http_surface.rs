// crates/mcp-hub-server/tests/http_surface.rs
// ============================================================================
// Module: HTTP Surface Tests
// Description: End-to-end tests for the administrative and invocation routes.
// Purpose: Validate CRUD wiring, SSE event order, and request-level errors.
// Dependencies: reqwest, tiny_http, tokio
// ============================================================================

//! HTTP surface integration tests.

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

mod common;

use serde_json::Value;
use serde_json::json;

use crate::common::parse_sse;
use crate::common::spawn_hub;
use crate::common::spawn_upstream;
use crate::common::unreachable_upstream;

#[tokio::test]
async fn backend_crud_round_trip() {
    let hub = spawn_hub(true).await;
    hub.put(
        "/backends/echo",
        json!({"name": "Echo", "baseAddress": "https://example.test", "auth": {"type": "bearer", "value": "abc"}}),
    )
    .await;

    let (status, backend) = hub.get_json("/backends/echo").await;
    assert_eq!(status, 200);
    assert_eq!(backend["baseUrl"], "https://example.test");
    assert_eq!(backend["active"], true);

    let (_, listed) = hub.get_json("/backends").await;
    assert!(listed.get("echo").is_some());

    let (_, stats) = hub.get_json("/stats").await;
    assert_eq!(stats, json!({"servers": 1, "activeServers": 1, "tools": 0, "activeTools": 0}));

    let response = hub.client.delete(hub.url("/backends/echo")).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let response = hub.client.delete(hub.url("/backends/echo")).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let (status, body) = hub.get_json("/backends/echo").await;
    assert_eq!(status, 404);
    assert_eq!(body, json!({"error": "backend not found"}));
}

#[tokio::test]
async fn tool_crud_updates_registry() {
    let hub = spawn_hub(true).await;
    hub.seed_demo(&unreachable_upstream()).await;

    let (status, tool) = hub.get_json("/tools/demo/get_item").await;
    assert_eq!(status, 200);
    assert_eq!(tool["paramMapping"]["path"]["id"], "itemId");

    let (_, tools) = hub.get_json("/tools/demo").await;
    assert_eq!(tools.as_object().unwrap().len(), 1);

    let response = hub.client.delete(hub.url("/tools/demo/get_item")).send().await.unwrap();
    assert!(response.status().is_success());
    let (status, _) = hub.get_json("/tools/demo/get_item").await;
    assert_eq!(status, 404);
    assert_eq!(hub.registry.stats().unwrap().tool_count, 0);
}

#[tokio::test]
async fn invocation_streams_started_output_completed() {
    let hub = spawn_hub(true).await;
    hub.seed_demo(&spawn_upstream(200)).await;

    let (status, text) =
        hub.post_text("/invoke/demo/get_item", json!({"args": {"itemId": 42}})).await;
    assert_eq!(status, 200);
    let events = parse_sse(&text);
    let names: Vec<&str> = events.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(names, vec!["started", "output", "completed"]);

    let started: Value = serde_json::from_str(&events[0].1).unwrap();
    assert_eq!(started, json!({"backendId": "demo", "toolName": "get_item"}));
    let output: Value = serde_json::from_str(&events[1].1).unwrap();
    assert_eq!(output, json!({"url": "/items/42"}));
    let completed: Value = serde_json::from_str(&events[2].1).unwrap();
    assert_eq!(completed, json!({"status": 200}));
}

#[tokio::test]
async fn validation_failure_streams_error_after_started() {
    let hub = spawn_hub(true).await;
    hub.seed_demo(&spawn_upstream(200)).await;

    let (status, text) =
        hub.post_text("/invoke/demo/get_item", json!({"args": {"itemId": "x"}})).await;
    assert_eq!(status, 200);
    let events = parse_sse(&text);
    assert_eq!(events.len(), 2);
    assert_eq!(events[1].0, "error");
    let error: Value = serde_json::from_str(&events[1].1).unwrap();
    assert!(error["error"].as_str().unwrap().starts_with("schema_validation_error: "));
}

#[tokio::test]
async fn unreachable_upstream_streams_single_error() {
    let hub = spawn_hub(true).await;
    hub.seed_demo(&unreachable_upstream()).await;

    let (_, text) = hub.post_text("/invoke/demo/get_item", json!({"args": {"itemId": 1}})).await;
    let names: Vec<String> = parse_sse(&text).into_iter().map(|(name, _)| name).collect();
    assert_eq!(names, vec!["started", "error"]);
}

#[tokio::test]
async fn rejected_invocations_emit_no_stream() {
    let hub = spawn_hub(true).await;
    hub.seed_demo(&spawn_upstream(200)).await;

    let (status, text) = hub.post_text("/invoke/ghost/get_item", json!({"args": {}})).await;
    assert_eq!(status, 404);
    assert_eq!(serde_json::from_str::<Value>(&text).unwrap(), json!({"error": "backend not found"}));

    let (status, _) = hub.post_text("/invoke/demo/missing", json!({"args": {}})).await;
    assert_eq!(status, 404);

    hub.put(
        "/tools/demo/get_item",
        json!({"name": "get_item", "method": "GET", "pathTemplate": "/items", "active": false}),
    )
    .await;
    let (status, text) = hub.post_text("/invoke/demo/get_item", json!({"args": {}})).await;
    assert_eq!(status, 403);
    assert!(!text.contains("started"));
    assert_eq!(serde_json::from_str::<Value>(&text).unwrap(), json!({"error": "tool inactive"}));
}

#[tokio::test]
async fn envelope_and_alias_routes() {
    let hub = spawn_hub(true).await;
    hub.seed_demo(&spawn_upstream(200)).await;

    let (status, text) = hub.post_text("/invoke/demo", json!({"method": "initialize"})).await;
    assert_eq!(status, 200);
    let init: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(init["serverInfo"]["name"], "mcp_hub:demo");
    assert_eq!(init["protocolVersion"], "2024-11-05");

    let (_, text) = hub.post_text("/invoke/demo", json!({"method": "tools.list"})).await;
    let list: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(list["tools"][0]["name"], "get_item");
    assert_eq!(list["tools"][0]["description"], "Fetch one item");
    assert_eq!(list["tools"][0]["inputSchema"], list["tools"][0]["parameters"]);

    let (_, scoped) = hub.get_json("/invoke/demo/tools/list").await;
    assert_eq!(scoped, list);

    let (_, text) = hub.post_text("/invoke/demo", json!({})).await;
    assert_eq!(serde_json::from_str::<Value>(&text).unwrap(), json!({"ok": true}));

    let (_, text) =
        hub.post_text("/invoke/demo", json!({"name": "get_item", "args": {"itemId": 7}})).await;
    let events = parse_sse(&text);
    assert_eq!(events[1].1, r#"{"url":"/items/7"}"#);

    let (_, text) =
        hub.post_text("/invoke/demo/tools/call", json!({"name": "get_item", "args": {"itemId": 8}})).await;
    let names: Vec<String> = parse_sse(&text).into_iter().map(|(name, _)| name).collect();
    assert_eq!(names, vec!["started", "output", "completed"]);
}

#[tokio::test]
async fn liveness_and_health() {
    let hub = spawn_hub(true).await;
    hub.seed_demo(&spawn_upstream(200)).await;

    let (status, body) = hub.get_json("/invoke/demo").await;
    assert_eq!(status, 200);
    assert_eq!(body, json!({"ok": true, "server": "demo"}));

    let response = hub.client.head(hub.url("/invoke/demo")).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let (status, _) = hub.get_json("/invoke/ghost").await;
    assert_eq!(status, 404);

    let (status, body) = hub.get_json("/healthz").await;
    assert_eq!(status, 200);
    assert_eq!(body["ok"], true);
    assert!(body["timestampMs"].is_u64());
}

#[tokio::test]
async fn admin_test_route_returns_full_result() {
    let hub = spawn_hub(true).await;
    hub.seed_demo(&spawn_upstream(201)).await;

    let (status, text) = hub.post_text("/tools/demo/get_item/test", json!({"itemId": 3})).await;
    assert_eq!(status, 200);
    let result: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(result["statusCode"], 201);
    assert_eq!(result["data"], json!({"url": "/items/3"}));
    assert!(result["finalUrl"].as_str().unwrap().ends_with("/items/3"));
    assert_eq!(result["headers"]["content-type"], "application/json");

    let (status, text) = hub.post_text("/tools/demo/get_item/test", json!({})).await;
    assert_eq!(status, 400);
    assert_eq!(
        serde_json::from_str::<Value>(&text).unwrap(),
        json!({"error": "Missing path arg: itemId"})
    );

    let (status, _) = hub.post_text("/tools/demo/nope/test", json!({})).await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn admin_test_route_reports_unreachable_upstream() {
    let hub = spawn_hub(true).await;
    hub.seed_demo(&unreachable_upstream()).await;
    let (status, _) = hub.post_text("/tools/demo/get_item/test", json!({"itemId": 3})).await;
    assert_eq!(status, 502);
}

#[tokio::test]
async fn scoped_metadata_routes_answer_base_url_clients() {
    let hub = spawn_hub(true).await;
    hub.seed_demo(&spawn_upstream(200)).await;

    let (status, text) = hub.post_text("/invoke/demo/initialize", json!({})).await;
    assert_eq!(status, 200);
    let init: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(init["serverInfo"]["name"], "mcp_hub:demo");
    assert_eq!(init["capabilities"], json!({"tools": {}, "resources": {}}));
    assert_eq!(init["transport"], "sse");

    let (status, body) = hub.get_json("/invoke/demo/resources/list").await;
    assert_eq!(status, 200);
    assert_eq!(body, json!({"resources": []}));
    let (status, body) = hub.get_json("/invoke/demo/resources/read").await;
    assert_eq!(status, 200);
    assert_eq!(body, json!({"content": null}));

    let (_, text) = hub.post_text("/invoke/demo", json!({"method": "resources/list"})).await;
    assert_eq!(serde_json::from_str::<Value>(&text).unwrap(), json!({"resources": []}));
}
