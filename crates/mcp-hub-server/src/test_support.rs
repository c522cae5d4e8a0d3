// crates/mcp-hub-server/src/test_support.rs
// ============================================================================
// Module: Unit Test Support
// Description: Upstream stubs and fixtures shared by unit tests.
// Purpose: Keep runtime and dispatcher tests free of setup noise.
// Dependencies: tiny_http, mcp-hub-core
// ============================================================================

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only helpers with panic-based setup."
)]

use std::io::Read;
use std::net::TcpListener;
use std::sync::Arc;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;
use std::time::Instant;

use mcp_hub_binding::HttpExecutor;
use mcp_hub_binding::HttpExecutorConfig;
use mcp_hub_core::Arguments;
use mcp_hub_core::BackendConfig;
use mcp_hub_core::BackendId;
use mcp_hub_core::HttpMethod;
use mcp_hub_core::Registry;
use mcp_hub_core::ToolBinding;
use mcp_hub_core::ToolName;
use serde_json::Value;
use tiny_http::Header;
use tiny_http::Response;
use tiny_http::Server;

/// Spawns a server that answers `count` requests with a fixed JSON reply.
///
/// Returns the base URL and a receiver of observed request URLs.
pub fn spawn_json_stub(
    count: usize,
    status: u16,
    body: &'static str,
) -> (String, mpsc::Receiver<String>) {
    let server = Server::http("127.0.0.1:0").unwrap();
    let addr = server.server_addr().to_ip().unwrap();
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for _ in 0..count {
            let Ok(mut request) = server.recv() else {
                return;
            };
            let mut sink = String::new();
            let _ = request.as_reader().read_to_string(&mut sink);
            let _ = tx.send(request.url().to_string());
            let header = Header::from_bytes("Content-Type", "application/json").unwrap();
            let response = Response::from_data(body.as_bytes().to_vec())
                .with_status_code(status)
                .with_header(header);
            let _ = request.respond(response);
        }
    });
    (format!("http://{addr}"), rx)
}

/// Returns a base URL nothing listens on.
pub fn unreachable_base_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

/// Builds an executor with a short timeout.
pub fn executor() -> Arc<HttpExecutor> {
    let config = HttpExecutorConfig {
        timeout_ms: 5_000,
        ..HttpExecutorConfig::default()
    };
    Arc::new(HttpExecutor::new(&config).unwrap())
}

/// Registers a backend and one GET tool with the given path.
pub fn seed(registry: &Registry, base_url: &str, path: &str) -> (BackendId, ToolName) {
    let backend_id = BackendId::new("demo");
    let tool_name = ToolName::new("get_item");
    registry.upsert_backend(backend_id.clone(), BackendConfig::new("Demo", base_url)).unwrap();
    registry
        .upsert_tool(
            backend_id.clone(),
            tool_name.clone(),
            ToolBinding::new("get_item", HttpMethod::Get, path),
        )
        .unwrap();
    (backend_id, tool_name)
}

/// Registers backend `backend` with one GET tool `tool` at `/{backend}/{tool}`.
pub fn seed_pair(registry: &Registry, backend: &str, tool: &str, base_url: &str) -> (BackendId, ToolName) {
    let backend_id = BackendId::new(backend);
    let tool_name = ToolName::new(tool);
    registry.upsert_backend(backend_id.clone(), BackendConfig::new(backend, base_url)).unwrap();
    registry
        .upsert_tool(
            backend_id.clone(),
            tool_name.clone(),
            ToolBinding::new(tool, HttpMethod::Get, format!("/{backend}/{tool}")),
        )
        .unwrap();
    (backend_id, tool_name)
}

/// Spawns a raw TCP upstream that accepts one connection and never answers.
///
/// The first receiver fires on accept; the second reports how long after
/// accept the client closed the connection.
pub fn spawn_silent_upstream() -> (String, mpsc::Receiver<()>, mpsc::Receiver<Duration>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let (accepted_tx, accepted_rx) = mpsc::channel();
    let (closed_tx, closed_rx) = mpsc::channel();
    thread::spawn(move || {
        let Ok((mut socket, _)) = listener.accept() else {
            return;
        };
        let accepted_at = Instant::now();
        let _ = accepted_tx.send(());
        let mut buffer = [0_u8; 1024];
        while let Ok(read) = socket.read(&mut buffer) {
            if read == 0 {
                break;
            }
        }
        let _ = closed_tx.send(accepted_at.elapsed());
    });
    (format!("http://{addr}"), accepted_rx, closed_rx)
}

/// Converts a JSON object literal into an argument bag.
pub fn args(value: Value) -> Arguments {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object arguments, got {other}"),
    }
}
