// crates/mcp-hub-binding/tests/common/mod.rs
// ============================================================================
// Module: Binding Test Helpers
// Description: Shared fixtures for binding integration tests.
// Purpose: Spawn local upstream stubs and build argument bags.
// Dependencies: tiny_http, serde_json
// ============================================================================

#![allow(
    dead_code,
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only helpers with panic-based setup."
)]

use std::sync::mpsc;
use std::thread;

use mcp_hub_core::Arguments;
use serde_json::Value;
use tiny_http::Header;
use tiny_http::Response;
use tiny_http::Server;

/// Request observed by a stub server.
#[derive(Debug, Clone)]
pub struct Observed {
    /// HTTP method.
    pub method: String,
    /// Path plus query string.
    pub url: String,
    /// Header name/value pairs.
    pub headers: Vec<(String, String)>,
    /// Request body text.
    pub body: String,
}

impl Observed {
    /// Returns the first header value with a case-insensitive name match.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Spawns a one-shot server replying with the given status, content type and body.
pub fn spawn_stub(
    status: u16,
    content_type: &'static str,
    body: String,
) -> (String, mpsc::Receiver<Observed>, thread::JoinHandle<()>) {
    let server = Server::http("127.0.0.1:0").unwrap();
    let addr = server.server_addr().to_ip().unwrap();
    let (tx, rx) = mpsc::channel();
    let handle = thread::spawn(move || {
        if let Ok(mut request) = server.recv() {
            let mut text = String::new();
            let _ = request.as_reader().read_to_string(&mut text);
            let observed = Observed {
                method: request.method().as_str().to_string(),
                url: request.url().to_string(),
                headers: request
                    .headers()
                    .iter()
                    .map(|header| (header.field.as_str().to_string(), header.value.to_string()))
                    .collect(),
                body: text,
            };
            let _ = tx.send(observed);
            let header = Header::from_bytes("Content-Type", content_type).unwrap();
            let response = Response::from_data(body.into_bytes()).with_status_code(status).with_header(header);
            let _ = request.respond(response);
        }
    });
    (format!("http://{addr}"), rx, handle)
}

/// Converts a JSON object literal into an argument bag.
pub fn args(value: Value) -> Arguments {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object arguments, got {other}"),
    }
}
