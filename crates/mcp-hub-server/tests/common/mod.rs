// crates/mcp-hub-server/tests/common/mod.rs
// ============================================================================
// Module: Server Test Helpers
// Description: Hub and upstream fixtures for HTTP surface tests.
// Purpose: Run the real router on an ephemeral port against stub backends.
// Dependencies: axum, reqwest, tiny_http, tokio
// ============================================================================

#![allow(
    dead_code,
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only helpers with panic-based setup."
)]

use std::thread;

use mcp_hub_config::HubConfig;
use mcp_hub_core::Registry;
use mcp_hub_server::HubServer;
use serde_json::Value;
use serde_json::json;
use tiny_http::Header;
use tiny_http::Response;
use tiny_http::Server;

/// Running hub under test.
pub struct Hub {
    /// Base URL of the hub listener.
    pub base_url: String,
    /// Registry handle of the running hub.
    pub registry: Registry,
    /// HTTP client for requests against the hub.
    pub client: reqwest::Client,
}

impl Hub {
    /// Joins a path onto the hub base URL.
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// PUTs a JSON document and asserts success.
    pub async fn put(&self, path: &str, body: Value) {
        let response = self.client.put(self.url(path)).json(&body).send().await.unwrap();
        assert!(response.status().is_success(), "PUT {path} failed: {}", response.status());
    }

    /// GETs a path and returns status plus JSON body.
    pub async fn get_json(&self, path: &str) -> (u16, Value) {
        let response = self.client.get(self.url(path)).send().await.unwrap();
        let status = response.status().as_u16();
        (status, response.json().await.unwrap_or(Value::Null))
    }

    /// POSTs JSON and returns status plus response text.
    pub async fn post_text(&self, path: &str, body: Value) -> (u16, String) {
        let response = self.client.post(self.url(path)).json(&body).send().await.unwrap();
        let status = response.status().as_u16();
        (status, response.text().await.unwrap())
    }

    /// Registers the `demo` backend and its `get_item` tool.
    pub async fn seed_demo(&self, upstream: &str) {
        self.put("/backends/demo", json!({"name": "Demo", "baseUrl": upstream})).await;
        self.put(
            "/tools/demo/get_item",
            json!({
                "name": "get_item",
                "description": "Fetch one item",
                "method": "GET",
                "pathTemplate": "/items/{id}",
                "paramMapping": {"path": {"id": "itemId"}},
                "inputSchema": {
                    "type": "object",
                    "properties": {"itemId": {"type": "integer"}},
                    "required": ["itemId"]
                },
                "responseMapping": {"pick": "$.item"}
            }),
        )
        .await;
    }
}

/// Starts a hub with audit disabled.
pub async fn spawn_hub(session_id_normalization: bool) -> Hub {
    let mut config = HubConfig::default();
    config.server.audit.enabled = false;
    config.server.session_id_normalization = session_id_normalization;
    config.upstream.timeout_ms = 5_000;
    let server = HubServer::from_config(config).unwrap();
    let registry = server.registry();
    let router = server.router();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    Hub {
        base_url: format!("http://{addr}"),
        registry,
        client: reqwest::Client::new(),
    }
}

/// Starts an upstream that answers every request with
/// `{"item": {"url": <request url>}}` and the given status.
pub fn spawn_upstream(status: u16) -> String {
    let server = Server::http("127.0.0.1:0").unwrap();
    let addr = server.server_addr().to_ip().unwrap();
    thread::spawn(move || {
        for mut request in server.incoming_requests() {
            let mut sink = String::new();
            let _ = request.as_reader().read_to_string(&mut sink);
            let body = json!({"item": {"url": request.url()}}).to_string();
            let header = Header::from_bytes("Content-Type", "application/json").unwrap();
            let response =
                Response::from_data(body.into_bytes()).with_status_code(status).with_header(header);
            let _ = request.respond(response);
        }
    });
    format!("http://{addr}")
}

/// Returns a base URL nothing listens on.
pub fn unreachable_upstream() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

/// Parses an SSE body into `(event, data)` pairs.
pub fn parse_sse(text: &str) -> Vec<(String, String)> {
    text.replace("\r\n", "\n")
        .split("\n\n")
        .filter_map(|block| {
            let mut event = None;
            let mut data = Vec::new();
            for line in block.lines() {
                if let Some(name) = line.strip_prefix("event:") {
                    event = Some(name.trim().to_string());
                } else if let Some(value) = line.strip_prefix("data:") {
                    data.push(value.strip_prefix(' ').unwrap_or(value).to_string());
                }
            }
            event.map(|event| (event, data.join("\n")))
        })
        .collect()
}

/// Reads a streaming response until `needle` appears in the accumulated text.
pub async fn read_until(response: &mut reqwest::Response, needle: &str) -> String {
    let mut text = String::new();
    while !text.contains(needle) {
        let chunk = tokio::time::timeout(std::time::Duration::from_secs(5), response.chunk())
            .await
            .expect("stream stalled")
            .unwrap()
            .expect("stream ended");
        text.push_str(&String::from_utf8_lossy(&chunk));
    }
    text
}
