// crates/mcp-hub-server/src/hosting.rs
// ============================================================================
// Module: Tool Hosting Endpoints
// Description: JSON-RPC and SSE session transports over tool hosts.
// Purpose: Expose the global and per-backend handler tables to MCP clients.
// Dependencies: axum, serde, serde_json, tokio, tokio-stream, uuid
// ============================================================================

//! ## Overview
//! Each [`ToolHost`] is served through three routes:
//! - `rpc`: stateless JSON-RPC 2.0 over HTTP;
//! - `sse`: opens a session stream whose first `endpoint` event names the
//!   session's `messages` URL;
//! - `messages`: JSON-RPC for an open session; replies are pushed onto the
//!   session stream as `message` events and the POST answers 202.
//!
//! The global host lives under `/mcp-sdk`. Per-backend hosts live under
//! `/mcp-servers/{backendId}` once the runtime mounts them through
//! [`MountedEndpoints`]; unmounted backends answer 404.
//!
//! Session ids are compact UUIDs. When enabled, the session-id normalizer
//! runs in front of every `messages` route.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::convert::Infallible;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::RwLock;

use axum::Json;
use axum::Router;
use axum::body::Bytes;
use axum::extract::Path;
use axum::extract::Query;
use axum::extract::State;
use axum::http::StatusCode;
use axum::middleware;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::response::Sse;
use axum::response::sse::Event;
use axum::response::sse::KeepAlive;
use axum::routing::MethodRouter;
use axum::routing::get;
use axum::routing::post;
use mcp_hub_core::Arguments;
use mcp_hub_core::BackendId;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use serde_json::json;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use uuid::Uuid;

use crate::host::ToolCallError;
use crate::host::ToolHost;
use crate::runtime::MountSurface;
use crate::runtime::RuntimeError;
use crate::session::normalize_session_query;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Protocol revision reported by `initialize`.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Server version reported by `initialize`.
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Route prefix of the global host.
pub const GLOBAL_PREFIX: &str = "/mcp-sdk";

/// Route prefix of mounted per-backend hosts.
pub const MOUNT_PREFIX: &str = "/mcp-servers";

/// Outbound event buffer per session.
const SESSION_BUFFER: usize = 16;

/// Serialized fallback when a reply cannot be encoded.
const SERIALIZATION_FAILED: &str =
    "{\"jsonrpc\":\"2.0\",\"id\":null,\"error\":{\"code\":-32603,\"message\":\"serialization \
     failed\"}}";

// ============================================================================
// SECTION: JSON-RPC Types
// ============================================================================

/// Incoming JSON-RPC request payload.
#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    /// JSON-RPC protocol version.
    pub jsonrpc: String,
    /// Request identifier; absent for notifications.
    #[serde(default)]
    pub id: Option<Value>,
    /// Method name.
    pub method: String,
    /// Optional parameters payload.
    #[serde(default)]
    pub params: Option<Value>,
}

/// JSON-RPC response envelope.
#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    /// JSON-RPC protocol version.
    pub jsonrpc: &'static str,
    /// Request identifier.
    pub id: Value,
    /// Successful result payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Error payload when the request fails.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// JSON-RPC error payload.
#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    /// Error code.
    pub code: i64,
    /// Human-readable error message.
    pub message: String,
}

/// Tool call parameters for JSON-RPC requests.
#[derive(Debug, Deserialize)]
struct ToolCallParams {
    /// Tool name.
    name: String,
    /// Tool arguments; absent means empty.
    #[serde(default)]
    arguments: Option<Arguments>,
}

impl JsonRpcResponse {
    /// Builds a success response.
    fn ok(id: Value, result: Value) -> (StatusCode, Self) {
        (
            StatusCode::OK,
            Self {
                jsonrpc: "2.0",
                id,
                result: Some(result),
                error: None,
            },
        )
    }

    /// Builds an error response.
    fn err(status: StatusCode, id: Value, code: i64, message: impl Into<String>) -> (StatusCode, Self) {
        (
            status,
            Self {
                jsonrpc: "2.0",
                id,
                result: None,
                error: Some(JsonRpcError {
                    code,
                    message: message.into(),
                }),
            },
        )
    }
}

// ============================================================================
// SECTION: JSON-RPC Handling
// ============================================================================

/// Parses a JSON-RPC request payload.
///
/// # Errors
///
/// Returns a ready-to-send `-32600` response when the payload is malformed.
pub fn parse_rpc(bytes: &[u8]) -> Result<JsonRpcRequest, (StatusCode, JsonRpcResponse)> {
    serde_json::from_slice(bytes).map_err(|_| {
        JsonRpcResponse::err(StatusCode::BAD_REQUEST, Value::Null, -32600, "invalid json-rpc request")
    })
}

/// Dispatches one JSON-RPC request against a host.
///
/// Returns `None` for notifications, which get no reply.
pub async fn handle_rpc(
    host: &ToolHost,
    request: JsonRpcRequest,
) -> Option<(StatusCode, JsonRpcResponse)> {
    let id = request.id?;
    if request.jsonrpc != "2.0" {
        return Some(JsonRpcResponse::err(
            StatusCode::BAD_REQUEST,
            id,
            -32600,
            "invalid json-rpc version",
        ));
    }
    let response = match request.method.as_str() {
        "initialize" => JsonRpcResponse::ok(
            id,
            json!({
                "protocolVersion": PROTOCOL_VERSION,
                "serverInfo": {"name": host.label(), "version": SERVER_VERSION},
                "capabilities": {"tools": {}},
            }),
        ),
        "ping" => JsonRpcResponse::ok(id, json!({})),
        "tools/list" => match host.list_tools() {
            Ok(tools) => JsonRpcResponse::ok(id, json!({"tools": tools})),
            Err(err) => {
                JsonRpcResponse::err(StatusCode::INTERNAL_SERVER_ERROR, id, -32603, err.to_string())
            }
        },
        "tools/call" => call_tool(host, id, request.params).await,
        _ => JsonRpcResponse::err(StatusCode::BAD_REQUEST, id, -32601, "method not found"),
    };
    Some(response)
}

/// Runs `tools/call`. Handler failures are tool results, not protocol errors.
async fn call_tool(
    host: &ToolHost,
    id: Value,
    params: Option<Value>,
) -> (StatusCode, JsonRpcResponse) {
    let Ok(params) = serde_json::from_value::<ToolCallParams>(params.unwrap_or(Value::Null)) else {
        return JsonRpcResponse::err(StatusCode::BAD_REQUEST, id, -32602, "invalid tool params");
    };
    match host.call_tool(&params.name, params.arguments.unwrap_or_default()).await {
        Ok(data) => {
            let text = serde_json::to_string(&data).unwrap_or_default();
            JsonRpcResponse::ok(
                id,
                json!({
                    "content": [{"type": "text", "text": text}],
                    "structuredContent": data,
                    "isError": false,
                }),
            )
        }
        Err(err @ ToolCallError::UnknownTool(_)) => {
            JsonRpcResponse::err(StatusCode::BAD_REQUEST, id, -32602, err.to_string())
        }
        Err(err @ ToolCallError::Poisoned) => {
            JsonRpcResponse::err(StatusCode::INTERNAL_SERVER_ERROR, id, -32603, err.to_string())
        }
        Err(ToolCallError::Handler(message)) => JsonRpcResponse::ok(
            id,
            json!({
                "content": [{"type": "text", "text": message}],
                "isError": true,
            }),
        ),
    }
}

// ============================================================================
// SECTION: Endpoints
// ============================================================================

/// Sender half of one session stream.
type SessionSender = mpsc::Sender<Result<Event, Infallible>>;

/// One hosted tool surface plus its open sessions.
pub struct HostEndpoint {
    /// Route prefix used in `endpoint` events.
    prefix: String,
    /// Served handler table.
    host: Arc<ToolHost>,
    /// Open sessions keyed by compact session id.
    sessions: Mutex<BTreeMap<String, SessionSender>>,
}

impl HostEndpoint {
    /// Creates an endpoint with no open sessions.
    #[must_use]
    pub fn new(prefix: impl Into<String>, host: Arc<ToolHost>) -> Self {
        Self {
            prefix: prefix.into(),
            host,
            sessions: Mutex::new(BTreeMap::new()),
        }
    }

    /// Returns the served host.
    #[must_use]
    pub fn host(&self) -> &ToolHost {
        &self.host
    }

    /// Returns the number of open sessions.
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.sessions.lock().map_or(0, |sessions| sessions.len())
    }

    /// Looks up a session sender.
    fn session(&self, session_id: &str) -> Option<SessionSender> {
        self.sessions.lock().ok()?.get(session_id).cloned()
    }
}

/// Arena of per-backend endpoints, filled by the runtime's mount requests.
#[derive(Default)]
pub struct MountedEndpoints {
    /// Endpoints keyed by backend id.
    endpoints: RwLock<BTreeMap<BackendId, Arc<HostEndpoint>>>,
}

impl MountedEndpoints {
    /// Creates an empty arena.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the endpoint mounted for a backend.
    #[must_use]
    pub fn get(&self, backend_id: &BackendId) -> Option<Arc<HostEndpoint>> {
        self.endpoints.read().ok()?.get(backend_id).cloned()
    }
}

impl MountSurface for MountedEndpoints {
    fn mount(&self, backend_id: &BackendId, host: Arc<ToolHost>) -> Result<(), RuntimeError> {
        let mut endpoints = self.endpoints.write().map_err(|_| RuntimeError::Poisoned)?;
        endpoints.entry(backend_id.clone()).or_insert_with(|| {
            Arc::new(HostEndpoint::new(format!("{MOUNT_PREFIX}/{backend_id}"), host))
        });
        drop(endpoints);
        Ok(())
    }
}

// ============================================================================
// SECTION: Router
// ============================================================================

/// Shared state of the hosting routes.
#[derive(Clone)]
pub struct HostingState {
    /// Global host endpoint.
    pub global: Arc<HostEndpoint>,
    /// Per-backend endpoint arena.
    pub mounts: Arc<MountedEndpoints>,
}

/// Session query parameters.
#[derive(Debug, Deserialize)]
struct SessionQuery {
    /// Compact session id.
    session_id: Option<String>,
}

/// Builds the hosting routes for the global and mounted hosts.
pub fn hosting_router(state: HostingState, normalize_session_ids: bool) -> Router {
    Router::new()
        .route(&format!("{GLOBAL_PREFIX}/rpc"), post(global_rpc))
        .route(&format!("{GLOBAL_PREFIX}/sse"), get(global_sse))
        .route(
            &format!("{GLOBAL_PREFIX}/messages"),
            messages_route(post(global_messages), normalize_session_ids),
        )
        .route(&format!("{MOUNT_PREFIX}/{{backend_id}}/rpc"), post(mounted_rpc))
        .route(&format!("{MOUNT_PREFIX}/{{backend_id}}/sse"), get(mounted_sse))
        .route(
            &format!("{MOUNT_PREFIX}/{{backend_id}}/messages"),
            messages_route(post(mounted_messages), normalize_session_ids),
        )
        .with_state(state)
}

/// Layers the session-id normalizer onto a `messages` route when enabled.
fn messages_route(
    route: MethodRouter<HostingState>,
    normalize_session_ids: bool,
) -> MethodRouter<HostingState> {
    if normalize_session_ids {
        route.layer(middleware::from_fn(normalize_session_query))
    } else {
        route
    }
}

/// Handles stateless JSON-RPC on the global host.
async fn global_rpc(State(state): State<HostingState>, bytes: Bytes) -> Response {
    serve_rpc(&state.global, &bytes).await
}

/// Opens a session on the global host.
async fn global_sse(State(state): State<HostingState>) -> Response {
    open_session(state.global)
}

/// Handles session JSON-RPC on the global host.
async fn global_messages(
    State(state): State<HostingState>,
    Query(query): Query<SessionQuery>,
    bytes: Bytes,
) -> Response {
    post_message(&state.global, query, &bytes).await
}

/// Handles stateless JSON-RPC on a mounted host.
async fn mounted_rpc(
    State(state): State<HostingState>,
    Path(backend_id): Path<String>,
    bytes: Bytes,
) -> Response {
    match state.mounts.get(&BackendId::new(backend_id)) {
        Some(endpoint) => serve_rpc(&endpoint, &bytes).await,
        None => not_mounted(),
    }
}

/// Opens a session on a mounted host.
async fn mounted_sse(State(state): State<HostingState>, Path(backend_id): Path<String>) -> Response {
    match state.mounts.get(&BackendId::new(backend_id)) {
        Some(endpoint) => open_session(endpoint),
        None => not_mounted(),
    }
}

/// Handles session JSON-RPC on a mounted host.
async fn mounted_messages(
    State(state): State<HostingState>,
    Path(backend_id): Path<String>,
    Query(query): Query<SessionQuery>,
    bytes: Bytes,
) -> Response {
    match state.mounts.get(&BackendId::new(backend_id)) {
        Some(endpoint) => post_message(&endpoint, query, &bytes).await,
        None => not_mounted(),
    }
}

// ============================================================================
// SECTION: Transports
// ============================================================================

/// Answers one JSON-RPC request inline.
async fn serve_rpc(endpoint: &HostEndpoint, bytes: &[u8]) -> Response {
    let request = match parse_rpc(bytes) {
        Ok(request) => request,
        Err((status, response)) => return (status, Json(response)).into_response(),
    };
    match handle_rpc(endpoint.host(), request).await {
        Some((status, response)) => (status, Json(response)).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}

/// Opens a session stream and announces its `messages` URL.
fn open_session(endpoint: Arc<HostEndpoint>) -> Response {
    let session_id = Uuid::new_v4().simple().to_string();
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(SESSION_BUFFER);
    let announce = Event::default()
        .event("endpoint")
        .data(format!("{}/messages?session_id={session_id}", endpoint.prefix));
    if tx.try_send(Ok(announce)).is_err() {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    match endpoint.sessions.lock() {
        Ok(mut sessions) => {
            sessions.insert(session_id.clone(), tx.clone());
        }
        Err(_) => return StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
    tokio::spawn(async move {
        tx.closed().await;
        if let Ok(mut sessions) = endpoint.sessions.lock() {
            sessions.remove(&session_id);
        }
    });
    Sse::new(ReceiverStream::new(rx)).keep_alive(KeepAlive::default()).into_response()
}

/// Handles one JSON-RPC message for an open session.
async fn post_message(endpoint: &HostEndpoint, query: SessionQuery, bytes: &[u8]) -> Response {
    let Some(sender) = query.session_id.as_deref().and_then(|id| endpoint.session(id)) else {
        return session_not_found();
    };
    let request = match parse_rpc(bytes) {
        Ok(request) => request,
        Err((status, response)) => return (status, Json(response)).into_response(),
    };
    let Some((_, response)) = handle_rpc(endpoint.host(), request).await else {
        return StatusCode::ACCEPTED.into_response();
    };
    let payload =
        serde_json::to_string(&response).unwrap_or_else(|_| SERIALIZATION_FAILED.to_string());
    if sender.send(Ok(Event::default().event("message").data(payload))).await.is_err() {
        return session_not_found();
    }
    StatusCode::ACCEPTED.into_response()
}

/// 404 for a backend without a mounted endpoint.
fn not_mounted() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({"error": "backend not mounted"}))).into_response()
}

/// 404 for an unknown or closed session.
fn session_not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({"error": "session not found"}))).into_response()
}

// ============================================================================
// SECTION: Tests
// ============================================================================
