// crates/mcp-hub-server/src/invoke.rs
// ============================================================================
// Module: Invocation Surface
// Description: HTTP routes that stream dispatcher events as SSE.
// Purpose: Expose tool invocation and scoped metadata per backend.
// Dependencies: axum, mcp-hub-core, serde, serde_json, tokio-stream
// ============================================================================

//! ## Overview
//! `POST /invoke/{backendId}/{toolName}` streams the dispatcher's events as
//! server-sent events named `started`, `output`, `completed` and `error`,
//! each carrying a JSON payload. Unknown or inactive targets fail the
//! request (404 or 403) before a stream exists.
//!
//! `POST /invoke/{backendId}` accepts a generic envelope:
//! `{"method":"initialize"}`, `{"method":"tools.list"}`, or `{name, args}`
//! which delegates to the call route. Anything else is acknowledged.
//!
//! Clients that treat `/invoke/{backendId}` as a server base URL also get
//! `initialize`, `tools/list`, and empty `resources/list` and
//! `resources/read` routes beneath it. Those static segments take
//! precedence over tool names on the call route.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::convert::Infallible;

use axum::Json;
use axum::Router;
use axum::extract::Path;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::response::Sse;
use axum::response::sse::Event;
use axum::routing::get;
use axum::routing::post;
use mcp_hub_core::Arguments;
use mcp_hub_core::BackendId;
use mcp_hub_core::ToolName;
use serde::Deserialize;
use serde_json::Value;
use serde_json::json;
use tokio_stream::StreamExt;

use crate::admin::error_response;
use crate::admin::registry_failure;
use crate::dispatcher::DispatchError;
use crate::hosting::PROTOCOL_VERSION;
use crate::hosting::SERVER_VERSION;
use crate::runtime::GLOBAL_HOST_LABEL;
use crate::server::HubState;

// ============================================================================
// SECTION: Request Types
// ============================================================================

/// Body of the direct call route.
#[derive(Debug, Default, Deserialize)]
struct CallRequest {
    /// Tool arguments; absent means empty.
    #[serde(default)]
    args: Option<Arguments>,
}

/// Body of the `tools/call` alias route.
#[derive(Debug, Deserialize)]
struct NamedCallRequest {
    /// Tool name within the backend.
    name: String,
    /// Tool arguments; absent means empty.
    #[serde(default)]
    args: Option<Arguments>,
}

// ============================================================================
// SECTION: Router
// ============================================================================

/// Builds the invocation routes.
pub fn invoke_router(state: HubState) -> Router {
    Router::new()
        .route("/invoke/{backend_id}", get(liveness).post(envelope))
        .route("/invoke/{backend_id}/initialize", post(initialize))
        .route("/invoke/{backend_id}/tools/list", get(tools_list).post(tools_list))
        .route("/invoke/{backend_id}/resources/list", get(resources_list).post(resources_list))
        .route("/invoke/{backend_id}/resources/read", get(resources_read).post(resources_read))
        .route("/invoke/{backend_id}/tools/call", post(tools_call))
        .route("/invoke/{backend_id}/{tool_name}", post(call_tool))
        .with_state(state)
}

// ============================================================================
// SECTION: Handlers
// ============================================================================

/// Streams one invocation.
async fn call_tool(
    State(state): State<HubState>,
    Path((backend_id, tool_name)): Path<(String, String)>,
    body: Option<Json<CallRequest>>,
) -> Response {
    let args = body.and_then(|Json(request)| request.args).unwrap_or_default();
    stream_invocation(&state, BackendId::new(backend_id), ToolName::new(tool_name), args)
}

/// Protocol-convention alias of [`call_tool`].
async fn tools_call(
    State(state): State<HubState>,
    Path(backend_id): Path<String>,
    Json(request): Json<NamedCallRequest>,
) -> Response {
    stream_invocation(
        &state,
        BackendId::new(backend_id),
        ToolName::new(request.name),
        request.args.unwrap_or_default(),
    )
}

/// Reports that the backend's invocation base URL is live.
async fn liveness(State(state): State<HubState>, Path(backend_id): Path<String>) -> Response {
    match state.registry.backend(&BackendId::new(backend_id.as_str())) {
        Ok(Some(_)) => Json(json!({"ok": true, "server": backend_id})).into_response(),
        Ok(None) => error_response(StatusCode::NOT_FOUND, "backend not found"),
        Err(err) => registry_failure(&err),
    }
}

/// Lists the backend's tools in protocol metadata form.
async fn tools_list(State(state): State<HubState>, Path(backend_id): Path<String>) -> Response {
    list_payload(&state, &BackendId::new(backend_id))
}

/// Scoped `initialize` for clients that set a per-backend base URL.
async fn initialize(Path(backend_id): Path<String>) -> Response {
    Json(initialize_payload(&BackendId::new(backend_id))).into_response()
}

/// The hub serves no resources.
async fn resources_list() -> Response {
    Json(json!({"resources": []})).into_response()
}

/// Resource reads always come back empty.
async fn resources_read() -> Response {
    Json(json!({"content": null})).into_response()
}

/// Handles the generic envelope.
async fn envelope(
    State(state): State<HubState>,
    Path(backend_id): Path<String>,
    body: Option<Json<Value>>,
) -> Response {
    let body = body.map(|Json(value)| value).unwrap_or(Value::Null);
    let backend_id = BackendId::new(backend_id);
    match body.get("method").and_then(Value::as_str) {
        Some("initialize") => Json(initialize_payload(&backend_id)).into_response(),
        Some("tools.list" | "tools/list") => list_payload(&state, &backend_id),
        Some("resources.list" | "resources/list") => resources_list().await,
        Some("resources.read" | "resources/read") => resources_read().await,
        _ => match body.get("name").and_then(Value::as_str) {
            Some(name) => {
                let args = body
                    .get("args")
                    .or_else(|| body.get("arguments"))
                    .and_then(Value::as_object)
                    .cloned()
                    .unwrap_or_default();
                stream_invocation(&state, backend_id, ToolName::new(name), args)
            }
            None => Json(json!({"ok": true})).into_response(),
        },
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Starts a dispatch and wraps its events as SSE.
fn stream_invocation(
    state: &HubState,
    backend_id: BackendId,
    tool_name: ToolName,
    args: Arguments,
) -> Response {
    match state.dispatcher.invoke(backend_id, tool_name, args) {
        Ok(events) => {
            let stream = events.map(|event| {
                Ok::<_, Infallible>(Event::default().event(event.name()).data(event.data().to_string()))
            });
            Sse::new(stream).into_response()
        }
        Err(err @ DispatchError::NotFound(_)) => {
            error_response(StatusCode::NOT_FOUND, &err.to_string())
        }
        Err(err @ DispatchError::Inactive(_)) => {
            error_response(StatusCode::FORBIDDEN, &err.to_string())
        }
        Err(DispatchError::Registry(err)) => registry_failure(&err),
    }
}

/// Capability and version metadata for one backend.
fn initialize_payload(backend_id: &BackendId) -> Value {
    json!({
        "protocolVersion": PROTOCOL_VERSION,
        "serverInfo": {
            "name": format!("{GLOBAL_HOST_LABEL}:{backend_id}"),
            "version": SERVER_VERSION,
        },
        "capabilities": {"tools": {}, "resources": {}},
        "transport": "sse",
    })
}

/// Builds `{tools:[{name, description, inputSchema, parameters}]}`.
fn list_payload(state: &HubState, backend_id: &BackendId) -> Response {
    let tools = match state.registry.list_tools(backend_id) {
        Ok(tools) => tools,
        Err(err) => return registry_failure(&err),
    };
    let items: Vec<Value> = tools
        .iter()
        .map(|(name, binding)| {
            let schema = binding.advertised_schema();
            json!({
                "name": name.as_str(),
                "description": binding.description_or_empty(),
                "inputSchema": schema,
                "parameters": schema,
            })
        })
        .collect();
    Json(json!({"tools": items})).into_response()
}
