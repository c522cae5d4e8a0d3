// crates/mcp-hub-server/src/admin.rs
// ============================================================================
// Module: Administrative Surface
// Description: CRUD routes for backends and tool bindings, plus stats.
// Purpose: Keep the registry and the registration runtime in step.
// Dependencies: axum, mcp-hub-binding, mcp-hub-core, serde_json
// ============================================================================

//! ## Overview
//! Every write goes to the [`mcp_hub_core::Registry`] first. Live wiring
//! follows as a second step whose outcome is audited and then deliberately
//! ignored, so CRUD responses never depend on registration or mounting:
//! - `PUT /backends/{id}` re-registers the backend's tools and mounts it;
//! - `DELETE /backends/{id}` deregisters the tools that were under it;
//! - `PUT /tools/{b}/{t}` registers the tool (or removes it when inactive);
//! - `DELETE /tools/{b}/{t}` deregisters it.
//!
//! `POST /tools/{b}/{t}/test` runs the binding once through the executor and
//! returns the full upstream result, ignoring activity flags.

// ============================================================================
// SECTION: Imports
// ============================================================================

use axum::Json;
use axum::Router;
use axum::extract::Path;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::get;
use axum::routing::post;
use mcp_hub_binding::ComposerError;
use mcp_hub_core::Arguments;
use mcp_hub_core::BackendConfig;
use mcp_hub_core::BackendId;
use mcp_hub_core::RegistryError;
use mcp_hub_core::ToolBinding;
use mcp_hub_core::ToolName;
use serde_json::json;

use crate::audit::RegistrationAction;
use crate::audit::RegistrationAuditEvent;
use crate::audit::RegistrationOutcome;
use crate::audit::now_ms;
use crate::runtime::MountOutcome;
use crate::runtime::Registration;
use crate::runtime::RuntimeError;
use crate::server::HubState;

// ============================================================================
// SECTION: Router
// ============================================================================

/// Builds the administrative routes.
pub fn admin_router(state: HubState) -> Router {
    Router::new()
        .route("/backends", get(list_backends))
        .route(
            "/backends/{backend_id}",
            get(get_backend).put(put_backend).post(put_backend).delete(delete_backend),
        )
        .route("/tools/{backend_id}", get(list_tools))
        .route(
            "/tools/{backend_id}/{tool_name}",
            get(get_tool).put(put_tool).post(put_tool).delete(delete_tool),
        )
        .route("/tools/{backend_id}/{tool_name}/test", post(test_tool))
        .route("/stats", get(stats))
        .route("/healthz", get(healthz))
        .with_state(state)
}

// ============================================================================
// SECTION: Backends
// ============================================================================

/// Lists every backend keyed by id.
async fn list_backends(State(state): State<HubState>) -> Response {
    match state.registry.list_backends() {
        Ok(backends) => Json(backends).into_response(),
        Err(err) => registry_failure(&err),
    }
}

/// Returns one backend.
async fn get_backend(State(state): State<HubState>, Path(backend_id): Path<String>) -> Response {
    match state.registry.backend(&BackendId::new(backend_id)) {
        Ok(Some(backend)) => Json(backend).into_response(),
        Ok(None) => error_response(StatusCode::NOT_FOUND, "backend not found"),
        Err(err) => registry_failure(&err),
    }
}

/// Upserts a backend, then re-registers its tools and mounts it.
async fn put_backend(
    State(state): State<HubState>,
    Path(backend_id): Path<String>,
    Json(config): Json<BackendConfig>,
) -> Response {
    let backend_id = BackendId::new(backend_id);
    if let Err(err) = state.registry.upsert_backend(backend_id.clone(), config) {
        return registry_failure(&err);
    }
    match state.runtime.register_backend_tools(&backend_id) {
        Ok(outcomes) => {
            for (tool_name, outcome) in outcomes {
                audit_registration(&state, &backend_id, Some(&tool_name), outcome);
            }
        }
        Err(err) => audit_registration(&state, &backend_id, None, Err(err)),
    }
    let _ = mount(&state, &backend_id);
    ok_response()
}

/// Deletes a backend with its tools and deregisters them.
async fn delete_backend(State(state): State<HubState>, Path(backend_id): Path<String>) -> Response {
    let backend_id = BackendId::new(backend_id);
    let tool_names = match state.registry.list_tools(&backend_id) {
        Ok(tools) => tools.into_keys().collect::<Vec<_>>(),
        Err(err) => return registry_failure(&err),
    };
    if let Err(err) = state.registry.delete_backend(&backend_id) {
        return registry_failure(&err);
    }
    for tool_name in &tool_names {
        let outcome = state.runtime.deregister_tool(&backend_id, tool_name);
        audit_deregistration(&state, &backend_id, tool_name, outcome);
    }
    ok_response()
}

// ============================================================================
// SECTION: Tools
// ============================================================================

/// Lists the tools under a backend keyed by name.
async fn list_tools(State(state): State<HubState>, Path(backend_id): Path<String>) -> Response {
    match state.registry.list_tools(&BackendId::new(backend_id)) {
        Ok(tools) => Json(tools).into_response(),
        Err(err) => registry_failure(&err),
    }
}

/// Returns one tool binding.
async fn get_tool(
    State(state): State<HubState>,
    Path((backend_id, tool_name)): Path<(String, String)>,
) -> Response {
    match state.registry.tool(&BackendId::new(backend_id), &ToolName::new(tool_name)) {
        Ok(Some(binding)) => Json(binding).into_response(),
        Ok(None) => error_response(StatusCode::NOT_FOUND, "tool not found"),
        Err(err) => registry_failure(&err),
    }
}

/// Upserts a tool binding, then registers it.
async fn put_tool(
    State(state): State<HubState>,
    Path((backend_id, tool_name)): Path<(String, String)>,
    Json(binding): Json<ToolBinding>,
) -> Response {
    let backend_id = BackendId::new(backend_id);
    let tool_name = ToolName::new(tool_name);
    if let Err(err) = state.registry.upsert_tool(backend_id.clone(), tool_name.clone(), binding) {
        return registry_failure(&err);
    }
    let outcome = state.runtime.register_tool(&backend_id, &tool_name);
    audit_registration(&state, &backend_id, Some(&tool_name), outcome);
    ok_response()
}

/// Deletes a tool binding and deregisters it.
async fn delete_tool(
    State(state): State<HubState>,
    Path((backend_id, tool_name)): Path<(String, String)>,
) -> Response {
    let backend_id = BackendId::new(backend_id);
    let tool_name = ToolName::new(tool_name);
    if let Err(err) = state.registry.delete_tool(&backend_id, &tool_name) {
        return registry_failure(&err);
    }
    let outcome = state.runtime.deregister_tool(&backend_id, &tool_name);
    audit_deregistration(&state, &backend_id, &tool_name, outcome);
    ok_response()
}

/// Executes a binding once and returns the full upstream result.
async fn test_tool(
    State(state): State<HubState>,
    Path((backend_id, tool_name)): Path<(String, String)>,
    Json(args): Json<Arguments>,
) -> Response {
    let backend_id = BackendId::new(backend_id);
    let tool_name = ToolName::new(tool_name);
    let (backend, binding) = match state.registry.backend(&backend_id) {
        Ok(None) => return error_response(StatusCode::NOT_FOUND, "backend not found"),
        Err(err) => return registry_failure(&err),
        Ok(Some(backend)) => match state.registry.tool(&backend_id, &tool_name) {
            Ok(Some(binding)) => (backend, binding),
            Ok(None) => return error_response(StatusCode::NOT_FOUND, "tool not found"),
            Err(err) => return registry_failure(&err),
        },
    };
    match state.executor.invoke(&backend, &binding, &args).await {
        Ok(result) => Json(result).into_response(),
        Err(err @ ComposerError::Binding(_)) => {
            error_response(StatusCode::BAD_REQUEST, &err.to_string())
        }
        Err(err @ ComposerError::Execution(_)) => {
            error_response(StatusCode::BAD_GATEWAY, &err.to_string())
        }
    }
}

// ============================================================================
// SECTION: Stats
// ============================================================================

/// Returns aggregate registry counts.
async fn stats(State(state): State<HubState>) -> Response {
    match state.registry.stats() {
        Ok(stats) => Json(stats).into_response(),
        Err(err) => registry_failure(&err),
    }
}

/// Liveness check.
async fn healthz() -> Response {
    Json(json!({"ok": true, "timestampMs": now_ms()})).into_response()
}

// ============================================================================
// SECTION: Live Wiring
// ============================================================================

/// Mounts a backend and audits the outcome.
fn mount(state: &HubState, backend_id: &BackendId) -> Result<MountOutcome, RuntimeError> {
    let outcome = state.runtime.ensure_mounted(backend_id);
    let (label, reason) = match &outcome {
        Ok(MountOutcome::Mounted) => (RegistrationOutcome::Ok, None),
        Ok(MountOutcome::AlreadyMounted) => {
            (RegistrationOutcome::Skipped, Some("already_mounted".to_string()))
        }
        Ok(MountOutcome::NoSurface) => (RegistrationOutcome::Skipped, Some("no_surface".to_string())),
        Err(err) => (RegistrationOutcome::Error, Some(err.to_string())),
    };
    state.audit.record_registration(&RegistrationAuditEvent::new(
        backend_id.clone(),
        None,
        RegistrationAction::Mount,
        label,
        reason,
    ));
    outcome
}

/// Audits a registration outcome.
fn audit_registration(
    state: &HubState,
    backend_id: &BackendId,
    tool_name: Option<&ToolName>,
    outcome: Result<Registration, RuntimeError>,
) {
    let (label, reason) = match outcome {
        Ok(Registration::Registered) => (RegistrationOutcome::Ok, None),
        Ok(Registration::Skipped) => {
            (RegistrationOutcome::Skipped, Some("inactive_or_missing".to_string()))
        }
        Err(err) => (RegistrationOutcome::Error, Some(err.to_string())),
    };
    state.audit.record_registration(&RegistrationAuditEvent::new(
        backend_id.clone(),
        tool_name.cloned(),
        RegistrationAction::Register,
        label,
        reason,
    ));
}

/// Audits a deregistration outcome.
fn audit_deregistration(
    state: &HubState,
    backend_id: &BackendId,
    tool_name: &ToolName,
    outcome: Result<(), RuntimeError>,
) {
    let (label, reason) = match outcome {
        Ok(()) => (RegistrationOutcome::Ok, None),
        Err(err) => (RegistrationOutcome::Error, Some(err.to_string())),
    };
    state.audit.record_registration(&RegistrationAuditEvent::new(
        backend_id.clone(),
        Some(tool_name.clone()),
        RegistrationAction::Deregister,
        label,
        reason,
    ));
}

// ============================================================================
// SECTION: Responses
// ============================================================================

/// `{"ok": true}` acknowledgement.
fn ok_response() -> Response {
    Json(json!({"ok": true})).into_response()
}

/// `{"error": message}` with a status code.
pub(crate) fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({"error": message}))).into_response()
}

/// 500 for a poisoned registry.
pub(crate) fn registry_failure(err: &RegistryError) -> Response {
    error_response(StatusCode::INTERNAL_SERVER_ERROR, &err.to_string())
}
