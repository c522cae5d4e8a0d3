// crates/mcp-hub-server/src/lib.rs
// ============================================================================
// Module: MCP Hub Server
// Description: Tool hosting, registration runtime, dispatcher, HTTP surfaces.
// Purpose: Serve registered REST bindings as MCP tools and SSE invocations.
// Dependencies: mcp-hub-core, mcp-hub-binding, mcp-hub-config, axum, tokio
// ============================================================================

//! ## Overview
//! The server crate owns every live component of the hub:
//! - [`runtime::ToolRuntime`] keeps the global and per-backend
//!   [`host::ToolHost`] tables in sync with the registry;
//! - [`dispatcher::Dispatcher`] runs invocations as ordered event streams
//!   with a runtime-first, composer-fallback execution path;
//! - [`session`] normalizes session ids in front of hosted endpoints;
//! - [`server::HubServer`] wires them behind one axum router.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod admin;
pub mod audit;
pub mod dispatcher;
pub mod host;
pub mod hosting;
pub mod invoke;
pub mod runtime;
pub mod server;
pub mod session;
pub mod telemetry;

#[cfg(test)]
mod test_support;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::FileAuditSink;
pub use audit::HubAuditSink;
pub use audit::InvocationAuditEvent;
pub use audit::NoopAuditSink;
pub use audit::RegistrationAuditEvent;
pub use audit::StderrAuditSink;
pub use dispatcher::DispatchError;
pub use dispatcher::Dispatcher;
pub use dispatcher::InvocationEvent;
pub use host::ToolCallError;
pub use host::ToolDescriptor;
pub use host::ToolHandler;
pub use host::ToolHost;
pub use hosting::MountedEndpoints;
pub use runtime::MountOutcome;
pub use runtime::MountSurface;
pub use runtime::Registration;
pub use runtime::RuntimeError;
pub use runtime::ToolRuntime;
pub use server::HubServer;
pub use server::HubServerError;
pub use server::HubState;
pub use session::normalize_session_id;
pub use telemetry::HubMetrics;
pub use telemetry::INVOCATION_LATENCY_BUCKETS_MS;
pub use telemetry::NoopMetrics;
