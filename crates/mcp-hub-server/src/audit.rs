// crates/mcp-hub-server/src/audit.rs
// ============================================================================
// Module: MCP Hub Audit Logging
// Description: Structured audit events for registration and invocation.
// Purpose: Emit JSON-line audit records without hard logging dependencies.
// Dependencies: mcp-hub-core, serde
// ============================================================================

//! ## Overview
//! Audit events are serialized as one JSON object per line. Sinks decide
//! where lines go: stderr, an append-only file, or nowhere. Events never
//! carry arguments, auth values, or response payloads.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use mcp_hub_core::BackendId;
use mcp_hub_core::ToolName;
use serde::Serialize;

// ============================================================================
// SECTION: Labels
// ============================================================================

/// Registration runtime actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationAction {
    /// Tool added to (or refreshed in) the handler tables.
    Register,
    /// Tool removed from the handler tables.
    Deregister,
    /// Per-backend hosting endpoint created.
    Mount,
}

/// Registration outcome labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationOutcome {
    /// Action applied.
    Ok,
    /// Action was a no-op (inactive tool, already mounted, no surface).
    Skipped,
    /// Action failed and was ignored.
    Error,
}

/// Which execution path produced the invocation outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InvocationPath {
    /// Managed tool runtime handler.
    Primary,
    /// Direct binding composer call.
    Fallback,
    /// Stopped before execution (validation).
    None,
}

/// Invocation outcome labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InvocationOutcome {
    /// `output` and `completed` were emitted.
    Ok,
    /// `error` was emitted.
    Error,
    /// The caller went away before a terminal event.
    Cancelled,
}

// ============================================================================
// SECTION: Events
// ============================================================================

/// Registration runtime audit event.
#[derive(Debug, Clone, Serialize)]
pub struct RegistrationAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Backend identifier.
    pub backend_id: BackendId,
    /// Tool name, absent for mount events.
    pub tool_name: Option<ToolName>,
    /// Runtime action.
    pub action: RegistrationAction,
    /// Action outcome.
    pub outcome: RegistrationOutcome,
    /// Short reason label or error message.
    pub reason: Option<String>,
}

impl RegistrationAuditEvent {
    /// Creates a registration event with a consistent timestamp.
    #[must_use]
    pub fn new(
        backend_id: BackendId,
        tool_name: Option<ToolName>,
        action: RegistrationAction,
        outcome: RegistrationOutcome,
        reason: Option<String>,
    ) -> Self {
        Self {
            event: "tool_registration",
            timestamp_ms: now_ms(),
            backend_id,
            tool_name,
            action,
            outcome,
            reason,
        }
    }
}

/// Invocation audit event.
#[derive(Debug, Clone, Serialize)]
pub struct InvocationAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Backend identifier.
    pub backend_id: BackendId,
    /// Tool name.
    pub tool_name: ToolName,
    /// Execution path that decided the outcome.
    pub path: InvocationPath,
    /// Invocation outcome.
    pub outcome: InvocationOutcome,
    /// Reported status code on success.
    pub status: Option<u16>,
    /// Normalized error kind label.
    pub error_kind: Option<&'static str>,
    /// Wall-clock latency in milliseconds.
    pub latency_ms: u128,
}

/// Inputs required to construct an invocation audit event.
pub struct InvocationAuditEventParams {
    /// Backend identifier.
    pub backend_id: BackendId,
    /// Tool name.
    pub tool_name: ToolName,
    /// Execution path that decided the outcome.
    pub path: InvocationPath,
    /// Invocation outcome.
    pub outcome: InvocationOutcome,
    /// Reported status code on success.
    pub status: Option<u16>,
    /// Normalized error kind label.
    pub error_kind: Option<&'static str>,
    /// Wall-clock latency in milliseconds.
    pub latency_ms: u128,
}

impl InvocationAuditEvent {
    /// Creates an invocation event with a consistent timestamp.
    #[must_use]
    pub fn new(params: InvocationAuditEventParams) -> Self {
        Self {
            event: "tool_invocation",
            timestamp_ms: now_ms(),
            backend_id: params.backend_id,
            tool_name: params.tool_name,
            path: params.path,
            outcome: params.outcome,
            status: params.status,
            error_kind: params.error_kind,
            latency_ms: params.latency_ms,
        }
    }
}

/// Server startup audit event.
#[derive(Debug, Clone, Serialize)]
pub struct StartupAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Bound socket address.
    pub bind: String,
    /// Whether session id normalization is active.
    pub session_id_normalization: bool,
}

impl StartupAuditEvent {
    /// Creates a startup event with a consistent timestamp.
    #[must_use]
    pub fn new(bind: SocketAddr, session_id_normalization: bool) -> Self {
        Self {
            event: "server_startup",
            timestamp_ms: now_ms(),
            bind: bind.to_string(),
            session_id_normalization,
        }
    }
}

/// Milliseconds since the Unix epoch.
#[must_use]
pub fn now_ms() -> u128 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis()
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Audit sink for hub events.
pub trait HubAuditSink: Send + Sync {
    /// Record a registration runtime event.
    fn record_registration(&self, event: &RegistrationAuditEvent);

    /// Record an invocation event.
    fn record_invocation(&self, event: &InvocationAuditEvent);

    /// Record a startup event.
    fn record_startup(&self, _event: &StartupAuditEvent) {}
}

/// Audit sink that logs JSON lines to stderr.
pub struct StderrAuditSink;

impl StderrAuditSink {
    /// Writes one serialized event line to stderr.
    fn emit(event: &impl Serialize) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(io::stderr(), "{payload}");
        }
    }
}

impl HubAuditSink for StderrAuditSink {
    fn record_registration(&self, event: &RegistrationAuditEvent) {
        Self::emit(event);
    }

    fn record_invocation(&self, event: &InvocationAuditEvent) {
        Self::emit(event);
    }

    fn record_startup(&self, event: &StartupAuditEvent) {
        Self::emit(event);
    }
}

/// Audit sink that logs JSON lines to a file.
pub struct FileAuditSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileAuditSink {
    /// Opens the audit log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }

    /// Appends one serialized event line.
    fn emit(&self, event: &impl Serialize) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

impl HubAuditSink for FileAuditSink {
    fn record_registration(&self, event: &RegistrationAuditEvent) {
        self.emit(event);
    }

    fn record_invocation(&self, event: &InvocationAuditEvent) {
        self.emit(event);
    }

    fn record_startup(&self, event: &StartupAuditEvent) {
        self.emit(event);
    }
}

/// No-op audit sink.
pub struct NoopAuditSink;

impl HubAuditSink for NoopAuditSink {
    fn record_registration(&self, _event: &RegistrationAuditEvent) {}

    fn record_invocation(&self, _event: &InvocationAuditEvent) {}
}
