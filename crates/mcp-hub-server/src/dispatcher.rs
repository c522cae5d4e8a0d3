// crates/mcp-hub-server/src/dispatcher.rs
// ============================================================================
// Module: Invocation Dispatcher
// Description: Precondition checks, schema validation, and primary/fallback
//              execution emitted as an ordered event stream.
// Purpose: Turn one tool call into a started/output/completed/error sequence.
// Dependencies: jsonschema, mcp-hub-binding, mcp-hub-core, tokio
// ============================================================================

//! ## Overview
//! [`Dispatcher::invoke`] rejects unknown or inactive targets before any
//! event exists. Accepted calls run on their own task and stream
//! [`InvocationEvent`]s through a bounded channel:
//!
//! 1. `started`
//! 2. `error` on schema validation failure, otherwise execution
//! 3. `output` then `completed`, or a single `error`
//!
//! Execution first goes through the runtime's hosted handler. Any failure
//! there falls back to the binding composer with the precondition snapshot,
//! which also reports the real upstream status.
//!
//! The task races execution against the receiver closing. Dropping the
//! stream drops the in-flight upstream request.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use jsonschema::Draft;
use jsonschema::Validator;
use mcp_hub_binding::HttpExecutor;
use mcp_hub_core::Arguments;
use mcp_hub_core::BackendConfig;
use mcp_hub_core::BackendId;
use mcp_hub_core::Registry;
use mcp_hub_core::RegistryError;
use mcp_hub_core::ToolBinding;
use mcp_hub_core::ToolName;
use serde_json::Value;
use serde_json::json;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::audit::HubAuditSink;
use crate::audit::InvocationAuditEvent;
use crate::audit::InvocationAuditEventParams;
use crate::audit::InvocationOutcome;
use crate::audit::InvocationPath;
use crate::host::ToolCallError;
use crate::runtime::ToolRuntime;
use crate::telemetry::HubMetrics;
use crate::telemetry::InvocationMetricEvent;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Event channel capacity; one invocation emits at most three events.
const EVENT_BUFFER: usize = 4;

/// Prefix of validation failure messages.
const VALIDATION_PREFIX: &str = "schema_validation_error";

// ============================================================================
// SECTION: Types
// ============================================================================

/// Request-level dispatch failures. No event has been emitted.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// Backend or tool is not registered.
    #[error("{0}")]
    NotFound(&'static str),
    /// Backend or tool is registered but inactive.
    #[error("{0}")]
    Inactive(&'static str),
    /// The registry could not be read.
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// One event of an invocation stream.
#[derive(Debug, Clone, PartialEq)]
pub enum InvocationEvent {
    /// The call was accepted.
    Started {
        /// Target backend.
        backend_id: BackendId,
        /// Target tool.
        tool_name: ToolName,
    },
    /// Payload from the successful execution path.
    Output(Value),
    /// Terminal success event.
    Completed {
        /// 200 for the primary path, else the upstream status.
        status: u16,
    },
    /// Terminal failure event.
    Error {
        /// Final failure message.
        error: String,
    },
}

impl InvocationEvent {
    /// Returns the wire event name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Started {
                ..
            } => "started",
            Self::Output(_) => "output",
            Self::Completed {
                ..
            } => "completed",
            Self::Error {
                ..
            } => "error",
        }
    }

    /// Returns the wire payload.
    #[must_use]
    pub fn data(&self) -> Value {
        match self {
            Self::Started {
                backend_id,
                tool_name,
            } => json!({"backendId": backend_id.as_str(), "toolName": tool_name.as_str()}),
            Self::Output(value) => value.clone(),
            Self::Completed {
                status,
            } => json!({"status": status}),
            Self::Error {
                error,
            } => json!({"error": error}),
        }
    }

    /// Returns true for `completed` and `error`.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed {
                ..
            } | Self::Error {
                ..
            }
        )
    }
}

// ============================================================================
// SECTION: Dispatcher
// ============================================================================

/// Invocation dispatcher.
pub struct Dispatcher {
    /// Source of truth for preconditions.
    registry: Registry,
    /// Primary execution path.
    runtime: Arc<ToolRuntime>,
    /// Fallback execution path.
    executor: Arc<HttpExecutor>,
    /// Audit sink.
    audit: Arc<dyn HubAuditSink>,
    /// Metrics sink.
    metrics: Arc<dyn HubMetrics>,
}

impl Dispatcher {
    /// Creates a dispatcher over shared components.
    #[must_use]
    pub fn new(
        registry: Registry,
        runtime: Arc<ToolRuntime>,
        executor: Arc<HttpExecutor>,
        audit: Arc<dyn HubAuditSink>,
        metrics: Arc<dyn HubMetrics>,
    ) -> Self {
        Self {
            registry,
            runtime,
            executor,
            audit,
            metrics,
        }
    }

    /// Starts an invocation and returns its event stream.
    ///
    /// Must be called within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError`] when the backend or tool is missing or
    /// inactive; no event is emitted in that case.
    pub fn invoke(
        &self,
        backend_id: BackendId,
        tool_name: ToolName,
        args: Arguments,
    ) -> Result<ReceiverStream<InvocationEvent>, DispatchError> {
        let (backend, binding) = self.preconditions(&backend_id, &tool_name)?;
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let job = Invocation {
            runtime: Arc::clone(&self.runtime),
            executor: Arc::clone(&self.executor),
            audit: Arc::clone(&self.audit),
            backend,
            binding,
            backend_id,
            tool_name,
            args,
        };
        let audit = Arc::clone(&self.audit);
        let metrics = Arc::clone(&self.metrics);
        tokio::spawn(async move {
            let started_at = Instant::now();
            let mut path = InvocationPath::None;
            let report = tokio::select! {
                () = tx.closed() => None,
                report = job.run(&tx, &mut path) => report,
            };
            let report = report.unwrap_or(Report {
                outcome: InvocationOutcome::Cancelled,
                status: None,
                error_kind: None,
            });
            job.finish(path, &report, started_at.elapsed(), audit.as_ref(), metrics.as_ref());
        });
        Ok(ReceiverStream::new(rx))
    }

    /// Checks existence before activity, backend before tool.
    fn preconditions(
        &self,
        backend_id: &BackendId,
        tool_name: &ToolName,
    ) -> Result<(BackendConfig, ToolBinding), DispatchError> {
        let backend =
            self.registry.backend(backend_id)?.ok_or(DispatchError::NotFound("backend not found"))?;
        let binding = self
            .registry
            .tool(backend_id, tool_name)?
            .ok_or(DispatchError::NotFound("tool not found"))?;
        if !backend.active {
            return Err(DispatchError::Inactive("backend inactive"));
        }
        if !binding.active {
            return Err(DispatchError::Inactive("tool inactive"));
        }
        Ok((backend, binding))
    }
}

// ============================================================================
// SECTION: Invocation Task
// ============================================================================

/// State moved into one invocation task.
struct Invocation {
    /// Primary path.
    runtime: Arc<ToolRuntime>,
    /// Fallback path.
    executor: Arc<HttpExecutor>,
    /// Audit sink for primary-path failures.
    audit: Arc<dyn HubAuditSink>,
    /// Backend snapshot taken by the precondition check.
    backend: BackendConfig,
    /// Tool snapshot taken by the precondition check.
    binding: ToolBinding,
    /// Target backend.
    backend_id: BackendId,
    /// Target tool.
    tool_name: ToolName,
    /// Caller arguments.
    args: Arguments,
}

/// Terminal state of a finished invocation.
struct Report {
    /// Outcome label.
    outcome: InvocationOutcome,
    /// Status on success.
    status: Option<u16>,
    /// Error kind on failure.
    error_kind: Option<&'static str>,
}

impl Invocation {
    /// Emits the event sequence. Returns `None` when the receiver went away.
    async fn run(
        &self,
        tx: &mpsc::Sender<InvocationEvent>,
        path: &mut InvocationPath,
    ) -> Option<Report> {
        let started = InvocationEvent::Started {
            backend_id: self.backend_id.clone(),
            tool_name: self.tool_name.clone(),
        };
        tx.send(started).await.ok()?;

        if let Err(message) = validate_arguments(self.binding.input_schema.as_ref(), &self.args) {
            tx.send(InvocationEvent::Error {
                error: message,
            })
            .await
            .ok()?;
            return Some(Report {
                outcome: InvocationOutcome::Error,
                status: None,
                error_kind: Some("validation"),
            });
        }

        *path = InvocationPath::Primary;
        let primary_started = Instant::now();
        match self.runtime.call(&self.backend_id, &self.tool_name, self.args.clone()).await {
            Ok(data) => return self.succeed(tx, data, 200).await,
            Err(err) => {
                self.audit.record_invocation(&InvocationAuditEvent::new(
                    InvocationAuditEventParams {
                        backend_id: self.backend_id.clone(),
                        tool_name: self.tool_name.clone(),
                        path: InvocationPath::Primary,
                        outcome: InvocationOutcome::Error,
                        status: None,
                        error_kind: Some(primary_error_kind(&err)),
                        latency_ms: primary_started.elapsed().as_millis(),
                    },
                ));
            }
        }

        *path = InvocationPath::Fallback;
        match self.executor.invoke(&self.backend, &self.binding, &self.args).await {
            Ok(result) => self.succeed(tx, result.data, result.status_code).await,
            Err(err) => {
                tx.send(InvocationEvent::Error {
                    error: err.to_string(),
                })
                .await
                .ok()?;
                Some(Report {
                    outcome: InvocationOutcome::Error,
                    status: None,
                    error_kind: Some(err.kind()),
                })
            }
        }
    }

    /// Emits `output` then `completed`.
    async fn succeed(
        &self,
        tx: &mpsc::Sender<InvocationEvent>,
        data: Value,
        status: u16,
    ) -> Option<Report> {
        tx.send(InvocationEvent::Output(data)).await.ok()?;
        tx.send(InvocationEvent::Completed {
            status,
        })
        .await
        .ok()?;
        Some(Report {
            outcome: InvocationOutcome::Ok,
            status: Some(status),
            error_kind: None,
        })
    }

    /// Records the final audit event and metrics.
    fn finish(
        &self,
        path: InvocationPath,
        report: &Report,
        latency: Duration,
        audit: &dyn HubAuditSink,
        metrics: &dyn HubMetrics,
    ) {
        audit.record_invocation(&InvocationAuditEvent::new(InvocationAuditEventParams {
            backend_id: self.backend_id.clone(),
            tool_name: self.tool_name.clone(),
            path,
            outcome: report.outcome,
            status: report.status,
            error_kind: report.error_kind,
            latency_ms: latency.as_millis(),
        }));
        let event = InvocationMetricEvent {
            backend_id: self.backend_id.clone(),
            tool_name: self.tool_name.clone(),
            path,
            outcome: report.outcome,
            status: report.status,
        };
        metrics.record_invocation(event.clone());
        metrics.record_latency(event, latency);
    }
}

// ============================================================================
// SECTION: Validation
// ============================================================================

/// Validates arguments against a declared schema. Absent schemas pass.
///
/// # Errors
///
/// Returns the `schema_validation_error: ...` message when the schema does
/// not compile or the arguments do not conform.
pub fn validate_arguments(schema: Option<&Value>, args: &Arguments) -> Result<(), String> {
    let Some(schema) = schema else {
        return Ok(());
    };
    let validator = compile_schema(schema)?;
    let instance = Value::Object(args.clone());
    let messages: Vec<String> = validator.iter_errors(&instance).map(|err| err.to_string()).collect();
    if messages.is_empty() {
        Ok(())
    } else {
        Err(format!("{VALIDATION_PREFIX}: {}", messages.join("; ")))
    }
}

/// Compiles a JSON schema for validation.
fn compile_schema(schema: &Value) -> Result<Validator, String> {
    jsonschema::options()
        .with_draft(Draft::Draft202012)
        .build(schema)
        .map_err(|err| format!("{VALIDATION_PREFIX}: invalid schema: {err}"))
}

/// Labels a primary-path failure for audit.
const fn primary_error_kind(err: &ToolCallError) -> &'static str {
    match err {
        ToolCallError::UnknownTool(_) => "not_hosted",
        ToolCallError::Handler(_) | ToolCallError::Poisoned => "runtime",
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
