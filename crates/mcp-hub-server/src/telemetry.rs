// crates/mcp-hub-server/src/telemetry.rs
// ============================================================================
// Module: MCP Hub Telemetry
// Description: Observability hooks for tool invocations.
// Purpose: Provide metric events and latency buckets without hard deps.
// Dependencies: mcp-hub-core
// ============================================================================

//! ## Overview
//! A thin metrics interface for invocation counters and latency histograms.
//! Deployments can plug in their own exporter; the default discards events.
//! Labels carry identifiers only, never arguments or payloads.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use mcp_hub_core::BackendId;
use mcp_hub_core::ToolName;

use crate::audit::InvocationOutcome;
use crate::audit::InvocationPath;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default latency buckets in milliseconds for invocation histograms.
pub const INVOCATION_LATENCY_BUCKETS_MS: &[u64] =
    &[5, 10, 25, 50, 100, 250, 500, 1_000, 2_500, 5_000, 10_000, 30_000];

// ============================================================================
// SECTION: Metric Events
// ============================================================================

/// Invocation metric event payload.
///
/// # Invariants
/// - `status` is `None` unless `outcome` is [`InvocationOutcome::Ok`].
#[derive(Debug, Clone)]
pub struct InvocationMetricEvent {
    /// Backend identifier.
    pub backend_id: BackendId,
    /// Tool name.
    pub tool_name: ToolName,
    /// Execution path that decided the outcome.
    pub path: InvocationPath,
    /// Invocation outcome.
    pub outcome: InvocationOutcome,
    /// Reported status code.
    pub status: Option<u16>,
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Metrics sink for tool invocations.
pub trait HubMetrics: Send + Sync {
    /// Records an invocation counter event.
    fn record_invocation(&self, event: InvocationMetricEvent);
    /// Records a latency observation for the invocation.
    fn record_latency(&self, event: InvocationMetricEvent, latency: Duration);
}

/// No-op metrics sink.
///
/// # Invariants
/// - Metrics are intentionally discarded.
pub struct NoopMetrics;

impl HubMetrics for NoopMetrics {
    fn record_invocation(&self, _event: InvocationMetricEvent) {}

    fn record_latency(&self, _event: InvocationMetricEvent, _latency: Duration) {}
}
