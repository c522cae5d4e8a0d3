// crates/mcp-hub-core/src/lib.rs
// ============================================================================
// Module: MCP Hub Core
// Description: Backend/tool data model and the authoritative in-memory registry.
// Purpose: Provide the leaf types every other MCP Hub crate builds on.
// Dependencies: serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! `mcp-hub-core` defines how a backend HTTP service and its tool bindings are
//! described ([`BackendConfig`], [`ToolBinding`]) and owns the process-lifetime
//! [`Registry`] that stores them. Every read returns an independent copy, so
//! dependent components only ever see snapshots.
//!
//! Invariants:
//! - `(BackendId, ToolName)` identifies at most one [`ToolBinding`].
//! - Deleting a backend removes every tool registered under it.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod identifiers;
pub mod model;
pub mod registry;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use identifiers::BackendId;
pub use identifiers::ToolName;
pub use model::Arguments;
pub use model::ArgumentMapping;
pub use model::AuthKind;
pub use model::AuthSpec;
pub use model::BackendConfig;
pub use model::HttpMethod;
pub use model::ResponseMapping;
pub use model::ToolBinding;
pub use registry::Registry;
pub use registry::RegistryError;
pub use registry::RegistryStats;
