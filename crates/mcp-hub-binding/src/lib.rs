// crates/mcp-hub-binding/src/lib.rs
// ============================================================================
// Module: MCP Hub Binding Composer
// Description: Argument-to-HTTP translation, execution, and extraction.
// Purpose: Turn a declarative tool binding into one upstream HTTP exchange.
// Dependencies: mcp-hub-core, reqwest, jsonpath_lib, serde_json, thiserror
// ============================================================================

//! ## Overview
//! The binding composer is stateless across calls and never mutates the
//! registry. Composition ([`compose_request`]) is pure and synchronous;
//! execution ([`HttpExecutor::invoke`]) is the only suspension point.
//!
//! Invariants:
//! - A successfully composed path never contains `{` or `}`.
//! - A mapped path argument that is absent always yields
//!   [`BindingError::MissingArgument`].
//! - Extraction never fails a call.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod compose;
pub mod error;
pub mod execute;
pub mod extract;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use compose::ComposedRequest;
pub use compose::RequestBody;
pub use compose::compose_body;
pub use compose::compose_headers;
pub use compose::compose_path;
pub use compose::compose_query;
pub use compose::compose_request;
pub use error::BindingError;
pub use error::ComposerError;
pub use error::ExecutionError;
pub use error::ExtractionError;
pub use execute::HttpExecutor;
pub use execute::HttpExecutorConfig;
pub use execute::InvocationResult;
pub use extract::apply_pick;
pub use extract::select_pick;
