// crates/mcp-hub-core/src/identifiers.rs
// ============================================================================
// Module: MCP Hub Identifiers
// Description: Opaque identifiers for registered backends and tools.
// Purpose: Provide strongly typed, serializable keys with stable string forms.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Backends are keyed by a caller-chosen [`BackendId`]; tools are keyed by a
//! [`ToolName`] unique within their backend. Both serialize as plain strings.
//! Shape validation happens at the administrative boundary, not here.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Identifier Types
// ============================================================================

/// Caller-chosen identifier of a registered backend.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BackendId(String);

impl BackendId {
    /// Creates a new backend identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BackendId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for BackendId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for BackendId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Name of a tool binding, unique within its backend.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ToolName(String);

impl ToolName {
    /// Creates a new tool name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the composite key used by the global tool table.
    #[must_use]
    pub fn qualified(&self, backend_id: &BackendId) -> String {
        format!("{}.{}", backend_id.as_str(), self.0)
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for ToolName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ToolName {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}
