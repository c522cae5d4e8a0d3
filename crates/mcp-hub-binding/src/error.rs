// crates/mcp-hub-binding/src/error.rs
// ============================================================================
// Module: Binding Errors
// Description: Error taxonomy for request composition, execution, extraction.
// Purpose: Keep composer failures typed so callers can map them precisely.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! [`BindingError`] covers argument/template mismatches detected before any
//! network I/O. [`ExecutionError`] covers the HTTP exchange itself.
//! [`ExtractionError`] never escapes the composer: extraction failures degrade
//! to the unextracted value. [`ComposerError`] is the union returned by a full
//! invocation.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Argument mapping failures raised while composing a request.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BindingError {
    /// A path mapping references an argument the caller did not supply.
    #[error("Missing path arg: {0}")]
    MissingArgument(String),
    /// Template braces survived substitution.
    #[error("Unresolved path placeholders in pathTemplate: {0}")]
    UnresolvedPlaceholder(String),
    /// A path argument would add a `.` or `..` segment to the URL.
    #[error("Dot segment in path arg: {0}")]
    DotSegment(String),
    /// The composed URL does not parse or is not http(s).
    #[error("invalid request url: {0}")]
    InvalidUrl(String),
}

/// Failures during the upstream HTTP exchange.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    /// The HTTP client could not be constructed.
    #[error("http client build failed: {0}")]
    Client(String),
    /// A composed header name or value is not valid HTTP.
    #[error("invalid header: {0}")]
    InvalidHeader(String),
    /// The request exceeded the configured timeout.
    #[error("upstream request timed out")]
    Timeout,
    /// Connection-level failure.
    #[error("upstream request failed: {0}")]
    Transport(String),
    /// The response body exceeded the configured limit.
    #[error("upstream response exceeds size limit of {limit} bytes")]
    ResponseTooLarge {
        /// Configured limit in bytes.
        limit: usize,
    },
    /// The response body could not be read.
    #[error("failed to read upstream response: {0}")]
    Read(String),
}

/// Extraction expression failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    /// The expression does not parse.
    #[error("invalid extraction expression: {0}")]
    InvalidExpression(String),
}

/// Any failure of a full composer invocation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ComposerError {
    /// Request composition failed.
    #[error(transparent)]
    Binding(#[from] BindingError),
    /// The HTTP exchange failed.
    #[error(transparent)]
    Execution(#[from] ExecutionError),
}

impl ComposerError {
    /// Returns a stable label for audit records.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Binding(_) => "binding",
            Self::Execution(ExecutionError::Timeout) => "timeout",
            Self::Execution(_) => "execution",
        }
    }
}
