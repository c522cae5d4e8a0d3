// crates/mcp-hub-binding/src/extract.rs
// ============================================================================
// Module: Response Extraction
// Description: JSONPath selection over structured upstream responses.
// Purpose: Narrow a response to the value a tool actually returns.
// Dependencies: jsonpath_lib, serde_json
// ============================================================================

//! ## Overview
//! A single match yields that value; zero or several matches yield the list
//! of matches. Expressions without a leading `$` are rooted automatically.
//! [`apply_pick`] never fails: an invalid expression returns the document.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::borrow::Cow;

use jsonpath_lib::select;
use serde_json::Value;

use crate::error::ExtractionError;

// ============================================================================
// SECTION: Extraction
// ============================================================================

/// Evaluates a pick expression against a document.
///
/// # Errors
///
/// Returns [`ExtractionError::InvalidExpression`] when the expression does
/// not parse.
pub fn select_pick(document: &Value, expression: &str) -> Result<Value, ExtractionError> {
    let rooted = root_expression(expression);
    let matches = select(document, &rooted)
        .map_err(|_| ExtractionError::InvalidExpression(expression.to_string()))?;
    if let [single] = matches.as_slice() {
        return Ok((*single).clone());
    }
    Ok(Value::Array(matches.into_iter().cloned().collect()))
}

/// Applies an optional pick, falling back to the document on any failure.
#[must_use]
pub fn apply_pick(document: Value, pick: Option<&str>) -> Value {
    match pick {
        Some(expression) => select_pick(&document, expression).unwrap_or(document),
        None => document,
    }
}

/// Prefixes `$` (and a dot where needed) onto unrooted expressions.
fn root_expression(expression: &str) -> Cow<'_, str> {
    let trimmed = expression.trim();
    if trimmed.starts_with('$') {
        Cow::Borrowed(trimmed)
    } else if trimmed.starts_with('.') || trimmed.starts_with('[') {
        Cow::Owned(format!("${trimmed}"))
    } else {
        Cow::Owned(format!("$.{trimmed}"))
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
