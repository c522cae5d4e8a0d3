// crates/mcp-hub-server/src/session.rs
// ============================================================================
// Module: Session Identifier Normalizer
// Description: Rewrites UUID session ids in query strings to compact form.
// Purpose: Let callers send hyphenated or compact ids to session endpoints.
// Dependencies: axum, url, uuid
// ============================================================================

//! ## Overview
//! Hosted session lookups key on the compact 32-digit hexadecimal UUID form.
//! This filter inspects `session_id` (and `sessionId`) on inbound requests
//! and rewrites any valid hyphenated or compact UUID to the lower-case
//! compact form. Anything else, including absent parameters, passes through
//! untouched. The filter holds no state.

// ============================================================================
// SECTION: Imports
// ============================================================================

use axum::extract::Request;
use axum::http::Uri;
use axum::http::uri::PathAndQuery;
use axum::middleware::Next;
use axum::response::Response;
use url::form_urlencoded;
use uuid::Uuid;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Query parameters that carry a session identifier.
pub const SESSION_QUERY_KEYS: [&str; 2] = ["session_id", "sessionId"];

/// Length of the compact hexadecimal form.
const COMPACT_LEN: usize = 32;

/// Length of the hyphenated form.
const HYPHENATED_LEN: usize = 36;

// ============================================================================
// SECTION: Normalization
// ============================================================================

/// Returns the compact form of a UUID session id, or the input unchanged.
#[must_use]
pub fn normalize_session_id(value: &str) -> String {
    if !matches!(value.len(), COMPACT_LEN | HYPHENATED_LEN) {
        return value.to_string();
    }
    Uuid::try_parse(value).map_or_else(|_| value.to_string(), |id| id.simple().to_string())
}

/// Rewrites session parameters in a raw query string.
///
/// Returns `None` when nothing changed, so untouched queries keep their
/// original encoding.
#[must_use]
pub fn rewrite_session_query(query: &str) -> Option<String> {
    let mut changed = false;
    let pairs: Vec<(String, String)> = form_urlencoded::parse(query.as_bytes())
        .map(|(key, value)| {
            if SESSION_QUERY_KEYS.contains(&key.as_ref()) {
                let normalized = normalize_session_id(&value);
                if normalized != value {
                    changed = true;
                    return (key.into_owned(), normalized);
                }
            }
            (key.into_owned(), value.into_owned())
        })
        .collect();
    if !changed {
        return None;
    }
    Some(form_urlencoded::Serializer::new(String::new()).extend_pairs(pairs).finish())
}

// ============================================================================
// SECTION: Middleware
// ============================================================================

/// Request filter applying [`rewrite_session_query`] to the request URI.
pub async fn normalize_session_query(mut request: Request, next: Next) -> Response {
    let rewritten = request
        .uri()
        .query()
        .and_then(rewrite_session_query)
        .and_then(|query| with_query(request.uri(), &query));
    if let Some(uri) = rewritten {
        *request.uri_mut() = uri;
    }
    next.run(request).await
}

/// Replaces the query component of a URI.
fn with_query(uri: &Uri, query: &str) -> Option<Uri> {
    let path_and_query = PathAndQuery::try_from(format!("{}?{query}", uri.path())).ok()?;
    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(path_and_query);
    Uri::from_parts(parts).ok()
}

// ============================================================================
// SECTION: Tests
// ============================================================================
