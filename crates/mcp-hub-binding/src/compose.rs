// crates/mcp-hub-binding/src/compose.rs
// ============================================================================
// Module: Request Composition
// Description: Turns a binding plus an argument bag into a concrete request.
// Purpose: Deterministic, side-effect-free construction of upstream requests.
// Dependencies: mcp-hub-core, reqwest (Url), serde_json
// ============================================================================

//! ## Overview
//! Composition runs in four independent steps: path, headers, query, body.
//! Each step only reads the [`BackendConfig`], the [`ToolBinding`], and the
//! caller's [`Arguments`]; nothing here touches the network.
//!
//! Precedence rules:
//! - Mapped headers override default headers (names compare
//!   case-insensitively).
//! - Auth headers and auth query parameters are only added when the name is
//!   not already present.
//! - Absent and `null` arguments are skipped for headers, query, and body.
//!
//! Path values are percent-encoded as URL path characters; `/` is kept so a
//! single argument may span several segments.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt::Write as _;

use mcp_hub_core::Arguments;
use mcp_hub_core::ArgumentMapping;
use mcp_hub_core::AuthKind;
use mcp_hub_core::BackendConfig;
use mcp_hub_core::HttpMethod;
use mcp_hub_core::ToolBinding;
use reqwest::Url;
use serde_json::Map;
use serde_json::Value;

use crate::error::BindingError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Canonical authorization header name.
const AUTHORIZATION: &str = "Authorization";

/// Bearer scheme prefix, compared case-insensitively.
const BEARER_PREFIX: &str = "bearer ";

// ============================================================================
// SECTION: Types
// ============================================================================

/// Request body produced by composition.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// Structured body sent as JSON.
    Json(Value),
    /// Verbatim body from the raw-body argument.
    Raw(String),
}

/// Fully composed upstream request.
#[derive(Debug, Clone, PartialEq)]
pub struct ComposedRequest {
    /// HTTP method.
    pub method: HttpMethod,
    /// Final URL including the query string.
    pub url: Url,
    /// Header name/value pairs.
    pub headers: BTreeMap<String, String>,
    /// Optional request body.
    pub body: Option<RequestBody>,
}

// ============================================================================
// SECTION: Composition
// ============================================================================

/// Composes the complete request for one invocation.
///
/// # Errors
///
/// Returns [`BindingError`] when a path argument is missing, placeholders
/// remain, or the resulting URL is invalid.
pub fn compose_request(
    backend: &BackendConfig,
    binding: &ToolBinding,
    args: &Arguments,
) -> Result<ComposedRequest, BindingError> {
    let mapping = &binding.argument_mapping;
    let path = compose_path(&binding.path_template, mapping, args)?;
    let mut url = join_url(&backend.base_url, &path)?;
    let query = compose_query(backend, mapping, args);
    if !query.is_empty() {
        url.query_pairs_mut().extend_pairs(query.iter());
    }
    Ok(ComposedRequest {
        method: binding.method,
        url,
        headers: compose_headers(backend, mapping, args),
        body: compose_body(mapping, args),
    })
}

/// Substitutes every mapped `{segment}` in the template.
///
/// # Errors
///
/// Returns [`BindingError::MissingArgument`] when a mapped source key is
/// absent, [`BindingError::DotSegment`] when a value contains a `.` or `..`
/// segment, and [`BindingError::UnresolvedPlaceholder`] when braces remain.
pub fn compose_path(
    template: &str,
    mapping: &ArgumentMapping,
    args: &Arguments,
) -> Result<String, BindingError> {
    let mut path = template.to_string();
    for (segment, source) in &mapping.path {
        let value =
            args.get(source).ok_or_else(|| BindingError::MissingArgument(source.clone()))?;
        let text = stringify(value);
        if has_dot_segment(&text) {
            return Err(BindingError::DotSegment(source.clone()));
        }
        let placeholder = format!("{{{segment}}}");
        path = path.replace(&placeholder, &encode_path_value(&text));
    }
    if path.contains('{') || path.contains('}') {
        return Err(BindingError::UnresolvedPlaceholder(path));
    }
    Ok(path)
}

/// Builds request headers from defaults, mappings, and auth.
#[must_use]
pub fn compose_headers(
    backend: &BackendConfig,
    mapping: &ArgumentMapping,
    args: &Arguments,
) -> BTreeMap<String, String> {
    let mut headers = backend.default_headers.clone();
    for (name, source) in &mapping.headers {
        let Some(value) = present(args, source) else {
            continue;
        };
        headers.retain(|existing, _| !existing.eq_ignore_ascii_case(name));
        headers.insert(name.clone(), stringify(value));
    }
    let auth = &backend.auth;
    match (auth.kind, auth.key.as_deref(), auth.value.as_deref()) {
        (AuthKind::Bearer, _, Some(token)) if !token.is_empty() => {
            if !has_header(&headers, AUTHORIZATION) {
                headers.insert(AUTHORIZATION.to_string(), bearer_value(token));
            }
        }
        (AuthKind::Header, Some(name), Some(value)) if !name.is_empty() => {
            if !has_header(&headers, name) {
                headers.insert(name.to_string(), value.to_string());
            }
        }
        _ => {}
    }
    headers
}

/// Builds ordered query pairs from mappings and query auth.
///
/// Array arguments expand to one pair per element.
#[must_use]
pub fn compose_query(
    backend: &BackendConfig,
    mapping: &ArgumentMapping,
    args: &Arguments,
) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for (name, source) in &mapping.query {
        match present(args, source) {
            Some(Value::Array(items)) => {
                for item in items.iter().filter(|item| !item.is_null()) {
                    pairs.push((name.clone(), stringify(item)));
                }
            }
            Some(value) => pairs.push((name.clone(), stringify(value))),
            None => {}
        }
    }
    let auth = &backend.auth;
    if auth.kind == AuthKind::Query
        && let (Some(name), Some(value)) = (auth.key.as_deref(), auth.value.as_deref())
        && !name.is_empty()
        && !pairs.iter().any(|(existing, _)| existing == name)
    {
        pairs.push((name.to_string(), value.to_string()));
    }
    pairs
}

/// Builds the request body, if any.
///
/// A present, non-null raw-body argument wins. Otherwise mapped fields form a
/// JSON object; an empty object means no body.
#[must_use]
pub fn compose_body(mapping: &ArgumentMapping, args: &Arguments) -> Option<RequestBody> {
    if let Some(raw_key) = mapping.raw_body.as_deref()
        && let Some(value) = present(args, raw_key)
    {
        return Some(RequestBody::Raw(stringify(value)));
    }
    let mut body = Map::new();
    for (field, source) in &mapping.body {
        if let Some(value) = present(args, source) {
            body.insert(field.clone(), value.clone());
        }
    }
    if body.is_empty() { None } else { Some(RequestBody::Json(Value::Object(body))) }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Renders an argument as request text: strings verbatim, all else as JSON.
#[must_use]
pub fn stringify(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Returns the argument when present and not `null`.
fn present<'a>(args: &'a Arguments, key: &str) -> Option<&'a Value> {
    args.get(key).filter(|value| !value.is_null())
}

/// Case-insensitive header presence check.
fn has_header(headers: &BTreeMap<String, String>, name: &str) -> bool {
    headers.keys().any(|existing| existing.eq_ignore_ascii_case(name))
}

/// Adds the bearer scheme unless the token already carries it.
fn bearer_value(token: &str) -> String {
    let has_prefix = token
        .get(.. BEARER_PREFIX.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(BEARER_PREFIX));
    if has_prefix { token.to_string() } else { format!("Bearer {token}") }
}

/// Joins the base URL and composed path with exactly one slash.
fn join_url(base: &str, path: &str) -> Result<Url, BindingError> {
    let joined = format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'));
    let url = Url::parse(&joined).map_err(|_| BindingError::InvalidUrl(joined.clone()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        _ => Err(BindingError::InvalidUrl(joined)),
    }
}

/// URL parsing resolves `.` and `..` segments, including their `%2E` forms,
/// so values carrying them would move the request off the bound path.
fn has_dot_segment(value: &str) -> bool {
    value.split('/').any(|segment| segment == "." || segment == "..")
}

/// Percent-encodes everything outside RFC 3986 `pchar` and `/`.
fn encode_path_value(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len());
    for byte in value.bytes() {
        if byte.is_ascii_alphanumeric() || b"-._~/:@!$&'()*+,;=".contains(&byte) {
            encoded.push(char::from(byte));
        } else {
            let _ = write!(encoded, "%{byte:02X}");
        }
    }
    encoded
}

// ============================================================================
// SECTION: Tests
// ============================================================================
