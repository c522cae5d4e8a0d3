// crates/mcp-hub-core/src/model.rs
// ============================================================================
// Module: MCP Hub Data Model
// Description: Backend connection settings and declarative tool bindings.
// Purpose: Describe how a generic argument bag maps onto a concrete HTTP call.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! A [`BackendConfig`] describes one upstream HTTP service (base URL, default
//! headers, authentication). A [`ToolBinding`] describes one operation on that
//! service: HTTP method, path template, and an [`ArgumentMapping`] that routes
//! named caller arguments into path segments, query parameters, headers, or
//! body fields.
//!
//! The wire format is camelCase JSON. Field aliases accept the alternate names
//! (`baseAddress`, `argumentMapping`, `rawBodyArgumentKey`, `kind`) so that
//! older administrative clients keep working.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;

/// Caller-supplied argument bag for a tool invocation.
pub type Arguments = Map<String, Value>;

// ============================================================================
// SECTION: Authentication
// ============================================================================

/// How backend credentials are attached to outbound requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthKind {
    /// `Authorization: Bearer <value>` header.
    Bearer,
    /// Custom header named by `key`.
    Header,
    /// Query parameter named by `key`.
    Query,
    /// No credentials.
    #[default]
    None,
}

/// Backend authentication settings.
///
/// # Invariants
/// - `key` and `value` are only consulted when `kind` is not [`AuthKind::None`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AuthSpec {
    /// Credential transport.
    #[serde(rename = "type", alias = "kind", default)]
    pub kind: AuthKind,
    /// Header or query parameter name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Secret or token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl AuthSpec {
    /// Returns a bearer-token auth spec.
    #[must_use]
    pub fn bearer(token: impl Into<String>) -> Self {
        Self {
            kind: AuthKind::Bearer,
            key: None,
            value: Some(token.into()),
        }
    }

    /// Returns a custom-header auth spec.
    #[must_use]
    pub fn header(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            kind: AuthKind::Header,
            key: Some(name.into()),
            value: Some(value.into()),
        }
    }

    /// Returns a query-parameter auth spec.
    #[must_use]
    pub fn query(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            kind: AuthKind::Query,
            key: Some(name.into()),
            value: Some(value.into()),
        }
    }
}

// ============================================================================
// SECTION: Backend Configuration
// ============================================================================

/// Connection settings for one upstream HTTP service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendConfig {
    /// Display name.
    pub name: String,
    /// Absolute URL prefix for every tool path.
    #[serde(alias = "baseAddress")]
    pub base_url: String,
    /// Authentication settings.
    #[serde(default)]
    pub auth: AuthSpec,
    /// Headers sent with every request, before tool mappings apply.
    #[serde(default)]
    pub default_headers: BTreeMap<String, String>,
    /// Whether the backend accepts invocations.
    #[serde(default = "default_active")]
    pub active: bool,
}

impl BackendConfig {
    /// Creates an active backend with no auth and no default headers.
    #[must_use]
    pub fn new(name: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            auth: AuthSpec::default(),
            default_headers: BTreeMap::new(),
            active: true,
        }
    }
}

// ============================================================================
// SECTION: Tool Bindings
// ============================================================================

/// HTTP methods a binding may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// GET request.
    #[default]
    #[serde(alias = "get")]
    Get,
    /// POST request.
    #[serde(alias = "post")]
    Post,
    /// PUT request.
    #[serde(alias = "put")]
    Put,
    /// PATCH request.
    #[serde(alias = "patch")]
    Patch,
    /// DELETE request.
    #[serde(alias = "delete")]
    Delete,
}

impl HttpMethod {
    /// Returns the canonical upper-case method token.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declarative routing of caller arguments into request parts.
///
/// Each map goes from a destination key (path segment, query parameter,
/// header, body field) to the source argument key.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArgumentMapping {
    /// `{segment}` placeholder -> argument key.
    #[serde(default)]
    pub path: BTreeMap<String, String>,
    /// Query parameter -> argument key.
    #[serde(default)]
    pub query: BTreeMap<String, String>,
    /// Header name -> argument key.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Body field -> argument key.
    #[serde(default)]
    pub body: BTreeMap<String, String>,
    /// Argument whose value is sent verbatim as the whole body.
    #[serde(default, alias = "rawBodyArgumentKey", skip_serializing_if = "Option::is_none")]
    pub raw_body: Option<String>,
}

/// Optional post-processing of structured responses.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResponseMapping {
    /// `JSONPath` expression selecting the value to return.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pick: Option<String>,
}

/// One declared operation on a backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolBinding {
    /// Tool name (unique within the backend).
    pub name: String,
    /// Human-readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// HTTP method.
    pub method: HttpMethod,
    /// Path with `{placeholder}` segments, relative to the backend base URL.
    pub path_template: String,
    /// Argument routing rules.
    #[serde(default, rename = "paramMapping", alias = "argumentMapping")]
    pub argument_mapping: ArgumentMapping,
    /// JSON schema the arguments must satisfy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_schema: Option<Value>,
    /// Response extraction rule.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_mapping: Option<ResponseMapping>,
    /// Whether the tool accepts invocations.
    #[serde(default = "default_active")]
    pub active: bool,
}

impl ToolBinding {
    /// Creates an active binding with empty mappings and no schema.
    #[must_use]
    pub fn new(name: impl Into<String>, method: HttpMethod, path_template: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            method,
            path_template: path_template.into(),
            argument_mapping: ArgumentMapping::default(),
            input_schema: None,
            response_mapping: None,
            active: true,
        }
    }

    /// Returns the description, or an empty string.
    #[must_use]
    pub fn description_or_empty(&self) -> &str {
        self.description.as_deref().unwrap_or_default()
    }

    /// Returns the schema advertised to tool-calling clients.
    ///
    /// Bindings without a declared schema advertise an open object schema.
    #[must_use]
    pub fn advertised_schema(&self) -> Value {
        self.input_schema.clone().unwrap_or_else(|| json!({"type": "object", "properties": {}}))
    }

    /// Returns the configured extraction expression, if any.
    #[must_use]
    pub fn pick(&self) -> Option<&str> {
        self.response_mapping.as_ref().and_then(|mapping| mapping.pick.as_deref())
    }
}

/// Serde default for `active` flags.
const fn default_active() -> bool {
    true
}

// ============================================================================
// SECTION: Tests
// ============================================================================
