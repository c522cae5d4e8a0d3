// crates/mcp-hub-binding/src/execute.rs
// ============================================================================
// Module: HTTP Executor
// Description: Executes composed requests against upstream backends.
// Purpose: Bounded, non-retrying HTTP execution with response extraction.
// Dependencies: mcp-hub-core, reqwest, serde, serde_json
// ============================================================================

//! ## Overview
//! [`HttpExecutor`] owns one shared `reqwest` client configured with a fixed
//! timeout, a user agent, and redirects disabled. Each call composes the
//! request, sends it once, reads the body under a byte limit, parses JSON when
//! the response declares it, and applies the binding's pick expression.
//!
//! Dropping the returned future cancels the in-flight request.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::time::Duration;

use mcp_hub_core::Arguments;
use mcp_hub_core::BackendConfig;
use mcp_hub_core::HttpMethod;
use mcp_hub_core::ToolBinding;
use reqwest::Client;
use reqwest::Method;
use reqwest::Response;
use reqwest::header::CONTENT_TYPE;
use reqwest::header::HeaderMap;
use reqwest::header::HeaderName;
use reqwest::header::HeaderValue;
use reqwest::redirect::Policy;
use serde::Serialize;
use serde_json::Value;

use crate::compose::ComposedRequest;
use crate::compose::RequestBody;
use crate::compose::compose_request;
use crate::error::ComposerError;
use crate::error::ExecutionError;
use crate::extract::apply_pick;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Default upstream timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Default upstream response size limit in bytes.
pub const DEFAULT_MAX_RESPONSE_BYTES: usize = 8 * 1024 * 1024;

/// Default user agent for upstream requests.
pub const DEFAULT_USER_AGENT: &str = "mcp-hub/0.1";

/// Executor configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpExecutorConfig {
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Maximum response body size in bytes.
    pub max_response_bytes: usize,
    /// User agent for outbound requests.
    pub user_agent: String,
}

impl Default for HttpExecutorConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            max_response_bytes: DEFAULT_MAX_RESPONSE_BYTES,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

// ============================================================================
// SECTION: Results
// ============================================================================

/// Outcome of one upstream call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationResult {
    /// HTTP status code.
    pub status_code: u16,
    /// Response headers, names lower-cased.
    pub headers: BTreeMap<String, String>,
    /// URL the request was sent to.
    pub final_url: String,
    /// Parsed (and possibly extracted) payload, or raw text.
    pub data: Value,
}

// ============================================================================
// SECTION: Executor
// ============================================================================

/// Shared HTTP executor for tool bindings.
#[derive(Debug, Clone)]
pub struct HttpExecutor {
    /// HTTP client used for outbound requests.
    client: Client,
    /// Maximum response body size in bytes.
    max_response_bytes: usize,
}

impl HttpExecutor {
    /// Creates a new executor.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutionError::Client`] when the HTTP client cannot be built.
    pub fn new(config: &HttpExecutorConfig) -> Result<Self, ExecutionError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(config.user_agent.clone())
            .redirect(Policy::none())
            .build()
            .map_err(|err| ExecutionError::Client(err.to_string()))?;
        Ok(Self {
            client,
            max_response_bytes: config.max_response_bytes,
        })
    }

    /// Composes, executes, and extracts one tool call.
    ///
    /// # Errors
    ///
    /// Returns [`ComposerError::Binding`] when composition fails and
    /// [`ComposerError::Execution`] when the exchange fails.
    pub async fn invoke(
        &self,
        backend: &BackendConfig,
        binding: &ToolBinding,
        args: &Arguments,
    ) -> Result<InvocationResult, ComposerError> {
        let request = compose_request(backend, binding, args)?;
        let mut result = self.execute(request).await?;
        if result.structured {
            result.outcome.data = apply_pick(result.outcome.data, binding.pick());
        }
        Ok(result.outcome)
    }

    /// Sends a composed request and reads the response.
    async fn execute(&self, request: ComposedRequest) -> Result<Executed, ExecutionError> {
        let ComposedRequest {
            method,
            url,
            headers,
            body,
        } = request;
        let mut builder = self.client.request(to_method(method), url).headers(header_map(&headers)?);
        builder = match body {
            Some(RequestBody::Json(value)) => builder.json(&value),
            Some(RequestBody::Raw(text)) => builder.body(text),
            None => builder,
        };
        let mut response = builder.send().await.map_err(map_transport)?;
        let status_code = response.status().as_u16();
        let final_url = response.url().to_string();
        let structured = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(is_json);
        let response_headers = flatten_headers(response.headers());
        let bytes = read_body_limited(&mut response, self.max_response_bytes).await?;
        let (data, structured) = if structured {
            serde_json::from_slice::<Value>(&bytes).map_or_else(
                |_| (Value::String(String::from_utf8_lossy(&bytes).into_owned()), false),
                |value| (value, true),
            )
        } else {
            (Value::String(String::from_utf8_lossy(&bytes).into_owned()), false)
        };
        Ok(Executed {
            outcome: InvocationResult {
                status_code,
                headers: response_headers,
                final_url,
                data,
            },
            structured,
        })
    }
}

/// Executed response plus whether the payload parsed as JSON.
struct Executed {
    /// Response outcome.
    outcome: InvocationResult,
    /// True when `outcome.data` came from a JSON parse.
    structured: bool,
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Maps binding methods onto HTTP methods.
const fn to_method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Patch => Method::PATCH,
        HttpMethod::Delete => Method::DELETE,
    }
}

/// Converts composed headers into a validated header map.
fn header_map(headers: &BTreeMap<String, String>) -> Result<HeaderMap, ExecutionError> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| ExecutionError::InvalidHeader(name.clone()))?;
        let header_value =
            HeaderValue::from_str(value).map_err(|_| ExecutionError::InvalidHeader(name.clone()))?;
        map.insert(header_name, header_value);
    }
    Ok(map)
}

/// Flattens response headers; repeated names are joined with `", "`.
fn flatten_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut flat: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let text = String::from_utf8_lossy(value.as_bytes()).into_owned();
        flat.entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&text);
            })
            .or_insert(text);
    }
    flat
}

/// Returns true for JSON media types, including `+json` suffixes.
fn is_json(content_type: &str) -> bool {
    let media = content_type.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
    media == "application/json" || media.ends_with("+json")
}

/// Maps send failures, singling out timeouts.
fn map_transport(err: reqwest::Error) -> ExecutionError {
    if err.is_timeout() {
        ExecutionError::Timeout
    } else {
        ExecutionError::Transport(err.to_string())
    }
}

/// Reads the response body while enforcing a byte limit.
async fn read_body_limited(
    response: &mut Response,
    max_bytes: usize,
) -> Result<Vec<u8>, ExecutionError> {
    let too_large = ExecutionError::ResponseTooLarge {
        limit: max_bytes,
    };
    let limit = u64::try_from(max_bytes).map_err(|_| too_large.clone())?;
    if let Some(length) = response.content_length()
        && length > limit
    {
        return Err(too_large);
    }
    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await.map_err(|err| {
        if err.is_timeout() { ExecutionError::Timeout } else { ExecutionError::Read(err.to_string()) }
    })? {
        let next_len = body.len().checked_add(chunk.len()).ok_or_else(|| too_large.clone())?;
        if next_len > max_bytes {
            return Err(too_large);
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only panic-based assertions are permitted."
    )]

    use super::is_json;

    #[test]
    fn json_media_types_are_detected() {
        assert!(is_json("application/json"));
        assert!(is_json("Application/JSON; charset=utf-8"));
        assert!(is_json("application/problem+json"));
        assert!(!is_json("text/plain"));
        assert!(!is_json("application/jsonl"));
    }
}
