// crates/mcp-hub-config/src/config.rs
// ============================================================================
// Module: MCP Hub Configuration
// Description: Configuration loading and validation for MCP Hub.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size limits. Path
//! resolution order: explicit path, then the [`CONFIG_ENV_VAR`] environment
//! variable, then [`DEFAULT_CONFIG_NAME`] in the working directory. Explicit
//! and environment paths must exist; a missing default file yields defaults.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::io;
use std::net::SocketAddr;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
pub const DEFAULT_CONFIG_NAME: &str = "mcp-hub.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "MCP_HUB_CONFIG";
/// Maximum configuration file size in bytes.
const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Minimum upstream timeout in milliseconds.
const MIN_UPSTREAM_TIMEOUT_MS: u64 = 100;
/// Maximum upstream timeout in milliseconds.
const MAX_UPSTREAM_TIMEOUT_MS: u64 = 300_000;
/// Hard ceiling for upstream response bodies.
const MAX_UPSTREAM_RESPONSE_BYTES: usize = 64 * 1024 * 1024;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Top-level MCP Hub configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HubConfig {
    /// Inbound server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Outbound upstream HTTP settings.
    #[serde(default)]
    pub upstream: UpstreamConfig,
}

impl HubConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (resolved, explicit) = resolve_path(path)?;
        let bytes = match fs::read(&resolved) {
            Ok(bytes) => bytes,
            Err(err) if !explicit && err.kind() == io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(err) => {
                return Err(ConfigError::Io(format!("{}: {err}", resolved.display())));
            }
        };
        Self::from_bytes(&bytes)
    }

    /// Parses and validates configuration from raw TOML bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the content is oversized, not UTF-8,
    /// unparsable, or invalid.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ConfigError> {
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.upstream.validate()
    }
}

/// Inbound server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Socket address to bind.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Maximum inbound request body size in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    /// Rewrite hyphenated session ids to compact form on hosting endpoints.
    #[serde(default = "default_true")]
    pub session_id_normalization: bool,
    /// Audit logging settings.
    #[serde(default)]
    pub audit: AuditConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_body_bytes: default_max_body_bytes(),
            session_id_normalization: true,
            audit: AuditConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Returns the parsed bind address.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when `bind` is not a socket address.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid("server.bind: invalid bind address".to_string()))
    }

    /// Validates server configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        self.bind_addr()?;
        if self.max_body_bytes == 0 {
            return Err(ConfigError::Invalid(
                "server.max_body_bytes must be greater than zero".to_string(),
            ));
        }
        self.audit.validate()
    }
}

/// Audit logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Enable structured audit logging.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Optional audit log path (JSON lines); stderr when absent.
    #[serde(default)]
    pub path: Option<String>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: None,
        }
    }
}

impl AuditConfig {
    /// Validates audit configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(path) = &self.path {
            if path.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "server.audit.path must not be empty".to_string(),
                ));
            }
            if path.len() > MAX_TOTAL_PATH_LENGTH {
                return Err(ConfigError::Invalid(
                    "server.audit.path exceeds max length".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Outbound upstream HTTP configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Per-request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Maximum upstream response body size in bytes.
    #[serde(default = "default_max_response_bytes")]
    pub max_response_bytes: usize,
    /// User agent for outbound requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            max_response_bytes: default_max_response_bytes(),
            user_agent: default_user_agent(),
        }
    }
}

impl UpstreamConfig {
    /// Validates upstream configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_UPSTREAM_TIMEOUT_MS ..= MAX_UPSTREAM_TIMEOUT_MS).contains(&self.timeout_ms) {
            return Err(ConfigError::Invalid(format!(
                "upstream.timeout_ms must be between {MIN_UPSTREAM_TIMEOUT_MS} and \
                 {MAX_UPSTREAM_TIMEOUT_MS}"
            )));
        }
        if self.max_response_bytes == 0 {
            return Err(ConfigError::Invalid(
                "upstream.max_response_bytes must be greater than zero".to_string(),
            ));
        }
        if self.max_response_bytes > MAX_UPSTREAM_RESPONSE_BYTES {
            return Err(ConfigError::Invalid(format!(
                "upstream.max_response_bytes must be at most {MAX_UPSTREAM_RESPONSE_BYTES}"
            )));
        }
        if self.user_agent.trim().is_empty() {
            return Err(ConfigError::Invalid("upstream.user_agent must not be empty".to_string()));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path; the flag is true when the path was named.
fn resolve_path(path: Option<&Path>) -> Result<(PathBuf, bool), ConfigError> {
    if let Some(path) = path {
        return Ok((path.to_path_buf(), true));
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok((PathBuf::from(env_path), true));
    }
    Ok((PathBuf::from(DEFAULT_CONFIG_NAME), false))
}

/// Default bind address.
fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

/// Default inbound body limit.
const fn default_max_body_bytes() -> usize {
    1024 * 1024
}

/// Default upstream timeout.
const fn default_timeout_ms() -> u64 {
    30_000
}

/// Default upstream response limit.
const fn default_max_response_bytes() -> usize {
    8 * 1024 * 1024
}

/// Default outbound user agent.
fn default_user_agent() -> String {
    "mcp-hub/0.1".to_string()
}

/// Serde default for enabled-by-default flags.
const fn default_true() -> bool {
    true
}
