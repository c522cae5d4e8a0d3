// crates/mcp-hub-config/src/lib.rs
// ============================================================================
// Module: MCP Hub Config
// Description: Configuration model, loading, and validation.
// Purpose: Single source of truth for process-wide MCP Hub settings.
// Dependencies: serde, thiserror, toml
// ============================================================================

//! ## Overview
//! Settings are read once at startup from a TOML file and validated fail-closed.
//! See [`HubConfig::load`] for path resolution rules.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::AuditConfig;
pub use config::CONFIG_ENV_VAR;
pub use config::ConfigError;
pub use config::DEFAULT_CONFIG_NAME;
pub use config::HubConfig;
pub use config::ServerConfig;
pub use config::UpstreamConfig;
