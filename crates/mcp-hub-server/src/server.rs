// crates/mcp-hub-server/src/server.rs
// ============================================================================
// Module: MCP Hub Server
// Description: Component wiring and the HTTP listener.
// Purpose: Build every hub component from configuration and serve them.
// Dependencies: axum, mcp-hub-binding, mcp-hub-config, mcp-hub-core, tokio
// ============================================================================

//! ## Overview
//! [`HubServer::from_config`] builds the shared pieces once and injects them
//! by handle: one [`Registry`], one [`HttpExecutor`], the
//! [`ToolRuntime`] with the mount arena attached as its surface, and the
//! [`Dispatcher`]. [`HubServer::router`] merges the administrative,
//! invocation, and hosting routes under one body limit.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use mcp_hub_binding::HttpExecutor;
use mcp_hub_binding::HttpExecutorConfig;
use mcp_hub_config::AuditConfig;
use mcp_hub_config::HubConfig;
use mcp_hub_core::Registry;
use thiserror::Error;

use crate::admin::admin_router;
use crate::audit::FileAuditSink;
use crate::audit::HubAuditSink;
use crate::audit::NoopAuditSink;
use crate::audit::StartupAuditEvent;
use crate::audit::StderrAuditSink;
use crate::dispatcher::Dispatcher;
use crate::hosting::GLOBAL_PREFIX;
use crate::hosting::HostEndpoint;
use crate::hosting::HostingState;
use crate::hosting::MountedEndpoints;
use crate::hosting::hosting_router;
use crate::invoke::invoke_router;
use crate::runtime::MountSurface;
use crate::runtime::ToolRuntime;
use crate::telemetry::HubMetrics;
use crate::telemetry::NoopMetrics;

// ============================================================================
// SECTION: Shared State
// ============================================================================

/// Handles shared by the administrative and invocation routes.
#[derive(Clone)]
pub struct HubState {
    /// Backend and tool registry.
    pub registry: Registry,
    /// Shared upstream executor.
    pub executor: Arc<HttpExecutor>,
    /// Registration runtime.
    pub runtime: Arc<ToolRuntime>,
    /// Invocation dispatcher.
    pub dispatcher: Arc<Dispatcher>,
    /// Audit sink.
    pub audit: Arc<dyn HubAuditSink>,
}

// ============================================================================
// SECTION: Server
// ============================================================================

/// MCP Hub server instance.
pub struct HubServer {
    /// Validated configuration.
    config: HubConfig,
    /// Administrative and invocation state.
    state: HubState,
    /// Hosting endpoint state.
    hosting: HostingState,
}

impl HubServer {
    /// Builds a server from configuration with no-op metrics.
    ///
    /// # Errors
    ///
    /// Returns [`HubServerError`] when validation or initialization fails.
    pub fn from_config(config: HubConfig) -> Result<Self, HubServerError> {
        Self::with_metrics(config, Arc::new(NoopMetrics))
    }

    /// Builds a server from configuration with a metrics sink.
    ///
    /// # Errors
    ///
    /// Returns [`HubServerError`] when validation or initialization fails.
    pub fn with_metrics(
        config: HubConfig,
        metrics: Arc<dyn HubMetrics>,
    ) -> Result<Self, HubServerError> {
        config.validate().map_err(|err| HubServerError::Config(err.to_string()))?;
        let executor = Arc::new(
            HttpExecutor::new(&HttpExecutorConfig {
                timeout_ms: config.upstream.timeout_ms,
                max_response_bytes: config.upstream.max_response_bytes,
                user_agent: config.upstream.user_agent.clone(),
            })
            .map_err(|err| HubServerError::Init(err.to_string()))?,
        );
        let audit = build_audit_sink(&config.server.audit)?;
        let registry = Registry::new();
        let runtime = Arc::new(ToolRuntime::new(registry.clone(), Arc::clone(&executor)));
        let mounts = Arc::new(MountedEndpoints::new());
        runtime
            .attach_surface(Arc::clone(&mounts) as Arc<dyn MountSurface>)
            .map_err(|err| HubServerError::Init(err.to_string()))?;
        let dispatcher = Arc::new(Dispatcher::new(
            registry.clone(),
            Arc::clone(&runtime),
            Arc::clone(&executor),
            Arc::clone(&audit),
            metrics,
        ));
        let hosting = HostingState {
            global: Arc::new(HostEndpoint::new(GLOBAL_PREFIX, runtime.global_host())),
            mounts,
        };
        Ok(Self {
            config,
            state: HubState {
                registry,
                executor,
                runtime,
                dispatcher,
                audit,
            },
            hosting,
        })
    }

    /// Returns a handle to the server's registry.
    #[must_use]
    pub fn registry(&self) -> Registry {
        self.state.registry.clone()
    }

    /// Returns the server's registration runtime.
    #[must_use]
    pub fn runtime(&self) -> Arc<ToolRuntime> {
        Arc::clone(&self.state.runtime)
    }

    /// Builds the complete HTTP router.
    #[must_use]
    pub fn router(&self) -> Router {
        admin_router(self.state.clone())
            .merge(invoke_router(self.state.clone()))
            .merge(hosting_router(self.hosting.clone(), self.config.server.session_id_normalization))
            .layer(DefaultBodyLimit::max(self.config.server.max_body_bytes))
    }

    /// Binds the configured address and serves until the listener fails.
    ///
    /// # Errors
    ///
    /// Returns [`HubServerError`] when binding or serving fails.
    pub async fn serve(self) -> Result<(), HubServerError> {
        let addr =
            self.config.server.bind_addr().map_err(|err| HubServerError::Config(err.to_string()))?;
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|_| HubServerError::Transport("http bind failed".to_string()))?;
        let bound = listener
            .local_addr()
            .map_err(|_| HubServerError::Transport("http bind failed".to_string()))?;
        self.state.audit.record_startup(&StartupAuditEvent::new(
            bound,
            self.config.server.session_id_normalization,
        ));
        axum::serve(listener, self.router())
            .await
            .map_err(|_| HubServerError::Transport("http server failed".to_string()))
    }
}

/// Builds the audit sink selected by configuration.
fn build_audit_sink(config: &AuditConfig) -> Result<Arc<dyn HubAuditSink>, HubServerError> {
    if !config.enabled {
        return Ok(Arc::new(NoopAuditSink));
    }
    match &config.path {
        Some(path) => {
            let sink = FileAuditSink::new(Path::new(path))
                .map_err(|err| HubServerError::Init(format!("audit log {path}: {err}")))?;
            Ok(Arc::new(sink))
        }
        None => Ok(Arc::new(StderrAuditSink)),
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Server errors.
#[derive(Debug, Error)]
pub enum HubServerError {
    /// Configuration errors.
    #[error("config error: {0}")]
    Config(String),
    /// Initialization failures.
    #[error("init error: {0}")]
    Init(String),
    /// Transport errors.
    #[error("transport error: {0}")]
    Transport(String),
}
