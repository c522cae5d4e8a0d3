// crates/mcp-hub-server/src/runtime.rs
// ============================================================================
// Module: Tool Registration Runtime
// Description: Keeps global and per-backend handler tables in sync with the
//              registry and lazily mounts per-backend hosting endpoints.
// Purpose: Make registry tools callable through hosted tool surfaces.
// Dependencies: async-trait, mcp-hub-binding, mcp-hub-core
// ============================================================================

//! ## Overview
//! The runtime owns two views of every hosted tool:
//! - the global [`ToolHost`], keyed `"{backendId}.{toolName}"`;
//! - one scoped [`ToolHost`] per backend, keyed by the bare tool name.
//!
//! [`ToolRuntime::register_tool`] and [`ToolRuntime::deregister_tool`] write
//! both tables in one call. Handlers re-read the binding from the
//! [`Registry`] on every call, so edits apply without re-registration.
//!
//! Composite keys are not injective (`("a", "b.c")` and `("a.b", "c")` both
//! yield `"a.b.c"`), so the runtime records which pair owns each global key
//! and refuses a registration whose key another pair already holds.
//! [`ToolRuntime::call`] resolves through the scoped table, which is keyed by
//! the pair itself.
//!
//! Per-backend mounting hands the scoped host to a [`MountSurface`] injected
//! once at startup. Each backend is mounted at most once; without a surface,
//! mount requests are skipped.
//!
//! Every operation returns an explicit outcome. Callers on administrative
//! paths record failures and move on rather than failing the request.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::OnceLock;
use std::sync::RwLock;

use async_trait::async_trait;
use mcp_hub_binding::HttpExecutor;
use mcp_hub_core::Arguments;
use mcp_hub_core::BackendId;
use mcp_hub_core::Registry;
use mcp_hub_core::RegistryError;
use mcp_hub_core::ToolBinding;
use mcp_hub_core::ToolName;
use serde_json::Value;
use thiserror::Error;

use crate::host::ToolCallError;
use crate::host::ToolDescriptor;
use crate::host::ToolHandler;
use crate::host::ToolHost;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Label of the global host.
pub const GLOBAL_HOST_LABEL: &str = "mcp_hub";

// ============================================================================
// SECTION: Types
// ============================================================================

/// Registration runtime failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    /// The registry could not be read.
    #[error(transparent)]
    Registry(#[from] RegistryError),
    /// A handler table rejected the change.
    #[error("handler table error: {0}")]
    Host(#[from] ToolCallError),
    /// The mount surface rejected the endpoint.
    #[error("mount failed: {0}")]
    Mount(String),
    /// Another backend/tool pair already owns the composite key.
    #[error("global tool key {key} is owned by {owner}")]
    KeyConflict {
        /// Contested composite key.
        key: String,
        /// Composite description of the owning pair.
        owner: String,
    },
    /// A mount surface was already attached.
    #[error("mount surface already attached")]
    SurfaceAlreadyAttached,
    /// A runtime lock is poisoned.
    #[error("runtime lock poisoned")]
    Poisoned,
}

/// Outcome of [`ToolRuntime::register_tool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// The tool is hosted in both tables.
    Registered,
    /// The tool is missing, inactive, or its backend is unknown; it was
    /// removed from both tables instead.
    Skipped,
}

/// Outcome of [`ToolRuntime::ensure_mounted`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountOutcome {
    /// A new endpoint was mounted.
    Mounted,
    /// The backend was mounted earlier.
    AlreadyMounted,
    /// No mount surface is attached.
    NoSurface,
}

/// Hosting process surface that accepts per-backend endpoints.
pub trait MountSurface: Send + Sync {
    /// Exposes `host` as the endpoint subtree for `backend_id`.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError`] when the endpoint cannot be created.
    fn mount(&self, backend_id: &BackendId, host: Arc<ToolHost>) -> Result<(), RuntimeError>;
}

// ============================================================================
// SECTION: Runtime
// ============================================================================

/// Registration runtime.
pub struct ToolRuntime {
    /// Source of truth for bindings.
    registry: Registry,
    /// Shared upstream executor.
    executor: Arc<HttpExecutor>,
    /// Composite-key handler table.
    global: Arc<ToolHost>,
    /// Owning pair of each composite key in the global table.
    owners: Mutex<BTreeMap<String, (BackendId, ToolName)>>,
    /// Per-backend handler tables.
    scoped: RwLock<BTreeMap<BackendId, Arc<ToolHost>>>,
    /// Backends with a mounted endpoint.
    mounted: Mutex<BTreeSet<BackendId>>,
    /// Injected hosting surface.
    surface: OnceLock<Arc<dyn MountSurface>>,
}

impl ToolRuntime {
    /// Creates a runtime with empty handler tables and no mount surface.
    #[must_use]
    pub fn new(registry: Registry, executor: Arc<HttpExecutor>) -> Self {
        Self {
            registry,
            executor,
            global: Arc::new(ToolHost::new(GLOBAL_HOST_LABEL)),
            owners: Mutex::new(BTreeMap::new()),
            scoped: RwLock::new(BTreeMap::new()),
            mounted: Mutex::new(BTreeSet::new()),
            surface: OnceLock::new(),
        }
    }

    /// Injects the hosting surface. Only the first call succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::SurfaceAlreadyAttached`] on repeat calls.
    pub fn attach_surface(&self, surface: Arc<dyn MountSurface>) -> Result<(), RuntimeError> {
        self.surface.set(surface).map_err(|_| RuntimeError::SurfaceAlreadyAttached)
    }

    /// Returns the global handler table.
    #[must_use]
    pub fn global_host(&self) -> Arc<ToolHost> {
        Arc::clone(&self.global)
    }

    /// Returns the scoped handler table for a backend, creating it if absent.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Poisoned`] when the arena lock is poisoned.
    pub fn scoped_host(&self, backend_id: &BackendId) -> Result<Arc<ToolHost>, RuntimeError> {
        if let Some(host) =
            self.scoped.read().map_err(|_| RuntimeError::Poisoned)?.get(backend_id)
        {
            return Ok(Arc::clone(host));
        }
        let mut scoped = self.scoped.write().map_err(|_| RuntimeError::Poisoned)?;
        let host = scoped
            .entry(backend_id.clone())
            .or_insert_with(|| Arc::new(ToolHost::new(scoped_label(backend_id))));
        Ok(Arc::clone(host))
    }

    /// Returns true when the backend has a mounted endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Poisoned`] when the mounted set is poisoned.
    pub fn is_mounted(&self, backend_id: &BackendId) -> Result<bool, RuntimeError> {
        Ok(self.mounted.lock().map_err(|_| RuntimeError::Poisoned)?.contains(backend_id))
    }

    /// Hosts a registry tool in both tables, or removes it when it should not
    /// be hosted.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::KeyConflict`] when another pair owns the
    /// composite key; the tool is then hosted in neither table. Returns other
    /// [`RuntimeError`]s when the registry or a handler table fails.
    pub fn register_tool(
        &self,
        backend_id: &BackendId,
        tool_name: &ToolName,
    ) -> Result<Registration, RuntimeError> {
        let Some((_, binding)) = self.registry.lookup(backend_id, tool_name)? else {
            self.deregister_tool(backend_id, tool_name)?;
            return Ok(Registration::Skipped);
        };
        if !binding.active {
            self.deregister_tool(backend_id, tool_name)?;
            return Ok(Registration::Skipped);
        }
        let handler: Arc<dyn ToolHandler> = Arc::new(BindingHandler {
            registry: self.registry.clone(),
            executor: Arc::clone(&self.executor),
            backend_id: backend_id.clone(),
            tool_name: tool_name.clone(),
        });
        let qualified = tool_name.qualified(backend_id);
        let mut owners = self.owners.lock().map_err(|_| RuntimeError::Poisoned)?;
        if let Some((owner_backend, owner_tool)) = owners.get(&qualified)
            && (owner_backend != backend_id || owner_tool != tool_name)
        {
            let owner = format!("{owner_backend}/{owner_tool}");
            drop(owners);
            self.remove_scoped(backend_id, tool_name)?;
            return Err(RuntimeError::KeyConflict {
                key: qualified,
                owner,
            });
        }
        self.global.add_tool(descriptor(&qualified, &binding), Arc::clone(&handler))?;
        owners.insert(qualified, (backend_id.clone(), tool_name.clone()));
        drop(owners);
        self.scoped_host(backend_id)?.add_tool(descriptor(tool_name.as_str(), &binding), handler)?;
        Ok(Registration::Registered)
    }

    /// Re-registers every registry tool under a backend.
    ///
    /// Returns the per-tool outcomes in name order.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Registry`] when the registry cannot be read.
    pub fn register_backend_tools(
        &self,
        backend_id: &BackendId,
    ) -> Result<Vec<(ToolName, Result<Registration, RuntimeError>)>, RuntimeError> {
        let tools = self.registry.list_tools(backend_id)?;
        Ok(tools
            .into_keys()
            .map(|tool_name| {
                let outcome = self.register_tool(backend_id, &tool_name);
                (tool_name, outcome)
            })
            .collect())
    }

    /// Removes a tool from both tables. Absent tools are not an error.
    ///
    /// A global key owned by a different pair is left in place.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError`] when a handler table lock is poisoned.
    pub fn deregister_tool(
        &self,
        backend_id: &BackendId,
        tool_name: &ToolName,
    ) -> Result<(), RuntimeError> {
        let qualified = tool_name.qualified(backend_id);
        let mut owners = self.owners.lock().map_err(|_| RuntimeError::Poisoned)?;
        let owned = owners
            .get(&qualified)
            .is_some_and(|(owner_backend, owner_tool)| {
                owner_backend == backend_id && owner_tool == tool_name
            });
        if owned {
            self.global.remove_tool(&qualified)?;
            owners.remove(&qualified);
        }
        drop(owners);
        self.remove_scoped(backend_id, tool_name)
    }

    /// Removes a tool from its backend's scoped table, if that table exists.
    fn remove_scoped(&self, backend_id: &BackendId, tool_name: &ToolName) -> Result<(), RuntimeError> {
        let scoped =
            self.scoped.read().map_err(|_| RuntimeError::Poisoned)?.get(backend_id).cloned();
        if let Some(host) = scoped {
            host.remove_tool(tool_name.as_str())?;
        }
        Ok(())
    }

    /// Mounts the backend's scoped host on the attached surface, once.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError`] when the surface rejects the endpoint; the
    /// backend stays unmounted so a later call can retry.
    pub fn ensure_mounted(&self, backend_id: &BackendId) -> Result<MountOutcome, RuntimeError> {
        let Some(surface) = self.surface.get() else {
            return Ok(MountOutcome::NoSurface);
        };
        let mut mounted = self.mounted.lock().map_err(|_| RuntimeError::Poisoned)?;
        if mounted.contains(backend_id) {
            return Ok(MountOutcome::AlreadyMounted);
        }
        let host = self.scoped_host(backend_id)?;
        surface.mount(backend_id, host)?;
        mounted.insert(backend_id.clone());
        drop(mounted);
        Ok(MountOutcome::Mounted)
    }

    /// Calls a tool through its backend's scoped handler table.
    ///
    /// # Errors
    ///
    /// Returns [`ToolCallError`] when the tool is not hosted or its handler
    /// fails.
    pub async fn call(
        &self,
        backend_id: &BackendId,
        tool_name: &ToolName,
        args: Arguments,
    ) -> Result<Value, ToolCallError> {
        let host = self
            .scoped
            .read()
            .map_err(|_| ToolCallError::Poisoned)?
            .get(backend_id)
            .cloned()
            .ok_or_else(|| ToolCallError::UnknownTool(tool_name.qualified(backend_id)))?;
        host.call_tool(tool_name.as_str(), args).await
    }
}

// ============================================================================
// SECTION: Binding Handler
// ============================================================================

/// Handler that executes the current registry binding for one tool.
struct BindingHandler {
    /// Registry used for the live re-fetch.
    registry: Registry,
    /// Shared upstream executor.
    executor: Arc<HttpExecutor>,
    /// Owning backend.
    backend_id: BackendId,
    /// Tool name within the backend.
    tool_name: ToolName,
}

#[async_trait]
impl ToolHandler for BindingHandler {
    async fn call(&self, args: Arguments) -> Result<Value, ToolCallError> {
        let (backend, binding) = self
            .registry
            .lookup(&self.backend_id, &self.tool_name)
            .map_err(|err| ToolCallError::Handler(err.to_string()))?
            .ok_or_else(|| {
                ToolCallError::Handler(format!(
                    "tool {} is no longer registered",
                    self.tool_name.qualified(&self.backend_id)
                ))
            })?;
        self.executor
            .invoke(&backend, &binding, &args)
            .await
            .map(|result| result.data)
            .map_err(|err| ToolCallError::Handler(err.to_string()))
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Builds the advertised descriptor for a binding.
fn descriptor(name: &str, binding: &ToolBinding) -> ToolDescriptor {
    ToolDescriptor {
        name: name.to_string(),
        description: binding.description_or_empty().to_string(),
        input_schema: binding.advertised_schema(),
    }
}

/// Label of a backend's scoped host.
fn scoped_label(backend_id: &BackendId) -> String {
    format!("{GLOBAL_HOST_LABEL}:{backend_id}")
}

// ============================================================================
// SECTION: Tests
// ============================================================================
