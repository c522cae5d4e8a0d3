// crates/mcp-hub-core/src/registry.rs
// ============================================================================
// Module: MCP Hub Registry
// Description: Process-lifetime store of backend configs and tool bindings.
// Purpose: Own every definition and hand out independent snapshots.
// Dependencies: crate::identifiers, crate::model, thiserror
// ============================================================================

//! ## Overview
//! [`Registry`] is the only shared mutable state in MCP Hub. It is a cheap
//! handle (`Clone` shares the same store) passed to every component that
//! needs it. Each operation takes the lock exactly once, so a reader never
//! observes a partially written entry; sequences of operations are not
//! transactional.
//!
//! Deletes are idempotent: removing a missing id is a no-op. Lookups of
//! missing ids return `None`; only lock poisoning is an error.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::RwLock;

use serde::Serialize;
use thiserror::Error;

use crate::identifiers::BackendId;
use crate::identifiers::ToolName;
use crate::model::BackendConfig;
use crate::model::ToolBinding;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Registry failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// A writer panicked while holding the registry lock.
    #[error("registry lock poisoned")]
    Poisoned,
}

// ============================================================================
// SECTION: Stats
// ============================================================================

/// Aggregate registry counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RegistryStats {
    /// Registered backends.
    #[serde(rename = "servers")]
    pub backend_count: usize,
    /// Registered backends flagged active.
    #[serde(rename = "activeServers")]
    pub active_backend_count: usize,
    /// Tools under registered backends.
    #[serde(rename = "tools")]
    pub tool_count: usize,
    /// Active tools under registered backends.
    #[serde(rename = "activeTools")]
    pub active_tool_count: usize,
}

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Lock-protected registry contents.
#[derive(Debug, Default)]
struct RegistryState {
    /// Backend definitions keyed by id.
    backends: BTreeMap<BackendId, BackendConfig>,
    /// Tool bindings grouped by owning backend id.
    tools: BTreeMap<BackendId, BTreeMap<ToolName, ToolBinding>>,
}

/// Authoritative in-memory store of backends and tools.
///
/// # Invariants
/// - `(BackendId, ToolName)` identifies at most one binding.
/// - Deleting a backend removes its tool table.
/// - Tools may be upserted under a backend id that is not (yet) registered;
///   they stay unreachable until the backend exists.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    /// Shared registry state.
    inner: Arc<RwLock<RegistryState>>,
}

impl Registry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a backend definition.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Poisoned`] when the lock is poisoned.
    pub fn upsert_backend(&self, id: BackendId, config: BackendConfig) -> Result<(), RegistryError> {
        self.inner.write().map_err(|_| RegistryError::Poisoned)?.backends.insert(id, config);
        Ok(())
    }

    /// Removes a backend and every tool registered under it.
    ///
    /// Returns the removed definition, if any.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Poisoned`] when the lock is poisoned.
    pub fn delete_backend(&self, id: &BackendId) -> Result<Option<BackendConfig>, RegistryError> {
        let mut guard = self.inner.write().map_err(|_| RegistryError::Poisoned)?;
        guard.tools.remove(id);
        let removed = guard.backends.remove(id);
        drop(guard);
        Ok(removed)
    }

    /// Returns a snapshot of every backend.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Poisoned`] when the lock is poisoned.
    pub fn list_backends(&self) -> Result<BTreeMap<BackendId, BackendConfig>, RegistryError> {
        let guard = self.inner.read().map_err(|_| RegistryError::Poisoned)?;
        Ok(guard.backends.clone())
    }

    /// Returns a snapshot of one backend.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Poisoned`] when the lock is poisoned.
    pub fn backend(&self, id: &BackendId) -> Result<Option<BackendConfig>, RegistryError> {
        let guard = self.inner.read().map_err(|_| RegistryError::Poisoned)?;
        Ok(guard.backends.get(id).cloned())
    }

    /// Inserts or replaces a tool binding under a backend id.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Poisoned`] when the lock is poisoned.
    pub fn upsert_tool(
        &self,
        backend_id: BackendId,
        tool_name: ToolName,
        binding: ToolBinding,
    ) -> Result<(), RegistryError> {
        self.inner
            .write()
            .map_err(|_| RegistryError::Poisoned)?
            .tools
            .entry(backend_id)
            .or_default()
            .insert(tool_name, binding);
        Ok(())
    }

    /// Removes one tool binding, returning it if it existed.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Poisoned`] when the lock is poisoned.
    pub fn delete_tool(
        &self,
        backend_id: &BackendId,
        tool_name: &ToolName,
    ) -> Result<Option<ToolBinding>, RegistryError> {
        let mut guard = self.inner.write().map_err(|_| RegistryError::Poisoned)?;
        let removed = guard.tools.get_mut(backend_id).and_then(|tools| tools.remove(tool_name));
        if guard.tools.get(backend_id).is_some_and(BTreeMap::is_empty) {
            guard.tools.remove(backend_id);
        }
        drop(guard);
        Ok(removed)
    }

    /// Returns a snapshot of the tools under a backend id.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Poisoned`] when the lock is poisoned.
    pub fn list_tools(
        &self,
        backend_id: &BackendId,
    ) -> Result<BTreeMap<ToolName, ToolBinding>, RegistryError> {
        let guard = self.inner.read().map_err(|_| RegistryError::Poisoned)?;
        Ok(guard.tools.get(backend_id).cloned().unwrap_or_default())
    }

    /// Returns a snapshot of one tool binding.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Poisoned`] when the lock is poisoned.
    pub fn tool(
        &self,
        backend_id: &BackendId,
        tool_name: &ToolName,
    ) -> Result<Option<ToolBinding>, RegistryError> {
        let guard = self.inner.read().map_err(|_| RegistryError::Poisoned)?;
        Ok(guard.tools.get(backend_id).and_then(|tools| tools.get(tool_name)).cloned())
    }

    /// Returns the backend and tool together, read under one lock.
    ///
    /// `None` when either is missing.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Poisoned`] when the lock is poisoned.
    pub fn lookup(
        &self,
        backend_id: &BackendId,
        tool_name: &ToolName,
    ) -> Result<Option<(BackendConfig, ToolBinding)>, RegistryError> {
        let guard = self.inner.read().map_err(|_| RegistryError::Poisoned)?;
        let Some(backend) = guard.backends.get(backend_id) else {
            return Ok(None);
        };
        let Some(binding) = guard.tools.get(backend_id).and_then(|tools| tools.get(tool_name))
        else {
            return Ok(None);
        };
        Ok(Some((backend.clone(), binding.clone())))
    }

    /// Returns aggregate counts.
    ///
    /// Tools parked under unregistered backend ids are not counted.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Poisoned`] when the lock is poisoned.
    pub fn stats(&self) -> Result<RegistryStats, RegistryError> {
        let guard = self.inner.read().map_err(|_| RegistryError::Poisoned)?;
        let mut stats = RegistryStats {
            backend_count: guard.backends.len(),
            active_backend_count: guard.backends.values().filter(|backend| backend.active).count(),
            ..RegistryStats::default()
        };
        for (backend_id, tools) in &guard.tools {
            if !guard.backends.contains_key(backend_id) {
                continue;
            }
            stats.tool_count += tools.len();
            stats.active_tool_count += tools.values().filter(|tool| tool.active).count();
        }
        drop(guard);
        Ok(stats)
    }
}
