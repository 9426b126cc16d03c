//! Connection registry: the set of configured cluster endpoints.
//!
//! Thread-safe storage of live endpoint handles. Uses a lock-free
//! concurrent map (DashMap) so listing and lookups never contend with
//! poll loops. The registry stores mechanism only; lifecycle policy
//! (client construction, poll-loop spawning, snapshot purging) lives in
//! the orchestrator.

mod endpoint;
mod error;

pub use endpoint::*;
pub use error::*;

use dashmap::DashMap;
use std::sync::Arc;

/// The set of registered endpoints and their live handles.
#[derive(Debug, Default)]
pub struct Registry {
    endpoints: DashMap<String, Arc<EndpointHandle>>,
}

impl Registry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            endpoints: DashMap::new(),
        }
    }

    /// Insert a new endpoint handle.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::DuplicateEndpoint` if an endpoint with the
    /// same id already exists.
    pub fn insert(&self, handle: Arc<EndpointHandle>) -> Result<(), RegistryError> {
        let id = handle.config.id.clone();
        if self.endpoints.contains_key(&id) {
            return Err(RegistryError::DuplicateEndpoint(id));
        }
        self.endpoints.insert(id, handle);
        Ok(())
    }

    /// Remove an endpoint, cancelling its poll loop.
    ///
    /// The returned handle lets the caller finish cleanup (purge
    /// snapshots, drop alerts) before the last reference goes away.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::EndpointNotFound` if no endpoint with the
    /// given id exists.
    pub fn remove(&self, id: &str) -> Result<Arc<EndpointHandle>, RegistryError> {
        let (_, handle) = self
            .endpoints
            .remove(id)
            .ok_or_else(|| RegistryError::EndpointNotFound(id.to_string()))?;
        handle.cancel.cancel();
        Ok(handle)
    }

    /// Get an endpoint handle by id.
    pub fn get(&self, id: &str) -> Option<Arc<EndpointHandle>> {
        self.endpoints.get(id).map(|entry| Arc::clone(&entry))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.endpoints.contains_key(id)
    }

    /// Connection views for every registered endpoint, ordered by id.
    pub fn list(&self) -> Vec<ConnectionView> {
        let mut views: Vec<_> = self.endpoints.iter().map(|entry| entry.view()).collect();
        views.sort_by(|a, b| a.id.cmp(&b.id));
        views
    }

    /// All live handles (order unspecified).
    pub fn handles(&self) -> Vec<Arc<EndpointHandle>> {
        self.endpoints
            .iter()
            .map(|entry| Arc::clone(&entry))
            .collect()
    }

    /// Number of registered endpoints.
    pub fn count(&self) -> usize {
        self.endpoints.len()
    }
}
