//! The control core facade: wires the registry, poller, dispatcher,
//! alert engine, and event bus together and exposes the operations the
//! surrounding API layer consumes.

use crate::alerts::{AlertEngine, AlertError, AlertFilter, AlertRecord};
use crate::client::{ApiClient, ClientError, Credentials};
use crate::config::{ConfigError, EndpointConfig, WardenConfig};
use crate::dispatch::{Action, BatchResult, BatchTarget, Dispatcher};
use crate::events::{Event, EventBus, FullSnapshot};
use crate::inventory::{NodeSnapshot, SnapshotStore, VmSnapshot};
use crate::poller::Poller;
use crate::registry::{
    ConnectionHealth, ConnectionView, EndpointHandle, Registry, RegistryError,
};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Errors surfaced by orchestrator operations.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Alert(#[from] AlertError),
}

/// Owns every subsystem of the control core.
///
/// Endpoint lifecycle policy lives here: adding an endpoint builds its
/// client and spawns its poll loop; removing it cancels the loop,
/// discards the session, and purges its snapshots and alerts in one
/// motion so stale data is never served.
pub struct Orchestrator {
    config: WardenConfig,
    registry: Arc<Registry>,
    store: Arc<SnapshotStore>,
    events: EventBus,
    alerts: Arc<AlertEngine>,
    dispatcher: Dispatcher,
    poller: Poller,
}

impl Orchestrator {
    pub fn new(config: WardenConfig) -> Self {
        let registry = Arc::new(Registry::new());
        let store = Arc::new(SnapshotStore::new());
        let events = EventBus::default();
        let alerts = Arc::new(AlertEngine::new(config.alerts.clone(), events.clone()));
        let dispatcher = Dispatcher::new(
            Arc::clone(&registry),
            Arc::clone(&store),
            events.clone(),
            config.dispatch.clone(),
        );
        let poller = Poller::new(
            Arc::clone(&store),
            Arc::clone(&alerts),
            events.clone(),
            config.poller.clone(),
        );

        Self {
            config,
            registry,
            store,
            events,
            alerts,
            dispatcher,
            poller,
        }
    }

    /// Register the endpoints from the static configuration. Failures
    /// are logged and skipped so one bad entry cannot block startup.
    pub fn bootstrap(&self) {
        for endpoint in self.config.endpoints.clone() {
            let id = endpoint.id.clone();
            match self.add_endpoint(endpoint) {
                Ok(()) => tracing::info!(endpoint_id = %id, "loaded endpoint from config"),
                Err(e) => {
                    tracing::error!(endpoint_id = %id, error = %e, "skipping endpoint from config")
                }
            }
        }
    }

    /// Add an endpoint. Does not authenticate eagerly; the session is
    /// created on the first call. Starts the poll loop when polling is
    /// enabled.
    pub fn add_endpoint(&self, config: EndpointConfig) -> Result<(), OrchestratorError> {
        if self.registry.contains(&config.id) {
            return Err(RegistryError::DuplicateEndpoint(config.id).into());
        }

        let credentials = Credentials {
            username: config.username.clone(),
            password: config.resolve_password()?,
        };
        let health = Arc::new(ConnectionHealth::new());
        let client = ApiClient::new(
            &config,
            credentials,
            &self.config.client,
            Arc::clone(&health),
            Some(self.events.sender()),
        )?;

        let handle = Arc::new(EndpointHandle {
            config,
            client: Arc::new(client),
            health,
            cancel: CancellationToken::new(),
        });
        self.registry.insert(Arc::clone(&handle))?;

        if self.config.poller.enabled {
            let _poll_loop = self.poller.spawn(handle);
        }

        Ok(())
    }

    /// Remove an endpoint: cancel its poll loop, drop its session, and
    /// purge its snapshots and alert records.
    pub fn remove_endpoint(&self, id: &str) -> Result<(), OrchestratorError> {
        let _handle = self.registry.remove(id)?;

        let removals = self.store.purge_endpoint(id);
        self.events.publish_all(removals);
        self.alerts.purge_endpoint(id);

        tracing::info!(endpoint_id = %id, "endpoint removed");
        Ok(())
    }

    /// Force an authenticate + lightweight call cycle against the
    /// endpoint and report reachability. Steady-state polling is not
    /// touched.
    pub async fn test_endpoint(&self, id: &str) -> Result<bool, OrchestratorError> {
        let handle = self
            .registry
            .get(id)
            .ok_or_else(|| RegistryError::EndpointNotFound(id.to_string()))?;

        match handle.client.probe().await {
            Ok(version) => {
                tracing::info!(endpoint_id = %id, version = %version.version, "endpoint reachable");
                Ok(true)
            }
            Err(e) => {
                tracing::warn!(endpoint_id = %id, error = %e, "endpoint test failed");
                Ok(false)
            }
        }
    }

    /// Run one poll cycle for an endpoint immediately, outside its
    /// regular interval.
    pub async fn refresh_endpoint(&self, id: &str) -> Result<(), OrchestratorError> {
        let handle = self
            .registry
            .get(id)
            .ok_or_else(|| RegistryError::EndpointNotFound(id.to_string()))?;
        self.poller.poll_once(&handle).await?;
        Ok(())
    }

    /// Connection views of every endpoint.
    pub fn list_connections(&self) -> Vec<ConnectionView> {
        self.registry.list()
    }

    /// Current node snapshots, optionally filtered by endpoint.
    pub fn list_nodes(&self, endpoint_id: Option<&str>) -> Vec<NodeSnapshot> {
        match endpoint_id {
            Some(id) => self.store.nodes_for(id),
            None => self.store.nodes(),
        }
    }

    /// Current guest snapshots, optionally filtered by endpoint.
    pub fn list_vms(&self, endpoint_id: Option<&str>) -> Vec<VmSnapshot> {
        match endpoint_id {
            Some(id) => self.store.vms_for(id),
            None => self.store.vms(),
        }
    }

    /// Dispatch a single action against one target.
    pub async fn dispatch_action(&self, target: BatchTarget, action: Action) -> BatchResult {
        self.dispatcher
            .dispatch(vec![target], action)
            .await
            .into_iter()
            .next()
            .expect("dispatch returns one result per target")
    }

    /// Dispatch one action against many targets.
    pub async fn dispatch_batch(
        &self,
        targets: Vec<BatchTarget>,
        action: Action,
    ) -> Vec<BatchResult> {
        self.dispatcher.dispatch(targets, action).await
    }

    /// Subscribe to the live event stream.
    ///
    /// The receiver is created before the snapshot is taken, so a new
    /// subscriber holds the complete state up front and every later
    /// change arrives on the stream — never a partial window.
    pub fn subscribe(&self) -> (FullSnapshot, broadcast::Receiver<Event>) {
        let receiver = self.events.subscribe();
        (self.snapshot(), receiver)
    }

    /// Immediate full snapshot of connections, inventory, and alerts.
    pub fn snapshot(&self) -> FullSnapshot {
        FullSnapshot {
            connections: self.list_connections(),
            nodes: self.store.nodes(),
            vms: self.store.vms(),
            alerts: self.alerts.unresolved(),
        }
    }

    pub fn list_alerts(&self, filter: &AlertFilter) -> Vec<AlertRecord> {
        self.alerts.list(filter)
    }

    pub fn acknowledge_alert(&self, id: Uuid) -> Result<AlertRecord, OrchestratorError> {
        Ok(self.alerts.acknowledge(id)?)
    }

    pub fn resolve_alert(&self, id: Uuid) -> Result<AlertRecord, OrchestratorError> {
        Ok(self.alerts.resolve(id)?)
    }

    pub fn delete_alert(&self, id: Uuid) -> Result<(), OrchestratorError> {
        Ok(self.alerts.delete(id)?)
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Stop every endpoint's poll loop. Used during server shutdown.
    pub fn shutdown(&self) {
        for handle in self.registry.handles() {
            handle.cancel.cancel();
        }
    }
}
