//! Per-endpoint state polling.
//!
//! Each registered endpoint gets exactly one poll loop; snapshot
//! replacement, diffing, and alert evaluation for an endpoint therefore
//! run strictly sequentially, while endpoints proceed independently of
//! each other. A cycle fetches the node listing and then each online
//! node's guests, replaces the endpoint's snapshots wholesale, publishes
//! the diff, and hands the fresh generation to the alert engine. A
//! failed cycle leaves the previous snapshots in place — stale data
//! beats a blanked view — and only the connection state changes.

mod config;

pub use config::PollerConfig;

use crate::alerts::AlertEngine;
use crate::client::ClientError;
use crate::events::EventBus;
use crate::inventory::{NodeSnapshot, SnapshotStore, VmKind, VmSnapshot};
use crate::registry::EndpointHandle;
use chrono::Utc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

/// Spawns and runs the per-endpoint poll loops.
#[derive(Clone)]
pub struct Poller {
    store: Arc<SnapshotStore>,
    alerts: Arc<AlertEngine>,
    events: EventBus,
    config: PollerConfig,
}

impl Poller {
    pub fn new(
        store: Arc<SnapshotStore>,
        alerts: Arc<AlertEngine>,
        events: EventBus,
        config: PollerConfig,
    ) -> Self {
        Self {
            store,
            alerts,
            events,
            config,
        }
    }

    /// Start the poll loop for one endpoint. The loop runs until the
    /// handle's cancellation token fires (i.e., the endpoint is removed
    /// or the server shuts down).
    pub fn spawn(&self, handle: Arc<EndpointHandle>) -> JoinHandle<()> {
        let poller = self.clone();

        tokio::spawn(async move {
            let endpoint_id = handle.config.id.clone();
            let mut interval =
                tokio::time::interval(Duration::from_secs(poller.config.interval_seconds));
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            tracing::info!(
                endpoint_id = %endpoint_id,
                interval_seconds = poller.config.interval_seconds,
                "state poller started"
            );

            loop {
                tokio::select! {
                    _ = handle.cancel.cancelled() => {
                        tracing::info!(endpoint_id = %endpoint_id, "state poller stopped");
                        break;
                    }
                    _ = interval.tick() => {
                        if poller.poll_once(&handle).await.is_err() {
                            // Status and alerts are already recorded; hold
                            // back before the next eligible tick.
                            let backoff =
                                Duration::from_secs(poller.config.failure_backoff_seconds);
                            tokio::select! {
                                _ = handle.cancel.cancelled() => {
                                    tracing::info!(endpoint_id = %endpoint_id, "state poller stopped");
                                    break;
                                }
                                _ = tokio::time::sleep(backoff) => {}
                            }
                        }
                    }
                }
            }
        })
    }

    /// Run one poll cycle for an endpoint.
    ///
    /// On success the snapshot store holds the fresh generation, diff
    /// events have been published, and the alert engine has evaluated
    /// the new values. On failure nothing is replaced: the previous
    /// snapshots stay in place and the endpoint's connection alert is
    /// raised.
    pub async fn poll_once(&self, handle: &EndpointHandle) -> Result<(), ClientError> {
        let endpoint_id = handle.config.id.as_str();
        let started = Instant::now();

        let (nodes, vms) = match self.fetch_generation(handle).await {
            Ok(generation) => generation,
            Err(e) => {
                tracing::warn!(
                    endpoint_id = %endpoint_id,
                    error = %e,
                    "poll cycle failed"
                );
                metrics::counter!("warden_poll_failures_total", "endpoint" => endpoint_id.to_string())
                    .increment(1);
                self.alerts.connection_lost(endpoint_id, &e.to_string());
                return Err(e);
            }
        };

        // The endpoint may have been removed while the fetch was in
        // flight; a cancelled handle must not write purged data back.
        if handle.cancel.is_cancelled() {
            return Ok(());
        }

        let node_count = nodes.len();
        let vm_count = vms.len();

        let changes = self.store.replace_endpoint(
            endpoint_id,
            nodes.clone(),
            vms.clone(),
            self.config.change_threshold_percent,
        );
        let change_count = changes.len();
        self.events.publish_all(changes);

        self.alerts.evaluate_endpoint(endpoint_id, &nodes, &vms);
        self.alerts.connection_recovered(endpoint_id);

        metrics::histogram!("warden_poll_duration_seconds", "endpoint" => endpoint_id.to_string())
            .record(started.elapsed().as_secs_f64());

        tracing::debug!(
            endpoint_id = %endpoint_id,
            nodes = node_count,
            vms = vm_count,
            changes = change_count,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "poll cycle completed"
        );

        Ok(())
    }

    /// Fetch the node listing and every online node's guests.
    async fn fetch_generation(
        &self,
        handle: &EndpointHandle,
    ) -> Result<(Vec<NodeSnapshot>, Vec<VmSnapshot>), ClientError> {
        let endpoint_id = handle.config.id.as_str();
        let captured_at = Utc::now();

        let entries = handle.client.list_nodes().await?;

        let mut nodes: Vec<NodeSnapshot> = Vec::with_capacity(entries.len());
        let mut vms: Vec<VmSnapshot> = Vec::new();

        for entry in &entries {
            let node = NodeSnapshot::from_wire(endpoint_id, entry, captured_at);
            let online = node.online;
            nodes.push(node);

            if !online {
                continue;
            }
            for kind in [VmKind::Qemu, VmKind::Lxc] {
                match handle.client.list_vms(&entry.node, kind).await {
                    Ok(list) => vms.extend(list.iter().map(|vm| {
                        VmSnapshot::from_wire(endpoint_id, &entry.node, kind, vm, captured_at)
                    })),
                    // A node without container (or VM) support answers
                    // with a client error; skip that kind, keep the rest.
                    Err(ClientError::Http { status, .. }) if (400..500).contains(&status) => {
                        tracing::debug!(
                            endpoint_id = %endpoint_id,
                            node = %entry.node,
                            ?kind,
                            status,
                            "guest listing unsupported, skipping"
                        );
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        Ok((nodes, vms))
    }
}
