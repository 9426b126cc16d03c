//! Alert engine: threshold evaluation over poll snapshots.
//!
//! Runs once per successful poll cycle per endpoint, after the snapshot
//! store has been updated. For each monitored dimension and resource the
//! highest breached level wins; an active record for the same
//! (resource, dimension) key is left untouched unless the level changed,
//! in which case the old record is resolved and a new one created. A
//! breach that clears on a later successful poll auto-resolves its
//! record. Polling failures raise a per-endpoint connection alert and
//! never touch resource-threshold records: only fresh data may resolve
//! them.

mod record;
mod rules;

pub use record::{
    AlertDimension, AlertKey, AlertLevel, AlertRecord, AlertStatus, ResourceRef,
};
pub use rules::{AlertsConfig, LevelThresholds};

use crate::events::{Event, EventBus};
use crate::inventory::{NodeSnapshot, VmKey, VmSnapshot};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use thiserror::Error;
use uuid::Uuid;

/// Errors from explicit alert operations.
#[derive(Debug, Error)]
pub enum AlertError {
    #[error("alert not found: {0}")]
    NotFound(Uuid),

    #[error("alert is already {0:?}")]
    InvalidTransition(AlertStatus),
}

/// Filter for listing alert records.
#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize)]
pub struct AlertFilter {
    pub status: Option<AlertStatus>,
    pub level: Option<AlertLevel>,
    pub endpoint_id: Option<String>,
}

#[derive(Debug, Default)]
struct AlertStore {
    records: HashMap<Uuid, AlertRecord>,
    /// Unresolved record per (resource, dimension) key
    active: HashMap<AlertKey, Uuid>,
}

#[derive(Debug, Clone, Copy)]
struct NetSample {
    total_bytes: u64,
    at: DateTime<Utc>,
}

/// Evaluates thresholds and owns the alert records.
pub struct AlertEngine {
    rules: AlertsConfig,
    store: Mutex<AlertStore>,
    net_samples: Mutex<HashMap<VmKey, NetSample>>,
    events: EventBus,
}

impl AlertEngine {
    pub fn new(rules: AlertsConfig, events: EventBus) -> Self {
        Self {
            rules,
            store: Mutex::new(AlertStore::default()),
            net_samples: Mutex::new(HashMap::new()),
            events,
        }
    }

    /// Evaluate one endpoint's fresh snapshots against the thresholds.
    pub fn evaluate_endpoint(
        &self,
        endpoint_id: &str,
        nodes: &[NodeSnapshot],
        vms: &[VmSnapshot],
    ) {
        if !self.rules.enabled {
            return;
        }

        let observations = self.collect_observations(nodes, vms);

        let mut emitted = Vec::new();
        {
            let mut store = self.store.lock().expect("alert store poisoned");
            let mut breached: HashSet<AlertKey> = HashSet::new();

            for (resource, dimension, value, thresholds) in observations {
                let key = AlertKey {
                    resource: resource.clone(),
                    dimension,
                };
                if let Some((level, threshold)) = thresholds.classify(value) {
                    breached.insert(key.clone());
                    emitted.extend(apply_breach(
                        &mut store, key, resource, dimension, level, value, threshold,
                    ));
                }
            }

            // Auto-resolve: every unresolved resource record of this
            // endpoint whose condition did not breach in this fresh poll.
            let clear: Vec<AlertKey> = store
                .active
                .keys()
                .filter(|key| {
                    key.dimension != AlertDimension::Connection
                        && key.resource.endpoint_id() == endpoint_id
                        && !breached.contains(*key)
                })
                .cloned()
                .collect();
            for key in clear {
                emitted.extend(resolve_key(&mut store, &key));
            }
        }
        self.events.publish_all(emitted);
    }

    /// Raise the per-endpoint connection alert. Left untouched if one is
    /// already active; resolved only by `connection_recovered`.
    pub fn connection_lost(&self, endpoint_id: &str, cause: &str) {
        let resource = ResourceRef::Endpoint {
            endpoint_id: endpoint_id.to_string(),
        };
        let key = AlertKey {
            resource: resource.clone(),
            dimension: AlertDimension::Connection,
        };

        let mut emitted = Vec::new();
        {
            let mut store = self.store.lock().expect("alert store poisoned");
            if !store.active.contains_key(&key) {
                let record = AlertRecord::new(
                    resource,
                    AlertDimension::Connection,
                    AlertLevel::Critical,
                    format!("endpoint unreachable: {}", cause),
                    None,
                    None,
                );
                store.active.insert(key, record.id);
                store.records.insert(record.id, record.clone());
                emitted.push(Event::AlertRaised { alert: record });
            }
        }
        self.events.publish_all(emitted);
    }

    /// Resolve the connection alert after a successful poll cycle.
    pub fn connection_recovered(&self, endpoint_id: &str) {
        let key = AlertKey {
            resource: ResourceRef::Endpoint {
                endpoint_id: endpoint_id.to_string(),
            },
            dimension: AlertDimension::Connection,
        };

        let mut emitted = Vec::new();
        {
            let mut store = self.store.lock().expect("alert store poisoned");
            emitted.extend(resolve_key(&mut store, &key));
        }
        self.events.publish_all(emitted);
    }

    /// List records matching the filter, newest first.
    pub fn list(&self, filter: &AlertFilter) -> Vec<AlertRecord> {
        let store = self.store.lock().expect("alert store poisoned");
        let mut records: Vec<_> = store
            .records
            .values()
            .filter(|r| filter.status.map_or(true, |s| r.status == s))
            .filter(|r| filter.level.map_or(true, |l| r.level == l))
            .filter(|r| {
                filter
                    .endpoint_id
                    .as_deref()
                    .map_or(true, |id| r.resource.endpoint_id() == id)
            })
            .cloned()
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        records
    }

    /// Unresolved records, for the subscriber snapshot.
    pub fn unresolved(&self) -> Vec<AlertRecord> {
        self.list(&AlertFilter::default())
            .into_iter()
            .filter(|r| r.status != AlertStatus::Resolved)
            .collect()
    }

    /// Operator acknowledgement of an active alert.
    pub fn acknowledge(&self, id: Uuid) -> Result<AlertRecord, AlertError> {
        let mut store = self.store.lock().expect("alert store poisoned");
        let record = store
            .records
            .get_mut(&id)
            .ok_or(AlertError::NotFound(id))?;
        if record.status != AlertStatus::Active {
            return Err(AlertError::InvalidTransition(record.status));
        }
        record.status = AlertStatus::Acknowledged;
        record.acknowledged_at = Some(Utc::now());
        Ok(record.clone())
    }

    /// Operator resolution of an unresolved alert.
    pub fn resolve(&self, id: Uuid) -> Result<AlertRecord, AlertError> {
        let mut emitted = Vec::new();
        let result = {
            let mut store = self.store.lock().expect("alert store poisoned");
            let record = store.records.get(&id).ok_or(AlertError::NotFound(id))?;
            if record.status == AlertStatus::Resolved {
                return Err(AlertError::InvalidTransition(record.status));
            }
            let key = record.key();
            let events = resolve_key(&mut store, &key);
            emitted.extend(events);
            store.records.get(&id).cloned().ok_or(AlertError::NotFound(id))
        };
        self.events.publish_all(emitted);
        result
    }

    /// Delete a record outright.
    pub fn delete(&self, id: Uuid) -> Result<(), AlertError> {
        let mut store = self.store.lock().expect("alert store poisoned");
        let record = store.records.remove(&id).ok_or(AlertError::NotFound(id))?;
        store.active.remove(&record.key());
        Ok(())
    }

    /// Drop every record belonging to a removed endpoint.
    pub fn purge_endpoint(&self, endpoint_id: &str) {
        let mut store = self.store.lock().expect("alert store poisoned");
        store
            .records
            .retain(|_, r| r.resource.endpoint_id() != endpoint_id);
        store
            .active
            .retain(|key, _| key.resource.endpoint_id() != endpoint_id);

        self.net_samples
            .lock()
            .expect("net sample map poisoned")
            .retain(|key, _| key.endpoint_id != endpoint_id);
    }

    fn collect_observations(
        &self,
        nodes: &[NodeSnapshot],
        vms: &[VmSnapshot],
    ) -> Vec<(ResourceRef, AlertDimension, f64, LevelThresholds)> {
        let mut observations = Vec::new();

        for node in nodes {
            let resource = ResourceRef::Node {
                endpoint_id: node.endpoint_id.clone(),
                node: node.node.clone(),
            };
            observations.push((
                resource.clone(),
                AlertDimension::Cpu,
                node.cpu_percent,
                self.rules.cpu,
            ));
            observations.push((
                resource.clone(),
                AlertDimension::Memory,
                node.mem_percent(),
                self.rules.memory,
            ));
            observations.push((
                resource,
                AlertDimension::Disk,
                node.disk_percent(),
                self.rules.disk,
            ));
        }

        for vm in vms {
            let resource = ResourceRef::Vm {
                endpoint_id: vm.endpoint_id.clone(),
                node: vm.node.clone(),
                vmid: vm.vmid,
            };
            observations.push((
                resource.clone(),
                AlertDimension::Cpu,
                vm.cpu_percent,
                self.rules.cpu,
            ));
            observations.push((
                resource.clone(),
                AlertDimension::Memory,
                vm.mem_percent(),
                self.rules.memory,
            ));
            observations.push((
                resource.clone(),
                AlertDimension::Disk,
                vm.disk_percent(),
                self.rules.disk,
            ));
            if let Some(rate) = self.network_rate(vm) {
                observations.push((resource, AlertDimension::Network, rate, self.rules.network));
            }
        }

        observations
    }

    /// Throughput in bytes/sec derived from the monotonic counters of
    /// two consecutive polls. None on the first sample or counter reset.
    fn network_rate(&self, vm: &VmSnapshot) -> Option<f64> {
        let mut samples = self.net_samples.lock().expect("net sample map poisoned");
        let total = vm.net_in.saturating_add(vm.net_out);
        let prev = samples.insert(
            vm.key(),
            NetSample {
                total_bytes: total,
                at: vm.captured_at,
            },
        )?;

        if total < prev.total_bytes {
            return None;
        }
        let elapsed = (vm.captured_at - prev.at).num_milliseconds();
        if elapsed <= 0 {
            return None;
        }
        Some((total - prev.total_bytes) as f64 / (elapsed as f64 / 1000.0))
    }
}

fn apply_breach(
    store: &mut AlertStore,
    key: AlertKey,
    resource: ResourceRef,
    dimension: AlertDimension,
    level: AlertLevel,
    value: f64,
    threshold: f64,
) -> Vec<Event> {
    let mut emitted = Vec::new();

    if let Some(existing_id) = store.active.get(&key).copied() {
        let existing_level = store.records[&existing_id].level;
        if existing_level == level {
            // Same condition at the same level: leave the record alone.
            return emitted;
        }
        // Level changed: resolve the old record and open a new one.
        emitted.extend(resolve_key(store, &key));
    }

    let message = format!(
        "{} {} at {:.1} breached the {:?} threshold ({:.1})",
        resource.label(),
        dimension.metric_name(),
        value,
        level,
        threshold
    );
    let record = AlertRecord::new(
        resource,
        dimension,
        level,
        message,
        Some(value),
        Some(threshold),
    );
    store.active.insert(key, record.id);
    store.records.insert(record.id, record.clone());
    emitted.push(Event::AlertRaised { alert: record });
    emitted
}

fn resolve_key(store: &mut AlertStore, key: &AlertKey) -> Vec<Event> {
    let mut emitted = Vec::new();
    if let Some(id) = store.active.remove(key) {
        if let Some(record) = store.records.get_mut(&id) {
            record.status = AlertStatus::Resolved;
            record.resolved_at = Some(Utc::now());
            emitted.push(Event::AlertResolved {
                alert: record.clone(),
            });
        }
    }
    emitted
}
