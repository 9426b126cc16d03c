//! Inventory snapshots: the current nodes and guests of every endpoint.
//!
//! The store follows a strict single-writer / multi-reader discipline:
//! for any endpoint only that endpoint's poll loop writes, and it always
//! replaces the endpoint's entries wholesale. Readers (the broadcaster,
//! the alert engine, the dispatcher's pre-flight check) take short read
//! locks and clone out what they need, so they never observe a
//! half-updated generation.

pub mod diff;
mod snapshot;

pub use snapshot::{NodeKey, NodeSnapshot, VmKey, VmKind, VmSnapshot, VmStatus};

use crate::events::Event;
use std::collections::HashMap;
use std::sync::RwLock;

/// Thread-safe store of the latest node and guest snapshots.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    nodes: RwLock<HashMap<NodeKey, NodeSnapshot>>,
    vms: RwLock<HashMap<VmKey, VmSnapshot>>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace one endpoint's snapshots with a fresh generation.
    ///
    /// Returns the diff events (added/removed/changed) against the
    /// previous generation. Entries of other endpoints are untouched.
    pub fn replace_endpoint(
        &self,
        endpoint_id: &str,
        nodes: Vec<NodeSnapshot>,
        vms: Vec<VmSnapshot>,
        change_threshold: f64,
    ) -> Vec<Event> {
        let mut events = Vec::new();

        {
            let mut guard = self.nodes.write().expect("node map poisoned");
            let old: HashMap<NodeKey, NodeSnapshot> = guard
                .iter()
                .filter(|(k, _)| k.endpoint_id == endpoint_id)
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            let new: HashMap<NodeKey, NodeSnapshot> =
                nodes.into_iter().map(|n| (n.key(), n)).collect();

            events.extend(diff::diff_nodes(&old, &new, change_threshold));

            guard.retain(|k, _| k.endpoint_id != endpoint_id);
            guard.extend(new);
        }

        {
            let mut guard = self.vms.write().expect("vm map poisoned");
            let old: HashMap<VmKey, VmSnapshot> = guard
                .iter()
                .filter(|(k, _)| k.endpoint_id == endpoint_id)
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            let new: HashMap<VmKey, VmSnapshot> = vms.into_iter().map(|v| (v.key(), v)).collect();

            events.extend(diff::diff_vms(&old, &new, change_threshold));

            guard.retain(|k, _| k.endpoint_id != endpoint_id);
            guard.extend(new);
        }

        events
    }

    /// Drop every snapshot belonging to an endpoint.
    ///
    /// Returns removal events so subscribers see the entries disappear.
    pub fn purge_endpoint(&self, endpoint_id: &str) -> Vec<Event> {
        let mut events = Vec::new();

        {
            let mut guard = self.nodes.write().expect("node map poisoned");
            guard.retain(|k, _| {
                if k.endpoint_id == endpoint_id {
                    events.push(Event::NodeRemoved {
                        endpoint_id: k.endpoint_id.clone(),
                        node: k.node.clone(),
                    });
                    false
                } else {
                    true
                }
            });
        }

        {
            let mut guard = self.vms.write().expect("vm map poisoned");
            guard.retain(|k, _| {
                if k.endpoint_id == endpoint_id {
                    events.push(Event::VmRemoved {
                        endpoint_id: k.endpoint_id.clone(),
                        node: k.node.clone(),
                        vmid: k.vmid,
                    });
                    false
                } else {
                    true
                }
            });
        }

        events
    }

    /// All node snapshots, ordered by (endpoint, node).
    pub fn nodes(&self) -> Vec<NodeSnapshot> {
        let mut nodes: Vec<_> = self
            .nodes
            .read()
            .expect("node map poisoned")
            .values()
            .cloned()
            .collect();
        nodes.sort_by(|a, b| (&a.endpoint_id, &a.node).cmp(&(&b.endpoint_id, &b.node)));
        nodes
    }

    /// All guest snapshots, ordered by (endpoint, node, vmid).
    pub fn vms(&self) -> Vec<VmSnapshot> {
        let mut vms: Vec<_> = self
            .vms
            .read()
            .expect("vm map poisoned")
            .values()
            .cloned()
            .collect();
        vms.sort_by(|a, b| {
            (&a.endpoint_id, &a.node, a.vmid).cmp(&(&b.endpoint_id, &b.node, b.vmid))
        });
        vms
    }

    /// Node snapshots for one endpoint.
    pub fn nodes_for(&self, endpoint_id: &str) -> Vec<NodeSnapshot> {
        self.nodes()
            .into_iter()
            .filter(|n| n.endpoint_id == endpoint_id)
            .collect()
    }

    /// Guest snapshots for one endpoint.
    pub fn vms_for(&self, endpoint_id: &str) -> Vec<VmSnapshot> {
        self.vms()
            .into_iter()
            .filter(|v| v.endpoint_id == endpoint_id)
            .collect()
    }

    /// Look up one guest by composite key.
    pub fn get_vm(&self, key: &VmKey) -> Option<VmSnapshot> {
        self.vms.read().expect("vm map poisoned").get(key).cloned()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.read().expect("node map poisoned").len()
    }

    pub fn vm_count(&self) -> usize {
        self.vms.read().expect("vm map poisoned").len()
    }
}
