//! Snapshot diffing between consecutive poll generations.
//!
//! Emits added/removed/changed events per composite key. Usage numbers
//! are quantized: a change event fires only when a percentage moves by
//! at least the configured threshold, so small sampling jitter does not
//! flood subscribers. Network byte counters are monotonic and excluded
//! from change detection; the alert engine derives rates from them.

use crate::events::Event;
use crate::inventory::snapshot::{NodeKey, NodeSnapshot, VmKey, VmSnapshot};
use std::collections::HashMap;

/// Diff two node generations for one endpoint.
pub fn diff_nodes(
    old: &HashMap<NodeKey, NodeSnapshot>,
    new: &HashMap<NodeKey, NodeSnapshot>,
    threshold: f64,
) -> Vec<Event> {
    let mut events = Vec::new();

    for (key, node) in new {
        match old.get(key) {
            None => events.push(Event::NodeAdded { node: node.clone() }),
            Some(prev) if node_changed(prev, node, threshold) => {
                events.push(Event::NodeChanged { node: node.clone() })
            }
            Some(_) => {}
        }
    }

    for key in old.keys() {
        if !new.contains_key(key) {
            events.push(Event::NodeRemoved {
                endpoint_id: key.endpoint_id.clone(),
                node: key.node.clone(),
            });
        }
    }

    events
}

/// Diff two guest generations for one endpoint.
pub fn diff_vms(
    old: &HashMap<VmKey, VmSnapshot>,
    new: &HashMap<VmKey, VmSnapshot>,
    threshold: f64,
) -> Vec<Event> {
    let mut events = Vec::new();

    for (key, vm) in new {
        match old.get(key) {
            None => events.push(Event::VmAdded { vm: vm.clone() }),
            Some(prev) if vm_changed(prev, vm, threshold) => {
                events.push(Event::VmChanged { vm: vm.clone() })
            }
            Some(_) => {}
        }
    }

    for key in old.keys() {
        if !new.contains_key(key) {
            events.push(Event::VmRemoved {
                endpoint_id: key.endpoint_id.clone(),
                node: key.node.clone(),
                vmid: key.vmid,
            });
        }
    }

    events
}

fn node_changed(prev: &NodeSnapshot, next: &NodeSnapshot, threshold: f64) -> bool {
    prev.online != next.online
        || beyond(prev.cpu_percent, next.cpu_percent, threshold)
        || beyond(prev.mem_percent(), next.mem_percent(), threshold)
        || beyond(prev.disk_percent(), next.disk_percent(), threshold)
}

fn vm_changed(prev: &VmSnapshot, next: &VmSnapshot, threshold: f64) -> bool {
    prev.status != next.status
        || prev.name != next.name
        || prev.node != next.node
        || beyond(prev.cpu_percent, next.cpu_percent, threshold)
        || beyond(prev.mem_percent(), next.mem_percent(), threshold)
        || beyond(prev.disk_percent(), next.disk_percent(), threshold)
}

fn beyond(a: f64, b: f64, threshold: f64) -> bool {
    (a - b).abs() >= threshold
}
