//! Point-in-time snapshots of nodes and virtual machines.
//!
//! Snapshots are replaced wholesale on every poll cycle; there are no
//! partial field updates. Identity is the composite key: `(endpoint,
//! node)` for nodes, `(endpoint, node, vmid)` for guests — a vmid alone
//! is not unique across endpoints.

use crate::client::wire::{NodeEntry, VmEntry};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Guest kind: a full virtual machine or a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VmKind {
    /// Full virtual machine
    Qemu,
    /// Container
    Lxc,
}

impl VmKind {
    /// URL path segment for this guest kind.
    pub fn api_segment(&self) -> &'static str {
        match self {
            VmKind::Qemu => "qemu",
            VmKind::Lxc => "lxc",
        }
    }
}

/// Guest power state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VmStatus {
    Running,
    Stopped,
    Paused,
    Suspended,
    Unknown,
}

impl VmStatus {
    pub fn from_api(status: &str) -> Self {
        match status {
            "running" => VmStatus::Running,
            "stopped" => VmStatus::Stopped,
            "paused" => VmStatus::Paused,
            "suspended" => VmStatus::Suspended,
            _ => VmStatus::Unknown,
        }
    }
}

/// Composite key for a node snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeKey {
    pub endpoint_id: String,
    pub node: String,
}

/// Composite key for a guest snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VmKey {
    pub endpoint_id: String,
    pub node: String,
    pub vmid: u32,
}

/// One cluster member at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSnapshot {
    pub endpoint_id: String,
    pub node: String,
    pub online: bool,
    /// CPU usage, 0-100
    pub cpu_percent: f64,
    pub mem_used: u64,
    pub mem_total: u64,
    pub disk_used: u64,
    pub disk_total: u64,
    pub uptime: u64,
    pub captured_at: DateTime<Utc>,
}

impl NodeSnapshot {
    pub fn from_wire(endpoint_id: &str, entry: &NodeEntry, captured_at: DateTime<Utc>) -> Self {
        Self {
            endpoint_id: endpoint_id.to_string(),
            node: entry.node.clone(),
            online: entry.status == "online",
            cpu_percent: entry.cpu * 100.0,
            mem_used: entry.mem,
            mem_total: entry.maxmem,
            disk_used: entry.disk,
            disk_total: entry.maxdisk,
            uptime: entry.uptime,
            captured_at,
        }
    }

    pub fn key(&self) -> NodeKey {
        NodeKey {
            endpoint_id: self.endpoint_id.clone(),
            node: self.node.clone(),
        }
    }

    pub fn mem_percent(&self) -> f64 {
        percent(self.mem_used, self.mem_total)
    }

    pub fn disk_percent(&self) -> f64 {
        percent(self.disk_used, self.disk_total)
    }
}

/// One guest at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VmSnapshot {
    pub endpoint_id: String,
    pub node: String,
    pub vmid: u32,
    pub name: String,
    pub kind: VmKind,
    pub status: VmStatus,
    /// CPU usage, 0-100
    pub cpu_percent: f64,
    pub mem_used: u64,
    pub mem_total: u64,
    pub disk_used: u64,
    pub disk_total: u64,
    /// Lifetime received bytes counter
    pub net_in: u64,
    /// Lifetime sent bytes counter
    pub net_out: u64,
    pub captured_at: DateTime<Utc>,
}

impl VmSnapshot {
    pub fn from_wire(
        endpoint_id: &str,
        node: &str,
        kind: VmKind,
        entry: &VmEntry,
        captured_at: DateTime<Utc>,
    ) -> Self {
        Self {
            endpoint_id: endpoint_id.to_string(),
            node: node.to_string(),
            vmid: entry.vmid,
            name: entry
                .name
                .clone()
                .unwrap_or_else(|| format!("vm-{}", entry.vmid)),
            kind,
            status: VmStatus::from_api(&entry.status),
            cpu_percent: entry.cpu * 100.0,
            mem_used: entry.mem,
            mem_total: entry.maxmem,
            disk_used: entry.disk,
            disk_total: entry.maxdisk,
            net_in: entry.netin,
            net_out: entry.netout,
            captured_at,
        }
    }

    pub fn key(&self) -> VmKey {
        VmKey {
            endpoint_id: self.endpoint_id.clone(),
            node: self.node.clone(),
            vmid: self.vmid,
        }
    }

    pub fn mem_percent(&self) -> f64 {
        percent(self.mem_used, self.mem_total)
    }

    pub fn disk_percent(&self) -> f64 {
        percent(self.disk_used, self.disk_total)
    }
}

fn percent(used: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        used as f64 / total as f64 * 100.0
    }
}
