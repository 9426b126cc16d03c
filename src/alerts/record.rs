//! Alert records and their identity keys.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Alert severity, ordered ascending so the highest breached level wins.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Info,
    Warning,
    Critical,
}

/// Lifecycle status of an alert record.
///
/// Transitions move forward only (active → acknowledged → resolved); a
/// re-breach after resolution creates a new record with a new id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    Active,
    Acknowledged,
    Resolved,
}

/// Monitored dimension of a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertDimension {
    Cpu,
    Memory,
    Disk,
    Network,
    Connection,
}

impl AlertDimension {
    pub fn metric_name(&self) -> &'static str {
        match self {
            AlertDimension::Cpu => "cpu usage",
            AlertDimension::Memory => "memory usage",
            AlertDimension::Disk => "disk usage",
            AlertDimension::Network => "network throughput",
            AlertDimension::Connection => "connection",
        }
    }
}

/// The resource an alert refers to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ResourceRef {
    Endpoint {
        endpoint_id: String,
    },
    Node {
        endpoint_id: String,
        node: String,
    },
    Vm {
        endpoint_id: String,
        node: String,
        vmid: u32,
    },
}

impl ResourceRef {
    pub fn endpoint_id(&self) -> &str {
        match self {
            ResourceRef::Endpoint { endpoint_id }
            | ResourceRef::Node { endpoint_id, .. }
            | ResourceRef::Vm { endpoint_id, .. } => endpoint_id,
        }
    }

    pub fn label(&self) -> String {
        match self {
            ResourceRef::Endpoint { endpoint_id } => format!("endpoint {}", endpoint_id),
            ResourceRef::Node { endpoint_id, node } => format!("node {}/{}", endpoint_id, node),
            ResourceRef::Vm {
                endpoint_id,
                node,
                vmid,
            } => format!("vm {}/{}/{}", endpoint_id, node, vmid),
        }
    }
}

/// Identity of an alert condition: one (resource, dimension) pair.
/// At most one unresolved record exists per key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AlertKey {
    pub resource: ResourceRef,
    pub dimension: AlertDimension,
}

/// One raised condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRecord {
    pub id: Uuid,
    pub level: AlertLevel,
    pub dimension: AlertDimension,
    pub status: AlertStatus,
    pub resource: ResourceRef,
    pub message: String,
    /// Observed value at creation (percent, or bytes/sec for network)
    pub value: Option<f64>,
    /// Threshold that was breached
    pub threshold: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub acknowledged_at: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl AlertRecord {
    pub fn new(
        resource: ResourceRef,
        dimension: AlertDimension,
        level: AlertLevel,
        message: String,
        value: Option<f64>,
        threshold: Option<f64>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            level,
            dimension,
            status: AlertStatus::Active,
            resource,
            message,
            value,
            threshold,
            created_at: Utc::now(),
            acknowledged_at: None,
            resolved_at: None,
        }
    }

    pub fn key(&self) -> AlertKey {
        AlertKey {
            resource: self.resource.clone(),
            dimension: self.dimension,
        }
    }
}
