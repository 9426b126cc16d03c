//! Upstream JSON shapes for the cluster REST API.
//!
//! Every response wraps its payload in a `data` envelope. Numeric usage
//! fields are optional on the wire; missing values default to zero so a
//! node that reports nothing still yields a usable entry.

use serde::Deserialize;

/// The `{"data": ...}` envelope around every API response.
#[derive(Debug, Deserialize)]
pub struct ApiEnvelope<T> {
    pub data: T,
}

/// Payload of a successful session-creation call.
#[derive(Debug, Deserialize)]
pub struct TicketData {
    pub ticket: String,
    #[serde(rename = "CSRFPreventionToken")]
    pub csrf_token: String,
}

/// One cluster member as returned by the node listing.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeEntry {
    pub node: String,
    pub status: String,
    #[serde(default)]
    pub cpu: f64,
    #[serde(default)]
    pub maxcpu: u32,
    #[serde(default)]
    pub mem: u64,
    #[serde(default)]
    pub maxmem: u64,
    #[serde(default)]
    pub disk: u64,
    #[serde(default)]
    pub maxdisk: u64,
    #[serde(default)]
    pub uptime: u64,
}

/// One guest as returned by the per-node VM/container listings.
#[derive(Debug, Clone, Deserialize)]
pub struct VmEntry {
    pub vmid: u32,
    #[serde(default)]
    pub name: Option<String>,
    pub status: String,
    #[serde(default)]
    pub cpu: f64,
    #[serde(default)]
    pub mem: u64,
    #[serde(default)]
    pub maxmem: u64,
    #[serde(default)]
    pub disk: u64,
    #[serde(default)]
    pub maxdisk: u64,
    #[serde(default)]
    pub netin: u64,
    #[serde(default)]
    pub netout: u64,
}

/// Payload of the version/health endpoint used for connectivity tests.
#[derive(Debug, Clone, Deserialize)]
pub struct VersionInfo {
    pub version: String,
    #[serde(default)]
    pub release: Option<String>,
}
