//! Shared test utilities for Warden integration tests.
//!
//! Provides a wiremock-backed mock cluster endpoint plus configuration
//! builders tuned for fast tests (tiny retry backoff, polling off).

#![allow(dead_code)]

use secrecy::SecretString;
use serde_json::json;
use warden::config::{ClientConfig, EndpointConfig, WardenConfig};
use warden::orchestrator::Orchestrator;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TEST_TICKET: &str = "PVE:root@pam:test-ticket";
pub const TEST_CSRF: &str = "csrf-token-1";

/// A mock cluster endpoint speaking the upstream JSON API.
pub struct MockCluster {
    pub server: MockServer,
}

impl MockCluster {
    /// Start a mock cluster with a working auth endpoint.
    pub async fn start() -> Self {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api2/json/access/ticket"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {
                    "ticket": TEST_TICKET,
                    "CSRFPreventionToken": TEST_CSRF,
                }
            })))
            .mount(&server)
            .await;

        Self { server }
    }

    /// Start a mock cluster whose auth endpoint rejects everything.
    pub async fn start_with_bad_credentials() -> Self {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api2/json/access/ticket"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        Self { server }
    }

    /// Mount the version endpoint used by connectivity tests.
    pub async fn mount_version(&self) {
        Mock::given(method("GET"))
            .and(path("/api2/json/version"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "version": "8.1.4", "release": "8.1" }
            })))
            .mount(&self.server)
            .await;
    }

    /// Mount a node listing.
    pub async fn mount_nodes(&self, nodes: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path("/api2/json/nodes"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": nodes })))
            .mount(&self.server)
            .await;
    }

    /// Mount guest listings for one node.
    pub async fn mount_vms(&self, node: &str, qemu: serde_json::Value, lxc: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path(format!("/api2/json/nodes/{}/qemu", node)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": qemu })))
            .mount(&self.server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("/api2/json/nodes/{}/lxc", node)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": lxc })))
            .mount(&self.server)
            .await;
    }

    /// Mount one online node with the given qemu guests (and no
    /// containers), the common single-node fixture.
    pub async fn mount_single_node(&self, node: &str, qemu: serde_json::Value) {
        self.mount_nodes(json!([{
            "node": node,
            "status": "online",
            "cpu": 0.25,
            "maxcpu": 8,
            "mem": 8_589_934_592u64,
            "maxmem": 17_179_869_184u64,
            "disk": 107_374_182_400u64,
            "maxdisk": 429_496_729_600u64,
            "uptime": 360000,
        }]))
        .await;
        self.mount_vms(node, qemu, json!([])).await;
    }

    /// Endpoint configuration pointing at this mock server.
    pub fn endpoint_config(&self, id: &str) -> EndpointConfig {
        let uri = self.server.uri();
        let without_scheme = uri.strip_prefix("http://").expect("mock server is http");
        let (host, port) = without_scheme
            .split_once(':')
            .expect("mock server uri has a port");

        EndpointConfig {
            id: id.to_string(),
            name: None,
            host: host.to_string(),
            port: port.parse().expect("numeric port"),
            username: "root@pam".to_string(),
            password_env: None,
            password: Some(SecretString::new("secret".to_string())),
            use_tls: false,
            verify_tls: false,
        }
    }
}

/// An endpoint config pointing at a closed port: connection refused.
pub fn unreachable_endpoint_config(id: &str) -> EndpointConfig {
    EndpointConfig {
        id: id.to_string(),
        name: None,
        host: "127.0.0.1".to_string(),
        // Discard port; nothing listens there in the test environment
        port: 9,
        username: "root@pam".to_string(),
        password_env: None,
        password: Some(SecretString::new("secret".to_string())),
        use_tls: false,
        verify_tls: false,
    }
}

/// Configuration tuned for tests: no background polling, fast retries.
pub fn test_config() -> WardenConfig {
    let mut config = WardenConfig::default();
    config.poller.enabled = false;
    config.client = ClientConfig {
        request_timeout_seconds: 5,
        max_retries: 2,
        retry_backoff_ms: 10,
    };
    config.dispatch.batch_timeout_seconds = 10;
    config
}

/// A test orchestrator with no endpoints registered.
pub fn orchestrator() -> Orchestrator {
    Orchestrator::new(test_config())
}

/// A test orchestrator with one endpoint pointing at the mock cluster.
pub fn orchestrator_with(cluster: &MockCluster, id: &str) -> Orchestrator {
    let orchestrator = orchestrator();
    orchestrator
        .add_endpoint(cluster.endpoint_config(id))
        .expect("add endpoint");
    orchestrator
}

/// A standard two-guest qemu fixture for `mount_single_node`.
pub fn two_running_vms() -> serde_json::Value {
    json!([
        {
            "vmid": 100,
            "name": "web-01",
            "status": "running",
            "cpu": 0.10,
            "mem": 2_147_483_648u64,
            "maxmem": 4_294_967_296u64,
            "disk": 0,
            "maxdisk": 34_359_738_368u64,
            "netin": 1000,
            "netout": 2000,
        },
        {
            "vmid": 101,
            "name": "db-01",
            "status": "running",
            "cpu": 0.20,
            "mem": 3_221_225_472u64,
            "maxmem": 4_294_967_296u64,
            "disk": 0,
            "maxdisk": 68_719_476_736u64,
            "netin": 500,
            "netout": 700,
        }
    ])
}
