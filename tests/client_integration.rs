//! Integration tests for the per-endpoint client: session lifecycle,
//! 401 re-authentication, and transient-failure retry.

mod common;

use common::{MockCluster, TEST_CSRF, TEST_TICKET};
use secrecy::SecretString;
use std::sync::Arc;
use warden::client::{ApiClient, ClientError, Credentials};
use warden::config::ClientConfig;
use warden::registry::{ConnectionHealth, ConnectionStatus};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, ResponseTemplate};

fn client_config() -> ClientConfig {
    ClientConfig {
        request_timeout_seconds: 5,
        max_retries: 2,
        retry_backoff_ms: 10,
    }
}

fn build_client(cluster: &MockCluster, id: &str) -> (ApiClient, Arc<ConnectionHealth>) {
    let config = cluster.endpoint_config(id);
    let health = Arc::new(ConnectionHealth::new());
    let client = ApiClient::new(
        &config,
        Credentials {
            username: config.username.clone(),
            password: SecretString::new("secret".to_string()),
        },
        &client_config(),
        Arc::clone(&health),
        None,
    )
    .unwrap();
    (client, health)
}

async fn auth_request_count(cluster: &MockCluster) -> usize {
    cluster
        .server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == "/api2/json/access/ticket")
        .count()
}

#[tokio::test]
async fn test_lazy_authentication_and_ticket_attachment() {
    let cluster = MockCluster::start().await;

    // The version endpoint only answers when the ticket cookie is there
    Mock::given(method("GET"))
        .and(path("/api2/json/version"))
        .and(header("Cookie", format!("PVEAuthCookie={}", TEST_TICKET)))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": { "version": "8.1.4" }
        })))
        .mount(&cluster.server)
        .await;

    let (client, health) = build_client(&cluster, "ep1");

    let version = client.version().await.unwrap();
    assert_eq!(version.version, "8.1.4");
    assert_eq!(health.status(), ConnectionStatus::Connected);
    assert!(health.last_error().is_none());
    assert_eq!(auth_request_count(&cluster).await, 1);

    // A second call reuses the session
    client.version().await.unwrap();
    assert_eq!(auth_request_count(&cluster).await, 1);
}

#[tokio::test]
async fn test_anti_forgery_token_on_mutating_requests() {
    let cluster = MockCluster::start().await;

    Mock::given(method("POST"))
        .and(path("/api2/json/nodes/pve1/qemu/100/status/start"))
        .and(header("CSRFPreventionToken", TEST_CSRF))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "data": "UPID:1" })),
        )
        .mount(&cluster.server)
        .await;

    let (client, _health) = build_client(&cluster, "ep1");
    let data = client
        .post("/nodes/pve1/qemu/100/status/start", None)
        .await
        .unwrap();
    assert_eq!(data, serde_json::json!("UPID:1"));
}

#[tokio::test]
async fn test_reauthenticates_once_on_401() {
    let cluster = MockCluster::start().await;

    // First call is rejected, the replay after re-auth succeeds
    Mock::given(method("GET"))
        .and(path("/api2/json/version"))
        .respond_with(ResponseTemplate::new(401))
        .up_to_n_times(1)
        .mount(&cluster.server)
        .await;
    cluster.mount_version().await;

    let (client, health) = build_client(&cluster, "ep1");

    let version = client.version().await.unwrap();
    assert_eq!(version.version, "8.1.4");
    assert_eq!(health.status(), ConnectionStatus::Connected);
    // Initial login plus the forced re-authentication
    assert_eq!(auth_request_count(&cluster).await, 2);
}

#[tokio::test]
async fn test_persistent_401_fails_with_auth_error() {
    let cluster = MockCluster::start().await;

    Mock::given(method("GET"))
        .and(path("/api2/json/version"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&cluster.server)
        .await;

    let (client, health) = build_client(&cluster, "ep1");

    let error = client.version().await.unwrap_err();
    assert!(matches!(error, ClientError::Auth(_)));
    assert_eq!(health.status(), ConnectionStatus::Error);
    assert!(health.last_error().is_some());
}

#[tokio::test]
async fn test_bad_credentials_fail_without_retry() {
    let cluster = MockCluster::start_with_bad_credentials().await;
    let (client, health) = build_client(&cluster, "ep1");

    let error = client.version().await.unwrap_err();
    assert!(matches!(error, ClientError::Auth(_)));
    assert_eq!(health.status(), ConnectionStatus::Error);
    // Authentication itself is never retried
    assert_eq!(auth_request_count(&cluster).await, 1);
}

#[tokio::test]
async fn test_transient_5xx_retried_until_success() {
    let cluster = MockCluster::start().await;

    Mock::given(method("GET"))
        .and(path("/api2/json/version"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&cluster.server)
        .await;
    cluster.mount_version().await;

    let (client, health) = build_client(&cluster, "ep1");

    let version = client.version().await.unwrap();
    assert_eq!(version.version, "8.1.4");
    assert_eq!(health.status(), ConnectionStatus::Connected);
}

#[tokio::test]
async fn test_exhausted_retries_mark_error() {
    let cluster = MockCluster::start().await;

    Mock::given(method("GET"))
        .and(path("/api2/json/version"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&cluster.server)
        .await;

    let (client, health) = build_client(&cluster, "ep1");

    let error = client.version().await.unwrap_err();
    assert!(error.is_transient());
    assert_eq!(health.status(), ConnectionStatus::Error);
    assert!(health
        .last_error()
        .map(|e| e.contains("500"))
        .unwrap_or(false));

    // Initial attempt plus two retries
    let version_calls = cluster
        .server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == "/api2/json/version")
        .count();
    assert_eq!(version_calls, 3);
}

#[tokio::test]
async fn test_recovery_clears_last_error() {
    let cluster = MockCluster::start().await;

    Mock::given(method("GET"))
        .and(path("/api2/json/version"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(3)
        .mount(&cluster.server)
        .await;
    cluster.mount_version().await;

    let (client, health) = build_client(&cluster, "ep1");

    // First call exhausts its retries against the three 500s
    assert!(client.version().await.is_err());
    assert_eq!(health.status(), ConnectionStatus::Error);

    // Next call lands on the healthy mock
    client.version().await.unwrap();
    assert_eq!(health.status(), ConnectionStatus::Connected);
    assert!(health.last_error().is_none());
}

#[tokio::test]
async fn test_non_json_payload_is_invalid_response() {
    let cluster = MockCluster::start().await;

    Mock::given(method("GET"))
        .and(path("/api2/json/version"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
        .mount(&cluster.server)
        .await;

    let (client, _health) = build_client(&cluster, "ep1");
    let error = client.version().await.unwrap_err();
    assert!(matches!(error, ClientError::InvalidResponse(_)));
}
