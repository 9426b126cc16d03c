//! Batch dispatch tests: failure isolation, policy screening, bounded
//! concurrency, and deadline behavior.

mod common;

use common::{orchestrator_with, test_config, two_running_vms, MockCluster};
use serde_json::json;
use std::time::{Duration, Instant};
use warden::dispatch::{Action, BatchTarget, PowerAction};
use warden::events::Event;
use warden::orchestrator::Orchestrator;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

fn target(endpoint_id: &str, vmid: u32) -> BatchTarget {
    BatchTarget {
        endpoint_id: endpoint_id.to_string(),
        node: "pve1".to_string(),
        vmid,
        kind: None,
    }
}

fn start_action() -> Action {
    Action::Power {
        action: PowerAction::Start,
    }
}

async fn populated_orchestrator(cluster: &MockCluster) -> Orchestrator {
    cluster.mount_single_node("pve1", two_running_vms()).await;
    let orchestrator = orchestrator_with(cluster, "ep1");
    orchestrator.refresh_endpoint("ep1").await.unwrap();
    orchestrator
}

async fn mount_power_endpoint(cluster: &MockCluster, vmid: u32, delay_ms: u64) {
    Mock::given(method("POST"))
        .and(path(format!(
            "/api2/json/nodes/pve1/qemu/{}/status/start",
            vmid
        )))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "data": format!("UPID:{}", vmid) }))
                .set_delay(Duration::from_millis(delay_ms)),
        )
        .mount(&cluster.server)
        .await;
}

#[tokio::test]
async fn test_empty_batch_is_a_no_op() {
    let cluster = MockCluster::start().await;
    let orchestrator = populated_orchestrator(&cluster).await;
    let before = cluster.server.received_requests().await.unwrap().len();

    let results = orchestrator.dispatch_batch(vec![], start_action()).await;

    assert!(results.is_empty());
    let after = cluster.server.received_requests().await.unwrap().len();
    assert_eq!(before, after);
}

#[tokio::test]
async fn test_batch_returns_one_result_per_target() {
    let cluster = MockCluster::start().await;
    let orchestrator = populated_orchestrator(&cluster).await;
    mount_power_endpoint(&cluster, 100, 0).await;
    mount_power_endpoint(&cluster, 101, 0).await;

    let mut rx = orchestrator.events().subscribe();
    let results = orchestrator
        .dispatch_batch(vec![target("ep1", 100), target("ep1", 101)], start_action())
        .await;

    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| r.success));
    assert!(results.iter().all(|r| r.action == "power:start"));
    assert_eq!(results[0].target.vmid, 100);
    assert_eq!(results[1].target.vmid, 101);

    // One command-result event per target for the audit trail
    let mut completed = 0;
    while let Ok(event) = rx.try_recv() {
        if matches!(event, Event::CommandCompleted { .. }) {
            completed += 1;
        }
    }
    assert_eq!(completed, 2);
}

#[tokio::test]
async fn test_unknown_vmid_fails_preflight_without_aborting_others() {
    let cluster = MockCluster::start().await;
    let orchestrator = populated_orchestrator(&cluster).await;
    mount_power_endpoint(&cluster, 100, 0).await;

    let results = orchestrator
        .dispatch_batch(vec![target("ep1", 100), target("ep1", 999)], start_action())
        .await;

    assert_eq!(results.len(), 2);
    assert!(results[0].success);
    assert!(!results[1].success);
    assert!(results[1]
        .error
        .as_deref()
        .unwrap()
        .contains("no such virtual machine"));
}

#[tokio::test]
async fn test_denylisted_shell_command_never_reaches_the_endpoint() {
    let cluster = MockCluster::start().await;
    let orchestrator = populated_orchestrator(&cluster).await;

    // The exec endpoint must never be called
    Mock::given(method("POST"))
        .and(path("/api2/json/nodes/pve1/qemu/100/agent/exec"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": null })))
        .expect(0)
        .mount(&cluster.server)
        .await;

    let results = orchestrator
        .dispatch_batch(
            vec![target("ep1", 100)],
            Action::Shell {
                command: "rm -rf / --no-preserve-root".to_string(),
            },
        )
        .await;

    assert_eq!(results.len(), 1);
    assert!(!results[0].success);
    assert!(results[0]
        .error
        .as_deref()
        .unwrap()
        .contains("rejected by policy"));
}

#[tokio::test]
async fn test_benign_shell_command_executes() {
    let cluster = MockCluster::start().await;
    let orchestrator = populated_orchestrator(&cluster).await;

    Mock::given(method("POST"))
        .and(path("/api2/json/nodes/pve1/qemu/100/agent/exec"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": { "pid": 4321 } })))
        .expect(1)
        .mount(&cluster.server)
        .await;

    let result = orchestrator
        .dispatch_action(
            target("ep1", 100),
            Action::Shell {
                command: "uptime".to_string(),
            },
        )
        .await;

    assert!(result.success);
    assert!(result.output.as_deref().unwrap().contains("4321"));
}

#[tokio::test]
async fn test_targets_run_concurrently() {
    let cluster = MockCluster::start().await;
    let orchestrator = populated_orchestrator(&cluster).await;
    mount_power_endpoint(&cluster, 100, 300).await;
    mount_power_endpoint(&cluster, 101, 300).await;

    let started = Instant::now();
    let results = orchestrator
        .dispatch_batch(vec![target("ep1", 100), target("ep1", 101)], start_action())
        .await;
    let elapsed = started.elapsed();

    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| r.success));
    // Two 300ms calls under a pool of 4: parallel, not serial
    assert!(
        elapsed < Duration::from_millis(550),
        "batch took {:?}, expected concurrent execution",
        elapsed
    );
}

#[tokio::test]
async fn test_mixed_reachable_and_unreachable_endpoints() {
    let cluster = MockCluster::start().await;
    let orchestrator = populated_orchestrator(&cluster).await;
    mount_power_endpoint(&cluster, 100, 0).await;

    // Endpoint B polls once successfully, then its server goes away:
    // pre-flight passes against the stale snapshot and the executor
    // itself fails with a transport cause.
    let cluster_b = MockCluster::start().await;
    cluster_b.mount_single_node("pve1", two_running_vms()).await;
    orchestrator
        .add_endpoint(cluster_b.endpoint_config("ep-b"))
        .unwrap();
    orchestrator.refresh_endpoint("ep-b").await.unwrap();
    drop(cluster_b);

    let started = Instant::now();
    let results = orchestrator
        .dispatch_batch(vec![target("ep1", 100), target("ep-b", 100)], start_action())
        .await;
    let elapsed = started.elapsed();

    assert_eq!(results.len(), 2);
    assert!(results[0].success);
    assert!(!results[1].success);
    assert!(results[1]
        .error
        .as_deref()
        .unwrap()
        .contains("connection failed"));

    // B's connection-refused failure is quick; the batch must not take
    // anywhere near a serial worst case
    assert!(
        elapsed < Duration::from_secs(5),
        "batch took {:?}, expected bounded completion",
        elapsed
    );
}

#[tokio::test]
async fn test_pool_deadline_synthesizes_pending_results() {
    let cluster = MockCluster::start().await;
    cluster.mount_single_node("pve1", two_running_vms()).await;

    let mut config = test_config();
    config.dispatch.batch_timeout_seconds = 1;
    let orchestrator = Orchestrator::new(config);
    orchestrator
        .add_endpoint(cluster.endpoint_config("ep1"))
        .unwrap();
    orchestrator.refresh_endpoint("ep1").await.unwrap();

    // The call takes far longer than the pool deadline
    mount_power_endpoint(&cluster, 100, 4000).await;

    let started = Instant::now();
    let results = orchestrator
        .dispatch_batch(vec![target("ep1", 100)], start_action())
        .await;
    let elapsed = started.elapsed();

    assert_eq!(results.len(), 1);
    assert!(!results[0].success);
    assert!(results[0]
        .error
        .as_deref()
        .unwrap()
        .contains("deadline exceeded"));
    assert!(
        elapsed < Duration::from_secs(3),
        "deadline did not bound the batch: {:?}",
        elapsed
    );
}

#[tokio::test]
async fn test_target_on_removed_endpoint_is_rejected() {
    let cluster = MockCluster::start().await;
    let orchestrator = populated_orchestrator(&cluster).await;
    orchestrator.remove_endpoint("ep1").unwrap();

    let results = orchestrator
        .dispatch_batch(vec![target("ep1", 100)], start_action())
        .await;

    assert_eq!(results.len(), 1);
    assert!(!results[0].success);
}

#[tokio::test]
async fn test_kind_mismatch_is_not_found() {
    let cluster = MockCluster::start().await;
    let orchestrator = populated_orchestrator(&cluster).await;

    let mut mismatched = target("ep1", 100);
    mismatched.kind = Some(warden::inventory::VmKind::Lxc);

    let results = orchestrator
        .dispatch_batch(vec![mismatched], start_action())
        .await;
    assert!(!results[0].success);
    assert!(results[0]
        .error
        .as_deref()
        .unwrap()
        .contains("no such virtual machine"));
}
