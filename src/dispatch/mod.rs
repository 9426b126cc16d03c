//! Concurrent batch dispatch with partial-failure isolation.
//!
//! A batch runs one action against many (endpoint, node, vmid) targets.
//! Targets execute independently through their endpoint's client under a
//! bounded worker pool; one target's failure never aborts or delays the
//! others. The call returns exactly one result per target: targets still
//! pending when the pool-wide deadline elapses (and targets whose worker
//! crashed) get a synthesized failure. Aggregate counts are derived by
//! callers from the result list, never stored here.

mod action;
pub mod denylist;
mod error;

pub use action::{Action, BackupMode, PowerAction};
pub use error::DispatchError;

use crate::events::{Event, EventBus};
use crate::inventory::{SnapshotStore, VmKey, VmKind, VmSnapshot};
use crate::registry::Registry;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Batch dispatch configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Worker pool size. Kept small so a batch cannot overwhelm any
    /// single endpoint.
    pub max_concurrency: usize,
    /// Pool-wide deadline for a whole batch
    pub batch_timeout_seconds: u64,
    /// Additional denied shell-command patterns
    pub denied_commands: Vec<String>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 4,
            batch_timeout_seconds: 60,
            denied_commands: Vec::new(),
        }
    }
}

/// One unit of a batch command.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BatchTarget {
    pub endpoint_id: String,
    pub node: String,
    pub vmid: u32,
    /// Optional kind assertion; must match the resolved guest when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<VmKind>,
}

impl BatchTarget {
    pub fn key(&self) -> VmKey {
        VmKey {
            endpoint_id: self.endpoint_id.clone(),
            node: self.node.clone(),
            vmid: self.vmid,
        }
    }
}

/// Outcome of one batch target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    pub target: BatchTarget,
    pub action: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration_ms: u64,
}

impl BatchResult {
    fn ok(target: BatchTarget, action: &Action, output: Option<String>, duration_ms: u64) -> Self {
        Self {
            target,
            action: action.describe(),
            success: true,
            output,
            error: None,
            duration_ms,
        }
    }

    fn failed(target: BatchTarget, action: &Action, cause: String, duration_ms: u64) -> Self {
        Self {
            target,
            action: action.describe(),
            success: false,
            output: None,
            error: Some(cause),
            duration_ms,
        }
    }
}

/// Runs batches of state-changing commands against registered endpoints.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<Registry>,
    store: Arc<SnapshotStore>,
    events: EventBus,
    config: DispatchConfig,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<Registry>,
        store: Arc<SnapshotStore>,
        events: EventBus,
        config: DispatchConfig,
    ) -> Self {
        Self {
            registry,
            store,
            events,
            config,
        }
    }

    /// Dispatch one action against a list of targets.
    ///
    /// Returns exactly one result per target, in target order. An empty
    /// batch returns an empty list with no side effects.
    pub async fn dispatch(&self, targets: Vec<BatchTarget>, action: Action) -> Vec<BatchResult> {
        if targets.is_empty() {
            return Vec::new();
        }

        let started = Instant::now();
        let mut slots: Vec<Option<BatchResult>> = vec![None; targets.len()];

        // Pre-flight: policy screening and target resolution never reach
        // an executor.
        let mut jobs = Vec::new();
        for (index, target) in targets.iter().enumerate() {
            match self.preflight(target, &action) {
                Ok(vm) => jobs.push((index, target.clone(), vm.kind)),
                Err(e) => {
                    slots[index] =
                        Some(BatchResult::failed(target.clone(), &action, e.to_string(), 0));
                }
            }
        }

        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency.max(1)));
        let mut workers: JoinSet<(usize, BatchResult)> = JoinSet::new();

        for (index, target, kind) in jobs {
            let semaphore = Arc::clone(&semaphore);
            let registry = Arc::clone(&self.registry);
            let action = action.clone();

            workers.spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                let started = Instant::now();

                // Re-resolve the client inside the worker: an endpoint
                // removed after pre-flight must not receive new work.
                let handle = match registry.get(&target.endpoint_id) {
                    Some(handle) => handle,
                    None => {
                        let cause =
                            DispatchError::UnknownEndpoint(target.endpoint_id.clone()).to_string();
                        return (
                            index,
                            BatchResult::failed(
                                target,
                                &action,
                                cause,
                                started.elapsed().as_millis() as u64,
                            ),
                        );
                    }
                };

                let (method, path, body) = action.request(&target, kind);
                let result = handle.client.execute(method, &path, body).await;

                let duration_ms = started.elapsed().as_millis() as u64;
                let result = match result {
                    Ok(data) => {
                        let output = (!data.is_null()).then(|| data.to_string());
                        BatchResult::ok(target, &action, output, duration_ms)
                    }
                    Err(e) => BatchResult::failed(target, &action, e.to_string(), duration_ms),
                };
                (index, result)
            });
        }

        let deadline = Duration::from_secs(self.config.batch_timeout_seconds);
        let drain = async {
            while let Some(joined) = workers.join_next().await {
                match joined {
                    Ok((index, result)) => slots[index] = Some(result),
                    Err(e) => {
                        // The worker's index is lost with it; its slot is
                        // synthesized below.
                        tracing::error!(error = %e, "dispatch worker crashed");
                    }
                }
            }
        };

        let timed_out = tokio::time::timeout(deadline, drain).await.is_err();
        if timed_out {
            workers.abort_all();
        }

        let results: Vec<BatchResult> = slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| {
                slot.unwrap_or_else(|| {
                    let cause = if timed_out {
                        DispatchError::Deadline(self.config.batch_timeout_seconds).to_string()
                    } else {
                        "executor crashed before producing a result".to_string()
                    };
                    BatchResult::failed(
                        targets[index].clone(),
                        &action,
                        cause,
                        started.elapsed().as_millis() as u64,
                    )
                })
            })
            .collect();

        for result in &results {
            let outcome = if result.success { "success" } else { "failure" };
            metrics::counter!(
                "warden_dispatch_total",
                "action" => result.action.clone(),
                "outcome" => outcome
            )
            .increment(1);
            metrics::histogram!("warden_dispatch_duration_seconds", "action" => result.action.clone())
                .record(result.duration_ms as f64 / 1000.0);

            self.events.publish(Event::CommandCompleted {
                result: result.clone(),
            });
        }

        tracing::info!(
            action = %action.describe(),
            targets = results.len(),
            failed = results.iter().filter(|r| !r.success).count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "batch completed"
        );

        results
    }

    fn preflight(
        &self,
        target: &BatchTarget,
        action: &Action,
    ) -> Result<VmSnapshot, DispatchError> {
        if let Action::Shell { command } = action {
            denylist::check(command, &self.config.denied_commands)?;
        }

        if !self.registry.contains(&target.endpoint_id) {
            return Err(DispatchError::UnknownEndpoint(target.endpoint_id.clone()));
        }

        let vm = self
            .store
            .get_vm(&target.key())
            .ok_or_else(|| DispatchError::NotFound {
                endpoint_id: target.endpoint_id.clone(),
                node: target.node.clone(),
                vmid: target.vmid,
            })?;

        if let Some(kind) = target.kind {
            if kind != vm.kind {
                return Err(DispatchError::NotFound {
                    endpoint_id: target.endpoint_id.clone(),
                    node: target.node.clone(),
                    vmid: target.vmid,
                });
            }
        }

        Ok(vm)
    }
}
