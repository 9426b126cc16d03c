//! Batch actions and their upstream request shapes.

use crate::dispatch::BatchTarget;
use crate::inventory::VmKind;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Guest power actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerAction {
    Start,
    Stop,
    Shutdown,
    Reboot,
    Suspend,
    Resume,
}

impl PowerAction {
    pub fn api_segment(&self) -> &'static str {
        match self {
            PowerAction::Start => "start",
            PowerAction::Stop => "stop",
            PowerAction::Shutdown => "shutdown",
            PowerAction::Reboot => "reboot",
            PowerAction::Suspend => "suspend",
            PowerAction::Resume => "resume",
        }
    }
}

/// Backup mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackupMode {
    #[default]
    Snapshot,
    Suspend,
    Stop,
}

impl BackupMode {
    fn api_value(&self) -> &'static str {
        match self {
            BackupMode::Snapshot => "snapshot",
            BackupMode::Suspend => "suspend",
            BackupMode::Stop => "stop",
        }
    }
}

/// One state-changing action applied to every target of a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    /// Guest power transition
    Power { action: PowerAction },
    /// Shell command executed through the guest agent
    Shell { command: String },
    /// Guest backup
    Backup {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        storage: Option<String>,
        #[serde(default)]
        mode: BackupMode,
    },
}

impl Action {
    /// Short label for results, logs, and audit entries.
    pub fn describe(&self) -> String {
        match self {
            Action::Power { action } => format!("power:{}", action.api_segment()),
            Action::Shell { .. } => "shell".to_string(),
            Action::Backup { mode, .. } => format!("backup:{}", mode.api_value()),
        }
    }

    /// Build the upstream request for one target.
    pub fn request(&self, target: &BatchTarget, kind: VmKind) -> (Method, String, Option<Value>) {
        match self {
            Action::Power { action } => (
                Method::POST,
                format!(
                    "/nodes/{}/{}/{}/status/{}",
                    target.node,
                    kind.api_segment(),
                    target.vmid,
                    action.api_segment()
                ),
                None,
            ),
            Action::Shell { command } => (
                Method::POST,
                format!(
                    "/nodes/{}/{}/{}/agent/exec",
                    target.node,
                    kind.api_segment(),
                    target.vmid
                ),
                Some(json!({ "command": command })),
            ),
            Action::Backup { storage, mode } => {
                let mut body = json!({
                    "vmid": target.vmid,
                    "mode": mode.api_value(),
                });
                if let Some(storage) = storage {
                    body["storage"] = json!(storage);
                }
                (Method::POST, format!("/nodes/{}/vzdump", target.node), Some(body))
            }
        }
    }
}
