//! Event broadcasting to subscribed consumers.
//!
//! A single broadcast sequence fans every event out to all subscribers:
//! delivery order per subscriber matches publish order, and no event is
//! delivered twice. Late subscribers pair the live stream with a full
//! snapshot taken at subscribe time (see `Orchestrator::subscribe`), so
//! they never observe a partial window.

use crate::alerts::AlertRecord;
use crate::dispatch::BatchResult;
use crate::inventory::{NodeSnapshot, VmSnapshot};
use crate::registry::{ConnectionStatus, ConnectionView};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Default buffer size for the broadcast channel. Slow subscribers that
/// fall further behind than this are lagged, not blocked.
pub const EVENT_BUS_CAPACITY: usize = 256;

/// A state-change or command-result event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    ConnectionChanged {
        endpoint_id: String,
        status: ConnectionStatus,
        last_error: Option<String>,
    },
    NodeAdded {
        node: NodeSnapshot,
    },
    NodeChanged {
        node: NodeSnapshot,
    },
    NodeRemoved {
        endpoint_id: String,
        node: String,
    },
    VmAdded {
        vm: VmSnapshot,
    },
    VmChanged {
        vm: VmSnapshot,
    },
    VmRemoved {
        endpoint_id: String,
        node: String,
        vmid: u32,
    },
    CommandCompleted {
        result: BatchResult,
    },
    AlertRaised {
        alert: AlertRecord,
    },
    AlertResolved {
        alert: AlertRecord,
    },
}

/// Immediate full state handed to a new subscriber before the stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FullSnapshot {
    pub connections: Vec<ConnectionView>,
    pub nodes: Vec<NodeSnapshot>,
    pub vms: Vec<VmSnapshot>,
    pub alerts: Vec<AlertRecord>,
}

/// Fan-out bus for state-change and command-result events.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Event>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(EVENT_BUS_CAPACITY)
    }
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish one event to all current subscribers.
    ///
    /// Publishing with no subscribers is not an error; the event is
    /// simply dropped.
    pub fn publish(&self, event: Event) {
        let _ = self.sender.send(event);
    }

    /// Publish a batch of events in order.
    pub fn publish_all<I>(&self, events: I)
    where
        I: IntoIterator<Item = Event>,
    {
        for event in events {
            self.publish(event);
        }
    }

    /// Subscribe to the live stream.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    /// Clone of the underlying sender, for components that publish
    /// directly (e.g., the per-endpoint clients).
    pub fn sender(&self) -> broadcast::Sender<Event> {
        self.sender.clone()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
