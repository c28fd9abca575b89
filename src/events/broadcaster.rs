//! Fan-out of job status events to subscribers

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::debug;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskStatus {
    Queued,
    Generating,
    Completed,
    Approved,
    Integrated,
}

/// Event pushed to every subscriber. Serialised with an `event` tag,
/// e.g. `{"event":"UPDATE","name":"hero","status":"GENERATING","asset_id":3}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event", rename_all = "UPPERCASE")]
pub enum StatusEvent {
    New {
        name: String,
        status: TaskStatus,
    },
    Update {
        name: String,
        status: TaskStatus,
        asset_id: i64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        image_url: Option<String>,
    },
    Error {
        name: String,
        #[serde(default)]
        asset_id: Option<i64>,
        message: String,
    },
}

impl StatusEvent {
    pub fn queued(name: &str) -> Self {
        StatusEvent::New {
            name: name.to_string(),
            status: TaskStatus::Queued,
        }
    }

    pub fn update(name: &str, status: TaskStatus, asset_id: i64) -> Self {
        StatusEvent::Update {
            name: name.to_string(),
            status,
            asset_id,
            image_url: None,
        }
    }

    pub fn completed(name: &str, asset_id: i64, image_url: String) -> Self {
        StatusEvent::Update {
            name: name.to_string(),
            status: TaskStatus::Completed,
            asset_id,
            image_url: Some(image_url),
        }
    }

    pub fn error(name: &str, asset_id: Option<i64>, message: impl Into<String>) -> Self {
        StatusEvent::Error {
            name: name.to_string(),
            asset_id,
            message: message.into(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            StatusEvent::New { name, .. }
            | StatusEvent::Update { name, .. }
            | StatusEvent::Error { name, .. } => name,
        }
    }
}

/// Receiving end handed to one subscriber
pub struct Subscription {
    pub id: u64,
    pub receiver: mpsc::UnboundedReceiver<StatusEvent>,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    /// Kept in registration order
    subscribers: Vec<(u64, mpsc::UnboundedSender<StatusEvent>)>,
}

/// Best-effort broadcaster. Each subscriber owns a queue, so one slow
/// connection never holds up delivery to the others. No replay for late
/// joiners.
#[derive(Clone, Default)]
pub struct Broadcaster {
    registry: Arc<Mutex<Registry>>,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut registry = self.lock();
        let id = registry.next_id;
        registry.next_id += 1;
        registry.subscribers.push((id, tx));
        debug!("Subscriber {} registered", id);

        Subscription { id, receiver: rx }
    }

    pub fn unsubscribe(&self, id: u64) {
        self.lock().subscribers.retain(|(sid, _)| *sid != id);
        debug!("Subscriber {} removed", id);
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().subscribers.len()
    }

    /// Deliver `event` to every open subscriber, dropping closed ones.
    /// Returns the number of subscribers that accepted it.
    pub fn broadcast(&self, event: StatusEvent) -> usize {
        let mut registry = self.lock();
        registry
            .subscribers
            .retain(|(_, tx)| tx.send(event.clone()).is_ok());
        registry.subscribers.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Registry> {
        // A poisoned registry still holds a consistent subscriber list
        self.registry.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
