use std::sync::{Arc, Mutex, PoisonError};

use bl_api_types::{RankedSlot, TaskStatus};
use serde::Serialize;

use crate::message_log::ChatMessage;
use crate::notifications::Notification;

/// Why the poll ticker went away.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "status", rename_all = "snake_case")]
pub enum StopReason {
    Terminal(TaskStatus),
    AttemptsExhausted,
    Stopped,
}

/// Everything presentation needs to react to.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UiEvent {
    MessageAppended(ChatMessage),
    SnapshotUpdated { status: TaskStatus },
    /// Open the results-selection surface.
    ShowResults { shortlist: Vec<RankedSlot> },
    ResultsDismissed,
    Notification(Notification),
    PollingStopped { reason: StopReason },
}

/// A broadcast-style event bus built on top of flume channels.
///
/// Each call to [`subscribe`](EventBus::subscribe) creates a receiver that
/// gets every event published after it subscribed. Cloning the bus is cheap.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<Mutex<Vec<flume::Sender<UiEvent>>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> flume::Receiver<UiEvent> {
        let (tx, rx) = flume::unbounded();
        self.senders().push(tx);
        rx
    }

    /// Publish to all current subscribers, pruning the ones whose receiver
    /// has been dropped.
    pub fn publish(&self, event: UiEvent) {
        self.senders().retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.senders().len()
    }

    fn senders(&self) -> std::sync::MutexGuard<'_, Vec<flume::Sender<UiEvent>>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
