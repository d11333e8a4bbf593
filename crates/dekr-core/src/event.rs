use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::alert::{AlertEntry, AlertId};
use crate::exchange::ExchangeEntry;
use crate::usage::UsageTracker;

/// Capacity of the event channel; slow subscribers lag rather than block.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Changes a rendering surface needs to mirror.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    EntryAppended { entry: ExchangeEntry },
    AlertRaised { alert: AlertEntry },
    AlertRemoved { id: AlertId, reason: AlertRemoval },
    UsageUpdated { usage: UsageTracker },
    SubmissionStarted,
    SubmissionFinished,
    LogCleared,
    DraftRestored { text: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertRemoval {
    Expired,
    Dismissed,
}

/// Fan-out of [`ChatEvent`]s to any number of subscribers.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ChatEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChatEvent> {
        self.sender.subscribe()
    }

    pub fn publish(&self, event: ChatEvent) {
        // No subscribers is fine; events are only a mirror of state.
        let _ = self.sender.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
