//! Transient notifications with timed expiry.
//!
//! Each pushed alert owns one expiry task. Dismissing an alert aborts that
//! task; dismissing twice, or after expiry, is a no-op.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::event::{AlertRemoval, ChatEvent, EventBus};

/// How long an alert stays visible unless dismissed.
pub const ALERT_DISPLAY_WINDOW: Duration = Duration::from_millis(5000);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    Info,
    Success,
    Warning,
    Danger,
}

/// Handle returned by [`AlertQueue::push`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlertId(pub u64);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertEntry {
    pub id: AlertId,
    pub message: String,
    pub severity: AlertSeverity,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct AlertState {
    entries: Vec<AlertEntry>,
    timers: HashMap<AlertId, JoinHandle<()>>,
}

#[derive(Debug)]
struct Inner {
    state: Mutex<AlertState>,
    next_id: AtomicU64,
    window: Duration,
    events: EventBus,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, AlertState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Removes the entry and its timer; returns whether the entry was present.
    fn remove(&self, id: AlertId) -> (bool, Option<JoinHandle<()>>) {
        let mut state = self.lock();
        let before = state.entries.len();
        state.entries.retain(|entry| entry.id != id);
        let removed = state.entries.len() != before;
        (removed, state.timers.remove(&id))
    }
}

/// Queue of visible alerts. Cheap to clone; clones share the same queue.
///
/// Must be used from within a Tokio runtime: `push` spawns the expiry task.
#[derive(Debug, Clone)]
pub struct AlertQueue {
    inner: Arc<Inner>,
}

impl AlertQueue {
    pub fn new(events: EventBus) -> Self {
        Self::with_window(events, ALERT_DISPLAY_WINDOW)
    }

    pub fn with_window(events: EventBus, window: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(AlertState::default()),
                next_id: AtomicU64::new(1),
                window,
                events,
            }),
        }
    }

    /// Shows an alert and schedules its removal after the display window.
    pub fn push(&self, message: impl Into<String>, severity: AlertSeverity) -> AlertId {
        let id = AlertId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let entry = AlertEntry {
            id,
            message: message.into(),
            severity,
            created_at: Utc::now(),
        };
        tracing::debug!(alert_id = id.0, ?severity, "alert raised: {}", entry.message);

        let weak = Arc::downgrade(&self.inner);
        let window = self.inner.window;
        {
            // Entry and timer handle are registered under one lock.
            let mut state = self.inner.lock();
            state.entries.push(entry.clone());
            let timer = tokio::spawn(async move {
                tokio::time::sleep(window).await;
                let Some(inner) = weak.upgrade() else {
                    return;
                };
                // Our own handle is dropped here, not aborted.
                let (removed, _own_handle) = inner.remove(id);
                if removed {
                    inner.events.publish(ChatEvent::AlertRemoved {
                        id,
                        reason: AlertRemoval::Expired,
                    });
                }
            });
            state.timers.insert(id, timer);
        }
        self.inner.events.publish(ChatEvent::AlertRaised { alert: entry });
        id
    }

    /// Removes an alert before its window ends. Returns `false` when it was
    /// already gone.
    pub fn dismiss(&self, id: AlertId) -> bool {
        let (removed, timer) = self.inner.remove(id);
        if let Some(timer) = timer {
            timer.abort();
        }
        if removed {
            self.inner.events.publish(ChatEvent::AlertRemoved {
                id,
                reason: AlertRemoval::Dismissed,
            });
        }
        removed
    }

    /// Currently visible alerts, oldest first.
    pub fn entries(&self) -> Vec<AlertEntry> {
        self.inner.lock().entries.clone()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cancels every pending expiry and drops all visible alerts.
    pub fn shutdown(&self) {
        let mut state = self.inner.lock();
        for (_, timer) in state.timers.drain() {
            timer.abort();
        }
        state.entries.clear();
    }
}
