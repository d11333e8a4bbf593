//! Per-session aggregate state.
//!
//! `SessionState` is plain data plus an atomic in-flight flag. Whoever owns
//! it is responsible for serialising access; `dekr-application` keeps it
//! behind a lock that is never held across a network call.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

use crate::exchange::{ExchangeEntry, ExchangeLog};
use crate::usage::UsageTracker;

/// Longest accepted message, in characters.
pub const MAX_MESSAGE_CHARS: usize = 5000;

/// Number of user messages listed as recent topics.
pub const RECENT_TOPIC_COUNT: usize = 5;
/// Characters kept from each recent topic.
pub const RECENT_TOPIC_CHARS: usize = 50;

/// Why a submission was refused before anything was sent.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SubmitRejection {
    #[error("message is empty")]
    Empty,
    #[error("a message is already being processed")]
    InFlight,
    #[error("Message too long. Please keep it under {max} characters.")]
    TooLong { chars: usize, max: usize },
}

/// The in-flight flag of a session.
///
/// Entering hands out a [`SubmissionPermit`]; the flag stays set until the
/// permit is released or dropped, so a cancelled submission cannot leave the
/// session locked.
#[derive(Debug, Default)]
pub struct SubmissionGate {
    busy: Arc<AtomicBool>,
}

impl SubmissionGate {
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Sets the flag if it was clear.
    pub fn try_enter(&self) -> Option<SubmissionPermit> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| SubmissionPermit {
                busy: Arc::clone(&self.busy),
                released: false,
            })
    }
}

/// Copies the current flag value; the copy is not linked to the original.
impl Clone for SubmissionGate {
    fn clone(&self) -> Self {
        Self {
            busy: Arc::new(AtomicBool::new(self.is_busy())),
        }
    }
}

impl PartialEq for SubmissionGate {
    fn eq(&self, other: &Self) -> bool {
        self.is_busy() == other.is_busy()
    }
}

/// Proof that a submission holds the gate. Clears the flag on drop.
#[derive(Debug)]
pub struct SubmissionPermit {
    busy: Arc<AtomicBool>,
    released: bool,
}

impl SubmissionPermit {
    /// Clears the flag. Later calls, and the drop, do nothing.
    pub fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.busy.store(false, Ordering::Release);
        }
    }
}

impl Drop for SubmissionPermit {
    fn drop(&mut self) {
        self.release();
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    /// Assigned by the server; unset until a status check returns one.
    pub session_id: Option<String>,
    pub usage: UsageTracker,
    pub log: ExchangeLog,
    pub draft_text: String,
    #[serde(skip)]
    gate: SubmissionGate,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn in_flight(&self) -> bool {
        self.gate.is_busy()
    }

    /// Validates `raw` and, if acceptable, marks a submission as in flight.
    ///
    /// Returns the trimmed message to send and the permit holding the flag.
    /// The check and the flag update are one atomic step, so two callers can
    /// never both succeed.
    pub fn begin_submission(
        &self,
        raw: &str,
    ) -> Result<(String, SubmissionPermit), SubmitRejection> {
        let message = raw.trim();
        if message.is_empty() {
            return Err(SubmitRejection::Empty);
        }
        if self.gate.is_busy() {
            return Err(SubmitRejection::InFlight);
        }
        let chars = message.chars().count();
        if chars > MAX_MESSAGE_CHARS {
            return Err(SubmitRejection::TooLong {
                chars,
                max: MAX_MESSAGE_CHARS,
            });
        }
        let permit = self.gate.try_enter().ok_or(SubmitRejection::InFlight)?;
        Ok((message.to_string(), permit))
    }

    pub fn append(&mut self, entry: ExchangeEntry) -> &ExchangeEntry {
        self.log.push(entry)
    }

    /// Empties the log and the daily counter after a confirmed server reset.
    pub fn clear_history(&mut self) {
        self.log.clear();
        self.usage.reset_daily();
    }

    pub fn recent_topics(&self) -> Vec<String> {
        self.log.recent_topics(RECENT_TOPIC_COUNT, RECENT_TOPIC_CHARS)
    }

    pub fn export(&self) -> ChatExport {
        ChatExport {
            session_id: self.session_id.clone(),
            timestamp: Utc::now(),
            messages: self.log.entries().to_vec(),
        }
    }
}

/// Serializable transcript of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatExport {
    pub session_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub messages: Vec<ExchangeEntry>,
}

impl ChatExport {
    /// Suggested file name, e.g. `dekr-chat-2024-05-01.json`.
    pub fn file_name(&self) -> String {
        format!("dekr-chat-{}.json", self.timestamp.format("%Y-%m-%d"))
    }

    pub fn to_json_pretty(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
