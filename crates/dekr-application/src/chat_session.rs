//! ChatSession - one user's conversation with the assistant.
//!
//! `ChatSession` drives the submission cycle and the surrounding session
//! operations (status, suggestions, history reset, draft autosave). All
//! methods take `&self`, so a single instance can be shared behind an `Arc`
//! by every UI handler.
//!
//! State lives behind a `tokio::sync::RwLock` that is only held between
//! suspension points, never across a remote call.

use dekr_core::alert::{AlertEntry, AlertId, AlertQueue, AlertSeverity};
use dekr_core::api::{ChatApi, ChatStatus, SendMessageResponse};
use dekr_core::debounce::Debouncer;
use dekr_core::draft::DraftStore;
use dekr_core::error::ChatError;
use dekr_core::event::{ChatEvent, EventBus};
use dekr_core::exchange::ExchangeEntry;
use dekr_core::session::{ChatExport, SessionState, SubmissionPermit, SubmitRejection};
use dekr_core::usage::{SeverityBand, UsageTracker};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{RwLock, broadcast};

pub const HISTORY_CLEARED_MESSAGE: &str = "Chat history cleared successfully.";
pub const HISTORY_CLEAR_FAILED_MESSAGE: &str = "Error clearing chat history.";
pub const CONNECTION_RESTORED_MESSAGE: &str = "Connection restored.";
pub const CONNECTION_LOST_MESSAGE: &str = "Connection lost. Please check your internet connection.";
const EMPTY_REPLY_MESSAGE: &str = "The assistant returned an empty response.";

/// Timing knobs for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    /// Quiet period before a typed draft is persisted.
    pub draft_debounce: Duration,
    /// How long alerts stay visible.
    pub alert_window: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            draft_debounce: Duration::from_millis(500),
            alert_window: dekr_core::alert::ALERT_DISPLAY_WINDOW,
        }
    }
}

/// Result of one [`ChatSession::submit`] call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SubmitOutcome {
    /// Nothing was sent.
    Rejected { rejection: SubmitRejection },
    /// The assistant replied; `entry` is the appended reply.
    Delivered { entry: ExchangeEntry },
    /// The exchange failed; an alert and an apology entry were recorded.
    Failed { error: ChatError },
}

impl SubmitOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered { .. })
    }
}

/// Holds the in-flight flag for one submission.
///
/// Dropping it, on completion or when the submitting future is cancelled,
/// clears the flag and announces the end of the submission.
struct SubmissionGuard {
    permit: SubmissionPermit,
    events: EventBus,
}

impl Drop for SubmissionGuard {
    fn drop(&mut self) {
        self.permit.release();
        self.events.publish(ChatEvent::SubmissionFinished);
    }
}

/// The persisted draft slot.
///
/// Writes and removals are serialized by the generation lock. A removal bumps
/// the generation, and a write scheduled before it is skipped, so a late
/// debounced write never brings back a cleared draft.
pub(crate) struct DraftSlot {
    store: Arc<dyn DraftStore>,
    generation: Mutex<u64>,
}

impl DraftSlot {
    pub(crate) fn new(store: Arc<dyn DraftStore>) -> Self {
        Self {
            store,
            generation: Mutex::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, u64> {
        self.generation.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn generation(&self) -> u64 {
        *self.lock()
    }

    /// Persists `text` unless the slot was cleared since `generation` was read.
    /// Returns whether the write went ahead.
    pub(crate) fn write_if_current(&self, generation: u64, text: &str) -> bool {
        let current = self.lock();
        if *current != generation {
            tracing::debug!("skipping stale draft write");
            return false;
        }
        persist_draft(self.store.as_ref(), text);
        true
    }

    pub(crate) fn clear(&self) {
        let mut current = self.lock();
        *current += 1;
        if let Err(err) = self.store.remove() {
            tracing::warn!("Failed to remove persisted draft: {}", err);
        }
    }
}

pub struct ChatSession {
    api: Arc<dyn ChatApi>,
    drafts: Arc<DraftSlot>,
    state: RwLock<SessionState>,
    alerts: AlertQueue,
    draft_debouncer: Debouncer,
    events: EventBus,
    settings: SessionSettings,
}

impl ChatSession {
    /// Creates a session. Must be called within a Tokio runtime context
    /// before any timer-driven operation is used.
    pub fn new(api: Arc<dyn ChatApi>, drafts: Arc<dyn DraftStore>) -> Self {
        Self::with_settings(api, drafts, SessionSettings::default())
    }

    pub fn with_settings(
        api: Arc<dyn ChatApi>,
        drafts: Arc<dyn DraftStore>,
        settings: SessionSettings,
    ) -> Self {
        let events = EventBus::new();
        Self {
            api,
            drafts: Arc::new(DraftSlot::new(drafts)),
            state: RwLock::new(SessionState::new()),
            alerts: AlertQueue::with_window(events.clone(), settings.alert_window),
            draft_debouncer: Debouncer::new(),
            events,
            settings,
        }
    }

    /// Restores the persisted draft and fetches the initial status.
    pub async fn initialize(&self) {
        match self.drafts.store.load() {
            Ok(Some(text)) => {
                self.state.write().await.draft_text = text.clone();
                self.events.publish(ChatEvent::DraftRestored { text });
            }
            Ok(None) => {}
            Err(err) => tracing::warn!("Failed to load draft: {}", err),
        }

        if let Err(err) = self.check_status().await {
            tracing::warn!("Initial status check failed: {}", err);
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChatEvent> {
        self.events.subscribe()
    }

    // ============================================================================
    // Submission
    // ============================================================================

    /// Sends one user message and records the exchange.
    ///
    /// Rejected without any network call when the trimmed text is empty,
    /// longer than the limit (also raises a warning alert) or while another
    /// submission is in flight. Dropping the returned future before it
    /// completes still clears the in-flight flag.
    pub async fn submit(&self, raw: &str) -> SubmitOutcome {
        let admitted = self.state.read().await.begin_submission(raw);
        let (message, permit) = match admitted {
            Ok(admitted) => admitted,
            Err(rejection) => {
                tracing::debug!("Submission rejected: {}", rejection);
                if matches!(rejection, SubmitRejection::TooLong { .. }) {
                    self.alerts.push(rejection.to_string(), AlertSeverity::Warning);
                }
                return SubmitOutcome::Rejected { rejection };
            }
        };
        let guard = SubmissionGuard {
            permit,
            events: self.events.clone(),
        };
        self.events.publish(ChatEvent::SubmissionStarted);

        self.append(ExchangeEntry::user(message.as_str())).await;
        self.clear_draft().await;

        let result = match self.api.send_message(&message).await {
            Ok(response) => interpret_reply(response),
            Err(err) => Err(ChatError::classify(&err)),
        };

        let outcome = match result {
            Ok(entry) => {
                let entry = self.append(entry).await;
                SubmitOutcome::Delivered { entry }
            }
            Err(error) => {
                self.report_failure(&error).await;
                SubmitOutcome::Failed { error }
            }
        };

        drop(guard);

        if outcome.is_delivered() {
            self.refresh_usage().await;
        }
        outcome
    }

    pub async fn in_flight(&self) -> bool {
        self.state.read().await.in_flight()
    }

    async fn append(&self, entry: ExchangeEntry) -> ExchangeEntry {
        let entry = self.state.write().await.append(entry).clone();
        self.events.publish(ChatEvent::EntryAppended {
            entry: entry.clone(),
        });
        entry
    }

    async fn report_failure(&self, error: &ChatError) {
        tracing::error!(kind = ?error, "Chat exchange failed: {}", error);
        self.alerts.push(error.to_string(), AlertSeverity::Danger);
        self.append(ExchangeEntry::assistant(error.apology(), None))
            .await;
    }

    // ============================================================================
    // Draft autosave
    // ============================================================================

    /// Records the current input and schedules a debounced write.
    pub async fn update_draft(&self, text: &str) {
        self.state.write().await.draft_text = text.to_string();

        let slot = Arc::clone(&self.drafts);
        let generation = slot.generation();
        let text = text.to_string();
        self.draft_debouncer
            .schedule(self.settings.draft_debounce, move || {
                tokio::task::spawn_blocking(move || slot.write_if_current(generation, &text));
            });
    }

    pub async fn draft(&self) -> String {
        self.state.read().await.draft_text.clone()
    }

    async fn clear_draft(&self) {
        self.draft_debouncer.cancel();
        self.state.write().await.draft_text.clear();
        self.with_draft_slot(|slot| slot.clear()).await;
    }

    /// Runs file I/O on the draft slot off the async worker threads.
    async fn with_draft_slot<F>(&self, action: F)
    where
        F: FnOnce(&DraftSlot) + Send + 'static,
    {
        let slot = Arc::clone(&self.drafts);
        if let Err(err) = tokio::task::spawn_blocking(move || action(&slot)).await {
            tracing::warn!("Draft task failed: {}", err);
        }
    }

    // ============================================================================
    // Status and usage
    // ============================================================================

    /// Fetches the session status and applies it.
    pub async fn check_status(&self) -> Result<(), ChatError> {
        let status = self.api.status().await.map_err(ChatError::from)?;
        self.apply_status(&status).await;
        Ok(())
    }

    /// Follow-up status fetch after a delivered message. Failures only log:
    /// the user's request already succeeded.
    pub async fn refresh_usage(&self) {
        if let Err(err) = self.check_status().await {
            tracing::warn!("Usage refresh failed: {}", err);
        }
    }

    async fn apply_status(&self, status: &ChatStatus) {
        let usage = {
            let mut state = self.state.write().await;
            if let Some(session_id) = &status.session_id {
                state.session_id = Some(session_id.clone());
            }
            let tier = status.tier();
            let daily_used = status
                .usage_stats
                .as_ref()
                .map(|stats| stats.daily_messages_used)
                .unwrap_or_else(|| state.usage.daily_used());
            state.usage.apply_status(tier, daily_used, tier.daily_limit());
            if let Some(stats) = &status.usage_stats {
                state.usage.set_rate_limit_usage(stats.rate_limit_usage);
            }
            state.usage.clone()
        };
        tracing::debug!(
            tier = usage.tier().0,
            used = usage.daily_used(),
            "usage updated: {}",
            usage.usage_label()
        );
        self.events.publish(ChatEvent::UsageUpdated { usage });
    }

    pub async fn usage(&self) -> UsageTracker {
        self.state.read().await.usage.clone()
    }

    pub async fn session_id(&self) -> Option<String> {
        self.state.read().await.session_id.clone()
    }

    // ============================================================================
    // Other session operations
    // ============================================================================

    pub async fn suggestions(&self) -> Result<Vec<String>, ChatError> {
        let suggestions = self.api.suggestions().await.map_err(|err| {
            let error = ChatError::classify(&err);
            tracing::warn!("Failed to load suggestions: {}", error);
            error
        })?;
        Ok(suggestions.suggestions)
    }

    /// Resets the conversation on the server, then locally.
    pub async fn clear_history(&self) -> Result<(), ChatError> {
        match self.api.clear_history().await {
            Ok(()) => {
                let usage = {
                    let mut state = self.state.write().await;
                    state.clear_history();
                    state.usage.clone()
                };
                self.events.publish(ChatEvent::LogCleared);
                self.events.publish(ChatEvent::UsageUpdated { usage });
                self.alerts.push(HISTORY_CLEARED_MESSAGE, AlertSeverity::Success);
                Ok(())
            }
            Err(err) => {
                let error = ChatError::classify(&err);
                tracing::warn!("Failed to clear history: {}", error);
                self.alerts.push(HISTORY_CLEAR_FAILED_MESSAGE, AlertSeverity::Danger);
                Err(error)
            }
        }
    }

    /// Reports a connectivity change to the user.
    pub fn set_online(&self, online: bool) -> AlertId {
        if online {
            self.alerts.push(CONNECTION_RESTORED_MESSAGE, AlertSeverity::Success)
        } else {
            self.alerts.push(CONNECTION_LOST_MESSAGE, AlertSeverity::Warning)
        }
    }

    pub fn alerts(&self) -> Vec<AlertEntry> {
        self.alerts.entries()
    }

    pub fn dismiss_alert(&self, id: AlertId) -> bool {
        self.alerts.dismiss(id)
    }

    /// Band for the character counter of an input of `chars` characters.
    pub fn input_band(&self, chars: usize) -> SeverityBand {
        SeverityBand::for_input_length(chars)
    }

    pub async fn recent_topics(&self) -> Vec<String> {
        self.state.read().await.recent_topics()
    }

    pub async fn export(&self) -> ChatExport {
        self.state.read().await.export()
    }

    /// Point-in-time copy of the whole session state.
    pub async fn snapshot(&self) -> SessionState {
        self.state.read().await.clone()
    }

    /// Persists a draft still waiting on its debounce, then cancels every timer.
    pub async fn shutdown(&self) {
        if self.draft_debouncer.is_pending() {
            self.draft_debouncer.cancel();
            let text = self.state.read().await.draft_text.clone();
            let generation = self.drafts.generation();
            self.with_draft_slot(move |slot| {
                slot.write_if_current(generation, &text);
            })
            .await;
        }
        self.alerts.shutdown();
        tracing::debug!("chat session shut down");
    }
}

fn interpret_reply(response: SendMessageResponse) -> Result<ExchangeEntry, ChatError> {
    if let Some(error) = response.error.as_deref().filter(|e| !e.trim().is_empty()) {
        return Err(ChatError::application(error));
    }
    let metadata = response.metadata();
    match response.response {
        Some(reply) => Ok(ExchangeEntry::assistant(reply, Some(metadata))),
        None => Err(ChatError::application(EMPTY_REPLY_MESSAGE)),
    }
}

fn persist_draft(drafts: &dyn DraftStore, text: &str) {
    let result = if text.is_empty() {
        drafts.remove()
    } else {
        drafts.save(text)
    };
    if let Err(err) = result {
        tracing::warn!("Failed to persist draft: {}", err);
    }
}
