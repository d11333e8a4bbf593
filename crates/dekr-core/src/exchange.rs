//! Conversation log types.
//!
//! The log is append-only: entries are never edited or removed one by one,
//! the only destructive operation is [`ExchangeLog::clear`].

use crate::format::format_message;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who produced an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// Details the server reported alongside an assistant reply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseMetadata {
    pub latency_ms: u64,
    pub cache_hit: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent_label: Option<String>,
}

impl ResponseMetadata {
    /// Short caption such as `120ms • Cached • market_data`.
    pub fn caption(&self) -> String {
        let mut caption = format!("{}ms", self.latency_ms);
        if self.cache_hit {
            caption.push_str(" • Cached");
        }
        if let Some(intent) = &self.intent_label {
            caption.push_str(" • ");
            caption.push_str(intent);
        }
        caption
    }
}

/// One message in the conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeEntry {
    pub role: Role,
    /// Verbatim text: the user's input or the server's reply.
    pub content: String,
    /// Display markup rendered from `content` when the entry was created.
    pub markup: String,
    pub timestamp: DateTime<Utc>,
    /// Only assistant entries built from a real reply carry metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ResponseMetadata>,
}

impl ExchangeEntry {
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content.into(), None)
    }

    pub fn assistant(content: impl Into<String>, metadata: Option<ResponseMetadata>) -> Self {
        Self::new(Role::Assistant, content.into(), metadata)
    }

    fn new(role: Role, content: String, metadata: Option<ResponseMetadata>) -> Self {
        let markup = format_message(&content);
        Self {
            role,
            content,
            markup,
            timestamp: Utc::now(),
            metadata,
        }
    }

    pub fn is_user(&self) -> bool {
        self.role == Role::User
    }
}

/// Ordered conversation history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExchangeLog {
    entries: Vec<ExchangeEntry>,
}

impl ExchangeLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry and returns a reference to it.
    pub fn push(&mut self, entry: ExchangeEntry) -> &ExchangeEntry {
        self.entries.push(entry);
        &self.entries[self.entries.len() - 1]
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[ExchangeEntry] {
        &self.entries
    }

    /// The last `limit` user messages, oldest first, each cut to
    /// `max_chars` characters with a trailing `...` when shortened.
    pub fn recent_topics(&self, limit: usize, max_chars: usize) -> Vec<String> {
        let user_entries: Vec<&ExchangeEntry> = self.entries.iter().filter(|e| e.is_user()).collect();
        let start = user_entries.len().saturating_sub(limit);
        user_entries[start..]
            .iter()
            .map(|entry| truncate_topic(&entry.content, max_chars))
            .collect()
    }
}

fn truncate_topic(content: &str, max_chars: usize) -> String {
    match content.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &content[..cut]),
        None => content.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entries_are_formatted_on_creation() {
        let entry = ExchangeEntry::user("**hi** <there>");
        assert_eq!(entry.content, "**hi** <there>");
        assert_eq!(entry.markup, "<strong>hi</strong> &lt;there&gt;");
        assert!(entry.metadata.is_none());
    }

    #[test]
    fn test_log_preserves_insertion_order() {
        let mut log = ExchangeLog::new();
        log.push(ExchangeEntry::user("first"));
        log.push(ExchangeEntry::assistant("second", None));
        log.push(ExchangeEntry::user("third"));

        let contents: Vec<&str> = log.entries().iter().map(|e| e.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "second", "third"]);
        assert!(log.entries()[0].timestamp <= log.entries()[2].timestamp);

        log.clear();
        assert!(log.is_empty());
    }

    #[test]
    fn test_recent_topics() {
        let mut log = ExchangeLog::new();
        for i in 0..7 {
            log.push(ExchangeEntry::user(format!("question {i}")));
            log.push(ExchangeEntry::assistant("answer", None));
        }
        log.push(ExchangeEntry::user("x".repeat(60)));

        let topics = log.recent_topics(5, 50);
        assert_eq!(topics.len(), 5);
        assert_eq!(topics[0], "question 3");
        assert_eq!(topics[4], format!("{}...", "x".repeat(50)));
    }

    #[test]
    fn test_topic_truncation_respects_char_boundaries() {
        let topic = truncate_topic(&"é".repeat(51), 50);
        assert_eq!(topic, format!("{}...", "é".repeat(50)));
        assert_eq!(truncate_topic("short", 50), "short");
    }

    #[test]
    fn test_metadata_caption() {
        let meta = ResponseMetadata {
            latency_ms: 120,
            cache_hit: true,
            intent_label: Some("market_data".into()),
        };
        assert_eq!(meta.caption(), "120ms • Cached • market_data");
        assert_eq!(ResponseMetadata::default().caption(), "0ms");
    }
}
