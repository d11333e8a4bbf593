//! Boundary to the remote assistant service.
//!
//! [`ChatApi`] is implemented over HTTP by `dekr-interaction`; the payload
//! types mirror the JSON bodies of the chat endpoints.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::exchange::ResponseMetadata;
use crate::usage::Tier;

/// Body of a message-send request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendMessageRequest {
    pub message: String,
}

/// Body of a message-send response.
///
/// Cached replies omit the timing and intent fields, hence the defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SendMessageResponse {
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub response_time_ms: Option<u64>,
    #[serde(default)]
    pub intent: Option<String>,
    #[serde(default)]
    pub context_used: Option<serde_json::Value>,
    #[serde(default)]
    pub cached: Option<bool>,
    #[serde(default)]
    pub error: Option<String>,
}

impl SendMessageResponse {
    /// A plain successful reply.
    pub fn reply(response: impl Into<String>, response_time_ms: u64) -> Self {
        Self {
            response: Some(response.into()),
            response_time_ms: Some(response_time_ms),
            ..Self::default()
        }
    }

    pub fn metadata(&self) -> ResponseMetadata {
        ResponseMetadata {
            latency_ms: self.response_time_ms.unwrap_or(0),
            cache_hit: self.cached.unwrap_or(false),
            intent_label: self.intent.clone().filter(|i| !i.is_empty()),
        }
    }
}

/// Usage counters inside a status response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageStats {
    #[serde(default)]
    pub daily_messages_used: u32,
    #[serde(default)]
    pub rate_limit_usage: Option<f64>,
}

/// Body of a chat-status response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatStatus {
    #[serde(default)]
    pub user_tier: Option<i64>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub usage_stats: Option<UsageStats>,
}

impl ChatStatus {
    /// Reported tier; a missing or zero tier falls back to freemium.
    pub fn tier(&self) -> Tier {
        match self.user_tier {
            Some(tier) if tier != 0 => Tier(tier),
            _ => Tier::default(),
        }
    }
}

/// Body of a chat-suggestions response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestions {
    #[serde(default)]
    pub suggestions: Vec<String>,
}

/// Remote chat endpoints.
///
/// Implementations only report what the transport saw; interpreting the
/// `error` field of a successful send response is the caller's job.
#[async_trait]
pub trait ChatApi: Send + Sync {
    /// Sends one user message.
    async fn send_message(&self, message: &str) -> Result<SendMessageResponse, ApiError>;

    /// Fetches tier, session id and usage counters.
    async fn status(&self) -> Result<ChatStatus, ApiError>;

    /// Fetches conversation starters for the current tier.
    async fn suggestions(&self) -> Result<Suggestions, ApiError>;

    /// Asks the server to reset the conversation.
    async fn clear_history(&self) -> Result<(), ApiError>;
}
