//! HttpChatApi - REST implementation of [`ChatApi`].
//!
//! Talks to the assistant's `/api/v1/chat/*` endpoints. The server keeps the
//! session in a cookie, so the client runs with a cookie store.

use async_trait::async_trait;
use dekr_core::api::{ChatApi, ChatStatus, SendMessageRequest, SendMessageResponse, Suggestions};
use dekr_core::error::{ApiError, DekrError, Result};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const API_PREFIX: &str = "/api/v1/chat";

/// [`ChatApi`] over HTTP.
#[derive(Clone, Debug)]
pub struct HttpChatApi {
    client: Client,
    base_url: String,
}

impl HttpChatApi {
    /// Creates a client for the server at `base_url` (e.g. `http://127.0.0.1:5000`).
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(base_url, Some(DEFAULT_REQUEST_TIMEOUT))
    }

    /// Creates a client with an explicit request timeout; `None` waits
    /// for as long as the transport does.
    pub fn with_timeout(base_url: impl Into<String>, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder().cookie_store(true);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|err| DekrError::config(format!("Failed to build HTTP client: {err}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, name: &str) -> String {
        format!("{}{}/{}", self.base_url, API_PREFIX, name)
    }

    async fn send(&self, request: RequestBuilder) -> std::result::Result<Response, ApiError> {
        let response = request.send().await.map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::debug!(status = status.as_u16(), "chat endpoint returned error status");
            return Err(map_http_error(status, &body));
        }
        Ok(response)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> std::result::Result<T, ApiError> {
        self.send(request)
            .await?
            .json::<T>()
            .await
            .map_err(|err| ApiError::network(format!("Failed to parse chat response: {err}")))
    }
}

#[async_trait]
impl ChatApi for HttpChatApi {
    async fn send_message(&self, message: &str) -> std::result::Result<SendMessageResponse, ApiError> {
        let body = SendMessageRequest {
            message: message.to_string(),
        };
        tracing::debug!(chars = message.chars().count(), "sending chat message");
        self.send_json(self.client.post(self.endpoint("message")).json(&body))
            .await
    }

    async fn status(&self) -> std::result::Result<ChatStatus, ApiError> {
        self.send_json(self.client.get(self.endpoint("status"))).await
    }

    async fn suggestions(&self) -> std::result::Result<Suggestions, ApiError> {
        self.send_json(self.client.get(self.endpoint("suggestions")))
            .await
    }

    async fn clear_history(&self) -> std::result::Result<(), ApiError> {
        self.send(self.client.post(self.endpoint("clear"))).await?;
        Ok(())
    }
}

#[derive(Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    error: Option<String>,
}

fn map_transport_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        ApiError::network("Request timed out. Please try again.")
    } else {
        ApiError::network(err.to_string())
    }
}

fn map_http_error(status: StatusCode, body: &str) -> ApiError {
    let error = serde_json::from_str::<ErrorResponse>(body)
        .ok()
        .and_then(|wrapper| wrapper.error);
    ApiError::status(status.as_u16(), error)
}
