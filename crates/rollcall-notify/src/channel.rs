//! Notification channel: where a fired welcome notification is delivered.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug, Clone)]
pub enum ChannelError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("no response within {0:?}")]
    Timeout(Duration),
}

/// Request timeout applied by [`HttpChannel::new`].
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// One welcome notification for a recognized identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub requested_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(email: impl Into<String>, name: impl Into<String>, requested_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: email.into(),
            name: name.into(),
            requested_at,
        }
    }
}

/// Request body of the welcome-email endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WelcomeRequest {
    pub email: String,
    pub name: String,
}

/// Response body of the welcome-email endpoint, on success and failure alike.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WelcomeResponse {
    pub message: String,
}

#[async_trait]
pub trait NotificationChannel: Send + Sync {
    /// Deliver one notification, returning the channel's confirmation message.
    async fn send(&self, notification: &Notification) -> Result<String, ChannelError>;
}

/// Channel that posts `{email, name}` to a welcome-email HTTP endpoint.
pub struct HttpChannel {
    client: reqwest::Client,
    url: String,
}

impl HttpChannel {
    pub fn new(url: impl Into<String>) -> Result<Self, ChannelError> {
        Self::with_timeout(url, DEFAULT_HTTP_TIMEOUT)
    }

    pub fn with_timeout(url: impl Into<String>, timeout: Duration) -> Result<Self, ChannelError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ChannelError::Transport(format!("http client: {e}")))?;
        Ok(Self { client, url: url.into() })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Post a request directly, outside the notification pipeline.
    pub async fn post(&self, request: &WelcomeRequest) -> Result<String, ChannelError> {
        let response = self
            .client
            .post(&self.url)
            .json(request)
            .send()
            .await
            .map_err(|e| ChannelError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response.json::<WelcomeResponse>().await;

        if status.is_success() {
            body.map(|b| b.message)
                .map_err(|e| ChannelError::InvalidResponse(e.to_string()))
        } else {
            Err(ChannelError::Rejected {
                status: status.as_u16(),
                message: body.map(|b| b.message).unwrap_or_default(),
            })
        }
    }
}

#[async_trait]
impl NotificationChannel for HttpChannel {
    async fn send(&self, notification: &Notification) -> Result<String, ChannelError> {
        let request = WelcomeRequest {
            email: notification.email.clone(),
            name: notification.name.clone(),
        };
        self.post(&request).await
    }
}
