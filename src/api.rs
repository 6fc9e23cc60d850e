use crate::config::ApiConfig;
use crate::error::ExchangeError;
use crate::events::HistoryEntry;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Path of the chat endpoint on the backend
pub const CHAT_PATH: &str = "/api/chat";

/// Body of `POST /api/chat`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub message: String,
    pub conversation_history: Vec<HistoryEntry>,
}

/// Body returned by the backend.
///
/// `success` decides the outcome; `error` is informational only.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ChatResponse {
    pub fn into_reply(self) -> Result<String, ExchangeError> {
        if !self.success {
            return Err(ExchangeError::Rejected { error: self.error });
        }

        match self.response {
            Some(reply) if !reply.trim().is_empty() => Ok(reply),
            _ => Err(ExchangeError::EmptyReply),
        }
    }
}

/// HTTP client for the chat backend
#[derive(Clone)]
pub struct ChatClient {
    client: reqwest::Client,
    endpoint: String,
}

impl ChatClient {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build().context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            endpoint: config.chat_url(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Perform one exchange. Exactly one request is issued, no retries.
    pub async fn send(&self, request: &ChatRequest) -> Result<String, ExchangeError> {
        let response = self.client.post(&self.endpoint).json(request).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExchangeError::Status(status));
        }

        let body = response.bytes().await?;
        let parsed: ChatResponse = serde_json::from_slice(&body)?;
        parsed.into_reply()
    }
}
