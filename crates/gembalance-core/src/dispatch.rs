//! Outbound dispatcher interface.
//!
//! The pool never talks HTTP itself; it hands a selected key to a
//! [`Dispatcher`] and interprets the outcome. Tests substitute scripted
//! dispatchers, the server wires in [`HttpDispatcher`].

use async_trait::async_trait;
use gembalance_types::ApiKey;
use serde_json::json;
use std::time::Duration;

const DEFAULT_UPSTREAM: &str = "https://generativelanguage.googleapis.com/v1beta";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Successful upstream reply.
#[derive(Debug, Clone)]
pub struct DispatchResponse {
    pub status: u16,
    pub body: String,
}

/// Failed dispatch attempt.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DispatchError {
    /// Upstream answered with a non-success status.
    #[error("upstream returned status {status}")]
    Upstream { status: u16, body: String },
    /// The request never produced an HTTP response.
    #[error("transport failure: {0}")]
    Transport(String),
}

impl DispatchError {
    /// Status code of the failure, when one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Upstream { status, .. } => Some(*status),
            Self::Transport(_) => None,
        }
    }

    /// Response body of the failure, when one was received.
    pub fn body(&self) -> &str {
        match self {
            Self::Upstream { body, .. } => body,
            Self::Transport(_) => "",
        }
    }
}

/// Sends a request upstream on behalf of one key.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    /// Issue a generation request for `model` authenticated by `key`.
    async fn generate(
        &self,
        key: &ApiKey,
        model: &str,
        payload: &serde_json::Value,
    ) -> Result<DispatchResponse, DispatchError>;

    /// List the model identifiers visible to `key`.
    async fn list_models(&self, key: &ApiKey) -> Result<Vec<String>, DispatchError>;
}

/// Reqwest-backed dispatcher against the Gemini REST surface.
pub struct HttpDispatcher {
    client: reqwest::Client,
    base_url: String,
}

impl HttpDispatcher {
    pub fn new() -> Result<Self, DispatchError> {
        Self::with_base_url(DEFAULT_UPSTREAM)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, DispatchError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| DispatchError::Transport(e.to_string()))?;
        Ok(Self { client, base_url: base_url.into() })
    }

    async fn read_response(response: reqwest::Response) -> Result<DispatchResponse, DispatchError> {
        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| DispatchError::Transport(e.to_string()))?;
        if (200..300).contains(&status) {
            Ok(DispatchResponse { status, body })
        } else {
            Err(DispatchError::Upstream { status, body })
        }
    }
}

#[async_trait]
impl Dispatcher for HttpDispatcher {
    async fn generate(
        &self,
        key: &ApiKey,
        model: &str,
        payload: &serde_json::Value,
    ) -> Result<DispatchResponse, DispatchError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, model);
        let response = self
            .client
            .post(&url)
            .query(&[("key", key.secret.as_str())])
            .json(payload)
            .send()
            .await
            .map_err(|e| DispatchError::Transport(e.to_string()))?;
        Self::read_response(response).await
    }

    async fn list_models(&self, key: &ApiKey) -> Result<Vec<String>, DispatchError> {
        let url = format!("{}/models", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("key", key.secret.as_str())])
            .send()
            .await
            .map_err(|e| DispatchError::Transport(e.to_string()))?;
        let ok = Self::read_response(response).await?;

        let parsed: serde_json::Value = serde_json::from_str(&ok.body)
            .map_err(|e| DispatchError::Transport(format!("malformed model listing: {e}")))?;
        let models = parsed["models"]
            .as_array()
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|entry| entry["name"].as_str())
                    .map(|name| name.strip_prefix("models/").unwrap_or(name).to_string())
                    .collect()
            })
            .unwrap_or_default();
        Ok(models)
    }
}

/// Minimal generation payload used by health probes.
pub fn probe_payload() -> serde_json::Value {
    json!({
        "contents": [{
            "role": "user",
            "parts": [{ "text": "hi" }]
        }],
        "generationConfig": { "maxOutputTokens": 1 }
    })
}
