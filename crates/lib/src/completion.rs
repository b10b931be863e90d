//! Remote completion client for the conversation endpoint.
//!
//! One POST per user turn. The endpoint answers with SSE-style `data:` chunks
//! terminated by a `[DONE]` sentinel; only the final complete chunk is parsed.
//! There is no incremental streaming and no retry.

use async_trait::async_trait;
use uuid::Uuid;

/// Client for the conversation completion endpoint.
#[derive(Clone)]
pub struct CompletionClient {
    endpoint: String,
    model: String,
    auth_token: String,
    client: reqwest::Client,
}

#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
    #[error("completion request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("completion api error: {0}")]
    Api(String),
    #[error("completion response decode failed: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("completion response missing field: {0}")]
    MissingField(&'static str),
}

/// Seam between dispatch and the concrete completion endpoint.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError>;
}

impl CompletionClient {
    pub fn new(endpoint: &str, model: &str, auth_token: &str) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model: model.to_string(),
            auth_token: auth_token.to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// POST one prompt; returns the generated text from the final chunk.
    pub async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        let body = serde_json::json!({
            "action": "next",
            "messages": [{
                "id": Uuid::new_v4().to_string(),
                "author": {"role": "user"},
                "role": "user",
                "content": {"content_type": "text", "parts": [prompt]},
            }],
            "conversation_id": "",
            "parent_message_id": Uuid::new_v4().to_string(),
            "model": self.model,
        });
        let res = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.auth_token)
            .json(&body)
            .send()
            .await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(CompletionError::Api(format!("{} {}", status, body)));
        }
        let raw = res.text().await?;
        extract_answer(&raw)
    }
}

#[async_trait]
impl CompletionBackend for CompletionClient {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        CompletionClient::complete(self, prompt).await
    }
}

/// Pull the generated text out of an SSE-style response body: strip every
/// `[DONE]` sentinel, split on `data:`, parse the second-to-last segment as
/// JSON, and concatenate `message.content.parts` in order. In a live stream
/// the last segment is the emptied sentinel remnant, so the second-to-last
/// holds the final complete message.
pub fn extract_answer(raw: &str) -> Result<String, CompletionError> {
    let stripped = raw.replace("[DONE]", "");
    let segments: Vec<&str> = stripped.split("data:").collect();
    if segments.len() < 2 {
        return Err(CompletionError::MissingField("data"));
    }
    let payload = segments[segments.len() - 2];
    let value: serde_json::Value = serde_json::from_str(payload.trim())?;
    let parts = value
        .get("message")
        .ok_or(CompletionError::MissingField("message"))?
        .get("content")
        .ok_or(CompletionError::MissingField("content"))?
        .get("parts")
        .ok_or(CompletionError::MissingField("parts"))?
        .as_array()
        .ok_or(CompletionError::MissingField("parts"))?;

    let mut answer = String::new();
    for part in parts {
        match part.as_str() {
            Some(s) => answer.push_str(s),
            None => answer.push_str(&part.to_string()),
        }
    }
    Ok(answer)
}
