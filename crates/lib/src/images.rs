//! Image generation capability: prompt in, temporary PNG file out.
//!
//! Optional branch, disabled by default. When enabled, messages whose
//! normalized text contains "img" are answered with a generated image
//! instead of text.

use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;
use uuid::Uuid;

/// Client for the image generation endpoint.
#[derive(Clone)]
pub struct ImageClient {
    endpoint: String,
    size: String,
    auth_token: String,
    client: reqwest::Client,
}

#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("image request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("image api error: {0}")]
    Api(String),
    #[error("image response decode failed: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("image response carries no url")]
    MissingUrl,
    #[error("writing image file failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Seam between dispatch and the concrete image endpoint.
#[async_trait]
pub trait ImageBackend: Send + Sync {
    /// Generate an image for the prompt, persist it to a temporary file, and
    /// return the file path.
    async fn generate(&self, prompt: &str) -> Result<PathBuf, ImageError>;
}

#[derive(Debug, Deserialize)]
struct GenerationResponse {
    #[serde(default)]
    data: Vec<GenerationEntry>,
}

#[derive(Debug, Deserialize)]
struct GenerationEntry {
    url: String,
}

impl ImageClient {
    pub fn new(endpoint: &str, size: &str, auth_token: &str) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            size: size.to_string(),
            auth_token: auth_token.to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// POST the prompt, download the first returned URL, and write the bytes
    /// to a uniquely named PNG in the temp directory.
    pub async fn generate(&self, prompt: &str) -> Result<PathBuf, ImageError> {
        let body = serde_json::json!({
            "prompt": prompt,
            "n": 1,
            "size": self.size,
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
            return Err(ImageError::Api(format!("{} {}", status, body)));
        }
        let raw = res.text().await?;
        let data: GenerationResponse = serde_json::from_str(&raw)?;
        let url = data
            .data
            .first()
            .map(|entry| entry.url.clone())
            .ok_or(ImageError::MissingUrl)?;

        let download = self.client.get(&url).send().await?;
        if !download.status().is_success() {
            return Err(ImageError::Api(format!(
                "image download failed: {}",
                download.status()
            )));
        }
        let bytes = download.bytes().await?;

        let path = std::env::temp_dir().join(format!("{}.png", Uuid::new_v4()));
        tokio::fs::write(&path, &bytes).await?;
        log::debug!("wrote generated image to {}", path.display());
        Ok(path)
    }
}

#[async_trait]
impl ImageBackend for ImageClient {
    async fn generate(&self, prompt: &str) -> Result<PathBuf, ImageError> {
        ImageClient::generate(self, prompt).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_generation_response_url() {
        let raw = r#"{"data":[{"url":"https://images.example/one.png"}]}"#;
        let parsed: GenerationResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.data[0].url, "https://images.example/one.png");
    }

    #[test]
    fn empty_data_array_parses_to_no_entries() {
        let parsed: GenerationResponse = serde_json::from_str(r#"{"data":[]}"#).unwrap();
        assert!(parsed.data.is_empty());

        let parsed: GenerationResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.data.is_empty());
    }
}
