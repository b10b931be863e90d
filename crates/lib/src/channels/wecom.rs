//! WeCom callback channel: signed inbound group events and webhook replies.
//!
//! Inbound events arrive as callback POSTs verified with a SHA1 signature
//! over the sorted (token, timestamp, nonce) triple. Replies go to the
//! message's own response URL when present, otherwise to the configured
//! fallback robot webhook.

use crate::channels::inbound::GroupMessage;
use crate::channels::registry::ChannelHandle;
use async_trait::async_trait;
use base64::Engine;
use serde::Deserialize;
use sha1::{Digest, Sha1};
use std::path::Path;

/// Inbound callback event payload (camelCase JSON).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallbackEvent {
    pub msg_id: String,
    pub msg_type: String,
    pub chat_id: String,
    #[serde(default)]
    pub chat_name: String,
    pub from_user_id: String,
    #[serde(default)]
    pub from_user_name: String,
    #[serde(default)]
    pub content: String,
    pub create_time: i64,
    #[serde(default)]
    pub mentioned_bot: bool,
    #[serde(default)]
    pub response_url: Option<String>,
}

/// Webhook acknowledgement body.
#[derive(Debug, Deserialize)]
struct WebhookAck {
    #[serde(default)]
    errcode: i64,
    #[serde(default)]
    errmsg: String,
}

/// Compute the callback signature: SHA1 over the sorted triple, hex encoded.
pub fn callback_signature(token: &str, timestamp: &str, nonce: &str) -> String {
    let mut parts = [token, timestamp, nonce];
    parts.sort_unstable();
    let mut hasher = Sha1::new();
    hasher.update(parts.concat().as_bytes());
    hex::encode(hasher.finalize())
}

/// WeCom channel connector: verifies callback signatures, converts events to
/// group messages, and delivers replies through webhooks.
pub struct WecomChannel {
    id: String,
    callback_token: Option<String>,
    fallback_webhook_url: Option<String>,
    client: reqwest::Client,
}

impl WecomChannel {
    pub fn new(callback_token: Option<String>, fallback_webhook_url: Option<String>) -> Self {
        Self {
            id: "wecom".to_string(),
            callback_token,
            fallback_webhook_url,
            client: reqwest::Client::new(),
        }
    }

    /// Verify a callback signature. Without a configured token every
    /// callback is rejected.
    pub fn verify_signature(&self, signature: &str, timestamp: &str, nonce: &str) -> bool {
        let token = match self.callback_token.as_ref() {
            Some(t) => t,
            None => {
                log::warn!("wecom callback token not configured, rejecting callback");
                return false;
            }
        };
        callback_signature(token, timestamp, nonce) == signature
    }

    /// Convert a verified callback event into a group message.
    pub fn group_message(&self, event: CallbackEvent) -> GroupMessage {
        GroupMessage {
            channel_id: self.id.clone(),
            msg_id: event.msg_id,
            sender_id: event.from_user_id,
            sender_name: event.from_user_name,
            group_id: event.chat_id,
            group_name: event.chat_name,
            text: event.content,
            created_at: event.create_time,
            mentions_bot: event.mentioned_bot,
            is_text: event.msg_type == "text",
            reply_url: event.response_url,
        }
    }

    /// Send a text reply for the message.
    pub async fn send_text(&self, msg: &GroupMessage, text: &str) -> Result<(), String> {
        let payload = serde_json::json!({
            "msgtype": "text",
            "text": { "content": text },
        });
        self.post_webhook(msg, payload).await
    }

    /// Send an image reply from a local file (base64 body + md5 checksum).
    pub async fn send_image(&self, msg: &GroupMessage, path: &Path) -> Result<(), String> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| format!("reading image file {}: {}", path.display(), e))?;
        let encoded = base64::engine::general_purpose::STANDARD.encode(&bytes);
        let checksum = format!("{:x}", md5::compute(&bytes));
        let payload = serde_json::json!({
            "msgtype": "image",
            "image": { "base64": encoded, "md5": checksum },
        });
        self.post_webhook(msg, payload).await
    }

    async fn post_webhook(&self, msg: &GroupMessage, payload: serde_json::Value) -> Result<(), String> {
        let webhook = msg
            .reply_url
            .clone()
            .or_else(|| self.fallback_webhook_url.clone())
            .ok_or("no reply url on message and no fallback webhook configured")?;
        let res = self
            .client
            .post(&webhook)
            .json(&payload)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(format!("webhook reply failed: {} {}", status, body));
        }
        let ack: WebhookAck = res.json().await.map_err(|e| e.to_string())?;
        if ack.errcode != 0 {
            return Err(format!("webhook reply error {}: {}", ack.errcode, ack.errmsg));
        }
        Ok(())
    }
}

#[async_trait]
impl ChannelHandle for WecomChannel {
    fn id(&self) -> &str {
        &self.id
    }

    fn stop(&self) {
        log::debug!("wecom channel stopped");
    }

    async fn send_text(&self, msg: &GroupMessage, text: &str) -> Result<(), String> {
        WecomChannel::send_text(self, msg, text).await
    }

    async fn send_image(&self, msg: &GroupMessage, path: &Path) -> Result<(), String> {
        WecomChannel::send_image(self, msg, path).await
    }
}
