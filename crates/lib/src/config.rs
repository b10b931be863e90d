//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.wxbot/config.json`) and environment.
//! Secrets (completion token, callback token, fallback webhook) may always be
//! supplied via environment variables instead of the file.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Gateway server settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Bot identity and reply behavior.
    #[serde(default)]
    pub bot: BotConfig,

    /// Remote completion endpoint settings.
    #[serde(default)]
    pub completion: CompletionConfig,

    /// Image generation settings (optional capability).
    #[serde(default)]
    pub images: ImagesConfig,

    /// WeCom callback and webhook settings.
    #[serde(default)]
    pub wecom: WecomConfig,
}

/// Gateway bind and port settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    /// Port for the HTTP callback server (default 7575).
    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Bind address (default "0.0.0.0"; the callback must be reachable from outside).
    #[serde(default = "default_gateway_bind")]
    pub bind: String,
}

fn default_gateway_port() -> u16 {
    7575
}

fn default_gateway_bind() -> String {
    "0.0.0.0".to_string()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_gateway_port(),
            bind: default_gateway_bind(),
        }
    }
}

/// Bot identity, session-clear token, and reply pacing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BotConfig {
    /// Display name the bot is @-mentioned by in groups.
    #[serde(default = "default_bot_name")]
    pub name: String,

    /// When a mention-stripped message equals this token, the sender's stored
    /// context is cleared and no reply is produced.
    #[serde(default = "default_session_clear_token")]
    pub session_clear_token: String,

    /// Reply used when the completion comes back empty after cleanup.
    #[serde(default = "default_fallback_reply")]
    pub fallback_reply: String,

    /// Lower bound of the random pre-reply delay, in seconds.
    #[serde(default = "default_reply_delay_min")]
    pub reply_delay_min_secs: u64,

    /// Upper bound of the random pre-reply delay, in seconds.
    #[serde(default = "default_reply_delay_max")]
    pub reply_delay_max_secs: u64,
}

fn default_bot_name() -> String {
    "wxbot".to_string()
}

fn default_session_clear_token() -> String {
    "清空会话".to_string()
}

fn default_fallback_reply() -> String {
    "request timed out, please try again later".to_string()
}

fn default_reply_delay_min() -> u64 {
    1
}

fn default_reply_delay_max() -> u64 {
    5
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            name: default_bot_name(),
            session_clear_token: default_session_clear_token(),
            fallback_reply: default_fallback_reply(),
            reply_delay_min_secs: default_reply_delay_min(),
            reply_delay_max_secs: default_reply_delay_max(),
        }
    }
}

/// Remote completion endpoint config.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionConfig {
    /// Conversation endpoint URL.
    #[serde(default = "default_completion_endpoint")]
    pub endpoint: String,

    /// Model name placed in the request envelope.
    #[serde(default = "default_completion_model")]
    pub model: String,

    /// Bearer token. Overridden by WXBOT_COMPLETION_TOKEN env when set.
    pub auth_token: Option<String>,
}

fn default_completion_endpoint() -> String {
    "https://chat.openai.com/backend-api/conversation".to_string()
}

fn default_completion_model() -> String {
    "text-davinci-002-render-paid".to_string()
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            endpoint: default_completion_endpoint(),
            model: default_completion_model(),
            auth_token: None,
        }
    }
}

/// Image generation config. Disabled by default; when disabled, messages that
/// would take the image branch go through the text path instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImagesConfig {
    /// Enable the image branch for messages whose text contains "img".
    #[serde(default)]
    pub enabled: bool,

    /// Image generation endpoint URL.
    #[serde(default = "default_images_endpoint")]
    pub endpoint: String,

    /// Requested image size.
    #[serde(default = "default_images_size")]
    pub size: String,
}

fn default_images_endpoint() -> String {
    "https://api.openai.com/v1/images/generations".to_string()
}

fn default_images_size() -> String {
    "1024x1024".to_string()
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: default_images_endpoint(),
            size: default_images_size(),
        }
    }
}

/// WeCom callback verification and reply webhook config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WecomConfig {
    /// Callback verification token. Overridden by WXBOT_CALLBACK_TOKEN env when set.
    pub callback_token: Option<String>,

    /// Robot webhook used when a message carries no response URL.
    /// Overridden by WXBOT_FALLBACK_WEBHOOK env when set.
    pub fallback_webhook_url: Option<String>,
}

fn env_nonempty(name: &str) -> Option<String> {
    std::env::var(name).ok().and_then(|s| {
        let t = s.trim();
        if t.is_empty() {
            None
        } else {
            Some(t.to_string())
        }
    })
}

/// Resolve the completion bearer token: env WXBOT_COMPLETION_TOKEN overrides config.
pub fn resolve_completion_token(config: &Config) -> Option<String> {
    env_nonempty("WXBOT_COMPLETION_TOKEN").or_else(|| {
        config
            .completion
            .auth_token
            .as_ref()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    })
}

/// Resolve the callback verification token: env WXBOT_CALLBACK_TOKEN overrides config.
pub fn resolve_callback_token(config: &Config) -> Option<String> {
    env_nonempty("WXBOT_CALLBACK_TOKEN").or_else(|| {
        config
            .wecom
            .callback_token
            .as_ref()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    })
}

/// Resolve the fallback robot webhook: env WXBOT_FALLBACK_WEBHOOK overrides config.
pub fn resolve_fallback_webhook(config: &Config) -> Option<String> {
    env_nonempty("WXBOT_FALLBACK_WEBHOOK").or_else(|| {
        config
            .wecom
            .fallback_webhook_url
            .as_ref()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    })
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("WXBOT_CONFIG_PATH").map(PathBuf::from).unwrap_or_else(|_| {
        dirs::home_dir()
            .map(|h| h.join(".wxbot").join("config.json"))
            .unwrap_or_else(|| PathBuf::from("config.json"))
    })
}

/// Load config from the default path (or WXBOT_CONFIG_PATH). Missing file => default config.
/// Returns the config and the path that was used.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    Ok((config, path))
}
