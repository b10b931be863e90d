//! Dispatch controller: decides whether an inbound group message gets a
//! reply and drives normalize → complete → store → format → send.
//!
//! The guard chain discards silently (non-text, stale, no mention, clear
//! token, empty text). Remote failures are recoverable errors surfaced to
//! the processor loop; one failed turn never affects other users.

use crate::channels::{ChannelRegistry, GroupMessage};
use crate::completion::CompletionBackend;
use crate::config::Config;
use crate::images::ImageBackend;
use crate::normalize;
use crate::reply;
use crate::session::SessionStore;
use anyhow::Result;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;

/// Messages older than this many seconds are dropped unanswered.
const STALE_AFTER_SECS: i64 = 60;

/// One dispatcher handles every inbound message; per-message state lives on
/// the stack of `handle`.
pub struct Dispatcher {
    bot_name: String,
    session_clear_token: String,
    fallback_reply: String,
    delay_min_secs: u64,
    delay_max_secs: u64,
    sessions: Arc<SessionStore>,
    channels: Arc<ChannelRegistry>,
    completion: Arc<dyn CompletionBackend>,
    images: Option<Arc<dyn ImageBackend>>,
}

impl Dispatcher {
    pub fn new(
        config: &Config,
        sessions: Arc<SessionStore>,
        channels: Arc<ChannelRegistry>,
        completion: Arc<dyn CompletionBackend>,
        images: Option<Arc<dyn ImageBackend>>,
    ) -> Self {
        Self {
            bot_name: config.bot.name.clone(),
            session_clear_token: config.bot.session_clear_token.clone(),
            fallback_reply: config.bot.fallback_reply.clone(),
            delay_min_secs: config.bot.reply_delay_min_secs,
            delay_max_secs: config.bot.reply_delay_max_secs,
            sessions,
            channels,
            completion,
            images,
        }
    }

    /// Process one inbound message end to end. Discards return Ok; remote
    /// and delivery failures return recoverable errors for the caller to log.
    pub async fn handle(&self, msg: GroupMessage) -> Result<()> {
        if !msg.is_text {
            return Ok(());
        }
        let age = chrono::Utc::now().timestamp() - msg.created_at;
        if age > STALE_AFTER_SECS {
            log::debug!("discarding stale message {} ({}s old)", msg.msg_id, age);
            return Ok(());
        }
        if !msg.mentions_bot {
            return Ok(());
        }

        let cleaned = normalize::strip_mention(&msg.text, &self.bot_name);
        if cleaned == self.session_clear_token {
            let lock = self.sessions.turn_lock(&msg.sender_id).await;
            let _guard = lock.lock().await;
            self.sessions.clear(&msg.sender_id).await;
            log::info!("cleared session context for {}", msg.sender_id);
            return Ok(());
        }
        self.delay().await;
        if cleaned.is_empty() {
            log::debug!("message {} is empty after mention strip", msg.msg_id);
            return Ok(());
        }
        log::info!("group[{}] {}: {}", msg.group_name, msg.sender_name, cleaned);

        let lock = self.sessions.turn_lock(&msg.sender_id).await;
        let _guard = lock.lock().await;

        let prior = self.sessions.get(&msg.sender_id).await;
        let prompt = normalize::build_prompt(&cleaned, prior.as_ref());

        if let Some(ref images) = self.images {
            if prompt.contains("img") {
                return self.handle_image(images.as_ref(), &msg, &prompt).await;
            }
        }

        let answer = self.completion.complete(&prompt).await?;
        log::debug!(
            "completion answered {} chars for {}",
            answer.chars().count(),
            msg.sender_id
        );
        self.sessions.set(&msg.sender_id, &prompt, &answer).await;

        let formatted =
            reply::format_reply(&answer, &msg.sender_name, &cleaned, &self.fallback_reply);
        self.send_text(&msg, &formatted).await
    }

    async fn handle_image(
        &self,
        images: &dyn ImageBackend,
        msg: &GroupMessage,
        prompt: &str,
    ) -> Result<()> {
        let path = images.generate(prompt).await?;
        log::info!("image reply for {}: {}", msg.sender_id, path.display());
        let handle = match self.channels.get(&msg.channel_id).await {
            Some(h) => h,
            None => anyhow::bail!("channel not found: {}", msg.channel_id),
        };
        if let Err(e) = handle.send_image(msg, &path).await {
            anyhow::bail!("reply group error: {}", e);
        }
        Ok(())
    }

    async fn send_text(&self, msg: &GroupMessage, text: &str) -> Result<()> {
        let handle = match self.channels.get(&msg.channel_id).await {
            Some(h) => h,
            None => anyhow::bail!("channel not found: {}", msg.channel_id),
        };
        if let Err(e) = handle.send_text(msg, text).await {
            anyhow::bail!("reply group error: {}", e);
        }
        Ok(())
    }

    async fn delay(&self) {
        let max = self.delay_max_secs.max(self.delay_min_secs);
        if max == 0 {
            return;
        }
        let secs = rand::thread_rng().gen_range(self.delay_min_secs..=max);
        if secs > 0 {
            tokio::time::sleep(Duration::from_secs(secs)).await;
        }
    }
}
