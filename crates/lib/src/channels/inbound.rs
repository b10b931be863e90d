//! Inbound group message from a channel: delivered to the gateway for dispatch.

/// A group-chat message as delivered by a channel. Immutable once received;
/// consumed once by dispatch.
#[derive(Debug, Clone)]
pub struct GroupMessage {
    /// Channel that produced the message (e.g. "wecom").
    pub channel_id: String,
    pub msg_id: String,
    pub sender_id: String,
    pub sender_name: String,
    pub group_id: String,
    pub group_name: String,
    pub text: String,
    /// Message creation time, unix epoch seconds.
    pub created_at: i64,
    pub mentions_bot: bool,
    pub is_text: bool,
    /// Per-message reply webhook; the configured fallback webhook is used when absent.
    pub reply_url: Option<String>,
}
