//! Communication channels (WeCom callback).
//!
//! Channel trait and registry so the gateway can stop channel connectors and
//! deliver replies. Inbound messages are sent to the gateway for dispatch.

mod inbound;
mod registry;
mod wecom;

pub use inbound::GroupMessage;
pub use registry::{ChannelHandle, ChannelRegistry};
pub use wecom::{callback_signature, CallbackEvent, WecomChannel};
