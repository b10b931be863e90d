//! Wxbot core library — config, sessions, normalization, completion and
//! image backends, channels, dispatch, and the gateway used by the CLI.

pub mod channels;
pub mod completion;
pub mod config;
pub mod dispatch;
pub mod gateway;
pub mod images;
pub mod init;
pub mod normalize;
pub mod reply;
pub mod session;
