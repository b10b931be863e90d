//! Gateway: HTTP control plane.
//!
//! Single port serves the WeCom callback endpoints and a health probe.
//! Inbound messages are queued and dispatched on their own tasks.

mod server;

pub use server::run_gateway;
