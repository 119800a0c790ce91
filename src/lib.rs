//! chat-relay: streaming chat relay with model fallback
//!
//! Features:
//! - Relays conversations to a hosted chat completion API
//! - Falls back to lower-capacity models when the preferred one is at capacity
//! - Forwards the upstream event stream untouched, naming the model used
//! - Terminal client that renders replies incrementally and can stop them

pub mod api;
pub mod client;
pub mod config;
pub mod proxy;
pub mod stats;
pub mod stream;
pub mod upstream;

pub use config::AppConfig;
pub use proxy::run_server;
