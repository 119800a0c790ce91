//! HTTP relay server

mod error;
mod fallback;
mod handler;
pub mod server;
mod streaming;

pub use error::RelayError;
pub use fallback::{forward_with_fallback, FallbackPolicy, Forwarded};
pub use handler::{chat_handler, MODEL_USED_HEADER};
pub use server::{build_router, run_server, ProxyState};
pub use streaming::{tap_stream, tap_stream_with};
