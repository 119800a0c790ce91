//! Chat client that renders relay replies as they stream in

mod conversation;
mod error;
mod relay;
mod renderer;

pub use conversation::{AssistantAccumulator, Conversation};
pub use error::RenderError;
pub use relay::{RelayClient, RelayStream};
pub use renderer::{pump_events, ChatSession, RenderOutcome, RenderSink, StopHandle, StreamEnd};
