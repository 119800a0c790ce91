use thiserror::Error;

/// Ways a streamed reply can end early
#[derive(Debug, Error)]
pub enum RenderError {
    /// Stopped by the user; never shown as an error
    #[error("Reply stopped")]
    Cancelled,

    #[error("Relay returned {status}: {body}")]
    Relay { status: u16, body: String },

    #[error("Could not reach relay: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Stream interrupted: {0}")]
    Stream(#[from] std::io::Error),
}

impl RenderError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, RenderError::Cancelled)
    }
}
