use futures::stream::LocalBoxStream;
use miette::Diagnostic;
use thiserror::Error;

use crate::Message;

/// Reply text as it arrives, already decoded, in arrival order.
pub type ChunkStream = LocalBoxStream<'static, Result<String, TransportError>>;

/// How a conversation client reaches the chat relay.
///
/// Implementations run on a single-threaded event loop (the browser, or the
/// CLI's current task), so neither the future nor the stream needs `Send`.
#[async_trait::async_trait(?Send)]
pub trait ChatTransport {
    /// Submits the whole history and resolves once the relay has committed to
    /// a streamed reply. Non-success statuses are reported here, before any
    /// chunk is yielded.
    async fn send(&self, messages: &[Message]) -> Result<ChunkStream, TransportError>;
}

#[derive(Error, Diagnostic, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("relay is rate limited")]
    RateLimited,
    #[error("relay responded with status {0}")]
    Status(u16),
    #[error("relay response has no readable body")]
    NoBody,
    #[error("network error: {0}")]
    Network(String),
    #[error("could not encode request: {0}")]
    Encode(String),
}

impl TransportError {
    /// Maps a non-success relay status onto the client's error classes.
    pub fn from_status(status: u16) -> Self {
        if status == 429 {
            Self::RateLimited
        } else {
            Self::Status(status)
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited)
    }
}
