use serde::{Deserialize, Serialize};

pub mod conversation;
pub mod decode;
pub mod flows;
pub mod guided;
pub mod speech;
pub mod transport;

pub use conversation::{stream_turn, Conversation, FailureKind, Fallbacks, Phase, TurnEvent, TurnRequest};
pub use decode::Utf8Decoder;
pub use flows::ChatFlow;
pub use transport::{ChatTransport, ChunkStream, TransportError};

pub const INVALID_REQUEST_ERROR: &str = "messages array is required";
pub const RATE_LIMITED_ERROR: &str = "Rate limit exceeded";
pub const INTERNAL_ERROR: &str = "Internal server error";

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Body of every chat relay `POST`.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ChatRequest {
    pub messages: Vec<Message>,
}

/// JSON payload of every non-streaming relay response.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_serialize_lowercase() {
        let body = serde_json::to_string(&ChatRequest {
            messages: vec![Message::user("hi"), Message::assistant("hello")],
        })
        .unwrap();

        assert_eq!(
            body,
            r#"{"messages":[{"role":"user","content":"hi"},{"role":"assistant","content":"hello"}]}"#
        );
    }
}
