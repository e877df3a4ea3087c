//! Per-request bridge between a chat client and the upstream model.
//!
//! Nothing here keeps state between calls: every request carries the whole
//! conversation, which is reshaped into the provider's turn format and sent
//! along with the persona's fixed system instruction.

use futures::{future, stream, StreamExt, TryStreamExt};
use miette::Diagnostic;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::gemini::generate::{Content, ContentRole, GenerateRequest, TextStream};
use crate::gemini::{Client, UpstreamError};
use crate::personas::Persona;

#[derive(Error, Diagnostic, Debug)]
pub enum RelayError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("upstream rate limited")]
    RateLimited(#[source] UpstreamError),
    #[error("upstream failed")]
    Upstream(#[source] UpstreamError),
}

impl From<UpstreamError> for RelayError {
    fn from(err: UpstreamError) -> Self {
        if err.is_rate_limited() {
            Self::RateLimited(err)
        } else {
            Self::Upstream(err)
        }
    }
}

/// One entry of the submitted history. Any role other than `assistant` is
/// treated as the user.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct IncomingMessage {
    #[serde(default)]
    pub role: Option<String>,
    pub content: String,
}

impl IncomingMessage {
    fn upstream_role(&self) -> ContentRole {
        match self.role.as_deref() {
            Some("assistant") => ContentRole::Model,
            _ => ContentRole::User,
        }
    }
}

/// A conversation reshaped for the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedChat {
    /// Prior turns; empty or starting with a user turn.
    pub history: Vec<Content>,
    /// The final submitted entry, answered now.
    pub message: String,
}

/// Parses a relay body. `messages` must be a non-empty array of objects with
/// string `content`.
pub fn parse_request(body: &[u8]) -> Result<Vec<IncomingMessage>, RelayError> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|err| RelayError::InvalidRequest(format!("body is not JSON: {err}")))?;

    let Some(Value::Array(entries)) = value.get("messages") else {
        return Err(RelayError::InvalidRequest("messages is not an array".into()));
    };
    if entries.is_empty() {
        return Err(RelayError::InvalidRequest("messages is empty".into()));
    }

    entries
        .iter()
        .map(|entry| {
            IncomingMessage::deserialize(entry)
                .map_err(|err| RelayError::InvalidRequest(format!("bad message: {err}")))
        })
        .collect()
}

/// Splits off the last entry as the message to answer, remaps the rest to the
/// provider's roles, and drops any leading model turns. The provider rejects
/// a history that opens with the model.
pub fn prepare(mut messages: Vec<IncomingMessage>) -> Result<PreparedChat, RelayError> {
    let last = messages
        .pop()
        .ok_or_else(|| RelayError::InvalidRequest("messages is empty".into()))?;

    let history = messages
        .iter()
        .map(|message| Content::text(message.upstream_role(), message.content.clone()))
        .skip_while(|content| content.role != ContentRole::User)
        .collect();

    Ok(PreparedChat {
        history,
        message: last.content,
    })
}

/// The streaming model the relay forwards to.
#[async_trait::async_trait]
pub trait Upstream: Send + Sync {
    async fn stream_reply(
        &self,
        system_instruction: &str,
        chat: PreparedChat,
    ) -> Result<TextStream, UpstreamError>;
}

#[async_trait::async_trait]
impl Upstream for Client {
    async fn stream_reply(
        &self,
        system_instruction: &str,
        chat: PreparedChat,
    ) -> Result<TextStream, UpstreamError> {
        let request = GenerateRequest::new(system_instruction, chat.history, chat.message);
        self.stream_generate(&request).await
    }
}

/// Starts the upstream reply for `persona` and waits for its first piece of
/// text. Failures up to that point are returned as errors, so the caller can
/// still choose a status; after it, they end the returned stream. Empty
/// increments are dropped.
pub async fn open_stream(
    upstream: &dyn Upstream,
    persona: &Persona,
    chat: PreparedChat,
) -> Result<TextStream, RelayError> {
    tracing::debug!(
        flow = persona.slug(),
        history = chat.history.len(),
        "opening upstream stream"
    );

    let mut replies = upstream
        .stream_reply(persona.system_instruction, chat)
        .await?
        .try_filter(|text| future::ready(!text.is_empty()));

    match replies.next().await {
        Some(Ok(first)) => Ok(stream::once(future::ready(Ok(first)))
            .chain(replies)
            .boxed()),
        Some(Err(err)) => Err(err.into()),
        None => Ok(stream::empty().boxed()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(role: &str, content: &str) -> IncomingMessage {
        IncomingMessage {
            role: Some(role.to_owned()),
            content: content.to_owned(),
        }
    }

    #[test]
    fn leading_assistant_turns_are_dropped() {
        let chat = prepare(vec![
            msg("assistant", "greeting"),
            msg("assistant", "more"),
            msg("user", "first"),
            msg("assistant", "reply"),
            msg("user", "now"),
        ])
        .unwrap();

        assert_eq!(
            chat.history,
            vec![
                Content::text(ContentRole::User, "first"),
                Content::text(ContentRole::Model, "reply"),
            ]
        );
        assert_eq!(chat.message, "now");
    }

    #[test]
    fn history_of_only_assistant_turns_is_empty() {
        let chat = prepare(vec![msg("assistant", "greeting"), msg("user", "hi")]).unwrap();

        assert!(chat.history.is_empty());
        assert_eq!(chat.message, "hi");
    }

    #[test]
    fn unknown_roles_count_as_user() {
        let chat = prepare(vec![msg("system", "x"), msg("user", "y")]).unwrap();

        assert_eq!(chat.history, vec![Content::text(ContentRole::User, "x")]);
    }

    #[test]
    fn parse_rejects_missing_and_non_array_messages() {
        for body in [
            "{}",
            r#"{"messages":"hi"}"#,
            r#"{"messages":[]}"#,
            r#"{"messages":[{"role":"user"}]}"#,
            "not json",
        ] {
            assert!(matches!(
                parse_request(body.as_bytes()),
                Err(RelayError::InvalidRequest(_))
            ));
        }
    }

    #[test]
    fn parse_accepts_role_tagged_entries() {
        let messages =
            parse_request(br#"{"messages":[{"role":"assistant","content":"a"},{"content":"b"}]}"#)
                .unwrap();

        assert_eq!(messages[0], msg("assistant", "a"));
        assert_eq!(messages[1].role, None);
    }
}
