use eventsource_stream::Eventsource;
use futures::{stream::BoxStream, StreamExt};
use serde::{Deserialize, Serialize};

use super::{ApiError, Client, UpstreamError};

/// Reply increments in arrival order.
pub type TextStream = BoxStream<'static, Result<String, UpstreamError>>;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ContentRole {
    User,
    Model,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Part {
    #[serde(default)]
    pub text: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Content {
    pub role: ContentRole,
    pub parts: Vec<Part>,
}

impl Content {
    pub fn text(role: ContentRole, text: impl Into<String>) -> Self {
        Self {
            role,
            parts: vec![Part { text: text.into() }],
        }
    }
}

#[derive(Serialize, Debug, Clone)]
struct SystemInstruction {
    parts: Vec<Part>,
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    system_instruction: SystemInstruction,
    contents: Vec<Content>,
}

impl GenerateRequest {
    /// `history` is the prior turns; `message` is the user turn to answer.
    pub fn new(system_instruction: &str, history: Vec<Content>, message: String) -> Self {
        let mut contents = history;
        contents.push(Content::text(ContentRole::User, message));

        Self {
            system_instruction: SystemInstruction {
                parts: vec![Part {
                    text: system_instruction.to_owned(),
                }],
            },
            contents,
        }
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize, Debug, Clone)]
struct Candidate {
    #[serde(default)]
    content: CandidateContent,
}

#[derive(Deserialize, Debug, Clone, Default)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

impl GenerateResponse {
    fn text(&self) -> String {
        self.candidates
            .first()
            .map(|candidate| {
                candidate
                    .content
                    .parts
                    .iter()
                    .map(|part| part.text.as_str())
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[derive(Deserialize, Debug)]
struct StreamError {
    error: ApiError,
}

/// Decodes one SSE `data:` payload into the text it adds. Metadata-only
/// events decode to an empty string.
pub(crate) fn parse_event(data: &str) -> Result<String, UpstreamError> {
    if let Ok(StreamError { error }) = serde_json::from_str::<StreamError>(data) {
        return Err(UpstreamError::from_api(500, error));
    }

    let response: GenerateResponse =
        serde_json::from_str(data).map_err(|err| UpstreamError::Decode(err.to_string()))?;

    Ok(response.text())
}

impl Client {
    /// Starts a streamed generation. Resolves once the provider has accepted
    /// the request; HTTP-level failures surface here rather than in the
    /// stream.
    pub async fn stream_generate(
        &self,
        request: &GenerateRequest,
    ) -> Result<TextStream, UpstreamError> {
        let url = format!(
            "{}/models/{}:streamGenerateContent?alt=sse",
            self.api_base, self.model
        );

        let response = self.http.post(url).json(request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UpstreamError::from_response(status.as_u16(), &body));
        }

        let stream = response
            .bytes_stream()
            .eventsource()
            .map(|event| match event {
                Ok(event) => parse_event(&event.data),
                Err(err) => Err(UpstreamError::Stream(err.to_string())),
            });

        Ok(stream.boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_uses_provider_field_names() {
        let request = GenerateRequest::new(
            "be kind",
            vec![
                Content::text(ContentRole::User, "hi"),
                Content::text(ContentRole::Model, "hello"),
            ],
            "how are you".to_owned(),
        );

        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["systemInstruction"]["parts"][0]["text"], "be kind");
        assert_eq!(json["contents"][1]["role"], "model");
        assert_eq!(json["contents"][2]["role"], "user");
        assert_eq!(json["contents"][2]["parts"][0]["text"], "how are you");
    }

    #[test]
    fn event_text_joins_first_candidate_parts() {
        let data = r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"Hel"},{"text":"lo"}]}}]}"#;

        assert_eq!(parse_event(data).unwrap(), "Hello");
    }

    #[test]
    fn usage_only_event_is_empty() {
        let data = r#"{"usageMetadata":{"promptTokenCount":3},"modelVersion":"x"}"#;

        assert_eq!(parse_event(data).unwrap(), "");
    }

    #[test]
    fn error_event_is_classified() {
        let data = r#"{"error":{"code":429,"message":"quota","status":"RESOURCE_EXHAUSTED"}}"#;

        assert!(parse_event(data).unwrap_err().is_rate_limited());
    }

    #[test]
    fn garbage_event_is_a_decode_error() {
        assert!(matches!(
            parse_event("not json"),
            Err(UpstreamError::Decode(_))
        ));
    }
}
