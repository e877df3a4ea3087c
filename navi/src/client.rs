use futures::{stream, StreamExt};
use miette::{Context, IntoDiagnostic, Result};
use shared::{ChatRequest, ChatTransport, ChunkStream, Message, TransportError, Utf8Decoder};

use crate::APP_USER_AGENT;

/// Talks to a running chat relay over HTTP.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
    url: String,
}

impl HttpTransport {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(APP_USER_AGENT)
            .build()
            .into_diagnostic()
            .wrap_err("Could not build reqwest client")?;

        Ok(Self {
            http,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait::async_trait(?Send)]
impl ChatTransport for HttpTransport {
    async fn send(&self, messages: &[Message]) -> Result<ChunkStream, TransportError> {
        let body = ChatRequest {
            messages: messages.to_vec(),
        };

        let response = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|err| TransportError::Network(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::from_status(status.as_u16()));
        }

        let body = response.bytes_stream().boxed_local();
        let chunks = stream::unfold(Some((body, Utf8Decoder::new())), |state| async move {
            let (mut body, mut decoder) = state?;

            match body.next().await {
                Some(Ok(bytes)) => {
                    let text = decoder.push(&bytes);
                    Some((Ok(text), Some((body, decoder))))
                }
                Some(Err(err)) => Some((Err(TransportError::Network(err.to_string())), None)),
                // A sequence cut off by the end of the body still surfaces.
                None => Some((Ok(decoder.finish()), None)),
            }
        });

        Ok(chunks.boxed_local())
    }
}
