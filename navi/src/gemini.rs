use miette::{Context, Diagnostic, IntoDiagnostic, Result};
use reqwest::header::HeaderValue;
use serde::Deserialize;
use thiserror::Error;

use crate::APP_USER_AGENT;

pub mod generate;

pub const DEFAULT_MODEL: &str = "gemini-3-flash-preview";
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

const API_KEY_HEADER: &str = "x-goog-api-key";
const RESOURCE_EXHAUSTED: &str = "RESOURCE_EXHAUSTED";

#[derive(Debug, Clone)]
pub struct Config {
    api_key: String,
    pub model: String,
    pub api_base: String,
}

#[derive(Debug, Clone)]
pub struct Client {
    http: reqwest::Client,
    model: String,
    api_base: String,
}

impl Config {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_owned(),
            api_base: DEFAULT_API_BASE.to_owned(),
        }
    }

    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("GOOGLE_API_KEY")
            .into_diagnostic()
            .wrap_err("Could not find GOOGLE_API_KEY env var")?;

        let mut config = Self::new(api_key);
        if let Ok(model) = std::env::var("NAVI_MODEL") {
            config.model = model;
        }
        if let Ok(api_base) = std::env::var("NAVI_API_BASE") {
            config.api_base = api_base;
        }

        Ok(config)
    }

    pub fn client(&self) -> Result<Client> {
        let mut headers = reqwest::header::HeaderMap::new();

        let mut value = HeaderValue::from_str(&self.api_key)
            .into_diagnostic()
            .wrap_err("Could not create header value")?;
        value.set_sensitive(true);

        headers.insert(API_KEY_HEADER, value);

        let http = reqwest::Client::builder()
            .user_agent(APP_USER_AGENT)
            .default_headers(headers)
            .build()
            .into_diagnostic()
            .wrap_err("Could not build reqwest client")?;

        Ok(Client {
            http,
            model: self.model.clone(),
            api_base: self.api_base.trim_end_matches('/').to_owned(),
        })
    }
}

impl Client {
    pub fn model(&self) -> &str {
        &self.model
    }
}

#[derive(Error, Diagnostic, Debug)]
pub enum UpstreamError {
    #[error("upstream is rate limited: {message}")]
    RateLimited { message: String },
    #[error("upstream returned {status}: {message}")]
    Api { status: u16, message: String },
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
    #[error("could not decode upstream event: {0}")]
    Decode(String),
    #[error("upstream stream broke: {0}")]
    Stream(String),
}

#[derive(Deserialize, Debug)]
struct ErrorEnvelope {
    error: ApiError,
}

#[derive(Deserialize, Debug, Default)]
pub(crate) struct ApiError {
    #[serde(default)]
    code: Option<u16>,
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

impl UpstreamError {
    /// Builds an error from a non-success response. Rate limiting is read off
    /// the HTTP status and the provider's structured status code, never off
    /// the message text.
    pub(crate) fn from_response(status: u16, body: &str) -> Self {
        let error = serde_json::from_str::<ErrorEnvelope>(body)
            .map(|envelope| envelope.error)
            .unwrap_or_else(|_| ApiError {
                message: body.to_owned(),
                ..ApiError::default()
            });

        Self::from_api(status, error)
    }

    pub(crate) fn from_api(status: u16, error: ApiError) -> Self {
        let status = error.code.unwrap_or(status);
        let exhausted = error.status.as_deref() == Some(RESOURCE_EXHAUSTED);

        if status == 429 || exhausted {
            Self::RateLimited {
                message: error.message,
            }
        } else {
            Self::Api {
                status,
                message: error.message,
            }
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structured_status_marks_rate_limits() {
        let body = r#"{"error":{"code":429,"message":"Quota exceeded","status":"RESOURCE_EXHAUSTED"}}"#;
        assert!(UpstreamError::from_response(429, body).is_rate_limited());

        let body = r#"{"error":{"message":"slow down","status":"RESOURCE_EXHAUSTED"}}"#;
        assert!(UpstreamError::from_response(400, body).is_rate_limited());
    }

    #[test]
    fn message_text_alone_is_not_a_rate_limit() {
        let body = r#"{"error":{"code":500,"message":"rate of 429 quota","status":"INTERNAL"}}"#;
        let err = UpstreamError::from_response(500, body);

        assert!(!err.is_rate_limited());
        assert!(matches!(err, UpstreamError::Api { status: 500, .. }));
    }

    #[test]
    fn unparseable_body_keeps_http_status() {
        let err = UpstreamError::from_response(503, "<html>unavailable</html>");

        assert!(matches!(err, UpstreamError::Api { status: 503, .. }));
    }

    #[test]
    fn client_trims_trailing_slash_from_base() {
        let mut config = Config::new("key");
        config.api_base = "http://localhost:9999/v1beta/".to_owned();

        let client = config.client().unwrap();

        assert_eq!(client.api_base, "http://localhost:9999/v1beta");
        assert_eq!(client.model(), DEFAULT_MODEL);
    }
}
