use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::header::{self, HeaderName, HeaderValue};
use axum::response::{IntoResponse, Response};
use futures::{StreamExt, TryStreamExt};
use navi::relay;
use navi::Persona;

use crate::error::ApiError;
use crate::AppState;

const TEXT_PLAIN_UTF8: &str = "text/plain; charset=utf-8";

/// `POST /api/<flow>`: relays the submitted history to the upstream model
/// and streams its reply back as plain text.
pub async fn chat(
    State(state): State<AppState>,
    persona: &'static Persona,
    body: Bytes,
) -> Result<Response, ApiError> {
    let messages = relay::parse_request(&body)?;
    let chat = relay::prepare(messages)?;
    let replies = relay::open_stream(state.upstream.as_ref(), persona, chat).await?;

    tracing::info!(flow = persona.slug(), "streaming reply");

    let slug = persona.slug();
    let chunks = replies
        .map_ok(Bytes::from)
        .inspect_err(move |err| {
            tracing::error!(flow = slug, error = %err, "upstream failed mid-stream, aborting reply");
        })
        .boxed();

    let headers = [
        (header::CONTENT_TYPE, HeaderValue::from_static(TEXT_PLAIN_UTF8)),
        (header::CACHE_CONTROL, HeaderValue::from_static("no-cache")),
        (
            HeaderName::from_static("x-accel-buffering"),
            HeaderValue::from_static("no"),
        ),
    ];

    Ok((headers, Body::from_stream(chunks)).into_response())
}

pub async fn health() -> &'static str {
    "ok"
}
