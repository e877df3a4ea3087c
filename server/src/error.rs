use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use navi::RelayError;
use shared::{ErrorBody, INTERNAL_ERROR, INVALID_REQUEST_ERROR, RATE_LIMITED_ERROR};

/// A relay failure that happened before any reply byte was sent. Only a
/// fixed message reaches the caller; the cause is logged.
#[derive(Debug)]
pub struct ApiError(pub RelayError);

impl From<RelayError> for ApiError {
    fn from(err: RelayError) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self.0 {
            RelayError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            RelayError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            RelayError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> &'static str {
        match self.0 {
            RelayError::InvalidRequest(_) => INVALID_REQUEST_ERROR,
            RelayError::RateLimited(_) => RATE_LIMITED_ERROR,
            RelayError::Upstream(_) => INTERNAL_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self.0 {
            RelayError::InvalidRequest(reason) => tracing::info!(%reason, "rejected chat request"),
            RelayError::RateLimited(source) => tracing::warn!(error = %source, "upstream rate limited"),
            RelayError::Upstream(source) => tracing::error!(error = %source, "upstream call failed"),
        }

        (self.status(), Json(ErrorBody::new(self.message()))).into_response()
    }
}
