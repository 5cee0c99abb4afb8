//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use booking::{BookingError, ErrorKind};
use common::IdError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Error reported by the booking engine.
    Booking(BookingError),
    /// Malformed request that never reached the engine.
    BadRequest(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Booking(err) => match err.kind() {
                ErrorKind::NotFound => StatusCode::NOT_FOUND,
                ErrorKind::Conflict => StatusCode::CONFLICT,
                ErrorKind::Expired => StatusCode::GONE,
                ErrorKind::Unauthorized => StatusCode::FORBIDDEN,
                ErrorKind::Validation => match err {
                    BookingError::InvalidAgeCategory(_) => StatusCode::UNPROCESSABLE_ENTITY,
                    _ => StatusCode::BAD_REQUEST,
                },
                ErrorKind::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            },
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            ApiError::Booking(err) => {
                if err.kind() == ErrorKind::Unavailable {
                    tracing::warn!(error = %err, "booking engine unavailable");
                }
                let mut body = serde_json::json!({
                    "error": err.to_string(),
                    "code": err.code(),
                });
                if let Some(seat_ids) = err.seat_ids() {
                    body["seat_ids"] = serde_json::json!(seat_ids);
                }
                body
            }
            ApiError::BadRequest(msg) => serde_json::json!({
                "error": msg,
                "code": "INVALID_REQUEST",
            }),
        };

        (status, axum::Json(body)).into_response()
    }
}

impl From<BookingError> for ApiError {
    fn from(err: BookingError) -> Self {
        ApiError::Booking(err)
    }
}

impl From<IdError> for ApiError {
    fn from(err: IdError) -> Self {
        ApiError::Booking(err.into())
    }
}
