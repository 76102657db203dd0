//! Error-to-HTTP response conversion.
//!
//! Handlers return `Result<T, AppError>`; any [`reelhouse_common::Error`]
//! converts with `?`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use reelhouse_common::Error;
use serde_json::json;

/// Wrapper so we can implement `IntoResponse` for an external type.
pub struct AppError {
    inner: Error,
}

impl AppError {
    pub fn new(inner: Error) -> Self {
        Self { inner }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(Error::invalid_input(msg))
    }
}

impl From<Error> for AppError {
    fn from(e: Error) -> Self {
        Self::new(e)
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(e: tokio::task::JoinError) -> Self {
        Self::new(Error::internal(format!("background task failed: {e}")))
    }
}

fn code_for(error: &Error) -> &'static str {
    match error {
        Error::NotFound(_) => "not_found",
        Error::InvalidInput(_) => "invalid_input",
        Error::Unavailable(_) => "unavailable",
        Error::Database(_) => "database_error",
        Error::Io(_) => "io_error",
        Error::Transcode(_) => "transcode_failed",
        Error::Internal(_) => "internal_error",
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.inner.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!(
                status = %status,
                error = %self.inner,
                "Server error in API handler"
            );
        }

        let body = json!({
            "error": self.inner.to_string(),
            "code": code_for(&self.inner),
        });

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_produces_404() {
        let response = AppError::new(Error::not_found("movie")).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn transcode_failure_produces_500() {
        let response = AppError::new(Error::transcode("both attempts failed")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn busy_encoder_produces_503() {
        let response = AppError::new(Error::unavailable("busy")).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn codes_are_stable() {
        assert_eq!(code_for(&Error::invalid_input("x")), "invalid_input");
        assert_eq!(code_for(&Error::transcode("x")), "transcode_failed");
    }
}
