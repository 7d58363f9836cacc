//! Error types for the Bookshelf service.

use std::time::Duration;

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Body detail returned to callers that exceed their quota.
pub const RATE_LIMIT_DETAIL: &str = "Rate limit exceeded. Please try again in a minute.";

/// Main error type for Bookshelf operations.
#[derive(Error, Debug)]
pub enum BookshelfError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// The caller has used up its quota for the current window
    #[error("Rate limit exceeded, retry after {retry_after:?}")]
    RateLimitExceeded { retry_after: Duration },

    /// No book with the given id
    #[error("Book {0} not found")]
    NotFound(u64),

    /// HTTP server errors
    #[error("Server error: {0}")]
    Server(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<config::ConfigError> for BookshelfError {
    fn from(err: config::ConfigError) -> Self {
        BookshelfError::Config(err.to_string())
    }
}

/// Result type alias for Bookshelf operations.
pub type Result<T> = std::result::Result<T, BookshelfError>;

/// Whole seconds a client should wait, rounded up and never zero.
pub fn retry_after_secs(retry_after: Duration) -> u64 {
    let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
    secs.max(1)
}

impl IntoResponse for BookshelfError {
    fn into_response(self) -> Response {
        match self {
            BookshelfError::RateLimitExceeded { retry_after } => {
                let mut response = (
                    StatusCode::TOO_MANY_REQUESTS,
                    Json(json!({ "detail": RATE_LIMIT_DETAIL })),
                )
                    .into_response();
                response.headers_mut().insert(
                    header::RETRY_AFTER,
                    HeaderValue::from(retry_after_secs(retry_after)),
                );
                response
            }
            BookshelfError::NotFound(_) => (
                StatusCode::NOT_FOUND,
                Json(json!({ "detail": "Book not found" })),
            )
                .into_response(),
            other => {
                tracing::error!(error = %other, "Request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "detail": "Internal server error" })),
                )
                    .into_response()
            }
        }
    }
}
