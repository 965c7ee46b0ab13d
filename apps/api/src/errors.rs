use std::time::Duration;

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::lexicon::ScoreError;
use crate::summarize::SummarizeError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
/// Every variant renders as `{"error": "<message>"}`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Method Not Allowed")]
    MethodNotAllowed,

    #[error("Too Many Requests")]
    TooManyRequests { retry_after: Duration },

    #[error("Invalid review text")]
    InvalidReview,

    #[error("{0}")]
    Summarize(#[from] SummarizeError),

    #[error("Scorer error: {0}")]
    Scorer(#[from] ScoreError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::MethodNotAllowed => (StatusCode::METHOD_NOT_ALLOWED, self.to_string()),
            AppError::TooManyRequests { .. } => (StatusCode::TOO_MANY_REQUESTS, self.to_string()),
            AppError::InvalidReview => (StatusCode::BAD_REQUEST, self.to_string()),
            AppError::Summarize(e) => {
                tracing::error!("Summarize error: {e:?}");
                (StatusCode::BAD_GATEWAY, e.to_string())
            }
            AppError::Scorer(e) => {
                tracing::error!("Sentiment analysis error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
        };

        let mut response = (status, Json(json!({ "error": message }))).into_response();

        if let AppError::TooManyRequests { retry_after } = &self {
            // Round up so clients never retry a moment too early.
            let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
            if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }

        response
    }
}
