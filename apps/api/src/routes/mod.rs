pub mod health;

use axum::{
    routing::{any, get, post},
    Router,
};
use serde_json::Value;

use crate::errors::AppError;
use crate::lexicon::handlers as analyze;
use crate::page::handlers as page;
use crate::state::AppState;
use crate::summarize::handlers as summarize;

/// Largest request body the JSON endpoints will read.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

async fn method_not_allowed() -> Result<(), AppError> {
    Err(AppError::MethodNotAllowed)
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Review page
        .route("/", get(page::handle_page).post(page::handle_page_submit))
        // Local review endpoint
        .route("/api/analyze", any(analyze::handle_analyze))
        // Model proxy
        .route(
            "/api/v1/summarize",
            post(summarize::handle_summarize).fallback(method_not_allowed),
        )
        .with_state(state)
}

/// Extracts a non-blank string `review` from a JSON body. Anything else,
/// including a body that is not JSON, yields `None`.
pub fn review_from_body(body: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(body).ok()?;
    value
        .get("review")?
        .as_str()
        .filter(|r| !r.trim().is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_review_from_body_keeps_raw_text() {
        assert_eq!(
            review_from_body(br#"{"review": "  great  "}"#).as_deref(),
            Some("  great  ")
        );
    }

    #[test]
    fn test_review_from_body_rejects_invalid_shapes() {
        assert!(review_from_body(b"").is_none());
        assert!(review_from_body(b"\"great\"").is_none());
        assert!(review_from_body(br#"{"review": true}"#).is_none());
        assert!(review_from_body(br#"{"review": " "}"#).is_none());
        assert!(review_from_body(br#"{"text": "great"}"#).is_none());
    }
}
