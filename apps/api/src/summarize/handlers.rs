//! Axum route handler for the summarize proxy.

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, State},
    http::HeaderMap,
    Json,
};
use bytes::Bytes;
use tracing::warn;

use super::SummaryOutcome;
use crate::errors::AppError;
use crate::rate_limit::{caller_identity, RateLimitDecision};
use crate::routes::review_from_body;
use crate::state::AppState;

/// POST /api/v1/summarize
///
/// Runs the summarizer server-side so the model credential never reaches
/// the browser. Request body: `{"review": "<text>"}`.
pub async fn handle_summarize(
    State(state): State<AppState>,
    headers: HeaderMap,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    body: Bytes,
) -> Result<Json<SummaryOutcome>, AppError> {
    let caller = caller_identity(
        &headers,
        connect_info.map(|ConnectInfo(addr)| addr),
        state.config.trust_forwarded_for,
    );
    if let RateLimitDecision::Limited { retry_after } = state.summarize_limiter.check(&caller) {
        warn!("Summarize rate limit exceeded for {caller}");
        return Err(AppError::TooManyRequests { retry_after });
    }

    let review = review_from_body(&body).ok_or(AppError::InvalidReview)?;
    let outcome = state.summarizer.summarize(&review).await?;

    Ok(Json(outcome))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
        Router,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::lexicon::AfinnScorer;
    use crate::rate_limit::RateLimitConfig;
    use crate::routes::build_router;
    use crate::state::testing::{state_with, state_with_model};
    use crate::summarize::testing::{ScriptedModel, NEUTRAL_REPLY, POSITIVE_REPLY};

    fn request(body: &str) -> Request<Body> {
        Request::post("/api/v1/summarize")
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-forwarded-for", "192.0.2.10")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn send(router: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_summarize_returns_summary_and_lexicon() {
        let router = build_router(state_with_model(Arc::new(ScriptedModel::replying(
            POSITIVE_REPLY,
        ))));

        let (status, body) = send(router, request(r#"{"review": "I love it"}"#)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["summary"]["overallSentiment"], "POSITIVE");
        assert_eq!(body["summary"]["positiveWords"], json!(["love", "powerful"]));
        assert_eq!(body["lexicon"]["score"], 3);
    }

    #[tokio::test]
    async fn test_blank_review_is_rejected_without_model_call() {
        let model = Arc::new(ScriptedModel::replying(NEUTRAL_REPLY));
        let router = build_router(state_with_model(model.clone()));

        let (status, body) = send(router, request(r#"{"review": "  "}"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "Invalid review text" }));
        assert_eq!(model.call_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_summary_is_bad_gateway() {
        let router = build_router(state_with_model(Arc::new(ScriptedModel::replying(
            r#"{"overallSentiment": "POSITIVE"}"#,
        ))));

        let (status, body) = send(router, request(r#"{"review": "ok"}"#)).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body, json!({ "error": "Failed to generate summary" }));
    }

    #[tokio::test]
    async fn test_model_failure_hides_upstream_detail() {
        let router = build_router(state_with_model(Arc::new(ScriptedModel::failing(401))));

        let (status, body) = send(router, request(r#"{"review": "ok"}"#)).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(
            body,
            json!({ "error": "An error occurred while analyzing the review" })
        );
    }

    #[tokio::test]
    async fn test_summarize_is_rate_limited() {
        let model = Arc::new(ScriptedModel::replying(NEUTRAL_REPLY));
        let router = build_router(state_with(
            model.clone(),
            Arc::new(AfinnScorer::new()),
            RateLimitConfig {
                window: Duration::from_secs(60),
                max: 1,
            },
        ));

        let (status, _) = send(router.clone(), request(r#"{"review": "ok"}"#)).await;
        assert_eq!(status, StatusCode::OK);
        let (status, body) = send(router, request(r#"{"review": "ok"}"#)).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body, json!({ "error": "Too Many Requests" }));
        assert_eq!(model.call_count(), 1);
    }

    #[tokio::test]
    async fn test_get_is_method_not_allowed() {
        let router = build_router(state_with_model(Arc::new(ScriptedModel::replying(
            NEUTRAL_REPLY,
        ))));

        let (status, body) = send(
            router,
            Request::get("/api/v1/summarize").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(body, json!({ "error": "Method Not Allowed" }));
    }
}
