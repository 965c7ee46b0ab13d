//! Axum route handler for the local review endpoint.

use std::net::SocketAddr;

use axum::{
    body::to_bytes,
    extract::{ConnectInfo, Request, State},
    http::Method,
    response::IntoResponse,
    Json,
};
use tracing::{info, warn};

use crate::errors::AppError;
use crate::lexicon::score_blocking;
use crate::rate_limit::{caller_identity, RateLimitDecision};
use crate::routes::{review_from_body, MAX_BODY_BYTES};
use crate::state::AppState;

/// /api/analyze
///
/// Received → method check → rate limit → body validation → score. Each
/// check exits early; the body is not read until the first two pass.
pub async fn handle_analyze(
    State(state): State<AppState>,
    request: Request,
) -> Result<impl IntoResponse, AppError> {
    let (parts, body) = request.into_parts();
    info!("Analyze request received: {} {}", parts.method, parts.uri);

    if parts.method != Method::POST {
        return Err(AppError::MethodNotAllowed);
    }

    let peer = parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let caller = caller_identity(&parts.headers, peer, state.config.trust_forwarded_for);

    let remaining = match state.analyze_limiter.check(&caller) {
        RateLimitDecision::Allowed { remaining } => remaining,
        RateLimitDecision::Limited { retry_after } => {
            warn!("Rate limit exceeded for {caller}");
            return Err(AppError::TooManyRequests { retry_after });
        }
    };

    let bytes = to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|_| AppError::InvalidReview)?;
    let review = review_from_body(&bytes).ok_or(AppError::InvalidReview)?;

    let result = score_blocking(state.scorer.clone(), review).await?;

    Ok((
        [
            ("x-ratelimit-limit", state.analyze_limiter.limit().to_string()),
            ("x-ratelimit-remaining", remaining.to_string()),
        ],
        Json(result),
    ))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
        Router,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::lexicon::{AfinnScorer, LexiconScore, LexiconScorer, ScoreError};
    use crate::rate_limit::RateLimitConfig;
    use crate::routes::build_router;
    use crate::state::testing::state_with;
    use crate::summarize::testing::{ScriptedModel, NEUTRAL_REPLY};

    #[derive(Default)]
    struct CountingScorer {
        calls: AtomicUsize,
        fail: bool,
    }

    impl LexiconScorer for CountingScorer {
        fn analyze(&self, text: &str) -> Result<LexiconScore, ScoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(ScoreError::Failed("lexicon unavailable".to_string()));
            }
            AfinnScorer::new().analyze(text)
        }
    }

    fn router(scorer: Arc<CountingScorer>, max: u32) -> Router {
        build_router(state_with(
            Arc::new(ScriptedModel::replying(NEUTRAL_REPLY)),
            scorer,
            RateLimitConfig {
                window: Duration::from_secs(900),
                max,
            },
        ))
    }

    fn post(body: &str, ip: &str) -> Request<Body> {
        Request::post("/api/analyze")
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-forwarded-for", ip)
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_valid_review_returns_score_breakdown() {
        let scorer = Arc::new(CountingScorer::default());
        let router = router(scorer.clone(), 100);

        let response = router
            .clone()
            .oneshot(post(
                r#"{"review": "This product is great but shipping was terrible"}"#,
                "198.51.100.1",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-ratelimit-limit"], "100");
        assert_eq!(response.headers()["x-ratelimit-remaining"], "99");

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(
            body,
            json!({
                "score": 0,
                "comparative": 0.0,
                "positive": ["great"],
                "negative": ["terrible"]
            })
        );
        assert_eq!(scorer.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_non_post_is_rejected_before_limiter_and_body() {
        let scorer = Arc::new(CountingScorer::default());
        let router = router(scorer.clone(), 1);

        for method in ["GET", "PUT", "DELETE"] {
            let request = Request::builder()
                .method(method)
                .uri("/api/analyze")
                .header("x-forwarded-for", "198.51.100.2")
                .body(Body::from("not even json"))
                .unwrap();
            let (status, body) = send(&router, request).await;
            assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
            assert_eq!(body, json!({ "error": "Method Not Allowed" }));
        }

        // The limiter budget of 1 is still unused.
        let (status, _) = send(&router, post(r#"{"review": "good"}"#, "198.51.100.2")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(scorer.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invalid_review_never_reaches_scorer() {
        let scorer = Arc::new(CountingScorer::default());
        let router = router(scorer.clone(), 100);

        for body in [
            r#"{}"#,
            r#"{"review": 42}"#,
            r#"{"review": null}"#,
            r#"{"review": ["good"]}"#,
            r#"{"review": ""}"#,
            r#"{"review": "   \n\t "}"#,
            "review=good",
            "",
        ] {
            let (status, value) = send(&router, post(body, "198.51.100.3")).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "body: {body}");
            assert_eq!(value, json!({ "error": "Invalid review text" }));
        }
        assert_eq!(scorer.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_rate_limit_rejects_before_validation_and_scoring() {
        let scorer = Arc::new(CountingScorer::default());
        let router = router(scorer.clone(), 2);

        for _ in 0..2 {
            let (status, _) = send(&router, post(r#"{"review": "good"}"#, "198.51.100.4")).await;
            assert_eq!(status, StatusCode::OK);
        }

        let response = router
            .clone()
            .oneshot(post(r#"{"review": ""}"#, "198.51.100.4"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(response.headers().contains_key(header::RETRY_AFTER));
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body, json!({ "error": "Too Many Requests" }));
        assert_eq!(scorer.calls.load(Ordering::SeqCst), 2);

        // Another caller still has its own budget.
        let (status, _) = send(&router, post(r#"{"review": "good"}"#, "198.51.100.5")).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_scorer_failure_is_generic_500() {
        let scorer = Arc::new(CountingScorer {
            fail: true,
            ..Default::default()
        });
        let router = router(scorer, 100);

        let (status, body) = send(&router, post(r#"{"review": "good"}"#, "198.51.100.6")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "error": "Internal Server Error" }));
    }
}
