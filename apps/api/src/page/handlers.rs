//! Axum route handlers for the server-rendered review page.

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, State},
    http::HeaderMap,
    response::Html,
    Form,
};
use serde::Deserialize;
use tracing::{debug, warn};

use super::render::render_page;
use crate::errors::AppError;
use crate::rate_limit::{caller_identity, RateLimitDecision};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PageForm {
    #[serde(default)]
    pub review: String,
    /// Present (as "on") when the dark-mode checkbox is ticked.
    pub dark: Option<String>,
    /// "theme" when the submit came from the dark-mode toggle.
    pub intent: Option<String>,
}

/// GET /
///
/// Renders the caller's open page, or an empty one.
pub async fn handle_page(
    State(state): State<AppState>,
    headers: HeaderMap,
    connect_info: Option<ConnectInfo<SocketAddr>>,
) -> Html<String> {
    let caller = caller_identity(
        &headers,
        connect_info.map(|ConnectInfo(addr)| addr),
        state.config.trust_forwarded_for,
    );
    Html(render_page(&state.pages.snapshot_for(&caller)))
}

/// POST /
///
/// Applies the submitted form to the caller's page and, unless the submit
/// only toggled the theme, runs one summarize before rendering. A submit
/// arriving while the page already has a call in flight renders the loading
/// view instead of starting a second call.
pub async fn handle_page_submit(
    State(state): State<AppState>,
    headers: HeaderMap,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    Form(form): Form<PageForm>,
) -> Html<String> {
    let caller = caller_identity(
        &headers,
        connect_info.map(|ConnectInfo(addr)| addr),
        state.config.trust_forwarded_for,
    );
    let page = state.pages.page_for(&caller);
    page.set_dark_mode(form.dark.is_some());
    page.edit_review(form.review);

    let wants_summary = form.intent.as_deref() != Some("theme");
    let snapshot = page.snapshot();
    if wants_summary && snapshot.loading() {
        debug!("Summarize already in flight for {caller}");
    } else if wants_summary && snapshot.can_submit() {
        match state.summarize_limiter.check(&caller) {
            RateLimitDecision::Allowed { .. } => {
                if let Err(rejected) = page.summarize().await {
                    debug!("Page summarize rejected for {caller}: {rejected}");
                }
            }
            RateLimitDecision::Limited { retry_after } => {
                warn!("Page summarize rate limit exceeded for {caller}");
                page.show_error(AppError::TooManyRequests { retry_after }.to_string());
            }
        }
    }

    Html(render_page(&page.snapshot()))
}
