mod config;
mod errors;
mod lexicon;
mod llm_client;
mod page;
mod rate_limit;
mod routes;
mod state;
mod summarize;

use anyhow::Result;
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use std::sync::Arc;

use crate::config::Config;
use crate::lexicon::{AfinnScorer, LexiconScorer};
use crate::llm_client::LlmClient;
use crate::page::sessions::PageSessions;
use crate::rate_limit::RateLimiter;
use crate::routes::build_router;
use crate::state::AppState;
use crate::summarize::proxy::ProxySummaryClient;
use crate::summarize::{Summarizer, SummarySource};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Review Lens v{}", env!("CARGO_PKG_VERSION"));

    // Initialize LLM client
    let llm = LlmClient::new(
        config.gemini_api_key.clone(),
        config.gemini_model.clone(),
        config.gemini_timeout,
    );
    info!("LLM client initialized (model: {})", llm.model());

    let scorer: Arc<dyn LexiconScorer> = Arc::new(AfinnScorer::new());
    let summarizer: Arc<dyn SummarySource> =
        Arc::new(Summarizer::new(Arc::new(llm), scorer.clone()));

    // Page submits go to a remote proxy when one is configured
    let page_source: Arc<dyn SummarySource> = match &config.summarize_upstream_url {
        Some(url) => {
            info!("Review page summarizes via upstream proxy at {url}");
            Arc::new(ProxySummaryClient::new(url.clone(), config.gemini_timeout))
        }
        None => summarizer.clone(),
    };
    let pages = Arc::new(PageSessions::new(page_source));

    let analyze_limiter = Arc::new(RateLimiter::new(config.rate_limit));
    let summarize_limiter = Arc::new(RateLimiter::new(config.rate_limit));
    info!(
        "Rate limit: {} requests per {}ms per caller",
        config.rate_limit.max,
        config.rate_limit.window.as_millis()
    );
    spawn_pruning(
        vec![analyze_limiter.clone(), summarize_limiter.clone()],
        pages.clone(),
    );

    // Build app state
    let state = AppState {
        config: config.clone(),
        scorer,
        summarizer,
        pages,
        analyze_limiter,
        summarize_limiter,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the page is served from a fixed host

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    Ok(())
}

/// Periodically forgets callers with no hits left in the window, and review
/// pages idle for longer than that window.
fn spawn_pruning(limiters: Vec<Arc<RateLimiter>>, pages: Arc<PageSessions>) {
    let Some(period) = limiters.iter().map(|l| l.window()).min() else {
        return;
    };
    if period.is_zero() {
        return;
    }
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            for limiter in &limiters {
                limiter.prune();
            }
            pages.prune(period);
        }
    });
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
