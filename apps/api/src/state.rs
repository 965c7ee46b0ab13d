use std::sync::Arc;

use crate::config::Config;
use crate::lexicon::LexiconScorer;
use crate::page::sessions::PageSessions;
use crate::rate_limit::RateLimiter;
use crate::summarize::SummarySource;

/// Shared application state injected into all route handlers via Axum extractors.
/// Every collaborator is constructed once in `main` and passed in here.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Lexicon scorer behind `/api/analyze`.
    pub scorer: Arc<dyn LexiconScorer>,
    /// Summarizer behind the proxy endpoint.
    pub summarizer: Arc<dyn SummarySource>,
    /// Open review pages, keyed by caller identity.
    pub pages: Arc<PageSessions>,
    pub analyze_limiter: Arc<RateLimiter>,
    pub summarize_limiter: Arc<RateLimiter>,
}

#[cfg(test)]
pub(crate) mod testing {
    use std::time::Duration;

    use super::*;
    use crate::lexicon::AfinnScorer;
    use crate::llm_client::GenerativeModel;
    use crate::rate_limit::RateLimitConfig;
    use crate::summarize::Summarizer;

    pub fn test_config(rate_limit: RateLimitConfig) -> Config {
        Config {
            gemini_api_key: "test-key".to_string(),
            gemini_model: "gemini-test".to_string(),
            gemini_timeout: Duration::from_secs(5),
            port: 0,
            rust_log: "debug".to_string(),
            rate_limit,
            trust_forwarded_for: true,
            summarize_upstream_url: None,
        }
    }

    pub fn state_with(
        model: Arc<dyn GenerativeModel>,
        scorer: Arc<dyn LexiconScorer>,
        rate_limit: RateLimitConfig,
    ) -> AppState {
        let summarizer: Arc<dyn SummarySource> = Arc::new(Summarizer::new(model, scorer.clone()));
        AppState {
            config: test_config(rate_limit),
            scorer,
            pages: Arc::new(PageSessions::new(summarizer.clone())),
            summarizer,
            analyze_limiter: Arc::new(RateLimiter::new(rate_limit)),
            summarize_limiter: Arc::new(RateLimiter::new(rate_limit)),
        }
    }

    pub fn state_with_model(model: Arc<dyn GenerativeModel>) -> AppState {
        state_with(model, Arc::new(AfinnScorer::new()), RateLimitConfig::default())
    }
}
