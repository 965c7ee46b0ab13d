use std::time::Duration;

use anyhow::{Context, Result};

use crate::llm_client::DEFAULT_MODEL;
use crate::rate_limit::RateLimitConfig;

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    /// Model credential. Server-side only; never rendered into a page.
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub gemini_timeout: Duration,
    pub port: u16,
    pub rust_log: String,
    pub rate_limit: RateLimitConfig,
    pub trust_forwarded_for: bool,
    /// Base URL of a remote summarize proxy. When set, page submits go there
    /// instead of calling the model in-process.
    pub summarize_upstream_url: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            gemini_api_key: require_env("GEMINI_API_KEY")?,
            gemini_model: std::env::var("GEMINI_MODEL")
                .unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            gemini_timeout: Duration::from_secs(parse_env("GEMINI_TIMEOUT_SECS", 60)?),
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            rate_limit: RateLimitConfig {
                window: Duration::from_millis(parse_env("RATE_LIMIT_WINDOW_MS", 900_000)?),
                max: parse_env("RATE_LIMIT_MAX", 100)?,
            },
            trust_forwarded_for: parse_env("TRUST_FORWARDED_FOR", false)?,
            summarize_upstream_url: std::env::var("SUMMARIZE_UPSTREAM_URL")
                .ok()
                .filter(|v| !v.trim().is_empty()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => parse_value(key, &raw),
        Err(_) => Ok(default),
    }
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.trim()
        .parse::<T>()
        .with_context(|| format!("{key} has invalid value '{raw}'"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_value_accepts_numbers_and_bools() {
        assert_eq!(parse_value::<u16>("PORT", " 3000 ").unwrap(), 3000);
        assert_eq!(parse_value::<u64>("RATE_LIMIT_WINDOW_MS", "900000").unwrap(), 900_000);
        assert!(parse_value::<bool>("TRUST_FORWARDED_FOR", "true").unwrap());
    }

    #[test]
    fn test_parse_value_error_names_the_variable() {
        let err = parse_value::<u16>("PORT", "eighty").unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }

    #[test]
    fn test_missing_optional_uses_default() {
        let value: u32 = parse_env("REVIEW_LENS_TEST_UNSET_VARIABLE", 100).unwrap();
        assert_eq!(value, 100);
    }

    #[test]
    fn test_require_env_reports_missing_key() {
        let err = require_env("REVIEW_LENS_TEST_UNSET_KEY").unwrap_err();
        assert!(err.to_string().contains("REVIEW_LENS_TEST_UNSET_KEY"));
    }
}
