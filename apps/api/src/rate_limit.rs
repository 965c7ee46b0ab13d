//! Per-caller sliding-window rate limiter.
//!
//! Each caller identity keeps a log of accepted request instants. A request is
//! admitted when fewer than `max` accepted requests fall inside the trailing
//! window. Rejected requests are not logged.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use axum::http::HeaderMap;
use dashmap::DashMap;
use tracing::debug;

#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    pub window: Duration,
    pub max: u32,
}

impl Default for RateLimitConfig {
    /// 100 requests per 15 minutes.
    fn default() -> Self {
        Self {
            window: Duration::from_millis(900_000),
            max: 100,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed { remaining: u32 },
    Limited { retry_after: Duration },
}

pub struct RateLimiter {
    config: RateLimitConfig,
    hits: DashMap<String, VecDeque<Instant>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            hits: DashMap::new(),
        }
    }

    pub fn limit(&self) -> u32 {
        self.config.max
    }

    pub fn window(&self) -> Duration {
        self.config.window
    }

    /// Records a hit for `key` if it is within budget.
    pub fn check(&self, key: &str) -> RateLimitDecision {
        self.check_at(key, Instant::now())
    }

    fn check_at(&self, key: &str, now: Instant) -> RateLimitDecision {
        let window = self.config.window;
        let mut log = self.hits.entry(key.to_string()).or_default();

        while let Some(oldest) = log.front() {
            if now.saturating_duration_since(*oldest) >= window {
                log.pop_front();
            } else {
                break;
            }
        }

        if log.len() >= self.config.max as usize {
            let retry_after = log
                .front()
                .map(|oldest| window.saturating_sub(now.saturating_duration_since(*oldest)))
                .unwrap_or(window);
            return RateLimitDecision::Limited { retry_after };
        }

        log.push_back(now);
        RateLimitDecision::Allowed {
            remaining: self.config.max - log.len() as u32,
        }
    }

    /// Drops callers whose whole log has aged out of the window.
    pub fn prune(&self) {
        self.prune_at(Instant::now());
    }

    fn prune_at(&self, now: Instant) {
        let window = self.config.window;
        let before = self.hits.len();
        self.hits.retain(|_, log| {
            log.back()
                .is_some_and(|newest| now.saturating_duration_since(*newest) < window)
        });
        debug!(
            "Rate limiter pruned {} idle callers",
            before.saturating_sub(self.hits.len())
        );
    }

    #[cfg(test)]
    fn tracked_callers(&self) -> usize {
        self.hits.len()
    }
}

/// Resolves the identity a request is rate limited under.
///
/// The first `X-Forwarded-For` entry is used only when `trust_forwarded` is
/// set; otherwise the peer IP. Falls back to `"unknown"`.
pub fn caller_identity(
    headers: &HeaderMap,
    peer: Option<SocketAddr>,
    trust_forwarded: bool,
) -> String {
    if trust_forwarded {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty());
        if let Some(ip) = forwarded {
            return ip.to_string();
        }
    }
    peer.map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn limiter(max: u32, window_secs: u64) -> RateLimiter {
        RateLimiter::new(RateLimitConfig {
            window: Duration::from_secs(window_secs),
            max,
        })
    }

    #[test]
    fn test_default_config_is_100_per_15_minutes() {
        let config = RateLimitConfig::default();
        assert_eq!(config.max, 100);
        assert_eq!(config.window, Duration::from_secs(15 * 60));
    }

    #[test]
    fn test_rejects_after_max_within_window() {
        let limiter = limiter(3, 60);
        let start = Instant::now();
        for i in 0..3 {
            assert_eq!(
                limiter.check_at("a", start + Duration::from_secs(i)),
                RateLimitDecision::Allowed { remaining: 2 - i as u32 }
            );
        }
        assert_eq!(
            limiter.check_at("a", start + Duration::from_secs(10)),
            RateLimitDecision::Limited {
                retry_after: Duration::from_secs(50)
            }
        );
    }

    #[test]
    fn test_admits_again_once_oldest_hit_leaves_window() {
        let limiter = limiter(2, 60);
        let start = Instant::now();
        limiter.check_at("a", start);
        limiter.check_at("a", start + Duration::from_secs(30));
        assert!(matches!(
            limiter.check_at("a", start + Duration::from_secs(59)),
            RateLimitDecision::Limited { .. }
        ));
        assert_eq!(
            limiter.check_at("a", start + Duration::from_secs(60)),
            RateLimitDecision::Allowed { remaining: 0 }
        );
    }

    #[test]
    fn test_rejected_requests_do_not_extend_the_window() {
        let limiter = limiter(1, 60);
        let start = Instant::now();
        limiter.check_at("a", start);
        for s in 1..60 {
            assert!(matches!(
                limiter.check_at("a", start + Duration::from_secs(s)),
                RateLimitDecision::Limited { .. }
            ));
        }
        assert!(matches!(
            limiter.check_at("a", start + Duration::from_secs(60)),
            RateLimitDecision::Allowed { .. }
        ));
    }

    #[test]
    fn test_identities_are_independent() {
        let limiter = limiter(1, 60);
        let now = Instant::now();
        assert!(matches!(limiter.check_at("a", now), RateLimitDecision::Allowed { .. }));
        assert!(matches!(limiter.check_at("b", now), RateLimitDecision::Allowed { .. }));
        assert!(matches!(limiter.check_at("a", now), RateLimitDecision::Limited { .. }));
    }

    #[test]
    fn test_zero_max_always_limits() {
        let limiter = limiter(0, 60);
        assert_eq!(
            limiter.check("a"),
            RateLimitDecision::Limited {
                retry_after: Duration::from_secs(60)
            }
        );
    }

    #[test]
    fn test_prune_drops_idle_callers() {
        let limiter = limiter(5, 60);
        let start = Instant::now();
        limiter.check_at("idle", start);
        limiter.check_at("active", start + Duration::from_secs(50));
        limiter.prune_at(start + Duration::from_secs(70));
        assert_eq!(limiter.tracked_callers(), 1);
    }

    #[test]
    fn test_caller_identity_prefers_peer_by_default() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.9"));
        let peer: SocketAddr = "10.0.0.1:4000".parse().unwrap();
        assert_eq!(caller_identity(&headers, Some(peer), false), "10.0.0.1");
    }

    #[test]
    fn test_caller_identity_uses_first_forwarded_entry_when_trusted() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.9, 10.0.0.2"),
        );
        let peer: SocketAddr = "10.0.0.1:4000".parse().unwrap();
        assert_eq!(caller_identity(&headers, Some(peer), true), "203.0.113.9");
    }

    #[test]
    fn test_caller_identity_unknown_without_peer() {
        assert_eq!(caller_identity(&HeaderMap::new(), None, true), "unknown");
    }
}
