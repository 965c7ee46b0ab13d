//! Open review pages, one per caller identity.
//!
//! A page outlives the request that rendered it, so its in-flight ticket and
//! generation counter guard every submit coming from the same caller.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::debug;

use super::controller::ReviewPage;
use super::state::UiState;
use crate::summarize::SummarySource;

struct Session {
    page: Arc<ReviewPage>,
    last_seen: Instant,
}

pub struct PageSessions {
    source: Arc<dyn SummarySource>,
    sessions: DashMap<String, Session>,
}

impl PageSessions {
    pub fn new(source: Arc<dyn SummarySource>) -> Self {
        Self {
            source,
            sessions: DashMap::new(),
        }
    }

    /// Returns the caller's page, opening a fresh one on first use.
    pub fn page_for(&self, caller: &str) -> Arc<ReviewPage> {
        self.page_at(caller, Instant::now())
    }

    fn page_at(&self, caller: &str, now: Instant) -> Arc<ReviewPage> {
        let mut session = self
            .sessions
            .entry(caller.to_string())
            .or_insert_with(|| Session {
                page: Arc::new(ReviewPage::new(self.source.clone())),
                last_seen: now,
            });
        session.last_seen = now;
        session.page.clone()
    }

    /// Current state of the caller's page without opening one.
    pub fn snapshot_for(&self, caller: &str) -> UiState {
        self.sessions
            .get(caller)
            .map(|session| session.page.snapshot())
            .unwrap_or_default()
    }

    /// Forgets pages untouched for `idle` that have no call in flight.
    pub fn prune(&self, idle: Duration) {
        self.prune_at(idle, Instant::now());
    }

    fn prune_at(&self, idle: Duration, now: Instant) {
        let before = self.sessions.len();
        self.sessions.retain(|_, session| {
            now.saturating_duration_since(session.last_seen) < idle
                || session.page.snapshot().loading()
        });
        debug!(
            "Pruned {} idle review pages",
            before.saturating_sub(self.sessions.len())
        );
    }

    #[cfg(test)]
    fn open_pages(&self) -> usize {
        self.sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::Notify;

    use super::*;
    use crate::lexicon::AfinnScorer;
    use crate::summarize::testing::{ScriptedModel, POSITIVE_REPLY};
    use crate::summarize::Summarizer;

    fn sessions_with(model: Arc<ScriptedModel>) -> PageSessions {
        PageSessions::new(Arc::new(Summarizer::new(
            model,
            Arc::new(AfinnScorer::new()),
        )))
    }

    #[test]
    fn test_same_caller_gets_same_page() {
        let sessions = sessions_with(Arc::new(ScriptedModel::replying(POSITIVE_REPLY)));
        let first = sessions.page_for("192.0.2.1");
        let again = sessions.page_for("192.0.2.1");
        let other = sessions.page_for("192.0.2.2");

        assert!(Arc::ptr_eq(&first, &again));
        assert!(!Arc::ptr_eq(&first, &other));
        assert_eq!(sessions.open_pages(), 2);
    }

    #[test]
    fn test_snapshot_for_unknown_caller_is_empty() {
        let sessions = sessions_with(Arc::new(ScriptedModel::replying(POSITIVE_REPLY)));
        let state = sessions.snapshot_for("192.0.2.1");
        assert!(state.review().is_empty());
        assert_eq!(sessions.open_pages(), 0);
    }

    #[test]
    fn test_prune_drops_idle_pages() {
        let sessions = sessions_with(Arc::new(ScriptedModel::replying(POSITIVE_REPLY)));
        let start = Instant::now();
        sessions.page_at("old", start);
        sessions.page_at("fresh", start + Duration::from_secs(50));

        sessions.prune_at(Duration::from_secs(30), start + Duration::from_secs(60));
        assert_eq!(sessions.open_pages(), 1);
        assert!(sessions.sessions.contains_key("fresh"));
    }

    #[tokio::test]
    async fn test_prune_keeps_page_with_call_in_flight() {
        let gate = Arc::new(Notify::new());
        let model = Arc::new(ScriptedModel::replying(POSITIVE_REPLY).gated(gate.clone()));
        let sessions = sessions_with(model.clone());
        let page = sessions.page_for("busy");
        page.edit_review("I love it");

        let pending = tokio::spawn({
            let page = page.clone();
            async move { page.summarize().await }
        });
        while model.call_count() == 0 {
            tokio::task::yield_now().await;
        }

        sessions.prune_at(Duration::ZERO, Instant::now() + Duration::from_secs(1));
        assert_eq!(sessions.open_pages(), 1);

        gate.notify_one();
        pending.await.unwrap().unwrap();
    }
}
