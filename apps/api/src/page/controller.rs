//! Owns a page's `UiState` and drives its summarize operation.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{info, warn};

use super::state::{Completion, SummarizeRejected, SummarizeTicket, UiState};
use crate::summarize::SummarySource;

pub struct ReviewPage {
    state: Arc<Mutex<UiState>>,
    source: Arc<dyn SummarySource>,
}

impl ReviewPage {
    pub fn new(source: Arc<dyn SummarySource>) -> Self {
        Self {
            state: Arc::new(Mutex::new(UiState::default())),
            source,
        }
    }

    /// Copy of the current state, for rendering.
    pub fn snapshot(&self) -> UiState {
        self.lock().clone()
    }

    pub fn edit_review(&self, text: impl Into<String>) {
        self.lock().edit_review(text);
    }

    pub fn set_dark_mode(&self, enabled: bool) {
        self.lock().set_dark_mode(enabled);
    }

    pub fn show_error(&self, message: impl Into<String>) {
        self.lock().show_error(message);
    }

    /// Summarizes the current review.
    ///
    /// Rejected without side effects when the review is blank or a call is
    /// already in flight. Otherwise loading is released on every path,
    /// including when this future is dropped before the call settles.
    pub async fn summarize(&self) -> Result<Completion, SummarizeRejected> {
        let (ticket, review) = {
            let mut state = self.lock();
            let ticket = state.begin_summarize()?;
            (ticket, state.review().to_string())
        };

        let mut guard = InFlight {
            state: &self.state,
            ticket: Some(ticket),
        };

        let outcome = self.source.summarize(&review).await;
        if let Err(err) = &outcome {
            warn!("Summarize failed: {err:?}");
        }

        let ticket = guard.ticket.take().unwrap_or(ticket);
        let completion = self.lock().complete_summarize(ticket, outcome);
        if completion == Completion::Stale {
            info!("Discarded summarize result for a cleared review");
        }
        Ok(completion)
    }

    fn lock(&self) -> MutexGuard<'_, UiState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Releases the in-flight slot if the summarize future is dropped early.
struct InFlight<'a> {
    state: &'a Mutex<UiState>,
    ticket: Option<SummarizeTicket>,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if let Some(ticket) = self.ticket.take() {
            self.state
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .abandon_summarize(ticket);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::sync::Notify;

    use super::*;
    use crate::lexicon::AfinnScorer;
    use crate::summarize::testing::{ScriptedModel, NEUTRAL_REPLY, POSITIVE_REPLY};
    use crate::summarize::Summarizer;

    fn page_with(model: Arc<ScriptedModel>) -> Arc<ReviewPage> {
        let source = Arc::new(Summarizer::new(model, Arc::new(AfinnScorer::new())));
        Arc::new(ReviewPage::new(source))
    }

    async fn wait_for_call(model: &ScriptedModel) {
        while model.call_count() == 0 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_summarize_populates_all_fields() {
        let page = page_with(Arc::new(ScriptedModel::replying(NEUTRAL_REPLY)));
        page.edit_review("It works. Nothing special.");

        assert_eq!(page.summarize().await, Ok(Completion::Applied));

        let state = page.snapshot();
        let summary = state.summary().unwrap();
        assert_eq!(summary.overall_sentiment, "NEUTRAL");
        assert_eq!(summary.summary, "Mixed feelings.");
        assert!(summary.positive_words.is_empty());
        assert!(summary.negative_words.is_empty());
        assert!(state.error().is_none());
        assert!(!state.loading());
    }

    #[tokio::test]
    async fn test_parse_failure_sets_error_and_no_summary() {
        let page = page_with(Arc::new(ScriptedModel::replying("```json\n{oops\n```")));
        page.edit_review("great");

        page.summarize().await.unwrap();

        let state = page.snapshot();
        assert_eq!(state.error(), Some("Failed to parse AI response as JSON"));
        assert!(state.summary().is_none());
        assert!(!state.loading());
    }

    #[tokio::test]
    async fn test_model_failure_never_leaves_loading_set() {
        let page = page_with(Arc::new(ScriptedModel::failing(500)));
        page.edit_review("great");

        page.summarize().await.unwrap();

        let state = page.snapshot();
        assert!(!state.loading());
        assert_eq!(state.error(), Some("An error occurred while analyzing the review"));
    }

    #[tokio::test]
    async fn test_blank_review_does_not_call_model() {
        let model = Arc::new(ScriptedModel::replying(POSITIVE_REPLY));
        let page = page_with(model.clone());
        page.edit_review("   ");

        assert_eq!(page.summarize().await, Err(SummarizeRejected::BlankReview));
        assert_eq!(model.call_count(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_summarize_is_rejected() {
        let gate = Arc::new(Notify::new());
        let model = Arc::new(ScriptedModel::replying(POSITIVE_REPLY).gated(gate.clone()));
        let page = page_with(model.clone());
        page.edit_review("I love it");

        let first = tokio::spawn({
            let page = page.clone();
            async move { page.summarize().await }
        });
        wait_for_call(&model).await;
        assert!(page.snapshot().loading());

        assert_eq!(page.summarize().await, Err(SummarizeRejected::InFlight));

        gate.notify_one();
        assert_eq!(first.await.unwrap(), Ok(Completion::Applied));
        assert_eq!(model.call_count(), 1);
        assert!(!page.snapshot().loading());
    }

    #[tokio::test]
    async fn test_late_result_after_clear_is_discarded() {
        let gate = Arc::new(Notify::new());
        let model = Arc::new(ScriptedModel::replying(POSITIVE_REPLY).gated(gate.clone()));
        let page = page_with(model.clone());
        page.edit_review("I love it");

        let pending = tokio::spawn({
            let page = page.clone();
            async move { page.summarize().await }
        });
        wait_for_call(&model).await;

        page.edit_review("");
        gate.notify_one();

        assert_eq!(pending.await.unwrap(), Ok(Completion::Stale));
        let state = page.snapshot();
        assert!(state.summary().is_none());
        assert!(!state.loading());
    }

    #[tokio::test]
    async fn test_dropped_call_releases_loading() {
        let gate = Arc::new(Notify::new());
        let model = Arc::new(ScriptedModel::replying(POSITIVE_REPLY).gated(gate));
        let page = page_with(model);
        page.edit_review("I love it");

        let timed_out = tokio::time::timeout(Duration::from_millis(20), page.summarize()).await;
        assert!(timed_out.is_err());
        assert!(!page.snapshot().loading());
    }
}
