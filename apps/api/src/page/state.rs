//! Page state for one open review page.
//!
//! Mutated only by user input (`edit_review`, `set_dark_mode`) and by the
//! begin/complete pair around a summarize call. At most one summarize is in
//! flight; a ticket started under an older generation is discarded on
//! completion.

use thiserror::Error;

use crate::lexicon::LexiconScore;
use crate::summarize::{AiSummary, SummarizeError, SummaryOutcome, GENERIC_FAILURE_MESSAGE};

/// Handle for the in-flight summarize call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SummarizeTicket {
    slot: u64,
    generation: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SummarizeRejected {
    #[error("review is blank")]
    BlankReview,
    #[error("a summarize call is already in flight")]
    InFlight,
}

/// What happened to a completed ticket's result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Applied,
    /// The review was cleared after the call started.
    Stale,
    /// The ticket does not own the in-flight slot.
    NotInFlight,
}

#[derive(Debug, Clone, Default)]
pub struct UiState {
    review: String,
    summary: Option<AiSummary>,
    lexicon: Option<LexiconScore>,
    error: Option<String>,
    dark_mode: bool,
    generation: u64,
    next_slot: u64,
    in_flight: Option<u64>,
}

impl UiState {
    pub fn review(&self) -> &str {
        &self.review
    }

    pub fn summary(&self) -> Option<&AiSummary> {
        self.summary.as_ref()
    }

    /// Local lexicon score from the last successful summarize.
    pub fn lexicon(&self) -> Option<&LexiconScore> {
        self.lexicon.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn dark_mode(&self) -> bool {
        self.dark_mode
    }

    pub fn loading(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn is_blank(&self) -> bool {
        self.review.trim().is_empty()
    }

    pub fn can_submit(&self) -> bool {
        !self.loading() && !self.is_blank()
    }

    /// Replaces the review text. Clearing it drops the shown summary at once
    /// and invalidates any call still in flight.
    pub fn edit_review(&mut self, text: impl Into<String>) {
        self.review = text.into();
        if self.is_blank() {
            self.summary = None;
            self.lexicon = None;
            self.generation += 1;
        }
    }

    pub fn set_dark_mode(&mut self, enabled: bool) {
        self.dark_mode = enabled;
    }

    /// Shows an error raised outside a summarize call (e.g. rate limiting).
    pub fn show_error(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
    }

    pub fn begin_summarize(&mut self) -> Result<SummarizeTicket, SummarizeRejected> {
        if self.in_flight.is_some() {
            return Err(SummarizeRejected::InFlight);
        }
        if self.is_blank() {
            return Err(SummarizeRejected::BlankReview);
        }

        self.next_slot += 1;
        self.in_flight = Some(self.next_slot);
        self.error = None;

        Ok(SummarizeTicket {
            slot: self.next_slot,
            generation: self.generation,
        })
    }

    /// Releases the in-flight slot and applies `outcome` if the ticket is
    /// still current.
    pub fn complete_summarize(
        &mut self,
        ticket: SummarizeTicket,
        outcome: Result<SummaryOutcome, SummarizeError>,
    ) -> Completion {
        if self.in_flight != Some(ticket.slot) {
            return Completion::NotInFlight;
        }
        self.in_flight = None;

        if ticket.generation != self.generation {
            return Completion::Stale;
        }

        match outcome {
            Ok(outcome) => {
                self.summary = Some(outcome.summary);
                self.lexicon = Some(outcome.lexicon);
                self.error = None;
            }
            Err(err) => {
                let message = err.to_string();
                self.summary = None;
                self.lexicon = None;
                self.error = Some(if message.is_empty() {
                    GENERIC_FAILURE_MESSAGE.to_string()
                } else {
                    message
                });
            }
        }
        Completion::Applied
    }

    /// Releases the slot without touching summary or error. Used when the
    /// call never settles (its future was dropped).
    pub fn abandon_summarize(&mut self, ticket: SummarizeTicket) {
        if self.in_flight == Some(ticket.slot) {
            self.in_flight = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(text: &str) -> SummaryOutcome {
        SummaryOutcome {
            summary: AiSummary {
                overall_sentiment: "POSITIVE".to_string(),
                summary: text.to_string(),
                positive_words: vec!["great".to_string()],
                negative_words: vec![],
            },
            lexicon: LexiconScore {
                score: 3,
                comparative: 1.0,
                positive: vec!["great".to_string()],
                negative: vec![],
            },
        }
    }

    fn with_review(text: &str) -> UiState {
        let mut state = UiState::default();
        state.edit_review(text);
        state
    }

    #[test]
    fn test_initial_state() {
        let state = UiState::default();
        assert!(!state.loading());
        assert!(state.summary().is_none());
        assert!(state.error().is_none());
        assert!(!state.dark_mode());
        assert!(!state.can_submit());
    }

    #[test]
    fn test_loading_spans_begin_to_complete() {
        let mut state = with_review("great");
        let ticket = state.begin_summarize().unwrap();
        assert!(state.loading());
        assert!(!state.can_submit());

        assert_eq!(
            state.complete_summarize(ticket, Ok(outcome("Nice."))),
            Completion::Applied
        );
        assert!(!state.loading());
        assert_eq!(state.summary().unwrap().summary, "Nice.");
        assert_eq!(state.lexicon().unwrap().score, 3);
    }

    #[test]
    fn test_second_begin_is_rejected_while_in_flight() {
        let mut state = with_review("great");
        state.begin_summarize().unwrap();
        assert_eq!(state.begin_summarize(), Err(SummarizeRejected::InFlight));
    }

    #[test]
    fn test_blank_review_is_rejected() {
        let mut state = with_review("   \n\t");
        assert_eq!(state.begin_summarize(), Err(SummarizeRejected::BlankReview));
        assert!(!state.loading());
    }

    #[test]
    fn test_begin_clears_prior_error() {
        let mut state = with_review("great");
        let ticket = state.begin_summarize().unwrap();
        state.complete_summarize(ticket, Err(SummarizeError::Parse));
        assert!(state.error().is_some());

        state.begin_summarize().unwrap();
        assert!(state.error().is_none());
    }

    #[test]
    fn test_failure_sets_error_and_clears_summary() {
        let mut state = with_review("great");
        let ticket = state.begin_summarize().unwrap();
        state.complete_summarize(ticket, Ok(outcome("Nice.")));

        let ticket = state.begin_summarize().unwrap();
        state.complete_summarize(ticket, Err(SummarizeError::MissingSummary));
        assert_eq!(state.error(), Some("Failed to generate summary"));
        assert!(state.summary().is_none());
        assert!(!state.loading());
    }

    #[test]
    fn test_empty_error_message_falls_back_to_generic() {
        let mut state = with_review("great");
        let ticket = state.begin_summarize().unwrap();
        state.complete_summarize(ticket, Err(SummarizeError::Upstream(String::new())));
        assert_eq!(state.error(), Some(GENERIC_FAILURE_MESSAGE));
    }

    #[test]
    fn test_success_clears_error() {
        let mut state = with_review("great");
        state.show_error("Too Many Requests");
        let ticket = state.begin_summarize().unwrap();
        state.complete_summarize(ticket, Ok(outcome("Nice.")));
        assert!(state.error().is_none());
    }

    #[test]
    fn test_clearing_review_drops_summary_immediately() {
        let mut state = with_review("great");
        let ticket = state.begin_summarize().unwrap();
        state.complete_summarize(ticket, Ok(outcome("Nice.")));

        state.edit_review(" ");
        assert!(state.summary().is_none());
        assert!(state.lexicon().is_none());
    }

    #[test]
    fn test_non_blank_edit_keeps_summary_and_error() {
        let mut state = with_review("great");
        let ticket = state.begin_summarize().unwrap();
        state.complete_summarize(ticket, Ok(outcome("Nice.")));
        state.show_error("earlier problem");

        state.edit_review("great, and sturdy");
        assert!(state.summary().is_some());
        assert_eq!(state.error(), Some("earlier problem"));
    }

    #[test]
    fn test_result_after_clear_is_discarded() {
        let mut state = with_review("great");
        let ticket = state.begin_summarize().unwrap();
        state.edit_review("");
        state.edit_review("something new");

        assert_eq!(
            state.complete_summarize(ticket, Ok(outcome("Old."))),
            Completion::Stale
        );
        assert!(state.summary().is_none());
        assert!(!state.loading());
    }

    #[test]
    fn test_foreign_ticket_does_not_release_slot() {
        let mut state = with_review("great");
        let first = state.begin_summarize().unwrap();
        state.complete_summarize(first, Ok(outcome("One.")));
        let _second = state.begin_summarize().unwrap();

        assert_eq!(
            state.complete_summarize(first, Ok(outcome("Replay."))),
            Completion::NotInFlight
        );
        assert!(state.loading());
        assert_eq!(state.summary().unwrap().summary, "One.");
    }

    #[test]
    fn test_abandon_releases_slot_only() {
        let mut state = with_review("great");
        let ticket = state.begin_summarize().unwrap();
        state.abandon_summarize(ticket);
        assert!(!state.loading());
        assert!(state.summary().is_none());
        assert!(state.error().is_none());
    }

    #[test]
    fn test_dark_mode_toggle() {
        let mut state = UiState::default();
        state.set_dark_mode(true);
        assert!(state.dark_mode());
    }
}
