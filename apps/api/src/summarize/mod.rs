//! Review summarization: local lexicon score plus one model call, parsed
//! into an `AiSummary`.
//!
//! `SummarySource` is the seam the page controller depends on. Implementations:
//! - `Summarizer`: in-process, holds the model client and scorer directly.
//! - `ProxySummaryClient`: calls the `/api/v1/summarize` proxy over HTTP.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use crate::lexicon::{score_blocking, LexiconScore, LexiconScorer, ScoreError};
use crate::llm_client::prompts::build_review_prompt;
use crate::llm_client::{strip_code_fences, GenerativeModel, LlmError};

pub mod handlers;
pub mod proxy;

/// Fallback shown when a failure carries no message of its own.
pub const GENERIC_FAILURE_MESSAGE: &str = "An error occurred while analyzing the review";

/// Failures of one summarize invocation. `Display` is the user-facing message.
#[derive(Debug, Error)]
pub enum SummarizeError {
    #[error("Failed to parse AI response as JSON")]
    Parse,

    #[error("Failed to generate summary")]
    MissingSummary,

    #[error("An error occurred while analyzing the review")]
    Model(#[source] LlmError),

    #[error("An error occurred while analyzing the review")]
    Scorer(#[source] ScoreError),

    #[error("An error occurred while analyzing the review")]
    Transport(#[source] reqwest::Error),

    /// Error message relayed from the summarize proxy.
    #[error("{0}")]
    Upstream(String),
}

/// The three labels the model is asked to pick from. Anything else renders
/// like `Neutral`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SentimentTone {
    Positive,
    Negative,
    Neutral,
}

impl SentimentTone {
    pub fn from_label(label: &str) -> Self {
        match label {
            "POSITIVE" => SentimentTone::Positive,
            "NEGATIVE" => SentimentTone::Negative,
            _ => SentimentTone::Neutral,
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            SentimentTone::Positive => "green",
            SentimentTone::Negative => "red",
            SentimentTone::Neutral => "yellow",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiSummary {
    /// Label as returned by the model, kept verbatim.
    pub overall_sentiment: String,
    pub summary: String,
    pub positive_words: Vec<String>,
    pub negative_words: Vec<String>,
}

impl AiSummary {
    pub fn tone(&self) -> SentimentTone {
        SentimentTone::from_label(&self.overall_sentiment)
    }
}

/// Everything one successful summarize produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryOutcome {
    pub summary: AiSummary,
    pub lexicon: LexiconScore,
}

#[async_trait]
pub trait SummarySource: Send + Sync {
    async fn summarize(&self, review: &str) -> Result<SummaryOutcome, SummarizeError>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelReply {
    #[serde(default)]
    overall_sentiment: Option<String>,
    summary: String,
    #[serde(default)]
    positive_words: Option<Vec<String>>,
    #[serde(default)]
    negative_words: Option<Vec<String>>,
}

/// Parses the model's free-form reply into an `AiSummary`.
///
/// Fences are stripped first. A `summary` that is absent or empty (null,
/// `""`, `false`, `0`) is a missing summary. Invalid JSON and mistyped fields,
/// including a `summary` that is present but not a string, are a parse failure.
pub fn parse_model_reply(reply: &str) -> Result<AiSummary, SummarizeError> {
    let cleaned = strip_code_fences(reply);
    let value: Value = serde_json::from_str(&cleaned).map_err(|_| SummarizeError::Parse)?;

    if is_empty_value(value.get("summary")) {
        return Err(SummarizeError::MissingSummary);
    }

    let reply: ModelReply = serde_json::from_value(value).map_err(|_| SummarizeError::Parse)?;

    Ok(AiSummary {
        overall_sentiment: reply
            .overall_sentiment
            .unwrap_or_else(|| "NEUTRAL".to_string()),
        summary: reply.summary,
        positive_words: reply.positive_words.unwrap_or_default(),
        negative_words: reply.negative_words.unwrap_or_default(),
    })
}

fn is_empty_value(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::Bool(b)) => !b,
        Some(Value::String(s)) => s.is_empty(),
        Some(Value::Number(n)) => n.as_f64() == Some(0.0),
        Some(Value::Array(_) | Value::Object(_)) => false,
    }
}

/// In-process summarizer. Constructed once in `main` and shared via `AppState`.
#[derive(Clone)]
pub struct Summarizer {
    model: Arc<dyn GenerativeModel>,
    scorer: Arc<dyn LexiconScorer>,
}

impl Summarizer {
    pub fn new(model: Arc<dyn GenerativeModel>, scorer: Arc<dyn LexiconScorer>) -> Self {
        Self { model, scorer }
    }
}

#[async_trait]
impl SummarySource for Summarizer {
    async fn summarize(&self, review: &str) -> Result<SummaryOutcome, SummarizeError> {
        let lexicon = score_blocking(self.scorer.clone(), review.to_string())
            .await
            .map_err(SummarizeError::Scorer)?;

        let prompt = build_review_prompt(review);
        let reply = self
            .model
            .generate(&prompt)
            .await
            .map_err(SummarizeError::Model)?;
        debug!("Model reply: {reply}");

        let summary = parse_model_reply(&reply)?;
        info!(
            "Review summarized: sentiment={}, lexicon_score={}",
            summary.overall_sentiment, lexicon.score
        );

        Ok(SummaryOutcome { summary, lexicon })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted model doubles shared by summarize, page and route tests.

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use tokio::sync::Notify;

    use super::*;

    /// Replies with a fixed result and records every prompt it receives.
    pub struct ScriptedModel {
        reply: Result<String, u16>,
        pub prompts: Mutex<Vec<String>>,
        pub calls: AtomicUsize,
        gate: Option<Arc<Notify>>,
    }

    impl ScriptedModel {
        pub fn replying(reply: &str) -> Self {
            Self {
                reply: Ok(reply.to_string()),
                prompts: Mutex::new(Vec::new()),
                calls: AtomicUsize::new(0),
                gate: None,
            }
        }

        pub fn failing(status: u16) -> Self {
            Self {
                reply: Err(status),
                prompts: Mutex::new(Vec::new()),
                calls: AtomicUsize::new(0),
                gate: None,
            }
        }

        /// Holds every reply until `gate` is notified.
        pub fn gated(mut self, gate: Arc<Notify>) -> Self {
            self.gate = Some(gate);
            self
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl GenerativeModel for ScriptedModel {
        async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.prompts.lock().unwrap().push(prompt.to_string());
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err(status) => Err(LlmError::Api {
                    status: *status,
                    message: "scripted failure".to_string(),
                }),
            }
        }
    }

    pub const NEUTRAL_REPLY: &str = "```json\n{\"overallSentiment\":\"NEUTRAL\",\"summary\":\"Mixed feelings.\",\"positiveWords\":[],\"negativeWords\":[]}\n```";

    pub const POSITIVE_REPLY: &str = r#"{"overallSentiment":"POSITIVE","summary":"The reviewer loves the blender.","positiveWords":["love","powerful"],"negativeWords":["loud"]}"#;
}
