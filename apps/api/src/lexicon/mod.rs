//! Lexicon scoring: trait-based sentiment scorer over a word valence list.
//!
//! Default: `AfinnScorer` (bundled AFINN-165 list, deterministic, no I/O).
//! `AppState` holds an `Arc<dyn LexiconScorer>` constructed once in `main`.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

mod afinn;
pub mod handlers;

/// Score breakdown for one piece of text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LexiconScore {
    pub score: i32,
    /// `score` divided by the number of tokens.
    pub comparative: f64,
    /// Tokens that contributed a positive score, in order of appearance.
    pub positive: Vec<String>,
    /// Tokens that contributed a negative score, in order of appearance.
    pub negative: Vec<String>,
}

#[derive(Debug, Error)]
pub enum ScoreError {
    #[error("lexicon scorer failed: {0}")]
    Failed(String),
}

/// Synchronous, CPU-bound scorer. Callers on the async path run it inside
/// `tokio::task::spawn_blocking`.
pub trait LexiconScorer: Send + Sync {
    fn analyze(&self, text: &str) -> Result<LexiconScore, ScoreError>;
}

/// AFINN word-list scorer.
///
/// Algorithm:
/// 1. Lowercase, replace punctuation with spaces, split on whitespace.
/// 2. Each token found in the list contributes its valence; if the previous
///    token is a negator the valence is flipped.
/// 3. comparative = score / token count (0.0 for empty input).
pub struct AfinnScorer {
    valences: HashMap<&'static str, i32>,
    negators: HashSet<&'static str>,
}

impl AfinnScorer {
    pub fn new() -> Self {
        Self {
            valences: afinn::AFINN.iter().copied().collect(),
            negators: afinn::NEGATORS.iter().copied().collect(),
        }
    }
}

impl Default for AfinnScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl LexiconScorer for AfinnScorer {
    fn analyze(&self, text: &str) -> Result<LexiconScore, ScoreError> {
        let tokens = tokenize(text);

        let mut score = 0;
        let mut positive = Vec::new();
        let mut negative = Vec::new();

        for (i, token) in tokens.iter().enumerate() {
            let Some(&valence) = self.valences.get(token.as_str()) else {
                continue;
            };
            let negated = i > 0 && self.negators.contains(tokens[i - 1].as_str());
            let valence = if negated { -valence } else { valence };

            score += valence;
            if valence > 0 {
                positive.push(token.clone());
            } else if valence < 0 {
                negative.push(token.clone());
            }
        }

        let comparative = if tokens.is_empty() {
            0.0
        } else {
            score as f64 / tokens.len() as f64
        };

        Ok(LexiconScore {
            score,
            comparative,
            positive,
            negative,
        })
    }
}

/// Runs the scorer on a blocking worker. A panicking scorer surfaces as
/// `ScoreError` instead of tearing down the request task.
pub async fn score_blocking(
    scorer: Arc<dyn LexiconScorer>,
    text: String,
) -> Result<LexiconScore, ScoreError> {
    tokio::task::spawn_blocking(move || scorer.analyze(&text))
        .await
        .map_err(|e| ScoreError::Failed(format!("scorer task aborted: {e}")))?
}

fn tokenize(text: &str) -> Vec<String> {
    const PUNCTUATION: &str = ".,/#!?$%^&*;:{}=_`\"~()";
    text.to_lowercase()
        .chars()
        .map(|c| if PUNCTUATION.contains(c) { ' ' } else { c })
        .collect::<String>()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn score(text: &str) -> LexiconScore {
        AfinnScorer::new().analyze(text).unwrap()
    }

    #[test]
    fn test_mixed_review_nets_out() {
        let result = score("This product is great but shipping was terrible");
        assert_eq!(result.positive, vec!["great"]);
        assert_eq!(result.negative, vec!["terrible"]);
        assert_eq!(result.score, 3 - 3);
        assert!((result.comparative - result.score as f64 / 8.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_positive_review() {
        let result = score("Amazing blender, I love it!");
        assert_eq!(result.score, 7);
        assert_eq!(result.positive, vec!["amazing", "love"]);
        assert!(result.negative.is_empty());
        assert!((result.comparative - 7.0 / 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_punctuation_and_case_are_ignored() {
        let result = score("TERRIBLE!!! (awful)");
        assert_eq!(result.negative, vec!["terrible", "awful"]);
        assert_eq!(result.score, -6);
    }

    #[test]
    fn test_negator_flips_following_token() {
        let result = score("it is not good");
        assert_eq!(result.score, -3);
        assert_eq!(result.negative, vec!["good"]);
        assert!(result.positive.is_empty());
    }

    #[test]
    fn test_full_word_list_is_bundled() {
        let scorer = AfinnScorer::new();
        for (word, expected) in [
            ("joy", 3),
            ("worried", -3),
            ("masterpiece", 4),
            ("hopeless", -2),
            ("excellence", 3),
            ("breathtaking", 5),
        ] {
            assert_eq!(scorer.analyze(word).unwrap().score, expected, "{word}");
        }
        assert!(scorer.valences.len() > 3000);
    }

    #[test]
    fn test_contracted_negators_flip_too() {
        assert_eq!(score("nothing good").score, -3);
        assert_eq!(score("it doesn't work and I didn't enjoy it").score, -2);
    }

    #[test]
    fn test_unknown_words_score_zero() {
        let result = score("the box arrived on tuesday");
        assert_eq!(result.score, 0);
        assert_eq!(result.comparative, 0.0);
        assert!(result.positive.is_empty() && result.negative.is_empty());
    }

    #[test]
    fn test_empty_input_has_zero_comparative() {
        let result = score("   ");
        assert_eq!(result.score, 0);
        assert_eq!(result.comparative, 0.0);
    }

    #[test]
    fn test_same_text_same_result() {
        let text = "Sturdy and reliable, but overpriced.";
        assert_eq!(score(text), score(text));
    }

    struct PanickingScorer;

    impl LexiconScorer for PanickingScorer {
        fn analyze(&self, _text: &str) -> Result<LexiconScore, ScoreError> {
            panic!("lexicon table corrupted")
        }
    }

    #[tokio::test]
    async fn test_score_blocking_runs_scorer() {
        let result = score_blocking(Arc::new(AfinnScorer::new()), "good".to_string())
            .await
            .unwrap();
        assert_eq!(result.score, 3);
    }

    #[tokio::test]
    async fn test_score_blocking_converts_panic_to_error() {
        let result = score_blocking(Arc::new(PanickingScorer), "good".to_string()).await;
        assert!(matches!(result, Err(ScoreError::Failed(_))));
    }
}
