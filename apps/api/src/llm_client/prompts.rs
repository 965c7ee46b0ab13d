// Prompt templates sent to the model. Placeholders are substituted with
// `str::replace`; the review text is embedded verbatim.

/// Review analysis prompt. `{review}` is replaced with the raw review text.
pub const REVIEW_SUMMARY_PROMPT_TEMPLATE: &str = r#"Analyze the following product review:
"{review}"

Provide a response in the following JSON format:
{
  "overallSentiment": "One word sentiment: POSITIVE, NEGATIVE, or NEUTRAL",
  "summary": "A 2-3 sentence summary of the review, focusing on the main points and overall sentiment",
  "positiveWords": ["list", "of", "positive", "words", "or", "phrases"],
  "negativeWords": ["list", "of", "negative", "words", "or", "phrases"]
}

Ensure that the positive and negative words or phrases are directly extracted or closely paraphrased from the original review."#;

pub fn build_review_prompt(review: &str) -> String {
    REVIEW_SUMMARY_PROMPT_TEMPLATE.replace("{review}", review)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_embeds_review_verbatim() {
        let review = "  Loved it, \"five stars\" {really}  ";
        let prompt = build_review_prompt(review);
        assert!(prompt.contains(&format!("\"{review}\"")));
        assert!(!prompt.contains("{review}"));
    }

    #[test]
    fn test_prompt_names_all_keys() {
        let prompt = build_review_prompt("ok");
        for key in ["overallSentiment", "summary", "positiveWords", "negativeWords"] {
            assert!(prompt.contains(key), "missing {key}");
        }
    }
}
