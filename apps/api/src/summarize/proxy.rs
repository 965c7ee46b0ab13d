//! HTTP client for the summarize proxy, for callers running outside the
//! server process. Holds no model credential.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{SummarizeError, SummaryOutcome, SummarySource, GENERIC_FAILURE_MESSAGE};

const SUMMARIZE_PATH: &str = "/api/v1/summarize";

#[derive(Debug, Serialize)]
struct SummarizeRequest<'a> {
    review: &'a str,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Clone)]
pub struct ProxySummaryClient {
    client: Client,
    base_url: String,
}

impl ProxySummaryClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .expect("Failed to build HTTP client"),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl SummarySource for ProxySummaryClient {
    async fn summarize(&self, review: &str) -> Result<SummaryOutcome, SummarizeError> {
        let response = self
            .client
            .post(format!("{}{SUMMARIZE_PATH}", self.base_url))
            .json(&SummarizeRequest { review })
            .send()
            .await
            .map_err(SummarizeError::Transport)?;

        if !response.status().is_success() {
            let message = response
                .json::<ErrorBody>()
                .await
                .map(|b| b.error)
                .ok()
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| GENERIC_FAILURE_MESSAGE.to_string());
            return Err(SummarizeError::Upstream(message));
        }

        response
            .json::<SummaryOutcome>()
            .await
            .map_err(SummarizeError::Transport)
    }
}
