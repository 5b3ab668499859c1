//! HTTP client for the Gemini `generateContent` endpoint.
//!
//! One client serves all three generation traits. Transient failures
//! (timeouts, connection errors, 429, 5xx) are retried with linear backoff;
//! a malformed response fails immediately.

use std::time::Duration;

use anyhow::anyhow;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{json, Value};
use tracing::{debug, warn};

use faqdb_core::config::GenerationSettings;
use faqdb_core::error::{Error, Result};
use faqdb_core::traits::{AnswerGenerator, OverallFaq, OverallFaqGenerator, QuestionGenerator};
use faqdb_core::types::Entry;

use crate::parse::{candidate_text, parse_overall_faq};
use crate::prompt::{answer_prompt, overall_faq_prompt, question_prompt};

pub struct GeminiClient {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
    max_retries: u32,
    retry_backoff: Duration,
    assistant_name: String,
}

enum CallError {
    Transient(anyhow::Error),
    Fatal(anyhow::Error),
}

pub fn is_transient_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

impl GeminiClient {
    /// Reads the API key from the env var named by `api_key_env`.
    pub fn from_settings(settings: &GenerationSettings) -> Result<Self> {
        let api_key = std::env::var(&settings.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| Error::InvalidConfig(format!("{} is not set", settings.api_key_env)))?;
        Self::new(settings, api_key)
    }

    pub fn new(settings: &GenerationSettings, api_key: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(settings.timeout_ms))
            .build()
            .map_err(|e| Error::InvalidConfig(format!("http client: {}", e)))?;
        Ok(Self {
            client,
            endpoint: settings.endpoint.trim_end_matches('/').to_string(),
            model: settings.model.trim_start_matches('/').to_string(),
            api_key: api_key.into(),
            max_retries: settings.max_retries,
            retry_backoff: Duration::from_millis(settings.retry_backoff_ms),
            assistant_name: settings.assistant_name.clone(),
        })
    }

    fn url(&self) -> String {
        format!("{}/{}:generateContent", self.endpoint, self.model)
    }

    /// Sends `prompt` and returns the model's text.
    pub async fn generate(&self, prompt: &str) -> anyhow::Result<String> {
        let mut attempt = 0u32;
        loop {
            match self.call_once(prompt).await {
                Ok(text) => return Ok(text),
                Err(CallError::Fatal(e)) => return Err(e),
                Err(CallError::Transient(e)) if attempt < self.max_retries => {
                    attempt += 1;
                    let wait = self.retry_backoff * attempt;
                    warn!(attempt, max = self.max_retries, wait_ms = wait.as_millis() as u64, error = %e, "generation call failed, retrying");
                    tokio::time::sleep(wait).await;
                }
                Err(CallError::Transient(e)) => {
                    return Err(e.context(format!("gave up after {} attempts", attempt + 1)))
                }
            }
        }
    }

    async fn call_once(&self, prompt: &str) -> std::result::Result<String, CallError> {
        let body = json!({ "contents": [{ "parts": [{ "text": prompt }] }] });
        let url = self.url();
        debug!(%url, prompt_chars = prompt.chars().count(), "generateContent");
        let resp = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                let err = anyhow!("gemini request to {} failed: {}", url, e);
                if e.is_timeout() || e.is_connect() || e.is_request() {
                    CallError::Transient(err)
                } else {
                    CallError::Fatal(err)
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            let err = anyhow!("gemini API error {}: {}", status, text);
            return Err(if is_transient_status(status) { CallError::Transient(err) } else { CallError::Fatal(err) });
        }

        let json: Value = resp
            .json()
            .await
            .map_err(|e| CallError::Fatal(anyhow!("gemini response is not JSON: {}", e)))?;
        candidate_text(&json).ok_or_else(|| CallError::Fatal(anyhow!("gemini response has no candidate text")))
    }
}

#[async_trait]
impl AnswerGenerator for GeminiClient {
    async fn generate_answer(&self, entry: &Entry, query: &str, low_confidence: bool) -> anyhow::Result<String> {
        self.generate(&answer_prompt(entry, query, low_confidence, &self.assistant_name)).await
    }
}

#[async_trait]
impl QuestionGenerator for GeminiClient {
    async fn generate_question(&self, chunk: &str) -> anyhow::Result<String> {
        self.generate(&question_prompt(chunk)).await
    }
}

#[async_trait]
impl OverallFaqGenerator for GeminiClient {
    async fn generate_overall_faq(&self, title: &str, text: &str) -> anyhow::Result<OverallFaq> {
        let raw = self.generate(&overall_faq_prompt(title, text)).await?;
        let parsed = parse_overall_faq(&raw);
        if parsed.question.is_none() || parsed.answer.is_none() {
            debug!(title, "overall FAQ response missing fields");
        }
        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limits_and_server_errors_are_transient() {
        assert!(is_transient_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_transient_status(StatusCode::SERVICE_UNAVAILABLE));
        assert!(!is_transient_status(StatusCode::BAD_REQUEST));
        assert!(!is_transient_status(StatusCode::UNAUTHORIZED));
    }

    #[test]
    fn url_joins_endpoint_and_model() {
        let mut s = GenerationSettings::default();
        s.endpoint = "http://localhost:1/v1beta/".into();
        let c = GeminiClient::new(&s, "k").unwrap();
        assert_eq!(c.url(), "http://localhost:1/v1beta/models/gemini-2.5-flash:generateContent");
    }
}
