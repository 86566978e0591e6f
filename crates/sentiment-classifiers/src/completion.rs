//! Remote completion backend
//!
//! Sentiment through a hosted LLM: the feedback is wrapped in a fixed
//! instruction prompt, the endpoint is asked for a single deterministic token,
//! and the reply is matched against the bucket names.

use async_trait::async_trait;
use sentiment_core::completion::{ApiErrorBody, CompletionRequest, CompletionResponse};
use sentiment_core::{ExternalServiceError, Result, SentimentBucket};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Environment variable holding the completion API key
pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Tokens requested per classification; one word is all the prompt asks for
pub const SENTIMENT_MAX_TOKENS: u32 = 1;

/// A text-completion endpoint
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Complete `prompt`, returning the raw generated text
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String>;

    /// Backend name for logs
    fn name(&self) -> &str;
}

/// Settings for the OpenAI completions client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiSettings {
    /// API base URL, without the `/completions` suffix
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Completion model
    #[serde(default = "default_model")]
    pub model: String,

    /// API key, normally supplied through `OPENAI_API_KEY`
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-3.5-turbo-instruct".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for OpenAiSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Client for the OpenAI `/completions` endpoint
pub struct OpenAiCompletionClient {
    client: reqwest::Client,
    settings: OpenAiSettings,
}

impl OpenAiCompletionClient {
    pub fn new(settings: OpenAiSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| {
                ExternalServiceError::Request(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self { client, settings })
    }

    pub fn settings(&self) -> &OpenAiSettings {
        &self.settings
    }

    /// Whether a credential is configured
    pub fn has_credential(&self) -> bool {
        self.settings.api_key.is_some()
    }

    fn endpoint(&self) -> String {
        format!("{}/completions", self.settings.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl CompletionBackend for OpenAiCompletionClient {
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String> {
        // Checked before any network traffic
        let api_key = self
            .settings
            .api_key
            .as_deref()
            .ok_or(ExternalServiceError::MissingCredential(OPENAI_API_KEY_ENV))?;

        let request = CompletionRequest::new(&self.settings.model, prompt, max_tokens);

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ExternalServiceError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&body)
                .map(|b| b.error.message)
                .unwrap_or(body);

            tracing::warn!("Completion endpoint returned {}: {}", status, message);
            return Err(ExternalServiceError::Status {
                status: status.as_u16(),
                message,
            }
            .into());
        }

        let completion: CompletionResponse = response
            .json()
            .await
            .map_err(|e| ExternalServiceError::MalformedResponse(e.to_string()))?;

        completion
            .first_text()
            .map(str::to_string)
            .ok_or_else(|| {
                ExternalServiceError::MalformedResponse("response has no choices".to_string())
                    .into()
            })
    }

    fn name(&self) -> &str {
        &self.settings.model
    }
}

/// Instruction prompt sent to the completion backend
pub fn build_prompt(text: &str) -> String {
    format!(
        "Classify the sentiment of the following customer feedback as Positive, Negative, or Neutral:\nFeedback: {}\nSentiment:",
        text
    )
}

/// Map a completion reply to a bucket.
///
/// Case-insensitive substring match, positive checked before negative.
/// Anything else, empty replies included, is neutral.
pub fn parse_completion_label(reply: &str) -> SentimentBucket {
    let reply = reply.to_lowercase();

    if reply.contains("positive") {
        SentimentBucket::Positive
    } else if reply.contains("negative") {
        SentimentBucket::Negative
    } else {
        if !reply.contains("neutral") {
            tracing::warn!("Unrecognized completion reply {:?}, treating as neutral", reply);
        }
        SentimentBucket::Neutral
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sentiment_core::Error;

    #[test]
    fn test_parse_labels() {
        assert_eq!(parse_completion_label(" Positive"), SentimentBucket::Positive);
        assert_eq!(parse_completion_label("NEGATIVE."), SentimentBucket::Negative);
        assert_eq!(parse_completion_label(" Neutral"), SentimentBucket::Neutral);
    }

    #[test]
    fn test_parse_unrecognized_is_neutral() {
        assert_eq!(parse_completion_label(""), SentimentBucket::Neutral);
        assert_eq!(parse_completion_label(" Mixed"), SentimentBucket::Neutral);
    }

    #[test]
    fn test_positive_checked_first() {
        assert_eq!(
            parse_completion_label("positive, not negative"),
            SentimentBucket::Positive
        );
        assert_eq!(parse_completion_label("non-positive"), SentimentBucket::Positive);
    }

    #[test]
    fn test_prompt_embeds_text() {
        let prompt = build_prompt("Great shoes");
        assert!(prompt.starts_with("Classify the sentiment of the following customer feedback"));
        assert!(prompt.contains("\nFeedback: Great shoes\n"));
        assert!(prompt.ends_with("Sentiment:"));
    }

    #[test]
    fn test_settings_defaults() {
        let settings: OpenAiSettings = serde_yaml::from_str("{}").unwrap();
        assert_eq!(settings.base_url, "https://api.openai.com/v1");
        assert_eq!(settings.model, "gpt-3.5-turbo-instruct");
        assert_eq!(settings.timeout_secs, 30);
        assert!(settings.api_key.is_none());
    }

    #[tokio::test]
    async fn test_missing_credential_fails_before_request() {
        let client = OpenAiCompletionClient::new(OpenAiSettings {
            // Nothing listens here; the call must not get that far
            base_url: "http://127.0.0.1:9".to_string(),
            ..Default::default()
        })
        .unwrap();

        let err = client.complete("prompt", 1).await.unwrap_err();
        assert!(matches!(
            err,
            Error::ExternalService(ExternalServiceError::MissingCredential(OPENAI_API_KEY_ENV))
        ));
    }
}
