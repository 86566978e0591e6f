//! OpenAI completions wire format
//!
//! Request and response bodies for the legacy `/v1/completions` endpoint:
//! ```text
//! {"id":"cmpl-xxx","object":"text_completion","created":1234567890,"model":"gpt-3.5-turbo-instruct","choices":[{"text":" Positive","index":0,"finish_reason":"length"}]}
//! ```

use serde::{Deserialize, Serialize};

/// Body sent to the completions endpoint
#[derive(Debug, Clone, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl CompletionRequest {
    /// Deterministic request for a short answer
    pub fn new(model: impl Into<String>, prompt: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            max_tokens,
            temperature: 0.0,
        }
    }
}

/// Body returned by the completions endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct CompletionResponse {
    pub id: Option<String>,
    pub model: Option<String>,
    pub choices: Vec<CompletionChoice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompletionChoice {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub index: usize,
    pub finish_reason: Option<String>,
}

impl CompletionResponse {
    /// Text of the first choice, if any
    pub fn first_text(&self) -> Option<&str> {
        self.choices.first().map(|choice| choice.text.as_str())
    }
}

/// Error envelope returned alongside non-success statuses
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorDetail {
    pub message: String,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}
