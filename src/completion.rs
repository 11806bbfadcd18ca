//! Text completion service collaborator.
//!
//! The extraction cascade only needs `complete(model_hint, prompt) -> text`.
//! Output is free text with no shape guarantees — possibly valid JSON,
//! possibly fenced, possibly prose, possibly empty. The parse cascade in
//! `extract::parse` absorbs all of that; this layer only moves bytes.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

use crate::net::{send_with_retry, RetryPolicy};

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("HTTP: {0}")]
    Http(#[from] reqwest::Error),
    #[error("completion API error {status}: {message}")]
    Api { status: u16, message: String },
    #[error("completion response had no content")]
    Empty,
}

/// Anything that can turn a prompt into completion text.
///
/// Dyn-compatible so the orchestrator can take `&dyn CompletionService` and
/// tests can substitute scripted fakes.
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(&self, model_hint: &str, prompt: &str) -> Result<String, CompletionError>;
}

// ============================================================================
// OpenAI-compatible HTTP client
// ============================================================================

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: String,
}

/// Chat-completions client for any OpenAI-compatible endpoint.
pub struct HttpCompletionClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    retry: RetryPolicy,
}

impl HttpCompletionClient {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        HttpCompletionClient {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            retry: RetryPolicy::default(),
        }
    }
}

#[async_trait]
impl CompletionService for HttpCompletionClient {
    async fn complete(&self, model_hint: &str, prompt: &str) -> Result<String, CompletionError> {
        let body = json!({
            "model": model_hint,
            "messages": [{"role": "user", "content": prompt}],
            "temperature": 0.2,
        });

        let request = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body);

        let resp = send_with_retry(request, &self.retry).await?;
        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(CompletionError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: ChatResponse = resp.json().await?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .unwrap_or_default();

        if content.trim().is_empty() {
            return Err(CompletionError::Empty);
        }
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_response_deserialization() {
        let json = r#"{
            "choices": [
                {"message": {"role": "assistant", "content": "{\"title\": \"Lunch\"}"}}
            ]
        }"#;
        let resp: ChatResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.choices.len(), 1);
        assert!(resp.choices[0].message.content.contains("Lunch"));
    }

    #[test]
    fn test_chat_response_empty_choices() {
        let resp: ChatResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        assert!(resp.choices.is_empty());
    }
}
