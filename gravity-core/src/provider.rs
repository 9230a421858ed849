//! Completion API client.
//!
//! The handler talks to the remote model through the `CompletionProvider`
//! trait so tests can script replies; `GroqProvider` is the production
//! implementation over the OpenAI-compatible HTTP surface.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;

use gravity_common::config::COMPLETION_BASE_URL;
use gravity_common::{Error, Result};

use crate::prompt::ModelRequest;

/// Unified interface for completion backends.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Send a completion request and return the generated answer text.
    async fn complete(&self, request: ModelRequest) -> Result<String>;
}

/// Groq chat-completions client.
pub struct GroqProvider {
    client: reqwest::Client,
    base_url: String,
}

impl GroqProvider {
    pub fn new(api_key: &str, timeout: Duration) -> Self {
        Self::with_base_url(api_key, timeout, COMPLETION_BASE_URL)
    }

    /// Create with a custom base URL (compatible APIs, test servers).
    pub fn with_base_url(api_key: &str, timeout: Duration, base_url: impl Into<String>) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {api_key}"))
                .unwrap_or_else(|_| HeaderValue::from_static("")),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl CompletionProvider for GroqProvider {
    async fn complete(&self, request: ModelRequest) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    Error::UpstreamTimeout
                } else {
                    Error::UpstreamHttp {
                        status: None,
                        message: format!("request failed: {err}"),
                    }
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::UpstreamHttp {
                status: Some(status.as_u16()),
                message: truncate(&body, 512),
            });
        }

        let completion: CompletionResponse =
            response.json().await.map_err(|err| Error::UpstreamHttp {
                status: None,
                message: format!("malformed completion payload: {err}"),
            })?;

        completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| Error::UpstreamHttp {
                status: None,
                message: "completion returned no choices".into(),
            })
    }
}

// ============================================================================
// Completion API wire types
// ============================================================================

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_standard_completion_payload() {
        let raw = r#"{
            "model": "llama-3.3-70b-versatile",
            "choices": [
                {"message": {"role": "assistant", "content": "Hi there"}, "finish_reason": "stop"}
            ],
            "usage": {"prompt_tokens": 10, "completion_tokens": 3, "total_tokens": 13}
        }"#;
        let parsed: CompletionResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.choices[0].message.content, "Hi there");
    }

    #[test]
    fn empty_choices_is_a_recoverable_error_shape() {
        let raw = r#"{"choices": []}"#;
        let parsed: CompletionResponse = serde_json::from_str(raw).unwrap();
        assert!(parsed.choices.is_empty());
    }

    #[test]
    fn truncate_is_char_boundary_safe() {
        assert_eq!(truncate("xatolik yuz berdi", 7), "xatolik");
        assert_eq!(truncate("дастур", 3), "дас");
        assert_eq!(truncate("ok", 512), "ok");
    }
}
