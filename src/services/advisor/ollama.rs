//! Local backend - Ollama's OpenAI-compatible endpoint
//!
//! Local model servers under load regularly answer with an empty or
//! truncated body. A body that is not JSON, or a response without
//! `choices[0].message.content`, yields an empty advice string and a warning
//! instead of an error. Transport failures are still errors.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

use super::Advisor;
use super::models::*;
use crate::models::AdvisoryRequest;

pub const DEFAULT_URL: &str = "http://localhost:11434/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "llama3";

pub struct OllamaAdvisor {
    http_client: Client,
    url: String,
    model: String,
    timeout: Duration,
}

impl OllamaAdvisor {
    pub fn new(model: impl Into<String>, timeout: Duration) -> Result<Self, AdvisorError> {
        let http_client = Client::builder()
            .build()
            .map_err(|e| AdvisorError::Api(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { http_client, url: DEFAULT_URL.to_string(), model: model.into(), timeout })
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }
}

#[async_trait]
impl Advisor for OllamaAdvisor {
    fn describe(&self) -> String {
        format!("Ollama ({})", self.model)
    }

    async fn advise(&self, request: &AdvisoryRequest) -> Result<String, AdvisorError> {
        // The local endpoint takes no output bound
        let chat_request = ChatCompletionRequest {
            model: &self.model,
            messages: ChatMessage::exchange(&request.system, &request.user),
            max_tokens: None,
        };
        let timeout_secs = self.timeout.as_secs();

        tracing::debug!("Calling local model server: {} with model {}", self.url, self.model);

        let response = self
            .http_client
            .post(&self.url)
            .timeout(self.timeout)
            .json(&chat_request)
            .send()
            .await
            .map_err(|e| AdvisorError::from_transport(e, timeout_secs))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AdvisorError::from_transport(e, timeout_secs))?;

        if !status.is_success() {
            tracing::warn!("Local model server answered {}: {}", status, body);
        }

        let parsed: Value = match serde_json::from_str(&body) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Failed to parse {} response: {}: {:?}", self.describe(), e, body);
                return Ok(String::new());
            },
        };

        Ok(extract_content(&parsed).unwrap_or_else(|| {
            tracing::warn!(
                "Failed to parse {} response: choices[0].message.content missing",
                self.describe()
            );
            String::new()
        }))
    }
}

fn extract_content(response: &Value) -> Option<String> {
    response
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .map(str::to_string)
}
