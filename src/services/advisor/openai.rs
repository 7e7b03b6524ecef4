//! Hosted backend - OpenAI chat-completion API

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use super::Advisor;
use super::models::*;
use crate::models::AdvisoryRequest;

pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_MAX_TOKENS: u32 = 500;

pub struct OpenAiAdvisor {
    http_client: Client,
    api_base: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    timeout: Duration,
}

impl OpenAiAdvisor {
    /// Fails with `MissingCredential` when `api_key` is absent or blank;
    /// no request is ever sent without one.
    pub fn new(
        api_key: Option<&str>,
        model: impl Into<String>,
        max_tokens: u32,
        timeout: Duration,
    ) -> Result<Self, AdvisorError> {
        let api_key = api_key
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or(AdvisorError::MissingCredential { provider: "OpenAI" })?;

        let http_client = Client::builder()
            .build()
            .map_err(|e| AdvisorError::Api(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            api_base: DEFAULT_API_BASE.to_string(),
            api_key: api_key.to_string(),
            model: model.into(),
            max_tokens,
            timeout,
        })
    }

    /// Point at another OpenAI-compatible deployment
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }
}

#[async_trait]
impl Advisor for OpenAiAdvisor {
    fn describe(&self) -> String {
        format!("OpenAI ({})", self.model)
    }

    async fn advise(&self, request: &AdvisoryRequest) -> Result<String, AdvisorError> {
        let chat_request = ChatCompletionRequest {
            model: &self.model,
            messages: ChatMessage::exchange(&request.system, &request.user),
            max_tokens: Some(request.max_tokens.unwrap_or(self.max_tokens)),
        };

        let url = format!("{}/chat/completions", self.api_base.trim_end_matches('/'));
        let timeout_secs = self.timeout.as_secs();

        tracing::debug!("Calling advisory API: {} with model {}", url, self.model);

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .timeout(self.timeout)
            .json(&chat_request)
            .send()
            .await
            .map_err(|e| AdvisorError::from_transport(e, timeout_secs))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            let body = response.text().await.unwrap_or_default();
            return Err(AdvisorError::Unauthorized(format!("{}: {}", status, body)));
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(60);
            return Err(AdvisorError::RateLimited(retry_after));
        }

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AdvisorError::Api(format!("API error {}: {}", status, error_text)));
        }

        let chat_response: ChatCompletionResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                AdvisorError::Timeout(timeout_secs)
            } else {
                AdvisorError::MalformedResponse(e.to_string())
            }
        })?;

        let choice = chat_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AdvisorError::MalformedResponse("no completion choice".to_string()))?;

        Ok(choice.message.content.unwrap_or_default())
    }
}
