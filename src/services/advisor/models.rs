//! Advisory backend data models
//!
//! Error taxonomy and the OpenAI-compatible chat-completion wire format
//! spoken by both backends.

use serde::{Deserialize, Serialize};

// ============================================================================
// Provider selection
// ============================================================================

/// Advisory backend chosen at configuration time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Hosted OpenAI chat-completion API
    #[value(name = "openai")]
    OpenAi,
    /// Local Ollama server (OpenAI-compatible endpoint)
    Ollama,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Ollama => "ollama",
        }
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Advisory backend errors
#[derive(Debug, thiserror::Error)]
pub enum AdvisorError {
    #[error("{provider} API key is required")]
    MissingCredential { provider: &'static str },

    #[error("Advisory backend rejected the credential: {0}")]
    Unauthorized(String),

    #[error("Advisory request timed out after {0}s")]
    Timeout(u64),

    #[error("Malformed advisory response: {0}")]
    MalformedResponse(String),

    #[error("Advisory backend unreachable: {0}")]
    Unreachable(String),

    #[error("Advisory backend rate limited, retry after {0}s")]
    RateLimited(u64),

    #[error("Advisory API error: {0}")]
    Api(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AdvisorError {
    /// Whether the error would recur for every remaining query shape.
    ///
    /// Fatal errors abort the run; the rest only abort the current shape.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::MissingCredential { .. } | Self::Unauthorized(_))
    }

    pub(crate) fn from_transport(e: reqwest::Error, timeout_secs: u64) -> Self {
        if e.is_timeout() {
            Self::Timeout(timeout_secs)
        } else if e.is_connect() {
            Self::Unreachable(format!("Connection failed: {}", e))
        } else {
            Self::Unreachable(e.to_string())
        }
    }
}

// ============================================================================
// Chat Completion Wire Types
// ============================================================================

#[derive(Debug, Serialize)]
pub(crate) struct ChatCompletionRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ChatMessage<'a> {
    pub role: &'static str,
    pub content: &'a str,
}

impl<'a> ChatMessage<'a> {
    /// System instruction followed by the user payload
    pub fn exchange(system: &'a str, user: &'a str) -> Vec<Self> {
        vec![Self { role: "system", content: system }, Self { role: "user", content: user }]
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatChoice {
    pub message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResponseMessage {
    pub content: Option<String>,
}
