//! Advisory Client
//!
//! Asks a language model for an index recommendation. The backend is picked
//! once from configuration; there is no failover between backends.
//!
//! # Architecture
//! ```text
//! ┌─────────────────┐
//! │     Advisor     │  ← Trait (advise: system + user → text)
//! └────────┬────────┘
//!          │
//!    ┌─────┴──────┐
//!    ▼            ▼
//! ┌──────┐   ┌────────┐
//! │OpenAI│   │ Ollama │
//! │hosted│   │ local  │
//! └──────┘   └────────┘
//! ```

mod models;
mod ollama;
mod openai;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::config::AdvisorConfig;
use crate::models::AdvisoryRequest;

pub use models::{AdvisorError, ProviderKind};
pub use ollama::{
    DEFAULT_MODEL as OLLAMA_DEFAULT_MODEL, DEFAULT_URL as OLLAMA_DEFAULT_URL, OllamaAdvisor,
};
pub use openai::{
    DEFAULT_API_BASE as OPENAI_DEFAULT_API_BASE, DEFAULT_MAX_TOKENS as OPENAI_DEFAULT_MAX_TOKENS,
    DEFAULT_MODEL as OPENAI_DEFAULT_MODEL, OpenAiAdvisor,
};

/// A single chat-completion call, no retry and no streaming.
#[async_trait]
pub trait Advisor: Send + Sync {
    /// Provider and model, for the report header
    fn describe(&self) -> String;

    async fn advise(&self, request: &AdvisoryRequest) -> Result<String, AdvisorError>;
}

/// Build the configured backend.
///
/// The hosted backend checks its credential here, before the store is touched.
pub fn build_advisor(config: &AdvisorConfig) -> Result<Arc<dyn Advisor>, AdvisorError> {
    let timeout = Duration::from_secs(config.timeout_secs);

    let advisor: Arc<dyn Advisor> = match config.provider {
        ProviderKind::OpenAi => Arc::new(
            OpenAiAdvisor::new(
                config.openai_api_key.as_deref(),
                config.openai_model.clone(),
                config.openai_max_tokens,
                timeout,
            )?
            .with_api_base(config.openai_api_base.clone()),
        ),
        ProviderKind::Ollama => Arc::new(
            OllamaAdvisor::new(config.ollama_model.clone(), timeout)?
                .with_url(config.ollama_url.clone()),
        ),
    };

    tracing::info!("Advisory backend: {}", advisor.describe());
    Ok(advisor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_openai_requires_key() {
        let config = AdvisorConfig { provider: ProviderKind::OpenAi, ..AdvisorConfig::default() };
        let err = build_advisor(&config).err().expect("missing key must fail");
        assert!(matches!(err, AdvisorError::MissingCredential { provider: "OpenAI" }));
    }

    #[test]
    fn test_build_openai_with_key() {
        let config = AdvisorConfig {
            provider: ProviderKind::OpenAi,
            openai_api_key: Some("sk-live".to_string()),
            openai_model: "gpt-4o-mini".to_string(),
            ..AdvisorConfig::default()
        };
        let advisor = build_advisor(&config).unwrap();
        assert_eq!(advisor.describe(), "OpenAI (gpt-4o-mini)");
    }

    #[test]
    fn test_build_ollama_needs_no_key() {
        let config = AdvisorConfig {
            provider: ProviderKind::Ollama,
            openai_api_key: None,
            ..AdvisorConfig::default()
        };
        let advisor = build_advisor(&config).unwrap();
        assert_eq!(advisor.describe(), "Ollama (llama3)");
    }
}
