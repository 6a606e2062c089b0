//! LLM integration for Goaler.
//!
//! Talks to any OpenAI-compatible chat-completions endpoint over reqwest.
//! Transient failures are retried by wrapping the provider in `RetryProvider`.

pub mod openai;
pub mod provider;
pub mod reasoning;
pub mod retry;
pub mod usage;

pub use openai::OpenAiProvider;
pub use provider::*;
pub use reasoning::{ModelStep, Reasoning, StepOutput};
pub use retry::{RetryPolicy, RetryProvider};
pub use usage::{UsageLog, UsageRecord, UsageSummary};

use std::sync::Arc;

use crate::error::LlmError;

/// Configuration for creating an LLM provider.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: secrecy::SecretString,
    pub model: String,
    pub base_url: String,
}

/// Create the retrying OpenAI-compatible provider from configuration.
pub fn create_provider(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
    let inner = OpenAiProvider::new(&config.base_url, config.api_key.clone(), &config.model)?;
    tracing::info!("Using OpenAI-compatible API (model: {})", config.model);
    Ok(Arc::new(RetryProvider::new(
        Arc::new(inner),
        RetryPolicy::default(),
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_provider_without_network() {
        let config = LlmConfig {
            api_key: secrecy::SecretString::from("sk-test"),
            model: "gpt-4o-mini".to_string(),
            base_url: "https://api.openai.com/v1/".to_string(),
        };
        let provider = create_provider(&config).unwrap();
        assert_eq!(provider.model_name(), "gpt-4o-mini");
    }
}
