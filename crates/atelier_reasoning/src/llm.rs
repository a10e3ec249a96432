use crate::api_types::{Message, MessagesResponse};
use crate::providers::{MockProvider, OpenAiClient};
use anyhow::Result;
use async_trait::async_trait;
use atelier_core::config::LlmConfig;
use atelier_core::CoreError;
use std::sync::Arc;

/// Parameters for one completion call.
#[derive(Debug, Clone)]
pub struct CompletionParams {
    /// Maximum tokens to generate (will be clamped to provider limits)
    pub max_tokens: u32,
    /// Sampling temperature (0.0 - 2.0)
    pub temperature: f32,
}

impl Default for CompletionParams {
    fn default() -> Self {
        Self {
            max_tokens: 1024,
            temperature: 0.7,
        }
    }
}

impl CompletionParams {
    pub fn from_config(cfg: &LlmConfig) -> Self {
        Self {
            max_tokens: cfg.max_tokens,
            temperature: cfg.temperature,
        }
    }

    /// Short, near-deterministic output for labels and JSON.
    pub fn structured() -> Self {
        Self {
            max_tokens: 64,
            temperature: 0.0,
        }
    }
}

/// The hosted text-generation capability.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send a chat completion request.
    async fn complete(
        &self,
        system: &str,
        messages: Vec<Message>,
        params: CompletionParams,
    ) -> Result<MessagesResponse>;

    fn name(&self) -> &str;
}

/// Create a client backend based on config.
pub fn create_client(cfg: &LlmConfig) -> Result<Arc<dyn LlmClient>> {
    match cfg.provider.as_str() {
        "openai" => Ok(Arc::new(OpenAiClient::from_config(cfg)?)),
        "mock" => Ok(Arc::new(MockProvider::new(&cfg.model))),
        other => Err(CoreError::UnknownBackend {
            kind: "llm.provider",
            value: other.to_string(),
        }
        .into()),
    }
}
