//! Mock LLM provider with deterministic replies, for running without an API key.

use crate::api_types::{Message, MessagesResponse};
use crate::llm::{CompletionParams, LlmClient};
use anyhow::Result;

#[derive(Debug, Clone)]
pub struct MockProvider {
    model: String,
}

impl MockProvider {
    pub fn new(model: &str) -> Self {
        Self {
            model: model.to_string(),
        }
    }
}

#[async_trait::async_trait]
impl LlmClient for MockProvider {
    async fn complete(
        &self,
        _system: &str,
        messages: Vec<Message>,
        _params: CompletionParams,
    ) -> Result<MessagesResponse> {
        let last = messages.last().map(|m| m.content.as_str()).unwrap_or("");
        Ok(MessagesResponse::text(&format!(
            "(Mock {} Response) I received: {}",
            self.model, last
        )))
    }

    fn name(&self) -> &str {
        "mock"
    }
}
