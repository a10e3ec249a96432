//! Persona reply composition.
//!
//! The responder only produces text. Turn recording, image analysis and
//! fallbacks live in the router so both variants behave the same around it.

use crate::api_types::Message;
use crate::llm::{CompletionParams, LlmClient};
use crate::prompts::persona_system_prompt;
use crate::replies::canned_reply;
use anyhow::{Context, Result};
use async_trait::async_trait;
use atelier_core::{CoreError, Persona, Session};
use std::sync::Arc;

#[async_trait]
pub trait Responder: Send + Sync {
    /// Compose a reply for `utterance` in the voice of `persona`.
    ///
    /// `session` holds the turns recorded before this one.
    async fn reply(&self, persona: &Persona, utterance: &str, session: &Session) -> Result<String>;

    fn name(&self) -> &str;
}

/// Scripted replies keyed on the utterance; needs no backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct CannedResponder;

#[async_trait]
impl Responder for CannedResponder {
    async fn reply(&self, persona: &Persona, utterance: &str, _session: &Session) -> Result<String> {
        Ok(canned_reply(persona.key, utterance).to_string())
    }

    fn name(&self) -> &str {
        "canned"
    }
}

/// Model-backed replies carrying the session history as context.
pub struct LlmResponder {
    client: Arc<dyn LlmClient>,
    params: CompletionParams,
}

impl LlmResponder {
    pub fn new(client: Arc<dyn LlmClient>, params: CompletionParams) -> Self {
        Self { client, params }
    }
}

#[async_trait]
impl Responder for LlmResponder {
    async fn reply(&self, persona: &Persona, utterance: &str, session: &Session) -> Result<String> {
        let history = session.history().await;
        let system = persona_system_prompt(persona, &history);

        let mut messages: Vec<Message> = history.iter().map(Message::from).collect();
        messages.push(Message::user(utterance));

        let response = self
            .client
            .complete(&system, messages, self.params.clone())
            .await
            .with_context(|| format!("{} reply failed", persona.name))?;
        Ok(response.text.trim().to_string())
    }

    fn name(&self) -> &str {
        "llm"
    }
}

/// Create a responder backend based on config.
pub fn create_responder(
    backend: &str,
    client: Arc<dyn LlmClient>,
    params: CompletionParams,
) -> Result<Arc<dyn Responder>> {
    match backend {
        "canned" => Ok(Arc::new(CannedResponder)),
        "llm" => Ok(Arc::new(LlmResponder::new(client, params))),
        other => Err(CoreError::UnknownBackend {
            kind: "routing.responder",
            value: other.to_string(),
        }
        .into()),
    }
}
