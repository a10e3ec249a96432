//! OpenAI-compatible chat completions provider.
//!
//! Gemini, Ollama and most hosted gateways expose this API shape, so one
//! client covers them; only the base URL and key change.

use crate::api_types::{Message, MessagesResponse, Role};
use crate::llm::{CompletionParams, LlmClient};
use crate::retry::{with_retry, RetryConfig};
use anyhow::{Context, Result};
use atelier_core::config::LlmConfig;
use reqwest::Client;
use serde_json::{json, Value};
use std::env;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai";

#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
    retry: RetryConfig,
}

impl OpenAiClient {
    pub fn from_config(cfg: &LlmConfig) -> Result<Self> {
        let api_key = env::var(&cfg.api_key_env).ok().filter(|k| !k.is_empty());
        if api_key.is_none() {
            tracing::warn!("{} is not set; requests will be sent without a key", cfg.api_key_env);
        }
        let base_url = cfg
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            client: Client::builder()
                .timeout(cfg.timeout())
                .build()
                .context("Failed to build HTTP client")?,
            api_key,
            base_url,
            model: cfg.model.clone(),
            retry: RetryConfig::default(),
        })
    }

    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}

/// Convert messages to OpenAI format; the system prompt goes first.
fn build_openai_messages(system: &str, messages: &[Message]) -> Vec<Value> {
    let mut openai_messages = Vec::with_capacity(messages.len() + 1);
    if !system.is_empty() {
        openai_messages.push(json!({"role": "system", "content": system}));
    }
    for msg in messages {
        let role = match msg.role {
            Role::User => "user",
            Role::Assistant => "assistant",
        };
        openai_messages.push(json!({"role": role, "content": msg.content}));
    }
    openai_messages
}

/// Parse a non-streaming OpenAI-compatible JSON response.
pub(crate) fn parse_openai_response(resp_json: &Value) -> Result<MessagesResponse> {
    let choice = resp_json["choices"]
        .get(0)
        .context("Response contained no choices")?;
    let text = choice["message"]["content"]
        .as_str()
        .unwrap_or_default()
        .to_string();
    let stop_reason = choice["finish_reason"].as_str().map(|s| s.to_string());
    Ok(MessagesResponse { text, stop_reason })
}

#[async_trait::async_trait]
impl LlmClient for OpenAiClient {
    #[tracing::instrument(skip(self, system, messages, params), fields(model = %self.model))]
    async fn complete(
        &self,
        system: &str,
        messages: Vec<Message>,
        params: CompletionParams,
    ) -> Result<MessagesResponse> {
        let payload = json!({
            "model": self.model,
            "messages": build_openai_messages(system, &messages),
            "temperature": params.temperature,
            "max_tokens": params.max_tokens,
        });

        let url = format!("{}/chat/completions", self.base_url);

        let response = with_retry(&self.retry, "OpenAI-compatible", || {
            let mut request = self.client.post(&url).json(&payload);
            if let Some(key) = &self.api_key {
                request = request.bearer_auth(key);
            }
            async move { request.send().await.map_err(anyhow::Error::from) }
        })
        .await?;

        let resp_json: Value = response
            .json()
            .await
            .context("Failed to parse completion response")?;
        parse_openai_response(&resp_json)
    }

    fn name(&self) -> &str {
        "openai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> OpenAiClient {
        let cfg = LlmConfig {
            base_url: Some(format!("{}/v1/", server.uri())),
            api_key_env: "ATELIER_TEST_UNSET_KEY".into(),
            timeout_secs: 5,
            ..Default::default()
        };
        OpenAiClient::from_config(&cfg).unwrap().with_retry_config(RetryConfig {
            max_attempts: 2,
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(20),
            backoff_factor: 2.0,
        })
    }

    #[test]
    fn test_default_base_url() {
        let client = OpenAiClient::from_config(&LlmConfig::default()).unwrap();
        assert!(client.base_url.contains("generativelanguage"));
        assert_eq!(client.model, "gemini-2.0-flash");
    }

    #[test]
    fn test_parse_text_response() {
        let resp = json!({
            "choices": [{
                "message": { "content": "chat" },
                "finish_reason": "stop"
            }]
        });
        let result = parse_openai_response(&resp).unwrap();
        assert_eq!(result.text, "chat");
        assert_eq!(result.stop_reason, Some("stop".into()));
    }

    #[test]
    fn test_parse_missing_choices_is_error() {
        assert!(parse_openai_response(&json!({"error": "nope"})).is_err());
    }

    #[test]
    fn test_build_messages_puts_system_first() {
        let built = build_openai_messages(
            "You are helpful.",
            &[Message::user("Hi"), Message::assistant("Hello!")],
        );
        assert_eq!(built.len(), 3);
        assert_eq!(built[0]["role"], "system");
        assert_eq!(built[1]["content"], "Hi");
        assert_eq!(built[2]["role"], "assistant");
    }

    #[tokio::test]
    async fn test_complete_against_mock_server() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("content-type", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"content": "take_picture"}, "finish_reason": "stop"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let resp = client_for(&server)
            .complete("classify", vec![Message::user("Take a picture")], CompletionParams::structured())
            .await
            .unwrap();
        assert_eq!(resp.text, "take_picture");
    }

    #[tokio::test]
    async fn test_complete_retries_server_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .expect(2)
            .mount(&server)
            .await;

        let err = client_for(&server)
            .complete("", vec![Message::user("hi")], CompletionParams::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("failed after 2 attempts"));
    }

    #[tokio::test]
    async fn test_complete_does_not_retry_client_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .expect(1)
            .mount(&server)
            .await;

        let err = client_for(&server)
            .complete("", vec![Message::user("hi")], CompletionParams::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("401"));
    }
}
