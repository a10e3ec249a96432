//! Filter extraction: utterance → `FilterSpec` via a single structured LLM call.
//!
//! Timeouts, backend errors and answers with no JSON object are errors here;
//! `PersonaRouter::extract_filter` turns them into `FilterSpec::unknown()`.

use crate::api_types::Message;
use crate::llm::{CompletionParams, LlmClient};
use crate::prompts::FILTER_EXTRACTION_PROMPT;
use anyhow::{Context, Result};
use atelier_core::{FilterSpec, FilterType};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

/// Loose shape of the model's answer; values are normalized afterwards.
#[derive(Debug, Deserialize)]
struct RawFilter {
    #[serde(rename = "type", default)]
    filter_type: String,
    #[serde(default)]
    value: serde_json::Value,
}

impl RawFilter {
    fn into_spec(self) -> FilterSpec {
        let filter_type = match self.filter_type.trim().to_lowercase().as_str() {
            "material" => FilterType::Material,
            "store" => FilterType::Store,
            "sustainable" => FilterType::Sustainable,
            _ => FilterType::Unknown,
        };
        let value = match self.value {
            serde_json::Value::String(s) => s.trim().to_string(),
            serde_json::Value::Bool(b) => b.to_string(),
            serde_json::Value::Number(n) => n.to_string(),
            _ => String::new(),
        };
        FilterSpec::new(filter_type, value)
    }
}

pub struct FilterExtractor {
    client: Arc<dyn LlmClient>,
    timeout: Duration,
}

impl FilterExtractor {
    pub fn new(client: Arc<dyn LlmClient>, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// A well-formed answer naming an unsupported type is `Ok(unknown)`.
    pub async fn try_extract(&self, utterance: &str) -> Result<FilterSpec> {
        let call = self.client.complete(
            FILTER_EXTRACTION_PROMPT,
            vec![Message::user(utterance)],
            CompletionParams::structured(),
        );
        let response = tokio::time::timeout(self.timeout, call)
            .await
            .with_context(|| format!("Filter extraction timed out after {:?}", self.timeout))?
            .context("Filter extraction LLM call failed")?;

        let spec = parse_filter_response(&response.text).with_context(|| {
            let preview: String = response.text.chars().take(120).collect();
            format!("Filter extraction answer is not a JSON object: {:?}", preview)
        })?;
        tracing::debug!(?spec, "Extracted filter");
        Ok(spec)
    }
}

/// Parse the model's answer, tolerating code fences and surrounding prose.
/// `None` when no filter object can be found at all.
pub fn parse_filter_response(text: &str) -> Option<FilterSpec> {
    let trimmed = text.trim();

    if let Ok(raw) = serde_json::from_str::<RawFilter>(trimmed) {
        return Some(raw.into_spec());
    }

    // Outermost object, e.g. inside ```json fences
    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if start < end {
            if let Ok(raw) = serde_json::from_str::<RawFilter>(&trimmed[start..=end]) {
                return Some(raw.into_spec());
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api_types::MessagesResponse;
    use async_trait::async_trait;

    #[test]
    fn test_parse_clean_json() {
        let spec = parse_filter_response(r#"{"type": "material", "value": "cotton"}"#);
        assert_eq!(spec, Some(FilterSpec::new(FilterType::Material, "cotton")));
    }

    #[test]
    fn test_parse_code_block_wrapped() {
        let text = "```json\n{\"type\": \"store\", \"value\": \"H&M\"}\n```";
        assert_eq!(parse_filter_response(text), Some(FilterSpec::new(FilterType::Store, "H&M")));
    }

    #[test]
    fn test_parse_boolean_value() {
        let spec = parse_filter_response(r#"{"type": "Sustainable", "value": true}"#);
        assert_eq!(spec, Some(FilterSpec::new(FilterType::Sustainable, "true")));
    }

    #[test]
    fn test_unsupported_type_is_unknown() {
        let spec = parse_filter_response(r#"{"type": "color", "value": "red"}"#).unwrap();
        assert!(spec.is_unknown());
        assert_eq!(spec.value, "");
    }

    #[test]
    fn test_known_type_without_value_is_unknown() {
        assert_eq!(parse_filter_response(r#"{"type": "material", "value": "  "}"#), Some(FilterSpec::unknown()));
        assert_eq!(parse_filter_response(r#"{"type": "material"}"#), Some(FilterSpec::unknown()));
    }

    #[test]
    fn test_explicit_unknown_is_parsed() {
        assert_eq!(
            parse_filter_response(r#"{"type": "unknown", "value": ""}"#),
            Some(FilterSpec::unknown())
        );
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert_eq!(parse_filter_response("I don't know how to parse this"), None);
        assert_eq!(parse_filter_response("} backwards {"), None);
        assert_eq!(parse_filter_response(""), None);
    }

    struct Scripted(&'static str);

    #[async_trait]
    impl LlmClient for Scripted {
        async fn complete(
            &self,
            system: &str,
            messages: Vec<Message>,
            _params: CompletionParams,
        ) -> Result<MessagesResponse> {
            assert_eq!(system, FILTER_EXTRACTION_PROMPT);
            assert_eq!(messages.len(), 1);
            Ok(MessagesResponse::text(self.0))
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    struct Failing;

    #[async_trait]
    impl LlmClient for Failing {
        async fn complete(
            &self,
            _system: &str,
            _messages: Vec<Message>,
            _params: CompletionParams,
        ) -> Result<MessagesResponse> {
            anyhow::bail!("quota exceeded")
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    #[tokio::test]
    async fn test_extract_uses_model_answer() {
        let extractor = FilterExtractor::new(
            Arc::new(Scripted(r#"{"type": "sustainable", "value": "true"}"#)),
            Duration::from_secs(5),
        );
        let spec = extractor.try_extract("Only show sustainable items").await.unwrap();
        assert_eq!(spec, FilterSpec::new(FilterType::Sustainable, "true"));
    }

    #[tokio::test]
    async fn test_extract_backend_failure_is_error() {
        let extractor = FilterExtractor::new(Arc::new(Failing), Duration::from_secs(5));
        assert!(extractor.try_extract("Show me cotton").await.is_err());
    }

    #[tokio::test]
    async fn test_extract_prose_answer_is_error() {
        let extractor = FilterExtractor::new(
            Arc::new(Scripted("Sorry, I can't help with that")),
            Duration::from_secs(5),
        );
        let err = extractor.try_extract("Show me cotton clothes").await.unwrap_err();
        assert!(err.to_string().contains("not a JSON object"));
    }
}
