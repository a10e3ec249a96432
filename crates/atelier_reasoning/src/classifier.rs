//! Intent classification: utterance → persona key.
//!
//! Two interchangeable backends behind one trait:
//! - `KeywordClassifier`: ordered substring cascade, first match wins.
//! - `LlmClassifier`: asks the model for a label and parses it.
//!
//! Both emit the full five-label set. Errors surface from `try_classify`;
//! `PersonaRouter::classify` turns them into `PersonaKey::Chat`.

use crate::api_types::Message;
use crate::llm::{CompletionParams, LlmClient};
use crate::prompts::INTENT_CLASSIFIER_PROMPT;
use anyhow::{Context, Result};
use async_trait::async_trait;
use atelier_core::{CoreError, PersonaKey};
use std::sync::Arc;
use std::time::Duration;

#[async_trait]
pub trait Classifier: Send + Sync {
    /// Classify, surfacing backend failures and unrecognized labels.
    async fn try_classify(&self, utterance: &str) -> Result<PersonaKey>;

    fn name(&self) -> &str;
}

/// One step of the keyword cascade.
#[derive(Debug, Clone, Copy)]
pub struct Rule {
    pub persona: PersonaKey,
    /// Matches when any of these occurs in the lower-cased utterance...
    pub any_of: &'static [&'static str],
    /// ...and none of these do.
    pub none_of: &'static [&'static str],
}

/// Precedence is most-specific first; categories overlap, so order matters.
pub const RULES: &[Rule] = &[
    // Long wardrobe phrases would otherwise be swallowed by color/photo words.
    Rule {
        persona: PersonaKey::WardrobeAnalysis,
        any_of: &[
            "analyze my wardrobe",
            "wardrobe analysis",
            "analyze my closet",
            "what should i wear",
            "outfit suggestion",
            "suggest an outfit",
            "what to wear",
            "choose colors that match",
            "help me choose colors",
            "outfit for work",
            "outfit for",
            "what outfit",
            "closet analysis",
        ],
        none_of: &[],
    },
    Rule {
        persona: PersonaKey::SkinToneAnalysis,
        any_of: &[
            "skin tone",
            "skin color",
            "undertone",
            "color season",
            "colors would look good",
        ],
        none_of: &[],
    },
    Rule {
        persona: PersonaKey::SkinToneAnalysis,
        any_of: &["color analysis", "analyze color"],
        none_of: &["skin", "tone"],
    },
    Rule {
        persona: PersonaKey::TakePicture,
        any_of: &["take", "picture", "photo", "camera", "capture", "snap"],
        none_of: &[],
    },
    Rule {
        persona: PersonaKey::UpdateFilter,
        any_of: &["filter", "show", "cotton", "sustainable", "store", "material"],
        none_of: &[],
    },
];

impl Rule {
    fn matches(&self, text: &str) -> bool {
        self.any_of.iter().any(|p| text.contains(p)) && !self.none_of.iter().any(|p| text.contains(p))
    }
}

/// Rule-based classifier over `RULES`.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordClassifier;

impl KeywordClassifier {
    pub fn new() -> Self {
        Self
    }

    pub fn classify_text(&self, utterance: &str) -> PersonaKey {
        let text = utterance.trim().to_lowercase();
        RULES
            .iter()
            .find(|rule| rule.matches(&text))
            .map(|rule| rule.persona)
            .unwrap_or_default()
    }
}

#[async_trait]
impl Classifier for KeywordClassifier {
    async fn try_classify(&self, utterance: &str) -> Result<PersonaKey> {
        Ok(self.classify_text(utterance))
    }

    fn name(&self) -> &str {
        "keyword"
    }
}

/// Delegates to the model with a fixed labelling prompt.
pub struct LlmClassifier {
    client: Arc<dyn LlmClient>,
    timeout: Duration,
}

impl LlmClassifier {
    pub fn new(client: Arc<dyn LlmClient>, timeout: Duration) -> Self {
        Self { client, timeout }
    }
}

#[async_trait]
impl Classifier for LlmClassifier {
    async fn try_classify(&self, utterance: &str) -> Result<PersonaKey> {
        let call = self.client.complete(
            INTENT_CLASSIFIER_PROMPT,
            vec![Message::user(utterance)],
            CompletionParams::structured(),
        );
        let response = tokio::time::timeout(self.timeout, call)
            .await
            .with_context(|| format!("Intent classification timed out after {:?}", self.timeout))?
            .context("Intent classification LLM call failed")?;

        let label = response.text.trim();
        let key: PersonaKey = label
            .parse()
            .map_err(|e: CoreError| anyhow::anyhow!(e))?;
        tracing::debug!("Model labelled {:?} as {}", utterance, key);
        Ok(key)
    }

    fn name(&self) -> &str {
        "llm"
    }
}

/// Create a classifier backend based on config.
pub fn create_classifier(backend: &str, client: Arc<dyn LlmClient>, timeout: Duration) -> Result<Arc<dyn Classifier>> {
    match backend {
        "keyword" => Ok(Arc::new(KeywordClassifier::new())),
        "llm" => Ok(Arc::new(LlmClassifier::new(client, timeout))),
        other => Err(CoreError::UnknownBackend {
            kind: "routing.classifier",
            value: other.to_string(),
        }
        .into()),
    }
}
