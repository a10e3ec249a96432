//! `PersonaRouter`: the explicitly constructed dispatcher handed to request
//! handlers. It owns the session store and the backend handles.
//!
//! Every public conversational method answers. Failures are logged at `warn`,
//! counted in `FallbackStats`, and turned into persona-flavored text.

use crate::classifier::{create_classifier, Classifier};
use crate::extraction::FilterExtractor;
use crate::llm::{create_client, CompletionParams, LlmClient};
use crate::replies;
use crate::responder::{create_responder, Responder};
use anyhow::{Context, Result};
use atelier_core::{
    AtelierConfig, ConversationKey, FilterSpec, Persona, PersonaKey, PersonaRegistry, Session,
    SessionPolicy, SessionStore, Speaker,
};
use atelier_perception::{
    analyze_skin_tone, analyze_wardrobe, ImageError, ImagePayload, Rgb, SkinToneAnalysis,
    WardrobeAnalysis,
};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Where a swallowed failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Classification,
    Extraction,
    Response,
    Image,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Classification => "classification",
            Self::Extraction => "extraction",
            Self::Response => "response",
            Self::Image => "image",
        }
    }
}

/// Counters for failures absorbed by the always-answer policy.
#[derive(Debug, Default)]
pub struct FallbackStats {
    classification: AtomicU64,
    extraction: AtomicU64,
    response: AtomicU64,
    image: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FallbackSnapshot {
    pub classification: u64,
    pub extraction: u64,
    pub response: u64,
    pub image: u64,
}

impl FallbackStats {
    pub fn record(&self, stage: Stage) {
        let counter = match stage {
            Stage::Classification => &self.classification,
            Stage::Extraction => &self.extraction,
            Stage::Response => &self.response,
            Stage::Image => &self.image,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> FallbackSnapshot {
        FallbackSnapshot {
            classification: self.classification.load(Ordering::Relaxed),
            extraction: self.extraction.load(Ordering::Relaxed),
            response: self.response.load(Ordering::Relaxed),
            image: self.image.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AnalysisDetails {
    SkinTone(SkinToneAnalysis),
    Wardrobe(WardrobeAnalysis),
}

/// Outcome of analyzing an attached photo.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub analysis_available: bool,
    #[serde(flatten)]
    pub details: Option<AnalysisDetails>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AnalysisReport {
    fn available(details: AnalysisDetails) -> Self {
        Self {
            analysis_available: true,
            details: Some(details),
            error: None,
        }
    }

    fn failed(error: &ImageError) -> Self {
        Self {
            analysis_available: false,
            details: None,
            error: Some(error.to_string()),
        }
    }
}

/// A persona's answer plus side metadata for the client.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reply {
    pub persona: PersonaKey,
    pub text: String,
    /// The persona needs a photo to go further.
    pub requires_photo: bool,
    /// The client should open its camera.
    pub trigger_camera: bool,
    pub analysis: Option<AnalysisReport>,
    pub filter: Option<FilterSpec>,
}

impl Reply {
    fn new(persona: PersonaKey, text: String) -> Self {
        Self {
            persona,
            text,
            requires_photo: false,
            trigger_camera: false,
            analysis: None,
            filter: None,
        }
    }
}

pub struct PersonaRouter {
    classifier: Arc<dyn Classifier>,
    extractor: FilterExtractor,
    responder: Arc<dyn Responder>,
    registry: PersonaRegistry,
    sessions: SessionStore,
    app_name: String,
    /// Per-process suffix so conversation keys never collide across restarts.
    instance: String,
    timeout: Duration,
    stats: FallbackStats,
}

impl PersonaRouter {
    pub fn new(
        classifier: Arc<dyn Classifier>,
        extractor: FilterExtractor,
        responder: Arc<dyn Responder>,
        sessions: SessionStore,
        app_name: &str,
        timeout: Duration,
    ) -> Self {
        Self {
            classifier,
            extractor,
            responder,
            registry: PersonaRegistry::new(),
            sessions,
            app_name: app_name.to_string(),
            instance: uuid::Uuid::new_v4().to_string(),
            timeout,
            stats: FallbackStats::default(),
        }
    }

    /// Build the router and its backends from configuration.
    pub fn from_config(cfg: &AtelierConfig) -> Result<Self> {
        let client = create_client(&cfg.llm).context("Failed to create LLM client")?;
        Self::with_client(cfg, client)
    }

    /// Like `from_config`, with an explicit model client.
    pub fn with_client(cfg: &AtelierConfig, client: Arc<dyn LlmClient>) -> Result<Self> {
        let timeout = cfg.llm.timeout();
        let classifier = create_classifier(&cfg.routing.classifier, client.clone(), timeout)?;
        let responder = create_responder(
            &cfg.routing.responder,
            client.clone(),
            CompletionParams::from_config(&cfg.llm),
        )?;
        tracing::info!(
            classifier = classifier.name(),
            responder = responder.name(),
            llm = client.name(),
            "Persona router ready"
        );
        Ok(Self::new(
            classifier,
            FilterExtractor::new(client, timeout),
            responder,
            SessionStore::new(SessionPolicy::from(&cfg.sessions)),
            &cfg.routing.app_name,
            timeout,
        ))
    }

    pub fn registry(&self) -> &PersonaRegistry {
        &self.registry
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn stats(&self) -> FallbackSnapshot {
        self.stats.snapshot()
    }

    pub fn classifier_name(&self) -> &str {
        self.classifier.name()
    }

    pub fn responder_name(&self) -> &str {
        self.responder.name()
    }

    /// Each persona keeps its own thread for a given user and session.
    pub fn conversation_key(&self, persona: PersonaKey, user_id: &str, session_id: &str) -> ConversationKey {
        let app = format!("{}-{}-{}", self.app_name, persona, self.instance);
        ConversationKey::new(&app, user_id, session_id)
    }

    /// Utterance → persona key. Never fails.
    pub async fn classify(&self, utterance: &str) -> PersonaKey {
        match self.classifier.try_classify(utterance).await {
            Ok(key) => {
                tracing::debug!(intent = %key, "Classified utterance");
                key
            }
            Err(e) => {
                self.absorb(Stage::Classification, PersonaKey::Chat, &e);
                PersonaKey::Chat
            }
        }
    }

    /// Utterance → filter. Never fails.
    pub async fn extract_filter(&self, utterance: &str) -> FilterSpec {
        match self.extractor.try_extract(utterance).await {
            Ok(filter) => filter,
            Err(e) => {
                self.absorb(Stage::Extraction, PersonaKey::UpdateFilter, &e);
                FilterSpec::unknown()
            }
        }
    }

    /// Answer `utterance` as `persona`, analyzing `image` when the persona
    /// accepts one. Records the user and assistant turns in the session.
    pub async fn respond(
        &self,
        persona: PersonaKey,
        utterance: &str,
        user_id: &str,
        session_id: &str,
        image: Option<ImagePayload>,
    ) -> Reply {
        let key = self.conversation_key(persona, user_id, session_id);
        let session = self.sessions.get_or_create(&key).await;
        let profile = self.registry.get(persona);

        let reply = match (persona, image) {
            (PersonaKey::UpdateFilter, _) => {
                let filter = self.extract_filter(utterance).await;
                let mut reply = Reply::new(persona, replies::filter_reply(&filter));
                reply.filter = Some(filter);
                reply
            }
            (p, Some(image)) if p.accepts_image() => self.analyze(p, image).await,
            (p, _) => {
                let mut reply = Reply::new(p, self.compose(profile, utterance, &session).await);
                reply.requires_photo = p.accepts_image();
                reply.trigger_camera = p == PersonaKey::TakePicture;
                reply
            }
        };

        session.record(Speaker::User, utterance).await;
        session.record(Speaker::Assistant, &reply.text).await;
        tracing::info!(
            persona = %persona,
            conversation = %key,
            requires_photo = reply.requires_photo,
            trigger_camera = reply.trigger_camera,
            "Persona replied"
        );
        reply
    }

    /// Classify then respond: one full voice turn.
    pub async fn route(
        &self,
        utterance: &str,
        user_id: &str,
        session_id: &str,
        image: Option<ImagePayload>,
    ) -> Reply {
        let persona = self.classify(utterance).await;
        self.respond(persona, utterance, user_id, session_id, image).await
    }

    /// Most common pixel of the analysis grid.
    pub async fn dominant_color(&self, image: ImagePayload) -> Result<Rgb> {
        let rgb = tokio::task::spawn_blocking(move || {
            image.decode_grid().map(|grid| grid.dominant_color())
        })
        .await
        .context("Image analysis task panicked")??;
        Ok(rgb)
    }

    async fn compose(&self, persona: &Persona, utterance: &str, session: &Session) -> String {
        let call = self.responder.reply(persona, utterance, session);
        let result = match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(anyhow::anyhow!("{} reply timed out after {:?}", persona.name, self.timeout)),
        };
        match result {
            Ok(text) if text.trim().is_empty() => {
                tracing::debug!(persona = %persona.key, "Empty reply, using fallback");
                persona.fallback_reply.to_string()
            }
            Ok(text) => text,
            Err(e) => {
                self.absorb(Stage::Response, persona.key, &e);
                persona.apology.to_string()
            }
        }
    }

    async fn analyze(&self, persona: PersonaKey, image: ImagePayload) -> Reply {
        let outcome = tokio::task::spawn_blocking(move || match persona {
            PersonaKey::WardrobeAnalysis => analyze_wardrobe(&image).map(AnalysisDetails::Wardrobe),
            _ => analyze_skin_tone(&image).map(AnalysisDetails::SkinTone),
        })
        .await;

        let (text, report) = match outcome {
            Ok(Ok(details)) => {
                let text = match &details {
                    AnalysisDetails::SkinTone(a) => replies::skin_tone_reply(a),
                    AnalysisDetails::Wardrobe(a) => replies::wardrobe_reply(a),
                };
                (text, AnalysisReport::available(details))
            }
            Ok(Err(e)) => {
                self.absorb(Stage::Image, persona, &anyhow::anyhow!("{}", e));
                (replies::analysis_failed_reply().to_string(), AnalysisReport::failed(&e))
            }
            Err(join) => {
                let e = anyhow::Error::new(join).context("Image analysis task panicked");
                self.absorb(Stage::Response, persona, &e);
                (
                    self.registry.get(persona).apology.to_string(),
                    AnalysisReport {
                        analysis_available: false,
                        details: None,
                        error: Some(format!("{:#}", e)),
                    },
                )
            }
        };

        let mut reply = Reply::new(persona, text);
        reply.analysis = Some(report);
        reply
    }

    fn absorb(&self, stage: Stage, persona: PersonaKey, error: &anyhow::Error) {
        self.stats.record(stage);
        tracing::warn!(
            stage = stage.as_str(),
            persona = %persona,
            error = %format!("{:#}", error),
            "Recovered from failure"
        );
    }
}
