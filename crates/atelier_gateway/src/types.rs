use atelier_core::{FilterSpec, PersonaKey};
use atelier_perception::ImagePayload;
use atelier_reasoning::router::FallbackSnapshot;
use atelier_reasoning::{AnalysisReport, Reply};
use serde::{Deserialize, Serialize};

/// Text turn addressed to a specific persona.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub session_id: String,
    pub message: String,
}

/// Text turn with an attached photo as base64 (a `data:` URL is accepted).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageChatRequest {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub message: String,
    pub image_data: String,
}

impl ImageChatRequest {
    pub fn image(&self) -> ImagePayload {
        ImagePayload::from_base64(self.image_data.as_str())
    }
}

/// One full voice turn: classify, then answer as the chosen persona.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteRequest {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub session_id: String,
    pub message: String,
    #[serde(default)]
    pub image_data: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptRequest {
    pub transcript: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentResponse {
    pub intent: PersonaKey,
}

/// A persona's answer. Flags and attachments are omitted when not set.
#[derive(Debug, Clone, Serialize)]
pub struct PersonaResponse {
    pub response: String,
    pub intent: PersonaKey,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requires_photo: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger_camera: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<AnalysisReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<FilterSpec>,
}

impl From<Reply> for PersonaResponse {
    fn from(reply: Reply) -> Self {
        Self {
            response: reply.text,
            intent: reply.persona,
            requires_photo: reply.requires_photo.then_some(true),
            trigger_camera: reply.trigger_camera.then_some(true),
            analysis: reply.analysis,
            filter: reply.filter,
        }
    }
}

/// Result of `POST /color-analysis`.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ColorAnalysisResponse {
    Dominant {
        dominant_color: String,
        intent: PersonaKey,
    },
    /// The transcript asked for something other than a color analysis.
    Fallback { response: String, intent: PersonaKey },
    Error { error: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
}

/// `GET /` banner.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceBanner {
    pub message: &'static str,
    pub status: &'static str,
    pub personas: Vec<&'static str>,
    pub classifier: String,
    pub responder: String,
    /// Failures absorbed since start-up, by stage.
    pub fallbacks: FallbackSnapshot,
}
