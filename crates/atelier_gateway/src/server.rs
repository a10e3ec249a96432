use crate::types::{
    ChatRequest, ChatResponse, ColorAnalysisResponse, HealthResponse, ImageChatRequest,
    IntentResponse, PersonaResponse, RouteRequest, ServiceBanner, TranscriptRequest,
};
use anyhow::{Context, Result};
use atelier_core::config::ServerConfig;
use atelier_core::{FilterSpec, PersonaKey};
use atelier_perception::ImagePayload;
use atelier_reasoning::PersonaRouter;
use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::HeaderValue,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

const SERVICE_NAME: &str = "Atelier Fashion API";

/// Photos are sent inline; the default 2 MB body limit is too small for phone images.
const MAX_IMAGE_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Shared state for the gateway server.
#[derive(Clone)]
struct AppState {
    router: Arc<PersonaRouter>,
}

/// The gateway HTTP server.
///
/// Every conversational endpoint answers 200; failures come back as
/// persona text or an `{error}` body.
pub struct GatewayServer {
    router: Arc<PersonaRouter>,
    origins: Vec<String>,
    /// Bind address.
    host: String,
    port: u16,
}

impl GatewayServer {
    pub fn new(router: Arc<PersonaRouter>, cfg: &ServerConfig) -> Self {
        Self {
            router,
            origins: cfg.cors_origins(),
            host: cfg.host.clone(),
            port: cfg.port,
        }
    }

    /// Build the axum application. Exposed for in-process tests.
    pub fn app(&self) -> Router {
        let state = AppState {
            router: self.router.clone(),
        };

        let image_routes = Router::new()
            .route("/skin-tone-analysis-with-image", post(skin_tone_with_image))
            .route("/wardrobe-analysis-with-image", post(wardrobe_with_image))
            .route("/color-analysis", post(color_analysis))
            .route("/route", post(route_turn))
            .layer(DefaultBodyLimit::max(MAX_IMAGE_BODY_BYTES));

        Router::new()
            .route("/", get(banner))
            .route("/health", get(health))
            .route("/chat", post(chat))
            .route("/classify-intent", post(classify_intent))
            .route("/extract-filter", post(extract_filter))
            .route("/skin-tone-analysis", post(skin_tone))
            .route("/take-picture", post(take_picture))
            .route("/wardrobe-analysis", post(wardrobe))
            .merge(image_routes)
            .layer(cors_layer(&self.origins))
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }

    /// Bind and serve in a background task.
    ///
    /// Binding happens before returning, so an occupied port is reported here.
    pub async fn start(self) -> Result<tokio::task::JoinHandle<()>> {
        let addr = format!("{}:{}", self.host, self.port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Gateway failed to bind {}", addr))?;
        let app = self.app();

        tracing::info!("Gateway listening on {}", addr);
        tracing::info!("CORS origins: {:?}", self.origins);
        Ok(tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!("Gateway server error: {}", e);
            }
        }))
    }
}

/// Explicit origin list; credentials allowed, methods and headers mirrored.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("Ignoring invalid CORS origin {:?}: {}", origin, e);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

// ============================================================================
// Route handlers
// ============================================================================

async fn banner(State(state): State<AppState>) -> Json<ServiceBanner> {
    let router = &state.router;
    Json(ServiceBanner {
        message: "Fashion API is running! 💅✨",
        status: "ready",
        personas: router.registry().names(),
        classifier: router.classifier_name().to_string(),
        responder: router.responder_name().to_string(),
        fallbacks: router.stats(),
    })
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: SERVICE_NAME,
    })
}

async fn chat(State(state): State<AppState>, Json(req): Json<ChatRequest>) -> Json<ChatResponse> {
    tracing::info!("Chat request from user {}: {}", req.user_id, req.message);
    let reply = state
        .router
        .respond(PersonaKey::Chat, &req.message, &req.user_id, &req.session_id, None)
        .await;
    Json(ChatResponse { response: reply.text })
}

async fn classify_intent(
    State(state): State<AppState>,
    Json(req): Json<TranscriptRequest>,
) -> Json<IntentResponse> {
    let intent = state.router.classify(&req.transcript).await;
    tracing::info!("Classified {:?} as {}", req.transcript, intent);
    Json(IntentResponse { intent })
}

async fn extract_filter(
    State(state): State<AppState>,
    Json(req): Json<TranscriptRequest>,
) -> Json<FilterSpec> {
    Json(state.router.extract_filter(&req.transcript).await)
}

/// Text-only turn for a fixed persona.
async fn persona_turn(state: &AppState, persona: PersonaKey, req: ChatRequest) -> Json<PersonaResponse> {
    tracing::info!("{} request from user {}: {}", persona, req.user_id, req.message);
    let reply = state
        .router
        .respond(persona, &req.message, &req.user_id, &req.session_id, None)
        .await;
    Json(reply.into())
}

/// Photo turn for a fixed persona.
async fn image_turn(state: &AppState, persona: PersonaKey, req: ImageChatRequest) -> Json<PersonaResponse> {
    tracing::info!(
        "{} request with image from user {} ({} base64 chars)",
        persona,
        req.user_id,
        req.image_data.len()
    );
    let image = req.image();
    let reply = state
        .router
        .respond(persona, &req.message, &req.user_id, &req.session_id, Some(image))
        .await;
    Json(reply.into())
}

async fn skin_tone(State(state): State<AppState>, Json(req): Json<ChatRequest>) -> Json<PersonaResponse> {
    persona_turn(&state, PersonaKey::SkinToneAnalysis, req).await
}

async fn take_picture(State(state): State<AppState>, Json(req): Json<ChatRequest>) -> Json<PersonaResponse> {
    persona_turn(&state, PersonaKey::TakePicture, req).await
}

async fn wardrobe(State(state): State<AppState>, Json(req): Json<ChatRequest>) -> Json<PersonaResponse> {
    persona_turn(&state, PersonaKey::WardrobeAnalysis, req).await
}

async fn skin_tone_with_image(
    State(state): State<AppState>,
    Json(req): Json<ImageChatRequest>,
) -> Json<PersonaResponse> {
    image_turn(&state, PersonaKey::SkinToneAnalysis, req).await
}

async fn wardrobe_with_image(
    State(state): State<AppState>,
    Json(req): Json<ImageChatRequest>,
) -> Json<PersonaResponse> {
    image_turn(&state, PersonaKey::WardrobeAnalysis, req).await
}

async fn route_turn(State(state): State<AppState>, Json(req): Json<RouteRequest>) -> Json<PersonaResponse> {
    let image = req
        .image_data
        .filter(|data| !data.trim().is_empty())
        .map(ImagePayload::from_base64);
    let reply = state
        .router
        .route(&req.message, &req.user_id, &req.session_id, image)
        .await;
    Json(reply.into())
}

/// Multipart form fields of `POST /color-analysis`.
#[derive(Debug, Default)]
struct ColorForm {
    file: Option<Vec<u8>>,
    transcript: Option<String>,
    user_id: Option<String>,
    session_id: Option<String>,
}

impl ColorForm {
    async fn read(mut multipart: Multipart) -> Result<Self> {
        let mut form = Self::default();
        while let Some(field) = multipart.next_field().await.context("Malformed multipart body")? {
            let name = field.name().map(str::to_owned);
            match name.as_deref() {
                Some("file") => {
                    let bytes = field.bytes().await.context("Failed to read uploaded file")?;
                    form.file = Some(bytes.to_vec());
                }
                Some("transcript") => form.transcript = Some(field.text().await?),
                Some("user_id") => form.user_id = Some(field.text().await?),
                Some("session_id") => form.session_id = Some(field.text().await?),
                other => tracing::debug!("Ignoring multipart field {:?}", other),
            }
        }
        Ok(form)
    }
}

async fn color_analysis(State(state): State<AppState>, multipart: Multipart) -> Json<ColorAnalysisResponse> {
    match color_analysis_inner(&state, multipart).await {
        Ok(response) => Json(response),
        Err(e) => {
            tracing::warn!("Color analysis error: {:#}", e);
            Json(ColorAnalysisResponse::Error {
                error: format!("Color analysis failed: {:#}", e),
            })
        }
    }
}

async fn color_analysis_inner(state: &AppState, multipart: Multipart) -> Result<ColorAnalysisResponse> {
    let form = ColorForm::read(multipart).await?;

    if let Some(transcript) = form.transcript.as_deref().filter(|t| !t.trim().is_empty()) {
        let intent = state.router.classify(transcript).await;
        if intent != PersonaKey::SkinToneAnalysis {
            let user_id = form.user_id.as_deref().unwrap_or("color_user");
            let session_id = form.session_id.as_deref().unwrap_or("color_session");
            let reply = state
                .router
                .respond(PersonaKey::Chat, transcript, user_id, session_id, None)
                .await;
            return Ok(ColorAnalysisResponse::Fallback {
                response: reply.text,
                intent,
            });
        }
    }

    let file = form.file.context("No image file uploaded")?;
    let dominant = state
        .router
        .dominant_color(ImagePayload::Bytes(file))
        .await?
        .hex();
    tracing::info!("Color analysis result: {}", dominant);
    Ok(ColorAnalysisResponse::Dominant {
        dominant_color: dominant,
        intent: PersonaKey::SkinToneAnalysis,
    })
}
