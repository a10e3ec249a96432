//! Integration tests for the PersonaRouter.
//!
//! A queued mock client stands in for the hosted model so the full
//! classify → respond pipeline runs without network calls.

use anyhow::Result;
use async_trait::async_trait;
use atelier_core::{AtelierConfig, FilterSpec, FilterType, PersonaKey};
use atelier_perception::ImagePayload;
use atelier_reasoning::api_types::{Message, MessagesResponse, Role};
use atelier_reasoning::llm::{CompletionParams, LlmClient};
use atelier_reasoning::PersonaRouter;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use image::{ImageFormat, Rgb, RgbImage};
use std::io::Cursor;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use std::time::Duration;
use tokio::sync::Mutex;

// ============================================================================
// Mock LLM Client
// ============================================================================

/// Pops one queued answer per call and remembers what it was sent.
/// An exhausted queue answers with empty text.
struct QueuedClient {
    responses: Mutex<Vec<&'static str>>,
    requests: Mutex<Vec<(String, Vec<Message>)>>,
    call_count: AtomicUsize,
}

impl QueuedClient {
    fn new(mut responses: Vec<&'static str>) -> Self {
        responses.reverse();
        Self {
            responses: Mutex::new(responses),
            requests: Mutex::new(Vec::new()),
            call_count: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmClient for QueuedClient {
    async fn complete(
        &self,
        system: &str,
        messages: Vec<Message>,
        _params: CompletionParams,
    ) -> Result<MessagesResponse> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().await.push((system.to_string(), messages));
        let next = self.responses.lock().await.pop().unwrap_or("");
        Ok(MessagesResponse::text(next))
    }

    fn name(&self) -> &str {
        "queued"
    }
}

/// Never answers.
struct StalledClient;

#[async_trait]
impl LlmClient for StalledClient {
    async fn complete(
        &self,
        _system: &str,
        _messages: Vec<Message>,
        _params: CompletionParams,
    ) -> Result<MessagesResponse> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(MessagesResponse::text("chat"))
    }

    fn name(&self) -> &str {
        "stalled"
    }
}

fn llm_config() -> AtelierConfig {
    let mut cfg = AtelierConfig::default();
    cfg.routing.classifier = "llm".into();
    cfg.routing.responder = "llm".into();
    cfg.llm.timeout_secs = 5;
    cfg
}

fn png_base64(color: [u8; 3]) -> String {
    let img = RgbImage::from_pixel(32, 32, Rgb(color));
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png).unwrap();
    format!("data:image/png;base64,{}", BASE64.encode(buf.into_inner()))
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_llm_pipeline_classifies_then_replies_with_history() {
    let client = Arc::new(QueuedClient::new(vec![
        "chat",
        "Hey gorgeous!",
        "chat",
        "Oversized blazers, babe.",
    ]));
    let router = PersonaRouter::with_client(&llm_config(), client.clone()).unwrap();

    let first = router.route("hello", "u1", "s1", None).await;
    assert_eq!(first.persona, PersonaKey::Chat);
    assert_eq!(first.text, "Hey gorgeous!");

    let second = router.route("what's trending?", "u1", "s1", None).await;
    assert_eq!(second.text, "Oversized blazers, babe.");
    assert_eq!(client.calls(), 4);

    // The second reply saw the first exchange as context.
    let requests = client.requests.lock().await;
    let (system, messages) = &requests[3];
    assert!(system.contains("FASHIONISTA"));
    let roles: Vec<Role> = messages.iter().map(|m| m.role).collect();
    assert_eq!(roles, vec![Role::User, Role::Assistant, Role::User]);
    assert_eq!(messages[1].content, "Hey gorgeous!");
}

#[tokio::test]
async fn test_llm_pipeline_routes_filter_requests_to_extractor() {
    let client = Arc::new(QueuedClient::new(vec![
        "update_filter",
        "```json\n{\"type\": \"sustainable\", \"value\": \"true\"}\n```",
    ]));
    let router = PersonaRouter::with_client(&llm_config(), client.clone()).unwrap();

    let reply = router.route("Only show sustainable items", "u", "s", None).await;
    assert_eq!(reply.persona, PersonaKey::UpdateFilter);
    assert_eq!(reply.filter, Some(FilterSpec::new(FilterType::Sustainable, "true")));
    assert_eq!(client.calls(), 2);
}

#[tokio::test]
async fn test_prose_filter_answer_is_counted_as_fallback() {
    let client = Arc::new(QueuedClient::new(vec![
        "Sorry, I can't help with that",
        r#"{"type": "unknown", "value": ""}"#,
    ]));
    let router = PersonaRouter::with_client(&llm_config(), client).unwrap();

    assert!(router.extract_filter("Show me cotton clothes").await.is_unknown());
    assert_eq!(router.stats().extraction, 1);

    // A well-formed "unknown" is an answer, not a failure.
    assert!(router.extract_filter("Show me something nice").await.is_unknown());
    assert_eq!(router.stats().extraction, 1);
}

#[tokio::test]
async fn test_unknown_label_and_empty_reply_still_answer() {
    let client = Arc::new(QueuedClient::new(vec!["fortune_telling", ""]));
    let router = PersonaRouter::with_client(&llm_config(), client).unwrap();

    let reply = router.route("read my palm", "u", "s", None).await;
    assert_eq!(reply.persona, PersonaKey::Chat);
    assert_eq!(reply.text, router.registry().get(PersonaKey::Chat).fallback_reply);
    assert_eq!(router.stats().classification, 1);
}

#[tokio::test(start_paused = true)]
async fn test_stalled_backend_times_out_to_defaults() {
    let router = PersonaRouter::with_client(&llm_config(), Arc::new(StalledClient)).unwrap();

    assert_eq!(router.classify("Take a picture").await, PersonaKey::Chat);
    assert!(router.extract_filter("Show me cotton").await.is_unknown());

    let reply = router.respond(PersonaKey::Chat, "hello", "u", "s", None).await;
    assert!(reply.text.starts_with("Oops!"));

    let stats = router.stats();
    assert_eq!(stats.classification, 1);
    assert_eq!(stats.extraction, 1);
    assert_eq!(stats.response, 1);
}

#[tokio::test]
async fn test_skin_tone_photo_is_analyzed() {
    let router = PersonaRouter::with_client(&AtelierConfig::default(), Arc::new(QueuedClient::new(vec![])))
        .unwrap();
    let image = ImagePayload::from_base64(png_base64([210, 160, 120]));

    let reply = router.route("What's my skin tone?", "u", "s", Some(image)).await;
    assert_eq!(reply.persona, PersonaKey::SkinToneAnalysis);
    let analysis = serde_json::to_value(reply.analysis.unwrap()).unwrap();
    assert_eq!(analysis["analysis_available"], true);
    assert_eq!(analysis["undertone"], "warm");
    assert_eq!(analysis["average_rgb"]["r"], 210);
    assert!(reply.text.contains("warm undertones"));
}

#[tokio::test]
async fn test_wardrobe_photo_is_bucketed() {
    let router = PersonaRouter::with_client(&AtelierConfig::default(), Arc::new(QueuedClient::new(vec![])))
        .unwrap();
    let image = ImagePayload::from_base64(png_base64([20, 20, 30]));

    let reply = router
        .respond(PersonaKey::WardrobeAnalysis, "analyze my wardrobe", "u", "s", Some(image))
        .await;
    let analysis = serde_json::to_value(reply.analysis.unwrap()).unwrap();
    assert_eq!(analysis["color_variety"], "low");
    assert_eq!(analysis["brightness"], "dark");
    assert!(!reply.requires_photo);
}

#[tokio::test]
async fn test_dominant_color_of_solid_image() {
    let router = PersonaRouter::with_client(&AtelierConfig::default(), Arc::new(QueuedClient::new(vec![])))
        .unwrap();
    let rgb = router
        .dominant_color(ImagePayload::from_base64(png_base64([255, 0, 128])))
        .await
        .unwrap();
    assert_eq!(rgb.hex(), "#ff0080");

    assert!(router.dominant_color(ImagePayload::Bytes(vec![0; 4])).await.is_err());
}

#[tokio::test]
async fn test_concurrent_first_turns_share_one_session() {
    let router = Arc::new(
        PersonaRouter::with_client(&AtelierConfig::default(), Arc::new(QueuedClient::new(vec![]))).unwrap(),
    );
    let mut handles = Vec::new();
    for _ in 0..16 {
        let router = router.clone();
        handles.push(tokio::spawn(async move {
            router.respond(PersonaKey::TakePicture, "snap", "u", "s", None).await
        }));
    }
    for handle in handles {
        assert!(handle.await.unwrap().trigger_camera);
    }

    assert_eq!(router.sessions().len().await, 1);
    let key = router.conversation_key(PersonaKey::TakePicture, "u", "s");
    let session = router.sessions().get_or_create(&key).await;
    assert_eq!(session.turn_count().await, 20);
}
