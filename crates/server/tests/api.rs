use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use quill_core::{
    Config, GenerationError, GenerationErrorKind, GenerationRequest, LanguageModel, LlmConfig,
    ModelTier, PromptRegistry,
};
use quill_server::{build_router, AppState, ModelProvider};
use serde_json::{json, Value};
use tower::ServiceExt;

const VALID_KEY: &str = "AIzaSyA1234567890abcdefghijklmnopqrstu";

/// Hands out models that pop canned replies from a shared queue. An empty
/// queue behaves like a dropped connection.
#[derive(Clone, Default)]
struct ScriptedProvider {
    replies: Arc<Mutex<VecDeque<String>>>,
    calls: Arc<Mutex<Vec<(ModelTier, u32, Option<f32>)>>>,
    client_timeouts: Arc<Mutex<Vec<u64>>>,
    delay: Option<Duration>,
}

impl ScriptedProvider {
    fn with_replies(replies: &[&str]) -> Self {
        let provider = Self::default();
        provider
            .replies
            .lock()
            .unwrap()
            .extend(replies.iter().map(|reply| reply.to_string()));
        provider
    }
}

struct ScriptedModel(ScriptedProvider);

impl LanguageModel for ScriptedModel {
    fn generate(&self, request: &GenerationRequest<'_>) -> Result<String, GenerationError> {
        if let Some(delay) = self.0.delay {
            std::thread::sleep(delay);
        }
        self.0
            .calls
            .lock()
            .unwrap()
            .push((request.tier, request.max_tokens, request.temperature));
        self.0
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| GenerationError::new(GenerationErrorKind::Network, "connection reset"))
    }
}

impl ModelProvider for ScriptedProvider {
    fn connect(&self, llm: &LlmConfig) -> Result<Box<dyn LanguageModel>, GenerationError> {
        self.client_timeouts.lock().unwrap().push(llm.timeout);
        if !llm.has_api_key() {
            return Err(GenerationError::missing_key());
        }
        Ok(Box::new(ScriptedModel(self.clone())))
    }
}

fn app_with(provider: ScriptedProvider, config: Config) -> Router {
    let prompts = PromptRegistry::new().unwrap();
    build_router(AppState::with_provider(config, prompts, Arc::new(provider)))
}

fn app(provider: ScriptedProvider) -> Router {
    app_with(provider, Config::default())
}

fn keyed_config() -> Config {
    let mut config = Config::default();
    config.llm.api_key = VALID_KEY.to_string();
    config
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.unwrap()
}

async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn test_story() -> Value {
    json!({
        "title": "Test",
        "genre": "Fantasy",
        "plotOutline": "A quest",
        "chapters": [
            {"id": "c1", "chapterNumber": 1, "title": "Intro", "content": "Hello world", "wordCount": 2, "status": "draft"}
        ]
    })
}

fn long_text() -> String {
    "The lanterns burned low as the caravan crossed the salt flats. ".repeat(4)
}

#[tokio::test]
async fn short_key_is_rejected_and_not_stored() {
    let app = app(ScriptedProvider::default());

    let response = send(&app, post_json("/api/configure-api-key", json!({"apiKey": "short"}))).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(response).await,
        json!({
            "valid": false,
            "error": "Invalid API key format. Gemini API keys should start with 'AIza'."
        })
    );

    let check = Request::get("/api/check-api-key").body(Body::empty()).unwrap();
    let response = send(&app, check).await;
    assert_eq!(json_body(response).await, json!({"configured": false}));
}

#[tokio::test]
async fn configure_key_reports_each_input_problem() {
    let app = app(ScriptedProvider::default());

    let cases = [
        (json!({}), "API key is required"),
        (json!({"apiKey": 17}), "API key must be a string"),
        (json!({"apiKey": "   "}), "API key cannot be empty"),
        (
            json!({"apiKey": "AIzaShort"}),
            "API key appears to be too short. Please check your key.",
        ),
    ];
    for (body, error) in cases {
        let response = send(&app, post_json("/api/configure-api-key", body)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], error);
    }

    let malformed = Request::post("/api/configure-api-key")
        .body(Body::from("{apiKey:"))
        .unwrap();
    let response = send(&app, malformed).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(response).await["error"],
        "Invalid request format. Please send valid JSON."
    );

    let response = send(
        &app,
        Request::get("/api/configure-api-key").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn configured_key_enables_generation() {
    let provider = ScriptedProvider::with_replies(&[&long_text()]);
    let app = app(provider.clone());

    let body = json!({
        "storyData": test_story(),
        "chapterTitle": "Crossing",
        "chapterSummary": "The caravan crosses the flats",
        "previousChapters": [],
        "chapterNumber": 2
    });
    let response = send(&app, post_json("/api/generate-chapter", body.clone())).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(response).await["error"],
        "Gemini API key not configured. Please configure your API key first."
    );

    let response = send(&app, post_json("/api/configure-api-key", json!({"apiKey": VALID_KEY}))).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["valid"], true);

    let response = send(&app, post_json("/api/generate-chapter", body)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["content"], long_text());

    let calls = provider.calls.lock().unwrap().clone();
    assert_eq!(calls, vec![(ModelTier::Quality, 4000, Some(0.7))]);
}

#[tokio::test]
async fn chapter_endpoints_validate_input_and_classify_failures() {
    let provider = ScriptedProvider::with_replies(&["too short"]);
    let app = app_with(provider, keyed_config());

    let response = send(
        &app,
        post_json(
            "/api/generate-chapter",
            json!({"storyData": test_story(), "chapterTitle": "", "chapterSummary": "x"}),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(response).await["error"],
        "Missing required story data, chapter title, or summary"
    );

    let response = send(
        &app,
        post_json(
            "/api/generate-chapter-simple",
            json!({"chapterTitle": "Intro", "chapterSummary": "It begins", "storyGenre": "Horror"}),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(
        json_body(response).await["error"],
        "Generated content is too short or empty"
    );

    // queue is now empty, so the edit call fails like a dropped connection
    let response = send(
        &app,
        post_json(
            "/api/ai-edit-chapter",
            json!({
                "storyData": test_story(),
                "chapter": {"chapterNumber": 1, "title": "Intro", "content": "Hello world"},
                "editInstructions": "More tension"
            }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert!(json_body(response).await["error"]
        .as_str()
        .unwrap()
        .starts_with("Network connection error"));
}

#[tokio::test]
async fn edit_returns_edited_content_without_temperature() {
    let provider = ScriptedProvider::with_replies(&["A sharper opening."]);
    let app = app_with(provider.clone(), keyed_config());

    let response = send(
        &app,
        post_json(
            "/api/ai-edit-chapter",
            json!({
                "storyData": test_story(),
                "chapter": {"chapterNumber": 1, "title": "Intro", "content": "Hello world"},
                "editInstructions": "Tighten"
            }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await,
        json!({"editedContent": "A sharper opening."})
    );
    assert_eq!(
        provider.calls.lock().unwrap()[0],
        (ModelTier::Quality, 4000, None)
    );
}

#[tokio::test]
async fn suggestions_fall_back_without_a_key() {
    let app = app(ScriptedProvider::default());

    let response = send(
        &app,
        post_json("/api/enhance-story-outline", json!({"storyData": test_story()})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["fallback"], true);
    assert!(body.get("message").is_none());
    assert!(!body["enhancedOutline"].as_str().unwrap().is_empty());

    let response = send(
        &app,
        post_json("/api/generate-font-recommendations", json!({"storyData": test_story()})),
    )
    .await;
    let body = json_body(response).await;
    assert_eq!(body["fallback"], true);
    assert_eq!(body["recommendations"].as_array().unwrap().len(), 6);
}

#[tokio::test]
async fn character_suggestions_fall_back_on_provider_failure() {
    let app = app_with(ScriptedProvider::default(), keyed_config());

    let response = send(
        &app,
        post_json(
            "/api/generate-character-suggestions",
            json!({"storyData": test_story(), "characterCount": 3}),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["fallback"], true);
    assert_eq!(body["message"], "Using default character suggestions");
    let characters = body["characters"].as_array().unwrap();
    assert_eq!(characters.len(), 3);
    assert_eq!(characters[0]["role"], "Protagonist");
    assert_eq!(characters[1]["role"], "Antagonist");
}

#[tokio::test]
async fn character_suggestions_use_model_reply() {
    let reply = r#"```json
[{"name": "Mira Vale", "role": "Protagonist", "description": "A cartographer"}]
```"#;
    let app = app_with(ScriptedProvider::with_replies(&[reply]), keyed_config());

    let response = send(
        &app,
        post_json("/api/generate-character-suggestions", json!({"storyData": test_story()})),
    )
    .await;
    let body = json_body(response).await;
    assert!(body.get("fallback").is_none());
    assert_eq!(body["characters"][0]["name"], "Mira Vale");
    assert!(body["characters"][0]["id"].as_str().unwrap().starts_with("ai-"));
}

#[tokio::test]
async fn client_timeout_is_capped_by_request_deadline() {
    let provider = ScriptedProvider::with_replies(&["Garamond", "Baskerville"]);
    let timeouts = Arc::clone(&provider.client_timeouts);

    let mut config = keyed_config();
    config.llm.timeout = 120;
    config.server.request_timeout_secs = 5;
    let app = app_with(provider.clone(), config);
    send(
        &app,
        post_json("/api/generate-font-recommendations", json!({"storyData": test_story()})),
    )
    .await;

    let mut config = keyed_config();
    config.llm.timeout = 10;
    config.server.request_timeout_secs = 30;
    let app = app_with(provider, config);
    send(
        &app,
        post_json("/api/generate-font-recommendations", json!({"storyData": test_story()})),
    )
    .await;

    assert_eq!(*timeouts.lock().unwrap(), vec![5, 10]);
}

#[tokio::test]
async fn slow_models_time_out_into_fallbacks() {
    let provider = ScriptedProvider {
        delay: Some(Duration::from_millis(2500)),
        ..ScriptedProvider::with_replies(&["Garamond"])
    };
    let mut config = keyed_config();
    config.server.request_timeout_secs = 1;
    let app = app_with(provider, config);

    let response = send(
        &app,
        post_json("/api/generate-font-recommendations", json!({"storyData": test_story()})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["fallback"], true);
    assert_eq!(body["message"], "Using default font recommendations");
}

#[tokio::test]
async fn export_pdf_returns_attachment() {
    let app = app(ScriptedProvider::default());

    let response = send(
        &app,
        post_json("/api/export-pdf", json!({"storyData": test_story(), "settings": {}})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"Test.pdf\""
    );
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8_lossy(&bytes);
    assert!(text.starts_with("%PDF-1.4"));
    assert!(text.contains("(Chapter 1: Intro"));
    let doc = lopdf::Document::load_mem(&bytes).unwrap();
    assert_eq!(doc.get_pages().len(), 1);
}

#[tokio::test]
async fn export_epub_lists_chapters() {
    let app = app(ScriptedProvider::default());

    let response = send(
        &app,
        post_json(
            "/api/export-epub",
            json!({"storyData": test_story(), "settings": {"includeTableOfContents": false}}),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/epub+zip");
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"Test.epub\""
    );
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let package = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(package.contains("<dc:title>Test</dc:title>"));
    assert!(package.contains(r#"<itemref idref="chapter1"/>"#));
    assert!(!package.contains("toc.xhtml"));
}

#[tokio::test]
async fn broken_export_body_is_a_generic_failure() {
    let app = app(ScriptedProvider::default());

    let response = send(&app, post_json("/api/export-pdf", json!({"settings": {}}))).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json_body(response).await, json!({"error": "Failed to export PDF"}));
}
