//! HTTP API for the Quill authoring toolkit.
//!
//! Every route lives under `/api`. Generation runs on the blocking pool with
//! a per-request deadline; exports are rendered inline.

pub mod api;
mod error;
mod state;

use axum::{
    routing::{get, post},
    Router,
};

pub use error::ServiceError;
pub use state::{AppState, GeminiProvider, ModelProvider};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/generate-chapter", post(api::generate_chapter))
        .route("/api/generate-chapter-simple", post(api::generate_chapter_simple))
        .route("/api/ai-edit-chapter", post(api::ai_edit_chapter))
        .route("/api/enhance-story-outline", post(api::enhance_story_outline))
        .route(
            "/api/generate-character-suggestions",
            post(api::generate_character_suggestions),
        )
        .route(
            "/api/generate-font-recommendations",
            post(api::generate_font_recommendations),
        )
        .route("/api/export-pdf", post(api::export_pdf))
        .route("/api/export-epub", post(api::export_epub))
        .route(
            "/api/configure-api-key",
            post(api::configure_api_key).get(api::configure_api_key_get),
        )
        .route("/api/check-api-key", get(api::check_api_key))
        .with_state(state)
}
