use axum::{extract::rejection::JsonRejection, extract::State, Json};
use quill_core::{Chapter, ChapterRequest, ChapterWriter, GenerationError, Story};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::state::{AppState, LOG_TARGET};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftChapterRequest {
    #[serde(default)]
    pub story_data: Story,
    #[serde(default)]
    pub chapter_title: String,
    #[serde(default)]
    pub chapter_summary: String,
    #[serde(default)]
    pub previous_chapters: Vec<Chapter>,
    /// Defaults to one past the previous chapters.
    #[serde(default)]
    pub chapter_number: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickDraftRequest {
    #[serde(default)]
    pub chapter_title: String,
    #[serde(default)]
    pub chapter_summary: String,
    #[serde(default)]
    pub story_genre: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditChapterRequest {
    #[serde(default)]
    pub story_data: Story,
    #[serde(default)]
    pub chapter: Chapter,
    #[serde(default)]
    pub edit_instructions: String,
}

#[derive(Debug, Serialize)]
pub struct DraftResponse {
    pub content: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditResponse {
    pub edited_content: String,
}

/// Generation endpoints refuse to start without a key.
async fn require_key(state: &AppState) -> Result<()> {
    if state.has_api_key().await {
        Ok(())
    } else {
        Err(GenerationError::missing_key().into())
    }
}

pub async fn generate_chapter(
    State(state): State<AppState>,
    payload: std::result::Result<Json<DraftChapterRequest>, JsonRejection>,
) -> Result<Json<DraftResponse>> {
    require_key(&state).await?;
    let Json(req) = payload?;
    let number = req
        .chapter_number
        .unwrap_or_else(|| (req.previous_chapters.len() as u32).saturating_add(1));
    log::info!(
        target: LOG_TARGET,
        "drafting chapter {number} of `{}` after {} chapters",
        req.story_data.title,
        req.previous_chapters.len()
    );

    let content = state
        .generate(move |model, prompts, sink| -> Result<String> {
            let model = model?;
            let request = ChapterRequest::new(number, &req.chapter_title, &req.chapter_summary)
                .after(&req.previous_chapters);
            Ok(ChapterWriter::new(prompts, sink).draft(model, &req.story_data, &request)?)
        })
        .await??;

    Ok(Json(DraftResponse { content }))
}

pub async fn generate_chapter_simple(
    State(state): State<AppState>,
    payload: std::result::Result<Json<QuickDraftRequest>, JsonRejection>,
) -> Result<Json<DraftResponse>> {
    require_key(&state).await?;
    let Json(req) = payload?;

    let content = state
        .generate(move |model, prompts, sink| -> Result<String> {
            let model = model?;
            Ok(ChapterWriter::new(prompts, sink).draft_simple(
                model,
                req.story_genre.as_deref(),
                &req.chapter_title,
                &req.chapter_summary,
            )?)
        })
        .await??;

    Ok(Json(DraftResponse { content }))
}

pub async fn ai_edit_chapter(
    State(state): State<AppState>,
    payload: std::result::Result<Json<EditChapterRequest>, JsonRejection>,
) -> Result<Json<EditResponse>> {
    require_key(&state).await?;
    let Json(req) = payload?;

    let edited_content = state
        .generate(move |model, prompts, sink| -> Result<String> {
            let model = model?;
            Ok(ChapterWriter::new(prompts, sink).edit(
                model,
                &req.story_data,
                &req.chapter,
                &req.edit_instructions,
            )?)
        })
        .await??;

    Ok(Json(EditResponse { edited_content }))
}
