use axum::{
    extract::rejection::JsonRejection,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use quill_core::export::{timestamp_identifier, EPUB_MIME, PDF_MIME};
use quill_core::{attachment_disposition, render_package, render_pdf, ExportSettings, Story};
use serde::Deserialize;

use crate::error::{Result, ServiceError};
use crate::state::LOG_TARGET;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRequest {
    pub story_data: Story,
    #[serde(default)]
    pub settings: ExportSettings,
}

fn read_request(
    payload: std::result::Result<Json<ExportRequest>, JsonRejection>,
    failure: &'static str,
) -> Result<ExportRequest> {
    payload.map(|Json(req)| req).map_err(|rejection| {
        log::warn!(target: LOG_TARGET, "export request rejected: {}", rejection.body_text());
        ServiceError::Export(failure)
    })
}

pub async fn export_pdf(
    payload: std::result::Result<Json<ExportRequest>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let req = read_request(payload, "Failed to export PDF")?;
    let bytes = render_pdf(&req.story_data.chapters, &req.settings).map_err(|err| {
        log::error!(target: LOG_TARGET, "PDF export failed: {err}");
        ServiceError::Export("Failed to export PDF")
    })?;
    log::info!(
        target: LOG_TARGET,
        "exported `{}` as PDF ({} chapters, {} bytes)",
        req.story_data.title,
        req.story_data.chapters.len(),
        bytes.len()
    );

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, PDF_MIME.to_string()),
            (
                header::CONTENT_DISPOSITION,
                attachment_disposition(&req.story_data.title, "pdf"),
            ),
        ],
        bytes,
    ))
}

pub async fn export_epub(
    payload: std::result::Result<Json<ExportRequest>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let req = read_request(payload, "Failed to export EPUB")?;
    let package = render_package(&req.story_data, &req.settings, &timestamp_identifier());
    log::info!(
        target: LOG_TARGET,
        "exported `{}` as EPUB package ({} chapters)",
        req.story_data.title,
        req.story_data.chapters.len()
    );

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, EPUB_MIME.to_string()),
            (
                header::CONTENT_DISPOSITION,
                attachment_disposition(&req.story_data.title, "epub"),
            ),
        ],
        package,
    ))
}
