use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use quill_core::{AuthoringError, GenerationError};
use serde_json::json;

use crate::state::LOG_TARGET;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Authoring(#[from] AuthoringError),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Export failures carry the fixed message the client shows.
    #[error("{0}")]
    Export(&'static str),

    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl From<JsonRejection> for ServiceError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidRequest(rejection.body_text())
    }
}

impl ServiceError {
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            Self::Authoring(err) => (status(err.http_status()), err.user_message()),
            Self::Generation(err) => (status(err.kind.http_status()), err.user_message()),
            Self::InvalidRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            Self::Export(message) => (StatusCode::INTERNAL_SERVER_ERROR, (*message).to_string()),
            Self::Task(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "An internal error occurred".to_string(),
            ),
        }
    }
}

fn status(code: u16) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        if status.is_server_error() {
            log::error!(target: LOG_TARGET, "request failed: {self}");
        } else {
            log::warn!(target: LOG_TARGET, "request rejected: {self}");
        }
        (status, Json(json!({ "error": message }))).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;
