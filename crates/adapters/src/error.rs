use quill_core::generation::{GenerationError, GenerationErrorKind};
use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("http request failed: {0}")]
    Http(reqwest::Error),
    #[error("failed to parse response: {0}")]
    Json(#[from] serde_json::Error),
    #[error("no API key configured")]
    MissingApiKey,
    #[error("invalid adapter configuration: {0}")]
    InvalidConfig(String),
    #[error("unexpected http status {status}: {body}")]
    HttpStatus { status: StatusCode, body: String },
    #[error("response blocked: {reason}")]
    Blocked { reason: String },
    #[error("API returned an empty response")]
    EmptyResponse,
}

impl AdapterError {
    /// Error kind for this failure. Provider wording in an error body wins
    /// over the bare HTTP status.
    pub fn kind(&self) -> GenerationErrorKind {
        match self {
            AdapterError::Http(err) if err.is_timeout() => GenerationErrorKind::Timeout,
            AdapterError::Http(_) => GenerationErrorKind::Network,
            AdapterError::Json(_) | AdapterError::InvalidConfig(_) => GenerationErrorKind::Other,
            AdapterError::MissingApiKey => GenerationErrorKind::MissingKey,
            AdapterError::HttpStatus { status, body } => {
                match GenerationErrorKind::from_provider_message(body) {
                    GenerationErrorKind::Other => status_kind(*status),
                    kind => kind,
                }
            }
            AdapterError::Blocked { .. } => GenerationErrorKind::ContentBlocked,
            AdapterError::EmptyResponse => GenerationErrorKind::EmptyResponse,
        }
    }
}

/// Request URLs are dropped so query credentials never reach a message.
impl From<reqwest::Error> for AdapterError {
    fn from(err: reqwest::Error) -> Self {
        AdapterError::Http(err.without_url())
    }
}

fn status_kind(status: StatusCode) -> GenerationErrorKind {
    match status {
        StatusCode::UNAUTHORIZED => GenerationErrorKind::InvalidKey,
        StatusCode::FORBIDDEN => GenerationErrorKind::PermissionDenied,
        StatusCode::TOO_MANY_REQUESTS => GenerationErrorKind::RateLimited,
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => GenerationErrorKind::Timeout,
        status if status.is_server_error() => GenerationErrorKind::Network,
        _ => GenerationErrorKind::Other,
    }
}

impl From<AdapterError> for GenerationError {
    fn from(err: AdapterError) -> Self {
        GenerationError::new(err.kind(), err.to_string())
    }
}
