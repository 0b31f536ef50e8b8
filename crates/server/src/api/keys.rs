use axum::{body::Bytes, extract::State, http::StatusCode, Json};
use quill_core::ApiKey;
use serde_json::{json, Value};

use crate::state::{AppState, LOG_TARGET};

const KEY_ACCEPTED: &str = "API key configured successfully! You can now use AI features.";
const KEY_REQUIRED: &str = "API key is required";
const KEY_NOT_STRING: &str = "API key must be a string";
const BAD_JSON: &str = "Invalid request format. Please send valid JSON.";

fn rejected(error: &str) -> (StatusCode, Json<Value>) {
    log::info!(target: LOG_TARGET, "API key rejected: {error}");
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "valid": false, "error": error })),
    )
}

/// Pulls the raw key out of the body, treating JSON falsy values as absent.
fn raw_key(body: &[u8]) -> Result<String, &'static str> {
    let value: Value = serde_json::from_slice(body).map_err(|_| BAD_JSON)?;
    match value.get("apiKey") {
        None | Some(Value::Null) | Some(Value::Bool(false)) => Err(KEY_REQUIRED),
        Some(Value::String(key)) if key.is_empty() => Err(KEY_REQUIRED),
        Some(Value::Number(n)) if n.as_f64() == Some(0.0) => Err(KEY_REQUIRED),
        Some(Value::String(key)) => Ok(key.clone()),
        Some(_) => Err(KEY_NOT_STRING),
    }
}

/// Validates the key syntactically and, when it passes, swaps it into the
/// key slot. Invalid keys leave the slot as it was.
pub async fn configure_api_key(State(state): State<AppState>, body: Bytes) -> (StatusCode, Json<Value>) {
    let raw = match raw_key(&body) {
        Ok(raw) => raw,
        Err(error) => return rejected(error),
    };
    let key = match ApiKey::parse(&raw) {
        Ok(key) => key,
        Err(err) => return rejected(&err.to_string()),
    };

    state.set_api_key(&key).await;
    log::info!(target: LOG_TARGET, "stored {key:?}");
    (
        StatusCode::OK,
        Json(json!({ "valid": true, "message": KEY_ACCEPTED })),
    )
}

pub async fn configure_api_key_get() -> (StatusCode, Json<Value>) {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(json!({ "error": "Method not allowed. Use POST to configure API key." })),
    )
}

pub async fn check_api_key(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "configured": state.has_api_key().await }))
}
