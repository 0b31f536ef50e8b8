use std::time::Duration;

use log::{debug, warn};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use quill_core::config::LlmConfig;
use quill_core::generation::{GenerationError, GenerationRequest, LanguageModel, ModelTier};

use crate::base_url::resolve_gemini_base_url;
use crate::error::AdapterError;

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Blocking client for the `generateContent` endpoint.
pub struct GeminiClient {
    client: Client,
    base_url: String,
    api_key: String,
    quality_model: String,
    fast_model: String,
}

impl GeminiClient {
    pub fn new(config: &LlmConfig) -> Result<Self, AdapterError> {
        let api_key = config.api_key.trim();
        if api_key.is_empty() {
            return Err(AdapterError::MissingApiKey);
        }
        if config.model_name.trim().is_empty() || config.fast_model_name.trim().is_empty() {
            return Err(AdapterError::InvalidConfig(
                "Gemini model names must not be empty".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout.max(1)))
            .build()?;

        Ok(Self {
            client,
            base_url: resolve_gemini_base_url(&config.base_url),
            api_key: api_key.to_string(),
            quality_model: config.model_name.trim().to_string(),
            fast_model: config.fast_model_name.trim().to_string(),
        })
    }

    fn model_for(&self, tier: ModelTier) -> &str {
        match tier {
            ModelTier::Quality => &self.quality_model,
            ModelTier::Fast => &self.fast_model,
        }
    }

    fn endpoint(&self, tier: ModelTier) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model_for(tier))
    }

    fn generate_once(&self, request: &GenerationRequest<'_>) -> Result<String, AdapterError> {
        let body = build_request(request);
        debug!(
            "Gemini request to {} ({} prompt chars, max {} tokens)",
            self.model_for(request.tier),
            request.prompt.chars().count(),
            request.max_tokens
        );

        let response = self
            .client
            .post(self.endpoint(request.tier))
            .header(API_KEY_HEADER, self.api_key.as_str())
            .json(&body)
            .send()?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            return Err(AdapterError::HttpStatus { status, body });
        }

        let parsed: GeminiResponse = response.json()?;
        parse_gemini_response(parsed)
    }
}

impl LanguageModel for GeminiClient {
    fn generate(&self, request: &GenerationRequest<'_>) -> Result<String, GenerationError> {
        self.generate_once(request).map_err(|err| {
            warn!("Gemini call to {} failed: {err}", self.model_for(request.tier));
            GenerationError::from(err)
        })
    }
}

fn build_request<'a>(request: &GenerationRequest<'a>) -> GeminiRequest<'a> {
    GeminiRequest {
        contents: vec![GeminiRequestContent {
            role: "user",
            parts: vec![GeminiRequestPart {
                text: request.prompt,
            }],
        }],
        generation_config: GeminiGenerationConfig {
            max_output_tokens: request.max_tokens,
            temperature: request.temperature,
        },
    }
}

#[derive(Serialize)]
struct GeminiRequest<'a> {
    contents: Vec<GeminiRequestContent<'a>>,
    #[serde(rename = "generationConfig")]
    generation_config: GeminiGenerationConfig,
}

#[derive(Serialize)]
struct GeminiRequestContent<'a> {
    role: &'static str,
    parts: Vec<GeminiRequestPart<'a>>,
}

#[derive(Serialize)]
struct GeminiRequestPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct GeminiGenerationConfig {
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(rename = "promptFeedback")]
    #[serde(default)]
    prompt_feedback: Option<GeminiPromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct GeminiPromptFeedback {
    #[serde(rename = "blockReason")]
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContent>,
    #[serde(rename = "finishReason")]
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum GeminiPart {
    Text { text: String },
    Other(serde_json::Value),
}

fn parse_gemini_response(response: GeminiResponse) -> Result<String, AdapterError> {
    if let Some(reason) = response
        .prompt_feedback
        .and_then(|feedback| feedback.block_reason)
    {
        warn!("Gemini prompt blocked: {reason}");
        return Err(AdapterError::Blocked { reason });
    }

    let mut blocked = None;
    for candidate in response.candidates {
        let reason = candidate.finish_reason.unwrap_or_default();
        if reason == "MAX_TOKENS" {
            warn!("Gemini response truncated due to max_tokens limit");
        }

        let text: String = candidate
            .content
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| match part {
                        GeminiPart::Text { text } => Some(text),
                        GeminiPart::Other(_) => None,
                    })
                    .collect()
            })
            .unwrap_or_default();
        if !text.trim().is_empty() {
            return Ok(text);
        }
        if matches!(reason.as_str(), "SAFETY" | "RECITATION") {
            blocked = Some(reason);
        }
    }

    match blocked {
        Some(reason) => {
            warn!("Gemini response blocked: {reason}");
            Err(AdapterError::Blocked { reason })
        }
        None => Err(AdapterError::EmptyResponse),
    }
}
