//! Boundary to the hosted text-generation service.
//!
//! Adapters implement [`LanguageModel`] and report failures with a
//! [`GenerationErrorKind`] so callers never inspect provider wording.

use std::fmt;
use thiserror::Error;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ModelTier {
    /// The configured primary model.
    #[default]
    Quality,
    /// The configured low-latency model.
    Fast,
}

#[derive(Clone, Debug, PartialEq)]
pub struct GenerationRequest<'a> {
    pub prompt: &'a str,
    pub max_tokens: u32,
    pub temperature: Option<f32>,
    pub tier: ModelTier,
}

impl<'a> GenerationRequest<'a> {
    pub fn new(prompt: &'a str, max_tokens: u32) -> Self {
        Self {
            prompt,
            max_tokens,
            temperature: None,
            tier: ModelTier::Quality,
        }
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn fast(mut self) -> Self {
        self.tier = ModelTier::Fast;
        self
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum GenerationErrorKind {
    MissingKey,
    InvalidKey,
    RateLimited,
    PermissionDenied,
    ContentBlocked,
    ApiDisabled,
    Timeout,
    Network,
    EmptyResponse,
    Other,
}

impl GenerationErrorKind {
    /// Classifies a raw provider message by the substrings the provider is
    /// known to use. Matching is case-sensitive and the first rule that
    /// matches wins.
    pub fn from_provider_message(message: &str) -> Self {
        const RULES: &[(&str, GenerationErrorKind)] = &[
            ("API key is missing", GenerationErrorKind::InvalidKey),
            ("API_KEY_INVALID", GenerationErrorKind::InvalidKey),
            ("QUOTA_EXCEEDED", GenerationErrorKind::RateLimited),
            ("PERMISSION_DENIED", GenerationErrorKind::PermissionDenied),
            ("SAFETY", GenerationErrorKind::ContentBlocked),
            (
                "Generative Language API has not been used",
                GenerationErrorKind::ApiDisabled,
            ),
        ];
        RULES
            .iter()
            .find(|(needle, _)| message.contains(needle))
            .map_or(GenerationErrorKind::Other, |(_, kind)| *kind)
    }

    /// HTTP status the front end reports for this kind.
    pub fn http_status(self) -> u16 {
        match self {
            Self::MissingKey | Self::ContentBlocked => 400,
            Self::InvalidKey => 401,
            Self::PermissionDenied | Self::ApiDisabled => 403,
            Self::RateLimited => 429,
            Self::Network | Self::EmptyResponse => 502,
            Self::Timeout => 504,
            Self::Other => 500,
        }
    }

    pub fn user_message(self) -> &'static str {
        match self {
            Self::MissingKey => {
                "Gemini API key not configured. Please configure your API key first."
            }
            Self::InvalidKey => "Invalid API key. Please reconfigure your Gemini API key.",
            Self::RateLimited => {
                "API quota exceeded. Please check your usage limits or try again later."
            }
            Self::PermissionDenied => {
                "API key does not have permission. Please check your API key settings."
            }
            Self::ContentBlocked => {
                "Content was blocked by safety filters. Please try rephrasing your chapter summary."
            }
            Self::ApiDisabled => {
                "Generative Language API is not enabled. Please enable it at https://console.developers.google.com/apis/api/generativelanguage.googleapis.com/overview"
            }
            Self::Timeout => "Request timed out. The provider may be overloaded; try again shortly.",
            Self::Network => "Network connection error. Please check your connection and try again.",
            Self::EmptyResponse => "No content received from AI",
            Self::Other => "Failed to generate content",
        }
    }
}

impl fmt::Display for GenerationErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::MissingKey => "missing key",
            Self::InvalidKey => "invalid key",
            Self::RateLimited => "rate limited",
            Self::PermissionDenied => "permission denied",
            Self::ContentBlocked => "content blocked",
            Self::ApiDisabled => "api disabled",
            Self::Timeout => "timeout",
            Self::Network => "network",
            Self::EmptyResponse => "empty response",
            Self::Other => "other",
        };
        f.write_str(label)
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct GenerationError {
    pub kind: GenerationErrorKind,
    pub message: String,
}

impl GenerationError {
    pub fn new(kind: GenerationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn missing_key() -> Self {
        Self::new(
            GenerationErrorKind::MissingKey,
            "no API key configured for the generation endpoint",
        )
    }

    pub fn timeout(seconds: u64) -> Self {
        Self::new(
            GenerationErrorKind::Timeout,
            format!("no response within {seconds}s"),
        )
    }

    /// Builds an error whose kind is derived from the provider's message.
    pub fn from_provider_message(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(GenerationErrorKind::from_provider_message(&message), message)
    }

    /// Message shown to the user; unclassified failures carry the raw text.
    pub fn user_message(&self) -> String {
        match self.kind {
            GenerationErrorKind::Other if !self.message.is_empty() => {
                format!("{}: {}", self.kind.user_message(), self.message)
            }
            kind => kind.user_message().to_string(),
        }
    }
}

pub trait LanguageModel: Send + Sync {
    fn generate(&self, request: &GenerationRequest<'_>) -> Result<String, GenerationError>;
}

impl<T: LanguageModel + ?Sized> LanguageModel for Box<T> {
    fn generate(&self, request: &GenerationRequest<'_>) -> Result<String, GenerationError> {
        (**self).generate(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_known_provider_phrases() {
        use GenerationErrorKind::*;
        let cases = [
            ("API key is missing. Pass a key", InvalidKey),
            ("400 API_KEY_INVALID", InvalidKey),
            ("QUOTA_EXCEEDED for project", RateLimited),
            ("403 PERMISSION_DENIED", PermissionDenied),
            ("blocked: SAFETY", ContentBlocked),
            (
                "Generative Language API has not been used in project 1 before",
                ApiDisabled,
            ),
            ("socket hang up", Other),
        ];
        for (message, expected) in cases {
            assert_eq!(
                GenerationErrorKind::from_provider_message(message),
                expected,
                "{message}"
            );
        }
    }

    #[test]
    fn earlier_rules_win_when_several_phrases_match() {
        assert_eq!(
            GenerationErrorKind::from_provider_message(
                "403 PERMISSION_DENIED: Generative Language API has not been used in project 7"
            ),
            GenerationErrorKind::PermissionDenied
        );
        assert_eq!(
            GenerationErrorKind::from_provider_message("SAFETY: Generative Language API has not been used"),
            GenerationErrorKind::ContentBlocked
        );
    }

    #[test]
    fn classification_is_case_sensitive() {
        assert_eq!(
            GenerationErrorKind::from_provider_message("quota_exceeded"),
            GenerationErrorKind::Other
        );
    }

    #[test]
    fn user_message_keeps_raw_text_only_for_unclassified() {
        let other = GenerationError::from_provider_message("boom");
        assert_eq!(other.user_message(), "Failed to generate content: boom");
        let quota = GenerationError::from_provider_message("QUOTA_EXCEEDED");
        assert!(quota.user_message().starts_with("API quota exceeded"));
        assert_eq!(quota.kind.http_status(), 429);
    }
}
