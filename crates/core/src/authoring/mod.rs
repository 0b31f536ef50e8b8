//! Services that turn story state into model calls: chapter drafting and
//! editing, plus suggestion flows that fall back to canned payloads.

use std::fmt;
use thiserror::Error;

use crate::generation::GenerationError;
use crate::prompts::PromptError;

mod advisor;
pub mod fallback;
pub mod prompt;
mod writer;

pub use advisor::{StoryAdvisor, Suggestion, DEFAULT_CHARACTER_COUNT};
pub use writer::{ChapterRequest, ChapterWriter};

/// Shortest accepted chapter draft, in characters.
pub const MIN_CHAPTER_CHARS: usize = 100;

pub const CHAPTER_INPUT_MISSING: &str = "Missing required story data, chapter title, or summary";
pub const SIMPLE_INPUT_MISSING: &str = "Missing chapter title or summary";

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum AuthoringStage {
    Draft,
    SimpleDraft,
    Edit,
    Outline,
    Characters,
    Fonts,
}

impl AuthoringStage {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Draft => "chapter draft",
            Self::SimpleDraft => "quick chapter draft",
            Self::Edit => "chapter edit",
            Self::Outline => "outline enhancement",
            Self::Characters => "character suggestions",
            Self::Fonts => "font recommendations",
        }
    }
}

impl fmt::Display for AuthoringStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Error)]
pub enum AuthoringError {
    #[error("{0}")]
    MissingField(&'static str),
    #[error("generated content is too short or empty ({length} characters)")]
    TooShort { length: usize },
    #[error("failed to render prompt for {stage}: {source}")]
    Prompt {
        stage: AuthoringStage,
        #[source]
        source: PromptError,
    },
    #[error("model call failed for {stage}: {source}")]
    Generation {
        stage: AuthoringStage,
        #[source]
        source: GenerationError,
    },
}

impl AuthoringError {
    pub fn http_status(&self) -> u16 {
        match self {
            Self::MissingField(_) => 400,
            Self::TooShort { .. } => 502,
            Self::Prompt { .. } => 500,
            Self::Generation { source, .. } => source.kind.http_status(),
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            Self::MissingField(message) => (*message).to_string(),
            Self::TooShort { .. } => "Generated content is too short or empty".to_string(),
            Self::Prompt { stage, .. } => format!("Failed to prepare the {stage} prompt"),
            Self::Generation { source, .. } => source.user_message(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::GenerationErrorKind;

    #[test]
    fn generation_errors_keep_provider_status() {
        let err = AuthoringError::Generation {
            stage: AuthoringStage::Draft,
            source: GenerationError::new(GenerationErrorKind::RateLimited, "QUOTA_EXCEEDED"),
        };
        assert_eq!(err.http_status(), 429);
        assert!(err.user_message().starts_with("API quota exceeded"));

        let missing = AuthoringError::MissingField(CHAPTER_INPUT_MISSING);
        assert_eq!(missing.http_status(), 400);
        assert_eq!(missing.user_message(), CHAPTER_INPUT_MISSING);
    }
}
