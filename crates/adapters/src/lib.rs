mod base_url;
mod error;
mod gemini;

pub use base_url::{resolve_gemini_base_url, DEFAULT_GEMINI_BASE_URL};
pub use error::AdapterError;
pub use gemini::GeminiClient;

pub use quill_core::config::LlmConfig;
pub use quill_core::generation::{GenerationError, LanguageModel};

/// Builds the configured generation backend.
pub fn create_language_model(config: &LlmConfig) -> Result<Box<dyn LanguageModel>, AdapterError> {
    Ok(Box::new(GeminiClient::new(config)?))
}
