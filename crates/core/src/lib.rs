pub mod authoring;
pub mod config;
pub mod export;
pub mod fonts;
pub mod generation;
pub mod logging;
pub mod prompts;
pub mod session;
pub mod story;

pub use authoring::{
    AuthoringError, AuthoringStage, ChapterRequest, ChapterWriter, StoryAdvisor, Suggestion,
};
pub use config::{
    ApiKey, ApiKeyError, Config, ConfigError, ConfigStore, LlmConfig, PromptConfig, ServerConfig,
};
pub use export::{
    attachment_disposition, render_package, render_pdf, EpubPackage, ExportSettings, Margins,
    PageSize, PdfError,
};
pub use fonts::{analyze_suitability, recommended_usage, FontError};
pub use generation::{
    GenerationError, GenerationErrorKind, GenerationRequest, LanguageModel, ModelTier,
};
pub use logging::{
    FacadeLogSink, LogLevel, LogRecord, LogSink, NullLogSink, SharedLogSink, VecLogSink,
};
pub use prompts::{PromptArguments, PromptError, PromptRegistry, PromptSource, PromptTemplate};
pub use session::{SessionError, SessionState, SessionStore};
pub use story::{Chapter, ChapterStatus, Character, FontAsset, Story, Suitability};
