use std::sync::Arc;
use std::time::Duration;

use quill_adapters::create_language_model;
use quill_core::{
    ApiKey, Config, FacadeLogSink, GenerationError, LanguageModel, LlmConfig, LogSink,
    PromptRegistry,
};
use tokio::sync::RwLock;

use crate::error::ServiceError;

pub const LOG_TARGET: &str = "quill_server";

/// Builds a model for one request from the current LLM settings.
pub trait ModelProvider: Send + Sync {
    fn connect(&self, llm: &LlmConfig) -> Result<Box<dyn LanguageModel>, GenerationError>;
}

/// Talks to the Gemini endpoint configured in `llm`.
pub struct GeminiProvider;

impl ModelProvider for GeminiProvider {
    fn connect(&self, llm: &LlmConfig) -> Result<Box<dyn LanguageModel>, GenerationError> {
        create_language_model(llm).map_err(GenerationError::from)
    }
}

/// Shared application state accessible to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub prompts: Arc<PromptRegistry>,
    /// Key used for generation calls; replaced by `configure-api-key`.
    api_key: Arc<RwLock<Option<String>>>,
    provider: Arc<dyn ModelProvider>,
}

impl AppState {
    pub fn new(config: Config, prompts: PromptRegistry) -> Self {
        Self::with_provider(config, prompts, Arc::new(GeminiProvider))
    }

    pub fn with_provider(
        config: Config,
        prompts: PromptRegistry,
        provider: Arc<dyn ModelProvider>,
    ) -> Self {
        let initial = Some(config.llm.api_key.trim().to_string()).filter(|key| !key.is_empty());
        Self {
            config: Arc::new(config),
            prompts: Arc::new(prompts),
            api_key: Arc::new(RwLock::new(initial)),
            provider,
        }
    }

    pub async fn has_api_key(&self) -> bool {
        self.api_key.read().await.is_some()
    }

    pub async fn set_api_key(&self, key: &ApiKey) {
        *self.api_key.write().await = Some(key.expose().to_string());
    }

    fn request_timeout_secs(&self) -> u64 {
        self.config.server.request_timeout_secs.max(1)
    }

    /// LLM settings for one request. The client timeout never exceeds the
    /// request deadline so an abandoned job ends its HTTP call soon after.
    async fn llm_config(&self) -> LlmConfig {
        let mut llm = self.config.llm.clone();
        llm.api_key = self.api_key.read().await.clone().unwrap_or_default();
        llm.timeout = llm.timeout.min(self.request_timeout_secs());
        llm
    }

    /// Runs `job` on the blocking pool with a freshly connected model.
    ///
    /// The job sees the connection error when no model could be built. A job
    /// that outlives `server.request_timeout_secs` is reported as a timeout;
    /// its thread keeps running until the model call returns, which the
    /// capped client timeout bounds.
    pub async fn generate<T, F>(&self, job: F) -> Result<T, ServiceError>
    where
        T: Send + 'static,
        F: FnOnce(Result<&dyn LanguageModel, GenerationError>, &PromptRegistry, &dyn LogSink) -> T
            + Send
            + 'static,
    {
        let llm = self.llm_config().await;
        let provider = Arc::clone(&self.provider);
        let prompts = Arc::clone(&self.prompts);
        let seconds = self.request_timeout_secs();

        let task = tokio::task::spawn_blocking(move || {
            let sink = FacadeLogSink::new(LOG_TARGET);
            let model = provider.connect(&llm);
            job(model.as_deref().map_err(Clone::clone), &*prompts, &sink as &dyn LogSink)
        });

        match tokio::time::timeout(Duration::from_secs(seconds), task).await {
            Ok(joined) => Ok(joined?),
            Err(_) => {
                log::warn!(target: LOG_TARGET, "generation abandoned after {seconds}s");
                Err(GenerationError::timeout(seconds).into())
            }
        }
    }
}
