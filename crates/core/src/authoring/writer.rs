use crate::generation::{GenerationRequest, LanguageModel};
use crate::logging::{LogLevel, LogRecord, LogSink};
use crate::prompts::PromptRegistry;
use crate::story::{Chapter, Story};

use super::prompt::{render_chapter_draft, render_chapter_draft_simple, render_chapter_edit};
use super::{
    AuthoringError, AuthoringStage, CHAPTER_INPUT_MISSING, MIN_CHAPTER_CHARS, SIMPLE_INPUT_MISSING,
};

const DRAFT_MAX_TOKENS: u32 = 4000;
const SIMPLE_DRAFT_MAX_TOKENS: u32 = 2000;
const EDIT_MAX_TOKENS: u32 = 4000;
const DRAFT_TEMPERATURE: f32 = 0.7;

/// The chapter to write and the chapters whose summaries give it context.
#[derive(Clone, Debug)]
pub struct ChapterRequest<'a> {
    pub chapter_number: u32,
    pub title: &'a str,
    pub summary: &'a str,
    pub previous_chapters: &'a [Chapter],
}

impl<'a> ChapterRequest<'a> {
    pub fn new(chapter_number: u32, title: &'a str, summary: &'a str) -> Self {
        Self {
            chapter_number,
            title,
            summary,
            previous_chapters: &[],
        }
    }

    pub fn after(mut self, previous_chapters: &'a [Chapter]) -> Self {
        self.previous_chapters = previous_chapters;
        self
    }
}

pub struct ChapterWriter<'a> {
    prompts: &'a PromptRegistry,
    sink: &'a dyn LogSink,
}

impl<'a> ChapterWriter<'a> {
    pub fn new(prompts: &'a PromptRegistry, sink: &'a dyn LogSink) -> Self {
        Self { prompts, sink }
    }

    /// Drafts a chapter with the whole story as context.
    pub fn draft<M: LanguageModel + ?Sized>(
        &self,
        model: &M,
        story: &Story,
        request: &ChapterRequest<'_>,
    ) -> Result<String, AuthoringError> {
        if is_blank(&story.title) || is_blank(request.title) || is_blank(request.summary) {
            return Err(AuthoringError::MissingField(CHAPTER_INPUT_MISSING));
        }

        let prompt = render_chapter_draft(
            self.prompts,
            story,
            request.chapter_number,
            request.title,
            request.summary,
            request.previous_chapters,
        )
        .map_err(|source| AuthoringError::Prompt {
            stage: AuthoringStage::Draft,
            source,
        })?;

        self.log(
            LogLevel::Info,
            format!(
                "drafting chapter {} of \"{}\" ({} previous chapters, prompt {} chars)",
                request.chapter_number,
                story.title,
                request.previous_chapters.len(),
                prompt.chars().count()
            ),
        );
        let generation = GenerationRequest::new(&prompt, DRAFT_MAX_TOKENS).temperature(DRAFT_TEMPERATURE);
        let content = self.generate(model, &generation, AuthoringStage::Draft)?;
        self.ensure_long_enough(content, AuthoringStage::Draft)
    }

    /// Drafts a chapter from its title and summary alone on the fast model.
    pub fn draft_simple<M: LanguageModel + ?Sized>(
        &self,
        model: &M,
        genre: Option<&str>,
        title: &str,
        summary: &str,
    ) -> Result<String, AuthoringError> {
        if is_blank(title) || is_blank(summary) {
            return Err(AuthoringError::MissingField(SIMPLE_INPUT_MISSING));
        }

        let prompt = render_chapter_draft_simple(self.prompts, genre, title, summary).map_err(
            |source| AuthoringError::Prompt {
                stage: AuthoringStage::SimpleDraft,
                source,
            },
        )?;

        self.log(LogLevel::Info, format!("quick draft for \"{title}\""));
        let generation = GenerationRequest::new(&prompt, SIMPLE_DRAFT_MAX_TOKENS)
            .temperature(DRAFT_TEMPERATURE)
            .fast();
        let content = self.generate(model, &generation, AuthoringStage::SimpleDraft)?;
        self.ensure_long_enough(content, AuthoringStage::SimpleDraft)
    }

    /// Rewrites `chapter` following `instructions`.
    pub fn edit<M: LanguageModel + ?Sized>(
        &self,
        model: &M,
        story: &Story,
        chapter: &Chapter,
        instructions: &str,
    ) -> Result<String, AuthoringError> {
        let prompt = render_chapter_edit(self.prompts, story, chapter, instructions).map_err(
            |source| AuthoringError::Prompt {
                stage: AuthoringStage::Edit,
                source,
            },
        )?;

        self.log(
            LogLevel::Info,
            format!("editing chapter {} \"{}\"", chapter.chapter_number, chapter.title),
        );
        let generation = GenerationRequest::new(&prompt, EDIT_MAX_TOKENS);
        self.generate(model, &generation, AuthoringStage::Edit)
    }

    fn generate<M: LanguageModel + ?Sized>(
        &self,
        model: &M,
        request: &GenerationRequest<'_>,
        stage: AuthoringStage,
    ) -> Result<String, AuthoringError> {
        model.generate(request).map_err(|source| {
            self.log(LogLevel::Error, format!("{stage} failed: {source}"));
            AuthoringError::Generation { stage, source }
        })
    }

    fn ensure_long_enough(
        &self,
        content: String,
        stage: AuthoringStage,
    ) -> Result<String, AuthoringError> {
        let length = content.trim().chars().count();
        if length < MIN_CHAPTER_CHARS {
            self.log(
                LogLevel::Warn,
                format!("{stage} returned only {length} characters"),
            );
            return Err(AuthoringError::TooShort { length });
        }
        self.log(LogLevel::Info, format!("{stage} produced {length} characters"));
        Ok(content)
    }

    fn log(&self, level: LogLevel, message: impl Into<String>) {
        self.sink.log(LogRecord::new(level, message));
    }
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}
