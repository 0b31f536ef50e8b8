use serde::{Deserialize, Serialize};

use crate::generation::{GenerationRequest, LanguageModel};
use crate::logging::{LogLevel, LogRecord, LogSink};
use crate::prompts::PromptRegistry;
use crate::story::{Character, Story};

use super::fallback::{fallback_characters, fallback_fonts, fallback_outline};
use super::prompt::{
    render_character_suggestions, render_font_recommendations, render_outline_enhance,
};
use super::AuthoringStage;

pub const DEFAULT_CHARACTER_COUNT: usize = 4;
const MAX_FONT_RECOMMENDATIONS: usize = 6;
const OUTLINE_MAX_TOKENS: u32 = 1500;
const CHARACTER_MAX_TOKENS: u32 = 2000;
const FONT_MAX_TOKENS: u32 = 200;

const OUTLINE_FALLBACK_MESSAGE: &str = "Using structured outline enhancement";
const CHARACTER_FALLBACK_MESSAGE: &str = "Using default character suggestions";
const FONT_FALLBACK_MESSAGE: &str = "Using default font recommendations";

/// Result of a suggestion flow. `fallback` is set when `value` is a canned
/// payload rather than model output.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Suggestion<T> {
    pub value: T,
    pub fallback: bool,
    pub message: Option<String>,
}

impl<T> Suggestion<T> {
    fn generated(value: T) -> Self {
        Self {
            value,
            fallback: false,
            message: None,
        }
    }

    fn fallback(value: T, message: Option<&str>) -> Self {
        Self {
            value,
            fallback: true,
            message: message.map(str::to_string),
        }
    }
}

/// Why a suggestion flow fell back.
enum Miss {
    /// No model configured; the fallback carries no message.
    NoModel,
    /// The model replied with something unusable; no message either.
    Unusable(String),
    /// The prompt or the call failed.
    Failed(String),
}

pub struct StoryAdvisor<'a> {
    prompts: &'a PromptRegistry,
    sink: &'a dyn LogSink,
}

impl<'a> StoryAdvisor<'a> {
    pub fn new(prompts: &'a PromptRegistry, sink: &'a dyn LogSink) -> Self {
        Self { prompts, sink }
    }

    pub fn enhance_outline<M: LanguageModel + ?Sized>(
        &self,
        model: Option<&M>,
        story: &Story,
    ) -> Suggestion<String> {
        let attempt = model.ok_or(Miss::NoModel).and_then(|model| {
            let prompt = render_outline_enhance(self.prompts, story)
                .map_err(|err| Miss::Failed(err.to_string()))?;
            let reply = model
                .generate(&GenerationRequest::new(&prompt, OUTLINE_MAX_TOKENS))
                .map_err(|err| Miss::Failed(err.to_string()))?;
            if reply.trim().is_empty() {
                return Err(Miss::Failed("empty reply".to_string()));
            }
            Ok(reply)
        });

        match attempt {
            Ok(outline) => Suggestion::generated(outline),
            Err(miss) => {
                let message = self.report(AuthoringStage::Outline, &miss, OUTLINE_FALLBACK_MESSAGE);
                Suggestion::fallback(fallback_outline(story), message)
            }
        }
    }

    /// Suggests `count` characters (default 4, at least 1).
    pub fn suggest_characters<M: LanguageModel + ?Sized>(
        &self,
        model: Option<&M>,
        story: &Story,
        count: Option<usize>,
    ) -> Suggestion<Vec<Character>> {
        let count = count.unwrap_or(DEFAULT_CHARACTER_COUNT).max(1);
        let stamp = chrono::Utc::now().timestamp_millis();

        let attempt = model.ok_or(Miss::NoModel).and_then(|model| {
            let prompt = render_character_suggestions(self.prompts, story, count)
                .map_err(|err| Miss::Failed(err.to_string()))?;
            let reply = model
                .generate(&GenerationRequest::new(&prompt, CHARACTER_MAX_TOKENS))
                .map_err(|err| Miss::Failed(err.to_string()))?;
            parse_characters(&reply, stamp)
        });

        match attempt {
            Ok(characters) => {
                self.log(
                    LogLevel::Info,
                    format!("model suggested {} characters", characters.len()),
                );
                Suggestion::generated(characters)
            }
            Err(miss) => {
                let message =
                    self.report(AuthoringStage::Characters, &miss, CHARACTER_FALLBACK_MESSAGE);
                Suggestion::fallback(fallback_characters(count, stamp), message)
            }
        }
    }

    pub fn recommend_fonts<M: LanguageModel + ?Sized>(
        &self,
        model: Option<&M>,
        story: &Story,
    ) -> Suggestion<Vec<String>> {
        let attempt = model.ok_or(Miss::NoModel).and_then(|model| {
            let prompt = render_font_recommendations(self.prompts, story)
                .map_err(|err| Miss::Failed(err.to_string()))?;
            let reply = model
                .generate(&GenerationRequest::new(&prompt, FONT_MAX_TOKENS).fast())
                .map_err(|err| Miss::Failed(err.to_string()))?;
            let fonts: Vec<String> = reply
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .take(MAX_FONT_RECOMMENDATIONS)
                .map(str::to_string)
                .collect();
            if fonts.is_empty() {
                Err(Miss::Failed("no font names in reply".to_string()))
            } else {
                Ok(fonts)
            }
        });

        match attempt {
            Ok(fonts) => Suggestion::generated(fonts),
            Err(miss) => {
                let message = self.report(AuthoringStage::Fonts, &miss, FONT_FALLBACK_MESSAGE);
                Suggestion::fallback(fallback_fonts(&story.genre), message)
            }
        }
    }

    fn report(&self, stage: AuthoringStage, miss: &Miss, message: &'static str) -> Option<&'static str> {
        match miss {
            Miss::NoModel => {
                self.log(
                    LogLevel::Info,
                    format!("no model configured, using fallback {stage}"),
                );
                None
            }
            Miss::Unusable(reason) => {
                self.log(
                    LogLevel::Warn,
                    format!("unusable {stage} reply ({reason}), using fallback"),
                );
                None
            }
            Miss::Failed(reason) => {
                self.log(
                    LogLevel::Error,
                    format!("{stage} failed: {reason}; using fallback"),
                );
                Some(message)
            }
        }
    }

    fn log(&self, level: LogLevel, message: impl Into<String>) {
        self.sink.log(LogRecord::new(level, message));
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SuggestedCharacter {
    name: String,
    role: String,
    description: String,
    personality: String,
    background: String,
    goals: String,
}

/// Parses the model's JSON array; a surrounding Markdown code fence is ignored.
fn parse_characters(reply: &str, stamp: i64) -> Result<Vec<Character>, Miss> {
    let body = strip_code_fence(reply);
    let suggested: Vec<SuggestedCharacter> =
        serde_json::from_str(body).map_err(|err| Miss::Unusable(err.to_string()))?;
    let characters: Vec<Character> = suggested
        .into_iter()
        .filter(|character| !character.name.trim().is_empty())
        .enumerate()
        .map(|(index, character)| Character {
            id: format!("ai-{stamp}-{index}"),
            name: character.name,
            role: character.role,
            description: character.description,
            personality: character.personality,
            background: character.background,
            goals: character.goals,
            relationships: String::new(),
        })
        .collect();
    if characters.is_empty() {
        return Err(Miss::Unusable("no named characters".to_string()));
    }
    Ok(characters)
}

fn strip_code_fence(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}
