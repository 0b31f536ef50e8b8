use axum::{extract::rejection::JsonRejection, extract::State, Json};
use quill_core::{
    Character, FacadeLogSink, GenerationError, GenerationErrorKind, GenerationRequest,
    LanguageModel, Story, StoryAdvisor, Suggestion,
};
use serde::{Deserialize, Serialize};

use crate::error::ServiceError;
use crate::state::{AppState, LOG_TARGET};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryRequest {
    #[serde(default)]
    pub story_data: Story,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterRequest {
    #[serde(default)]
    pub story_data: Story,
    #[serde(default)]
    pub character_count: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutlineResponse {
    pub enhanced_outline: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub fallback: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CharactersResponse {
    pub characters: Vec<Character>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub fallback: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FontsResponse {
    pub recommendations: Vec<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub fallback: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Stands in for a model whose call could not complete.
struct Unavailable(GenerationError);

impl LanguageModel for Unavailable {
    fn generate(&self, _request: &GenerationRequest<'_>) -> Result<String, GenerationError> {
        Err(self.0.clone())
    }
}

/// Runs a suggestion flow on the blocking pool. Suggestion endpoints never
/// fail: a missing key, an unreadable body, a timeout or a crashed task all
/// end in the flow's fallback payload.
async fn advise<T, F>(
    state: &AppState,
    payload: Result<Story, ServiceError>,
    flow: F,
) -> Suggestion<T>
where
    T: Send + 'static,
    F: Fn(&StoryAdvisor<'_>, Option<&dyn LanguageModel>, &Story) -> Suggestion<T>
        + Clone
        + Send
        + 'static,
{
    let story = match payload {
        Ok(story) => story,
        Err(err) => {
            log::warn!(target: LOG_TARGET, "unreadable suggestion request: {err}");
            Story::default()
        }
    };

    let job_story = story.clone();
    let job_flow = flow.clone();
    let outcome = state
        .generate(move |model, prompts, sink| {
            let advisor = StoryAdvisor::new(prompts, sink);
            job_flow(&advisor, model.ok(), &job_story)
        })
        .await;

    match outcome {
        Ok(suggestion) => suggestion,
        Err(err) => {
            let cause = match err {
                ServiceError::Generation(err) => err,
                other => GenerationError::new(GenerationErrorKind::Other, other.to_string()),
            };
            let unavailable = Unavailable(cause);
            let sink = FacadeLogSink::new(LOG_TARGET);
            let advisor = StoryAdvisor::new(&state.prompts, &sink);
            flow(&advisor, Some(&unavailable as &dyn LanguageModel), &story)
        }
    }
}

pub async fn enhance_story_outline(
    State(state): State<AppState>,
    payload: Result<Json<StoryRequest>, JsonRejection>,
) -> Json<OutlineResponse> {
    let story = payload.map(|Json(req)| req.story_data).map_err(ServiceError::from);
    let suggestion = advise(&state, story, |advisor, model, story| {
        advisor.enhance_outline(model, story)
    })
    .await;

    Json(OutlineResponse {
        enhanced_outline: suggestion.value,
        fallback: suggestion.fallback,
        message: suggestion.message,
    })
}

pub async fn generate_character_suggestions(
    State(state): State<AppState>,
    payload: Result<Json<CharacterRequest>, JsonRejection>,
) -> Json<CharactersResponse> {
    let (story, count) = match payload {
        Ok(Json(req)) => (Ok(req.story_data), req.character_count),
        Err(rejection) => (Err(ServiceError::from(rejection)), None),
    };
    let suggestion = advise(&state, story, move |advisor, model, story| {
        advisor.suggest_characters(model, story, count)
    })
    .await;

    Json(CharactersResponse {
        characters: suggestion.value,
        fallback: suggestion.fallback,
        message: suggestion.message,
    })
}

pub async fn generate_font_recommendations(
    State(state): State<AppState>,
    payload: Result<Json<StoryRequest>, JsonRejection>,
) -> Json<FontsResponse> {
    let story = payload.map(|Json(req)| req.story_data).map_err(ServiceError::from);
    let suggestion = advise(&state, story, |advisor, model, story| {
        advisor.recommend_fonts(model, story)
    })
    .await;

    Json(FontsResponse {
        recommendations: suggestion.value,
        fallback: suggestion.fallback,
        message: suggestion.message,
    })
}
