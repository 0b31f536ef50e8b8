use crate::prompts::{PromptArguments, PromptError, PromptRegistry};
use crate::story::{Chapter, Character, Story};

pub const DEFAULT_GENRE: &str = "fiction";

fn story_arguments(story: &Story) -> PromptArguments {
    let mut args = PromptArguments::new();
    args.insert("title".into(), story.title.clone());
    args.insert("genre".into(), story.genre.clone());
    args.insert("setting".into(), story.setting.clone());
    args.insert("theme".into(), story.theme.clone());
    args.insert("plot_outline".into(), story.plot_outline.clone());
    args.insert("target_audience".into(), story.target_audience.clone());
    args.insert("writing_style".into(), story.writing_style.clone());
    args
}

pub fn characters_block(characters: &[Character]) -> String {
    characters
        .iter()
        .map(|character| {
            format!(
                "- {} ({}): {}\n  Personality: {}\n  Background: {}\n  Goals: {}",
                character.name,
                character.role,
                character.description,
                character.personality,
                character.background,
                character.goals
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Numbers the summaries by position, not by `chapter_number`.
pub fn previous_chapters_block(chapters: &[Chapter]) -> String {
    chapters
        .iter()
        .enumerate()
        .map(|(index, chapter)| format!("Chapter {}: {}\n{}", index + 1, chapter.title, chapter.summary))
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn render_chapter_draft(
    prompts: &PromptRegistry,
    story: &Story,
    chapter_number: u32,
    chapter_title: &str,
    chapter_summary: &str,
    previous_chapters: &[Chapter],
) -> Result<String, PromptError> {
    let mut args = story_arguments(story);
    args.insert("chapter_number".into(), chapter_number.to_string());
    args.insert("characters".into(), characters_block(&story.characters));
    args.insert(
        "previous_chapters".into(),
        previous_chapters_block(previous_chapters),
    );
    args.insert("chapter_title".into(), chapter_title.to_string());
    args.insert("chapter_summary".into(), chapter_summary.to_string());
    prompts.format("chapter_draft", &args)
}

pub fn render_chapter_draft_simple(
    prompts: &PromptRegistry,
    genre: Option<&str>,
    chapter_title: &str,
    chapter_summary: &str,
) -> Result<String, PromptError> {
    let genre = genre
        .map(str::trim)
        .filter(|genre| !genre.is_empty())
        .unwrap_or(DEFAULT_GENRE);
    let mut args = PromptArguments::new();
    args.insert("genre".into(), genre.to_string());
    args.insert("chapter_title".into(), chapter_title.to_string());
    args.insert("chapter_summary".into(), chapter_summary.to_string());
    prompts.format("chapter_draft_simple", &args)
}

pub fn render_chapter_edit(
    prompts: &PromptRegistry,
    story: &Story,
    chapter: &Chapter,
    instructions: &str,
) -> Result<String, PromptError> {
    let mut args = story_arguments(story);
    args.insert("chapter_title".into(), chapter.title.clone());
    args.insert("chapter_content".into(), chapter.content.clone());
    args.insert("edit_instructions".into(), instructions.to_string());
    prompts.format("chapter_edit", &args)
}

pub fn render_outline_enhance(prompts: &PromptRegistry, story: &Story) -> Result<String, PromptError> {
    prompts.format("outline_enhance", &story_arguments(story))
}

pub fn render_character_suggestions(
    prompts: &PromptRegistry,
    story: &Story,
    count: usize,
) -> Result<String, PromptError> {
    let mut args = story_arguments(story);
    args.insert("count".into(), count.to_string());
    prompts.format("character_suggestions", &args)
}

pub fn render_font_recommendations(
    prompts: &PromptRegistry,
    story: &Story,
) -> Result<String, PromptError> {
    prompts.format("font_recommendations", &story_arguments(story))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn story() -> Story {
        let mut story = Story::new("Ashfall");
        story.genre = "Fantasy, Mystery".into();
        story.writing_style = "Lyrical".into();
        story.target_audience = "Adults".into();
        story.add_character(Character {
            id: "c1".into(),
            name: "Mara".into(),
            role: "Protagonist".into(),
            description: "A cartographer".into(),
            personality: "Stubborn".into(),
            background: "Exiled".into(),
            goals: "Map the ash".into(),
            relationships: String::new(),
        });
        story
    }

    #[test]
    fn draft_prompt_carries_story_context() {
        let registry = PromptRegistry::new().unwrap();
        let previous = vec![
            Chapter::new(1, "Embers", "").with_summary("The city burns."),
            Chapter::new(5, "Smoke", "").with_summary("Mara flees."),
        ];
        let prompt =
            render_chapter_draft(&registry, &story(), 3, "Cinders", "A map is found", &previous)
                .unwrap();

        assert!(prompt.contains("writing Chapter 3 of \"Ashfall\""));
        assert!(prompt.contains("- Mara (Protagonist): A cartographer"));
        assert!(prompt.contains("Goals: Map the ash"));
        assert!(prompt.contains("Chapter 1: Embers\nThe city burns."));
        assert!(prompt.contains("Chapter 2: Smoke\nMara flees."));
        assert!(prompt.contains("Summary: A map is found"));
        assert!(prompt.contains("Use the specified writing style (Lyrical)"));
    }

    #[test]
    fn simple_prompt_defaults_genre() {
        let registry = PromptRegistry::new().unwrap();
        let prompt = render_chapter_draft_simple(&registry, Some("  "), "Intro", "Start").unwrap();
        assert!(prompt.contains("for a fiction story"));
        let prompt = render_chapter_draft_simple(&registry, Some("Horror"), "Intro", "Start").unwrap();
        assert!(prompt.contains("for a Horror story"));
    }

    #[test]
    fn suggestion_prompts_render() {
        let registry = PromptRegistry::new().unwrap();
        let story = story();
        assert!(render_character_suggestions(&registry, &story, 5)
            .unwrap()
            .contains("Create exactly 5 diverse characters"));
        assert!(render_outline_enhance(&registry, &story)
            .unwrap()
            .contains("- Title: Ashfall"));
        assert!(render_font_recommendations(&registry, &story)
            .unwrap()
            .contains("Target Audience: Adults"));

        let chapter = Chapter::new(1, "Embers", "Old text");
        let edit = render_chapter_edit(&registry, &story, &chapter, "Tighten it").unwrap();
        assert!(edit.contains("Content: Old text"));
        assert!(edit.contains("EDIT INSTRUCTIONS: Tighten it"));
    }
}
