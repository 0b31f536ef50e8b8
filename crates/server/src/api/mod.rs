pub mod chapters;
pub mod export;
pub mod keys;
pub mod suggestions;

pub use chapters::{ai_edit_chapter, generate_chapter, generate_chapter_simple};
pub use export::{export_epub, export_pdf};
pub use keys::{check_api_key, configure_api_key, configure_api_key_get};
pub use suggestions::{
    enhance_story_outline, generate_character_suggestions, generate_font_recommendations,
};
