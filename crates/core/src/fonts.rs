//! Keyword heuristics that rate uploaded fonts against the story's genres.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::path::Path;
use thiserror::Error;

use crate::story::{new_id, FontAsset, Story, Suitability};

const FONT_EXTENSIONS: &[&str] = &["ttf", "otf", "woff", "woff2"];
/// Stored when the upload carries no MIME type.
const DEFAULT_FONT_MIME: &str = "font/truetype";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FontError {
    #[error("`{0}` is not a font file (expected .ttf, .otf, .woff or .woff2)")]
    NotAFont(String),
}

struct GenreRule {
    genres: &'static [&'static str],
    name_keywords: &'static [&'static str],
}

const EXCELLENT_RULES: &[GenreRule] = &[
    GenreRule {
        genres: &["fantasy", "wuxia", "xianxia"],
        name_keywords: &["medieval", "gothic", "celtic", "fantasy"],
    },
    GenreRule {
        genres: &["science", "cyberpunk", "steampunk", "biopunk", "solarpunk"],
        name_keywords: &["futur", "tech", "cyber", "sci"],
    },
    GenreRule {
        genres: &["horror"],
        name_keywords: &["horror", "blood", "scary", "gothic"],
    },
    GenreRule {
        genres: &["romance"],
        name_keywords: &["script", "elegant", "calligraphy", "romantic"],
    },
    GenreRule {
        genres: &["mystery", "thriller", "noir"],
        name_keywords: &["detective", "mystery", "noir"],
    },
];

const READABLE_KEYWORDS: &[&str] = &["serif", "times", "garamond", "book"];

const USAGE_RULES: &[(&[&str], &[&str])] = &[
    (&["title", "display", "header"], &["Chapter Titles", "Book Title"]),
    (&["body", "text", "serif"], &["Body Text", "Paragraphs"]),
    (&["script", "handwriting"], &["Dialogue", "Letters", "Notes"]),
    (&["decorative", "ornament"], &["Chapter Decorations", "Drop Caps"]),
];

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}

pub fn analyze_suitability(file_name: &str, genre: &str) -> Suitability {
    let name = file_name.to_lowercase();
    let genres = genre.to_lowercase();

    let genre_match = EXCELLENT_RULES
        .iter()
        .any(|rule| contains_any(&genres, rule.genres) && contains_any(&name, rule.name_keywords));
    if genre_match {
        Suitability::Excellent
    } else if contains_any(&name, READABLE_KEYWORDS) {
        Suitability::Good
    } else {
        Suitability::Fair
    }
}

pub fn recommended_usage(file_name: &str, genre: &str) -> Vec<String> {
    let name = file_name.to_lowercase();
    let genres = genre.to_lowercase();

    let mut usage: Vec<String> = USAGE_RULES
        .iter()
        .filter(|(keywords, _)| contains_any(&name, keywords))
        .flat_map(|(_, tags)| tags.iter().map(|tag| tag.to_string()))
        .collect();

    if genres.contains("fantasy") && contains_any(&name, &["medieval", "celtic"]) {
        usage.extend(["Fantasy Elements".to_string(), "Magic Scenes".to_string()]);
    }
    if genres.contains("horror") && name.contains("gothic") {
        usage.extend([
            "Atmospheric Scenes".to_string(),
            "Tension Building".to_string(),
        ]);
    }

    if usage.is_empty() {
        usage.push("General Use".to_string());
    }
    usage
}

pub fn is_font_upload(file_name: &str, mime_type: &str) -> bool {
    if mime_type.contains("font") {
        return true;
    }
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| FONT_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

impl FontAsset {
    /// Builds an asset from an uploaded file, rated against `story`'s genres.
    pub fn from_upload(
        file_name: &str,
        mime_type: &str,
        bytes: &[u8],
        story: &Story,
    ) -> Result<Self, FontError> {
        if !is_font_upload(file_name, mime_type) {
            return Err(FontError::NotAFont(file_name.to_string()));
        }

        let name = Path::new(file_name)
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or(file_name)
            .to_string();
        let mime_type = match mime_type.trim() {
            "" => DEFAULT_FONT_MIME,
            declared => declared,
        };

        Ok(Self {
            id: new_id("font"),
            name,
            file_name: file_name.to_string(),
            data: STANDARD.encode(bytes),
            mime_type: mime_type.to_string(),
            suitability: analyze_suitability(file_name, &story.genre),
            recommended_for: recommended_usage(file_name, &story.genre),
        })
    }
}
