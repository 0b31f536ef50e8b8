//! In-memory document model for a story being authored.
//!
//! Field names serialize in camelCase so the same structures round-trip
//! through the persisted session blob and the HTTP request bodies.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

pub const ROLE_PROTAGONIST: &str = "Protagonist";
pub const ROLE_ANTAGONIST: &str = "Antagonist";
pub const ROLE_SUPPORTING: &str = "Supporting";
pub const ROLE_MINOR: &str = "Minor";

static ID_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Generates an opaque id from the current timestamp in nanoseconds.
///
/// A process-local sequence number is appended so that two ids minted within
/// the same clock tick still differ.
pub fn new_id(prefix: &str) -> String {
    let now = chrono::Utc::now();
    let nanos = now
        .timestamp_nanos_opt()
        .unwrap_or_else(|| now.timestamp_micros().saturating_mul(1_000));
    let seq = ID_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    if prefix.is_empty() {
        format!("{nanos}-{seq}")
    } else {
        format!("{prefix}-{nanos}-{seq}")
    }
}

/// Counts words the way the editor always has: one more than the number of
/// whitespace runs. Empty content therefore counts as a single word.
pub fn word_count(content: &str) -> usize {
    let mut runs = 0;
    let mut in_run = false;
    for ch in content.chars() {
        if ch.is_whitespace() {
            if !in_run {
                runs += 1;
                in_run = true;
            }
        } else {
            in_run = false;
        }
    }
    runs + 1
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChapterStatus {
    #[default]
    Draft,
    Review,
    Complete,
}

impl fmt::Display for ChapterStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ChapterStatus::Draft => "draft",
            ChapterStatus::Review => "review",
            ChapterStatus::Complete => "complete",
        };
        f.write_str(label)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chapter {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub chapter_number: u32,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub word_count: usize,
    #[serde(default)]
    pub status: ChapterStatus,
}

impl Chapter {
    pub fn new(chapter_number: u32, title: impl Into<String>, content: impl Into<String>) -> Self {
        let mut chapter = Self {
            id: new_id("chapter"),
            chapter_number,
            title: title.into(),
            ..Self::default()
        };
        chapter.set_content(content);
        chapter
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    /// Replaces the chapter text and recomputes its word count.
    pub fn set_content(&mut self, content: impl Into<String>) {
        self.content = content.into();
        self.word_count = word_count(&self.content);
    }

    /// Heading used by both exporters.
    pub fn heading(&self, include_number: bool) -> String {
        if include_number {
            format!("Chapter {}: {}", self.chapter_number, self.title)
        } else {
            self.title.clone()
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Character {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub personality: String,
    #[serde(default)]
    pub background: String,
    #[serde(default)]
    pub goals: String,
    #[serde(default)]
    pub relationships: String,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Suitability {
    Excellent,
    Good,
    #[default]
    Fair,
    Poor,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FontAsset {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub file_name: String,
    /// Base64 text of the uploaded font file.
    #[serde(default)]
    pub data: String,
    #[serde(default, rename = "type")]
    pub mime_type: String,
    #[serde(default)]
    pub suitability: Suitability,
    #[serde(default)]
    pub recommended_for: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Story {
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default)]
    pub genre: String,
    #[serde(default)]
    pub setting: String,
    #[serde(default)]
    pub theme: String,
    #[serde(default)]
    pub plot_outline: String,
    #[serde(default)]
    pub target_audience: String,
    #[serde(default)]
    pub writing_style: String,
    #[serde(default)]
    pub chapters: Vec<Chapter>,
    #[serde(default)]
    pub characters: Vec<Character>,
    #[serde(default)]
    pub fonts: Vec<FontAsset>,
}

impl Story {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Genres listed in the comma-separated `genre` field.
    pub fn genres(&self) -> Vec<&str> {
        self.genre
            .split(',')
            .map(str::trim)
            .filter(|genre| !genre.is_empty())
            .collect()
    }

    pub fn next_chapter_number(&self) -> u32 {
        self.chapters
            .iter()
            .map(|chapter| chapter.chapter_number)
            .max()
            .map_or(1, |max| max.saturating_add(1))
    }

    pub fn chapter(&self, id: &str) -> Option<&Chapter> {
        self.chapters.iter().find(|chapter| chapter.id == id)
    }

    pub fn chapter_by_number(&self, number: u32) -> Option<&Chapter> {
        self.chapters
            .iter()
            .find(|chapter| chapter.chapter_number == number)
    }

    /// Replaces the chapter with the same id, or appends it.
    pub fn upsert_chapter(&mut self, chapter: Chapter) {
        match self.chapters.iter_mut().find(|c| c.id == chapter.id) {
            Some(existing) => *existing = chapter,
            None => self.chapters.push(chapter),
        }
    }

    pub fn remove_chapter(&mut self, id: &str) -> Option<Chapter> {
        let index = self.chapters.iter().position(|c| c.id == id)?;
        Some(self.chapters.remove(index))
    }

    pub fn add_character(&mut self, character: Character) {
        match self.characters.iter_mut().find(|c| c.id == character.id) {
            Some(existing) => *existing = character,
            None => self.characters.push(character),
        }
    }

    pub fn remove_character(&mut self, id: &str) -> Option<Character> {
        let index = self.characters.iter().position(|c| c.id == id)?;
        Some(self.characters.remove(index))
    }

    pub fn add_font(&mut self, font: FontAsset) {
        match self.fonts.iter_mut().find(|f| f.id == font.id) {
            Some(existing) => *existing = font,
            None => self.fonts.push(font),
        }
    }

    pub fn remove_font(&mut self, id: &str) -> Option<FontAsset> {
        let index = self.fonts.iter().position(|f| f.id == id)?;
        Some(self.fonts.remove(index))
    }

    pub fn total_words(&self) -> usize {
        self.chapters.iter().map(|chapter| chapter.word_count).sum()
    }
}
