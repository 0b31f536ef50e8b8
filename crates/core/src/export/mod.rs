//! Serializers that turn a story's chapters into downloadable documents.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod epub;
pub mod pdf;

pub use epub::{render_package, timestamp_identifier, EpubPackage};
pub use pdf::{render_pdf, PdfError, MAX_PAGE_CHARS};

pub const PDF_MIME: &str = "application/pdf";
pub const EPUB_MIME: &str = "application/epub+zip";

const POINTS_PER_INCH: f32 = 72.0;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub enum PageSize {
    A4,
    #[default]
    A5,
    #[serde(rename = "US Letter", alias = "Letter")]
    UsLetter,
    #[serde(rename = "6x9")]
    Trade6x9,
    #[serde(rename = "5x8")]
    Digest5x8,
}

impl PageSize {
    /// Width and height in PDF points.
    pub fn dimensions(self) -> (f32, f32) {
        match self {
            PageSize::A4 => (595.28, 841.89),
            PageSize::A5 => (419.53, 595.28),
            PageSize::UsLetter => (612.0, 792.0),
            PageSize::Trade6x9 => (6.0 * POINTS_PER_INCH, 9.0 * POINTS_PER_INCH),
            PageSize::Digest5x8 => (5.0 * POINTS_PER_INCH, 8.0 * POINTS_PER_INCH),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Margins {
    Narrow,
    #[default]
    Standard,
    Wide,
    Kdp,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MarginBox {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl Margins {
    pub fn points(self) -> MarginBox {
        let uniform = |inches: f32| MarginBox {
            top: inches * POINTS_PER_INCH,
            right: inches * POINTS_PER_INCH,
            bottom: inches * POINTS_PER_INCH,
            left: inches * POINTS_PER_INCH,
        };
        match self {
            Margins::Narrow => uniform(0.5),
            Margins::Standard => uniform(0.75),
            Margins::Wide => uniform(1.0),
            Margins::Kdp => MarginBox {
                top: 0.75 * POINTS_PER_INCH,
                right: POINTS_PER_INCH,
                bottom: 0.75 * POINTS_PER_INCH,
                left: POINTS_PER_INCH,
            },
        }
    }
}

fn default_font_size() -> f32 {
    12.0
}

fn default_line_spacing() -> f32 {
    1.5
}

fn default_font_name() -> String {
    "Times New Roman".to_string()
}

fn default_true() -> bool {
    true
}

fn default_formats() -> Vec<String> {
    vec!["PDF".to_string(), "EPUB".to_string()]
}

/// Layout and content options shared by the PDF and EPUB exporters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportSettings {
    #[serde(default)]
    pub page_size: PageSize,
    #[serde(default)]
    pub margins: Margins,
    #[serde(default = "default_font_size", deserialize_with = "number_or_string")]
    pub font_size: f32,
    #[serde(default = "default_line_spacing", deserialize_with = "number_or_string")]
    pub line_spacing: f32,
    #[serde(default = "default_font_name")]
    pub primary_font: String,
    #[serde(default = "default_font_name")]
    pub title_font: String,
    #[serde(default = "default_true")]
    pub include_table_of_contents: bool,
    #[serde(default = "default_true")]
    pub include_chapter_numbers: bool,
    #[serde(default = "default_true")]
    pub include_page_numbers: bool,
    #[serde(default = "default_true")]
    pub chapter_breaks: bool,
    #[serde(default = "default_true")]
    pub header_footer: bool,
    #[serde(default = "default_formats")]
    pub export_formats: Vec<String>,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            page_size: PageSize::default(),
            margins: Margins::default(),
            font_size: default_font_size(),
            line_spacing: default_line_spacing(),
            primary_font: default_font_name(),
            title_font: default_font_name(),
            include_table_of_contents: true,
            include_chapter_numbers: true,
            include_page_numbers: true,
            chapter_breaks: true,
            header_footer: true,
            export_formats: default_formats(),
        }
    }
}

/// Accepts `12`, `12.5` or `"12"`; the export form sends numbers as strings.
fn number_or_string<'de, D>(deserializer: D) -> Result<f32, D::Error>
where
    D: Deserializer<'de>,
{
    struct NumberVisitor;

    impl<'de> de::Visitor<'de> for NumberVisitor {
        type Value = f32;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a number or a numeric string")
        }

        fn visit_f64<E: de::Error>(self, value: f64) -> Result<f32, E> {
            Ok(value as f32)
        }

        fn visit_i64<E: de::Error>(self, value: i64) -> Result<f32, E> {
            Ok(value as f32)
        }

        fn visit_u64<E: de::Error>(self, value: u64) -> Result<f32, E> {
            Ok(value as f32)
        }

        fn visit_str<E: de::Error>(self, value: &str) -> Result<f32, E> {
            value
                .trim()
                .parse::<f32>()
                .map_err(|_| E::invalid_value(de::Unexpected::Str(value), &self))
        }
    }

    deserializer.deserialize_any(NumberVisitor)
}

/// `Content-Disposition` value for a download named after the story.
///
/// Characters that cannot appear inside a quoted ASCII header value are
/// replaced with `_`.
pub fn attachment_disposition(title: &str, extension: &str) -> String {
    let trimmed = title.trim();
    let base = if trimmed.is_empty() { "Novel" } else { trimmed };
    let safe: String = base
        .chars()
        .map(|ch| match ch {
            ' '..='~' if ch != '"' && ch != '\\' => ch,
            _ => '_',
        })
        .collect();
    format!("attachment; filename=\"{safe}.{extension}\"")
}
