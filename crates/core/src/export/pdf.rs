//! PDF 1.4 export: one page and one content stream per chapter.
//!
//! Object layout for N chapters:
//!
//! | id            | object                          |
//! |---------------|---------------------------------|
//! | 1             | catalog                         |
//! | 2             | page tree                       |
//! | 3             | Type1 font resource `/F1`       |
//! | 4 ..= 3+N     | page for chapter i              |
//! | 4+N ..= 3+2N  | content stream for chapter i    |
//!
//! `lopdf` serializes the objects and writes the cross-reference table.

use std::fmt::Write as _;

use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use thiserror::Error;

use crate::story::Chapter;

use super::ExportSettings;

/// Characters of heading plus body rendered per chapter page; the rest of the
/// chapter is dropped.
pub const MAX_PAGE_CHARS: usize = 1000;

const CATALOG_ID: u32 = 1;
const PAGES_ID: u32 = 2;
const FONT_ID: u32 = 3;
const FIRST_PAGE_ID: u32 = 4;
const FONT_RESOURCE: &str = "F1";
const FALLBACK_BASE_FONT: &str = "Times-Roman";
/// Rough advance width of a glyph, as a fraction of the font size.
const AVERAGE_GLYPH_WIDTH: f32 = 0.5;

#[derive(Debug, Error)]
pub enum PdfError {
    #[error("failed to write PDF: {0}")]
    Write(String),
}

fn object_id(id: u32) -> ObjectId {
    (id, 0)
}

pub fn render_pdf(chapters: &[Chapter], settings: &ExportSettings) -> Result<Vec<u8>, PdfError> {
    let count = chapters.len() as u32;
    let first_content_id = FIRST_PAGE_ID + count;
    let (width, height) = settings.page_size.dimensions();

    let mut doc = Document::with_version("1.4");

    doc.objects.insert(
        object_id(CATALOG_ID),
        Object::Dictionary(dictionary! {
            "Type" => "Catalog",
            "Pages" => object_id(PAGES_ID),
        }),
    );

    let kids: Vec<Object> = (0..count)
        .map(|index| object_id(FIRST_PAGE_ID + index).into())
        .collect();
    doc.objects.insert(
        object_id(PAGES_ID),
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => i64::from(count),
        }),
    );

    doc.objects.insert(
        object_id(FONT_ID),
        Object::Dictionary(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => Object::Name(base_font_name(&settings.primary_font).into_bytes()),
        }),
    );

    let media_box: Vec<Object> = vec![0.into(), 0.into(), width.into(), height.into()];
    for (index, chapter) in (0..count).zip(chapters) {
        let content_id = object_id(first_content_id + index);
        doc.objects.insert(
            object_id(FIRST_PAGE_ID + index),
            Object::Dictionary(dictionary! {
                "Type" => "Page",
                "Parent" => object_id(PAGES_ID),
                "MediaBox" => media_box.clone(),
                "Contents" => content_id,
                "Resources" => dictionary! {
                    "Font" => dictionary! { FONT_RESOURCE => object_id(FONT_ID) },
                },
            }),
        );

        let content = page_content(chapter, index as usize + 1, settings);
        doc.objects.insert(
            content_id,
            Object::Stream(Stream::new(dictionary! {}, content.into_bytes())),
        );
    }

    doc.max_id = first_content_id + count - 1;
    doc.trailer.set("Size", i64::from(doc.max_id) + 1);
    doc.trailer.set("Root", object_id(CATALOG_ID));

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).map_err(|err| PdfError::Write(err.to_string()))?;
    Ok(bytes)
}

/// Text drawn on a chapter's page: heading, blank line, body, cut to
/// [`MAX_PAGE_CHARS`] characters.
pub fn page_text(chapter: &Chapter, include_number: bool) -> String {
    let full = format!("{}\n\n{}", chapter.heading(include_number), chapter.content);
    full.chars().take(MAX_PAGE_CHARS).collect()
}

fn page_content(chapter: &Chapter, page_number: usize, settings: &ExportSettings) -> String {
    let (width, height) = settings.page_size.dimensions();
    let margins = settings.margins.points();
    let font_size = if settings.font_size > 0.0 {
        settings.font_size
    } else {
        12.0
    };
    let leading = font_size * settings.line_spacing.max(1.0);

    let text_width = (width - margins.left - margins.right).max(font_size);
    let columns = ((text_width / (font_size * AVERAGE_GLYPH_WIDTH)).floor() as usize).max(1);

    let text = page_text(chapter, settings.include_chapter_numbers);
    let lines = wrap_lines(&text, columns);

    let mut out = String::new();
    let _ = writeln!(out, "BT");
    let _ = writeln!(out, "/{FONT_RESOURCE} {} Tf", num(font_size));
    let _ = writeln!(out, "{} TL", num(leading));
    let _ = writeln!(
        out,
        "{} {} Td",
        num(margins.left),
        num(height - margins.top - font_size)
    );
    for (index, line) in lines.iter().enumerate() {
        if index > 0 {
            let _ = writeln!(out, "T*");
        }
        if !line.is_empty() {
            let _ = writeln!(out, "({}) Tj", escape_literal(line));
        }
    }
    let _ = writeln!(out, "ET");

    let small = (font_size * 0.75).max(6.0);
    if settings.header_footer {
        let label = chapter.heading(settings.include_chapter_numbers);
        let _ = writeln!(
            out,
            "BT /{FONT_RESOURCE} {} Tf {} {} Td ({}) Tj ET",
            num(small),
            num(margins.left),
            num(height - margins.top / 2.0),
            escape_literal(&label.chars().take(columns).collect::<String>())
        );
    }
    if settings.include_page_numbers {
        let label = page_number.to_string();
        let label_width = label.len() as f32 * small * AVERAGE_GLYPH_WIDTH;
        let _ = writeln!(
            out,
            "BT /{FONT_RESOURCE} {} Tf {} {} Td ({label}) Tj ET",
            num(small),
            num((width - label_width) / 2.0),
            num(margins.bottom / 2.0)
        );
    }
    out
}

/// Greedy word wrap; words longer than a line are split.
fn wrap_lines(text: &str, columns: usize) -> Vec<String> {
    let mut lines = Vec::new();
    for source in text.lines() {
        let mut current = String::new();
        let mut current_len = 0;
        for word in source.split_whitespace() {
            let mut word: Vec<char> = word.chars().collect();
            while word.len() > columns {
                if current_len > 0 {
                    lines.push(std::mem::take(&mut current));
                    current_len = 0;
                }
                let rest = word.split_off(columns);
                lines.push(word.into_iter().collect());
                word = rest;
            }
            if word.is_empty() {
                continue;
            }
            let needed = if current_len == 0 {
                word.len()
            } else {
                current_len + 1 + word.len()
            };
            if needed > columns {
                lines.push(std::mem::take(&mut current));
                current_len = 0;
            }
            if current_len > 0 {
                current.push(' ');
                current_len += 1;
            }
            current.extend(word.iter());
            current_len += word.len();
        }
        lines.push(current);
    }
    lines
}

/// Escapes the three characters that are special inside a `( … )` string.
pub fn escape_literal(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        if matches!(ch, '(' | ')' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// PDF name for the configured font with whitespace runs joined by `-`.
/// Delimiters are escaped as `#xx` when the name is serialized.
pub fn base_font_name(font: &str) -> String {
    let joined = font.split_whitespace().collect::<Vec<_>>().join("-");
    if joined.is_empty() {
        FALLBACK_BASE_FONT.to_string()
    } else {
        joined
    }
}

/// Formats a coordinate with at most two decimals and no trailing zeros.
fn num(value: f32) -> String {
    let formatted = format!("{value:.2}");
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    if trimmed.is_empty() || trimmed == "-0" {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::{Margins, PageSize};

    fn chapters(count: usize) -> Vec<Chapter> {
        (1..=count)
            .map(|n| Chapter::new(n as u32, format!("Part {n}"), format!("Body of part {n}.")))
            .collect()
    }

    fn render(chapters: &[Chapter], settings: &ExportSettings) -> Vec<u8> {
        render_pdf(chapters, settings).unwrap()
    }

    fn text(bytes: &[u8]) -> String {
        String::from_utf8_lossy(bytes).into_owned()
    }

    fn dict(doc: &Document, id: u32) -> &lopdf::Dictionary {
        doc.get_object((id, 0)).unwrap().as_dict().unwrap()
    }

    #[test]
    fn single_chapter_scenario() {
        let chapter = Chapter::new(1, "Intro", "Hello world");
        let bytes = render(&[chapter], &ExportSettings::default());
        let pdf = text(&bytes);

        assert!(pdf.starts_with("%PDF-1.4"));
        assert!(pdf.contains("(Chapter 1: Intro"));
        assert!(pdf.contains("(Hello world) Tj"));
        assert!(pdf.trim_end().ends_with("%%EOF"));

        let doc = Document::load_mem(&bytes).unwrap();
        let pages = doc.get_pages();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages.get(&1), Some(&(4, 0)));
        let kids: Vec<ObjectId> = dict(&doc, PAGES_ID)
            .get(b"Kids")
            .unwrap()
            .as_array()
            .unwrap()
            .iter()
            .map(|kid| kid.as_reference().unwrap())
            .collect();
        assert_eq!(kids, vec![(4, 0)]);
    }

    #[test]
    fn page_tree_and_trailer_track_chapter_count() {
        for count in [0u32, 1, 2, 3, 7] {
            let bytes = render(&chapters(count as usize), &ExportSettings::default());
            let doc = Document::load_mem(&bytes).unwrap();

            assert_eq!(doc.get_pages().len(), count as usize);
            let pages = dict(&doc, PAGES_ID);
            assert_eq!(pages.get(b"Count").unwrap().as_i64().unwrap(), i64::from(count));
            assert_eq!(doc.objects.len() as u32, 2 * count + 3);

            let size = doc.trailer.get(b"Size").unwrap().as_i64().unwrap();
            assert_eq!(size, i64::from(2 * count + 4));
            let root = doc.trailer.get(b"Root").unwrap().as_reference().unwrap();
            assert_eq!(root, (CATALOG_ID, 0));
        }
    }

    #[test]
    fn pages_reference_their_content_stream_and_font() {
        let bytes = render(&chapters(3), &ExportSettings::default());
        let doc = Document::load_mem(&bytes).unwrap();

        for index in 0..3u32 {
            let page = dict(&doc, FIRST_PAGE_ID + index);
            assert_eq!(page.get(b"Type").unwrap().as_name().unwrap(), b"Page");
            assert_eq!(page.get(b"Parent").unwrap().as_reference().unwrap(), (PAGES_ID, 0));
            let contents = page.get(b"Contents").unwrap().as_reference().unwrap();
            assert_eq!(contents, (FIRST_PAGE_ID + 3 + index, 0));

            let body = doc.get_page_content((FIRST_PAGE_ID + index, 0)).unwrap();
            assert!(text(&body).contains(&format!("(Body of part {}.) Tj", index + 1)));
        }
    }

    #[test]
    fn stream_lengths_match_payload() {
        let bytes = render(&chapters(2), &ExportSettings::default());
        let doc = Document::load_mem(&bytes).unwrap();
        for id in [6u32, 7] {
            let stream = doc.get_object((id, 0)).unwrap().as_stream().unwrap();
            let length = stream.dict.get(b"Length").unwrap().as_i64().unwrap();
            assert_eq!(length as usize, stream.content.len());
            assert!(text(&stream.content).starts_with("BT\n"));
        }
    }

    #[test]
    fn special_characters_are_escaped_once() {
        let chapter = Chapter::new(2, "Odd (title)", r"f(x) = a\b");
        let pdf = text(&render(&[chapter], &ExportSettings::default()));
        assert!(pdf.contains(r"(Chapter 2: Odd \(title\)) Tj"));
        assert!(pdf.contains(r"(f\(x\) = a\\b) Tj"));
        assert!(!pdf.contains(r"\\\("));
    }

    #[test]
    fn escape_literal_handles_each_special_character() {
        assert_eq!(escape_literal(r"()\"), r"\(\)\\");
        assert_eq!(escape_literal("plain"), "plain");
    }

    #[test]
    fn long_chapters_are_truncated_before_escaping() {
        let body = "(".repeat(2 * MAX_PAGE_CHARS);
        let chapter = Chapter::new(1, "Long", body);
        let page = page_text(&chapter, true);
        assert_eq!(page.chars().count(), MAX_PAGE_CHARS);

        let settings = ExportSettings {
            page_size: PageSize::A4,
            margins: Margins::Narrow,
            font_size: 6.0,
            line_spacing: 1.0,
            include_page_numbers: false,
            header_footer: false,
            ..ExportSettings::default()
        };
        let pdf = text(&render(&[chapter], &settings));
        let parens = pdf.matches(r"\(").count();
        assert_eq!(parens, MAX_PAGE_CHARS - "Chapter 1: Long\n\n".len());
        assert!(!pdf.contains(r"\\"));
    }

    #[test]
    fn every_line_of_page_text_is_drawn() {
        let body = (1..=40)
            .map(|n| format!("Line ({n})."))
            .collect::<Vec<_>>()
            .join("\n");
        let chapter = Chapter::new(1, "Long", body);
        assert!(page_text(&chapter, true).chars().count() < MAX_PAGE_CHARS);

        let pdf = text(&render(&[chapter], &ExportSettings::default()));
        assert_eq!(pdf.matches(r"\(").count(), 40);
        assert!(pdf.contains(r"(Line \(1\).) Tj"));
        assert!(pdf.contains(r"(Line \(40\).) Tj"));
    }

    #[test]
    fn font_name_and_page_size_follow_settings() {
        let settings = ExportSettings {
            page_size: PageSize::UsLetter,
            primary_font: "  Libre   Baskerville ".into(),
            font_size: 10.0,
            ..ExportSettings::default()
        };
        let bytes = render(&chapters(1), &settings);
        let doc = Document::load_mem(&bytes).unwrap();

        let font = dict(&doc, FONT_ID);
        assert_eq!(font.get(b"BaseFont").unwrap().as_name().unwrap(), b"Libre-Baskerville");
        assert_eq!(font.get(b"Subtype").unwrap().as_name().unwrap(), b"Type1");

        let media_box: Vec<f32> = dict(&doc, FIRST_PAGE_ID)
            .get(b"MediaBox")
            .unwrap()
            .as_array()
            .unwrap()
            .iter()
            .map(|value| value.as_float().unwrap())
            .collect();
        assert_eq!(media_box, vec![0.0, 0.0, 612.0, 792.0]);

        let pdf = text(&bytes);
        assert!(pdf.contains("/F1 10 Tf"));
        assert!(pdf.contains("15 TL"));
    }

    #[test]
    fn base_font_name_joins_words_and_defaults() {
        assert_eq!(base_font_name(""), "Times-Roman");
        assert_eq!(base_font_name("Times New Roman"), "Times-New-Roman");
        assert_eq!(base_font_name("A/B#C"), "A/B#C");
    }

    #[test]
    fn chapter_numbers_can_be_omitted() {
        let settings = ExportSettings {
            include_chapter_numbers: false,
            ..ExportSettings::default()
        };
        let pdf = text(&render(&chapters(1), &settings));
        assert!(pdf.contains("(Part 1) Tj"));
        assert!(!pdf.contains("Chapter 1:"));
    }

    #[test]
    fn wrap_respects_columns_and_blank_lines() {
        let lines = wrap_lines("alpha beta gamma\n\nabcdefghij", 11);
        assert_eq!(lines, vec!["alpha beta", "gamma", "", "abcdefghij"]);
        let split = wrap_lines("abcdefghijkl", 5);
        assert_eq!(split, vec!["abcde", "fghij", "kl"]);
    }

    #[test]
    fn coordinates_drop_trailing_zeros() {
        assert_eq!(num(612.0), "612");
        assert_eq!(num(419.53), "419.53");
        assert_eq!(num(18.5), "18.5");
        assert_eq!(num(0.0), "0");
    }
}
