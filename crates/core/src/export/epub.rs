//! OPF 3.0 package document for a story. Only the manifest is produced;
//! the container, mimetype file and XHTML bodies are left to the packager.

use html_escape::encode_text;
use std::fmt::Write as _;

use crate::story::{Chapter, Story};

use super::ExportSettings;

pub const UNKNOWN_AUTHOR: &str = "Unknown Author";
const XHTML_MEDIA_TYPE: &str = "application/xhtml+xml";

/// Identifier minted from the current time in milliseconds.
pub fn timestamp_identifier() -> String {
    chrono::Utc::now().timestamp_millis().to_string()
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EpubPackage {
    pub title: String,
    pub author: Option<String>,
    pub identifier: String,
    pub language: String,
    /// Adds the `toc.xhtml` navigation document to the manifest.
    pub include_navigation: bool,
}

impl EpubPackage {
    pub fn new(title: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            author: None,
            identifier: identifier.into(),
            language: "en".to_string(),
            include_navigation: true,
        }
    }

    pub fn author(mut self, author: Option<String>) -> Self {
        self.author = author;
        self
    }

    pub fn navigation(mut self, include: bool) -> Self {
        self.include_navigation = include;
        self
    }

    fn creator(&self) -> &str {
        match self.author.as_deref().map(str::trim) {
            Some(author) if !author.is_empty() => author,
            _ => UNKNOWN_AUTHOR,
        }
    }

    /// Manifest items and spine entries follow the order of `chapters`,
    /// numbered from 1 by position.
    pub fn render(&self, chapters: &[Chapter]) -> String {
        let mut out = String::new();
        let _ = writeln!(out, r#"<?xml version="1.0" encoding="UTF-8"?>"#);
        let _ = writeln!(
            out,
            r#"<package xmlns="http://www.idpf.org/2007/opf" version="3.0" unique-identifier="BookId">"#
        );
        let _ = writeln!(
            out,
            r#"  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">"#
        );
        let _ = writeln!(out, "    <dc:title>{}</dc:title>", encode_text(&self.title));
        let _ = writeln!(
            out,
            "    <dc:creator>{}</dc:creator>",
            encode_text(self.creator())
        );
        let _ = writeln!(
            out,
            "    <dc:language>{}</dc:language>",
            encode_text(&self.language)
        );
        let _ = writeln!(
            out,
            r#"    <dc:identifier id="BookId">{}</dc:identifier>"#,
            encode_text(&self.identifier)
        );
        let _ = writeln!(out, "  </metadata>");

        let _ = writeln!(out, "  <manifest>");
        if self.include_navigation {
            let _ = writeln!(
                out,
                r#"    <item id="toc" href="toc.xhtml" media-type="{XHTML_MEDIA_TYPE}" properties="nav"/>"#
            );
        }
        for index in 1..=chapters.len() {
            let _ = writeln!(
                out,
                r#"    <item id="chapter{index}" href="chapter{index}.xhtml" media-type="{XHTML_MEDIA_TYPE}"/>"#
            );
        }
        let _ = writeln!(out, "  </manifest>");

        let _ = writeln!(out, "  <spine>");
        for index in 1..=chapters.len() {
            let _ = writeln!(out, r#"    <itemref idref="chapter{index}"/>"#);
        }
        let _ = writeln!(out, "  </spine>");
        out.push_str("</package>\n");
        out
    }
}

/// Package document for `story` under the given identifier.
pub fn render_package(story: &Story, settings: &ExportSettings, identifier: &str) -> String {
    EpubPackage::new(story.title.clone(), identifier)
        .author(story.author.clone())
        .navigation(settings.include_table_of_contents)
        .render(&story.chapters)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn story(count: u32) -> Story {
        let mut story = Story::new("Test");
        for n in 1..=count {
            story.upsert_chapter(Chapter::new(n * 10, format!("Part {n}"), "text"));
        }
        story
    }

    #[test]
    fn manifest_and_spine_list_every_chapter_in_order() {
        for count in [0, 1, 4] {
            let opf = render_package(&story(count), &ExportSettings::default(), "42");
            assert_eq!(opf.matches(r#"<item id="chapter"#).count(), count as usize);
            assert_eq!(opf.matches("<itemref ").count(), count as usize);

            let item_ids: Vec<&str> = opf
                .match_indices(r#"<item id="chapter"#)
                .map(|(at, _)| &opf[at + 10..at + 10 + opf[at + 10..].find('"').unwrap()])
                .collect();
            let spine_ids: Vec<&str> = opf
                .match_indices(r#"<itemref idref=""#)
                .map(|(at, _)| &opf[at + 16..at + 16 + opf[at + 16..].find('"').unwrap()])
                .collect();
            assert_eq!(item_ids, spine_ids);
            let expected: Vec<String> = (1..=count).map(|i| format!("chapter{i}")).collect();
            assert_eq!(item_ids, expected);
        }
    }

    #[test]
    fn navigation_item_follows_table_of_contents_flag() {
        let with_toc = render_package(&story(2), &ExportSettings::default(), "1");
        assert!(with_toc.contains(r#"properties="nav""#));
        assert!(!with_toc.contains(r#"idref="toc""#));

        let settings = ExportSettings {
            include_table_of_contents: false,
            ..ExportSettings::default()
        };
        let without = render_package(&story(2), &settings, "1");
        assert!(!without.contains("toc.xhtml"));
    }

    #[test]
    fn metadata_is_escaped_and_author_defaults() {
        let mut story = story(1);
        story.title = "Salt & <Iron>".into();
        let opf = render_package(&story, &ExportSettings::default(), "1700000000000");
        assert!(opf.contains("<dc:title>Salt &amp; &lt;Iron&gt;</dc:title>"));
        assert!(opf.contains("<dc:creator>Unknown Author</dc:creator>"));
        assert!(opf.contains(r#"<dc:identifier id="BookId">1700000000000</dc:identifier>"#));

        story.author = Some("Ada".into());
        let opf = render_package(&story, &ExportSettings::default(), "1");
        assert!(opf.contains("<dc:creator>Ada</dc:creator>"));
    }

    #[test]
    fn same_identifier_renders_identically() {
        let story = story(3);
        let settings = ExportSettings::default();
        assert_eq!(
            render_package(&story, &settings, "7"),
            render_package(&story, &settings, "7")
        );
    }

    #[test]
    fn timestamp_identifier_is_numeric() {
        let id = timestamp_identifier();
        assert!(id.parse::<i64>().unwrap() > 0);
    }
}
