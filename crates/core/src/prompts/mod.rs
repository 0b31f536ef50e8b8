//! Named prompt templates with `{placeholder}` interpolation.
//!
//! Built-in templates ship in `prompts/default.toml`. Files in custom
//! directories (`*.toml`, `*.yaml`, `*.yml`) are loaded afterwards in file
//! name order and replace built-ins with the same key.

use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::PromptConfig;

const BUILT_IN_PROMPTS: &str = include_str!("../../prompts/default.toml");

pub type PromptArguments = HashMap<String, String>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PromptSource {
    BuiltIn,
    File(PathBuf),
}

#[derive(Debug, Error)]
pub enum PromptError {
    #[error("prompt `{0}` not found")]
    NotFound(String),
    #[error("missing argument `{argument}` when rendering prompt `{key}`")]
    MissingArgument { key: String, argument: String },
    #[error("failed to read prompt file `{path}`: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse built-in prompt definitions: {0}")]
    ParseBuiltIn(toml::de::Error),
    #[error("failed to parse prompt file `{path}` as TOML: {source}")]
    ParseToml {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("failed to parse prompt file `{path}` as YAML: {source}")]
    ParseYaml {
        path: PathBuf,
        source: serde_yaml::Error,
    },
}

#[derive(Clone, Debug)]
enum Segment {
    Text(String),
    Slot(String),
}

#[derive(Clone, Debug)]
pub struct PromptTemplate {
    key: String,
    segments: Vec<Segment>,
    slots: BTreeSet<String>,
    description: Option<String>,
    source: PromptSource,
}

impl PromptTemplate {
    pub fn parse(key: impl Into<String>, template: &str, source: PromptSource) -> Self {
        let (segments, slots) = split_template(template);
        Self {
            key: key.into(),
            segments,
            slots,
            description: None,
            source,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn source(&self) -> &PromptSource {
        &self.source
    }

    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.slots.iter().map(String::as_str)
    }

    /// Every placeholder must have an argument; extra arguments are ignored.
    pub fn render(&self, arguments: &PromptArguments) -> Result<String, PromptError> {
        if let Some(missing) = self.slots.iter().find(|slot| !arguments.contains_key(*slot)) {
            return Err(PromptError::MissingArgument {
                key: self.key.clone(),
                argument: missing.clone(),
            });
        }

        let mut output = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => output.push_str(text),
                Segment::Slot(name) => output.push_str(&arguments[name]),
            }
        }
        Ok(output)
    }
}

#[derive(Debug)]
pub struct PromptRegistry {
    templates: BTreeMap<String, PromptTemplate>,
}

impl PromptRegistry {
    pub fn new() -> Result<Self, PromptError> {
        Self::with_custom_directories::<PathBuf>(&[])
    }

    pub fn from_prompt_config(config: &PromptConfig) -> Result<Self, PromptError> {
        Self::with_custom_directories(&config.custom_directories)
    }

    pub fn with_custom_directories<P: AsRef<Path>>(directories: &[P]) -> Result<Self, PromptError> {
        let mut templates = BTreeMap::new();
        let document: PromptDocument =
            toml::from_str(BUILT_IN_PROMPTS).map_err(PromptError::ParseBuiltIn)?;
        insert_document(&mut templates, document, &PromptSource::BuiltIn);

        for dir in directories {
            load_directory(dir.as_ref(), &mut templates)?;
        }
        Ok(Self { templates })
    }

    pub fn get(&self, key: &str) -> Option<&PromptTemplate> {
        self.templates.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }

    pub fn format(&self, key: &str, arguments: &PromptArguments) -> Result<String, PromptError> {
        self.get(key)
            .ok_or_else(|| PromptError::NotFound(key.to_string()))?
            .render(arguments)
    }
}

fn insert_document(
    templates: &mut BTreeMap<String, PromptTemplate>,
    document: PromptDocument,
    source: &PromptSource,
) {
    for (key, raw) in document.prompts {
        let mut template = PromptTemplate::parse(key.clone(), &raw.template, source.clone());
        template.description = raw.description;
        templates.insert(key, template);
    }
}

fn load_directory(
    dir: &Path,
    templates: &mut BTreeMap<String, PromptTemplate>,
) -> Result<(), PromptError> {
    if !dir.is_dir() {
        return Ok(());
    }

    let io_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source| PromptError::Io { path, source }
    };

    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_err(dir))? {
        let path = entry.map_err(io_err(dir))?.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();

    for path in files {
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        let document: PromptDocument = match ext.as_deref() {
            Some("toml") => {
                let contents = fs::read_to_string(&path).map_err(io_err(&path))?;
                toml::from_str(&contents).map_err(|source| PromptError::ParseToml {
                    path: path.clone(),
                    source,
                })?
            }
            Some("yaml") | Some("yml") => {
                let contents = fs::read_to_string(&path).map_err(io_err(&path))?;
                serde_yaml::from_str(&contents).map_err(|source| PromptError::ParseYaml {
                    path: path.clone(),
                    source,
                })?
            }
            _ => continue,
        };
        insert_document(templates, document, &PromptSource::File(path.clone()));
    }

    Ok(())
}

#[derive(Debug, Deserialize)]
struct PromptDocument {
    #[serde(default)]
    prompts: BTreeMap<String, RawPrompt>,
}

#[derive(Debug, Deserialize)]
struct RawPrompt {
    #[serde(alias = "text")]
    template: String,
    #[serde(default)]
    description: Option<String>,
}

/// `{{` and `}}` are literal braces; an unclosed `{` is kept as text.
fn split_template(template: &str) -> (Vec<Segment>, BTreeSet<String>) {
    let mut segments = Vec::new();
    let mut slots = BTreeSet::new();
    let mut text = String::new();
    let mut chars = template.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                text.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                text.push('}');
            }
            '{' => {
                let mut name = String::new();
                let mut closed = false;
                for next in chars.by_ref() {
                    if next == '}' {
                        closed = true;
                        break;
                    }
                    name.push(next);
                }
                let trimmed = name.trim();
                if closed && !trimmed.is_empty() {
                    if !text.is_empty() {
                        segments.push(Segment::Text(std::mem::take(&mut text)));
                    }
                    slots.insert(trimmed.to_string());
                    segments.push(Segment::Slot(trimmed.to_string()));
                } else {
                    text.push('{');
                    text.push_str(&name);
                    if closed {
                        text.push('}');
                    }
                }
            }
            _ => text.push(ch),
        }
    }

    if !text.is_empty() {
        segments.push(Segment::Text(text));
    }
    (segments, slots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn built_in_templates_are_available() {
        let registry = PromptRegistry::new().expect("registry");
        for key in [
            "chapter_draft",
            "chapter_draft_simple",
            "chapter_edit",
            "outline_enhance",
            "character_suggestions",
            "font_recommendations",
        ] {
            assert!(registry.get(key).is_some(), "missing template {key}");
        }
    }

    #[test]
    fn missing_argument_fails() {
        let registry = PromptRegistry::new().expect("registry");
        let args = PromptArguments::from([("chapter_title".into(), "Intro".into())]);
        match registry.format("chapter_draft_simple", &args) {
            Err(PromptError::MissingArgument { argument, .. }) => {
                assert_ne!(argument, "chapter_title");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn braces_escape_and_unclosed_slots_stay_literal() {
        let template = PromptTemplate::parse(
            "t",
            "JSON {{\"name\"}} for {title} and {open",
            PromptSource::BuiltIn,
        );
        let placeholders: Vec<_> = template.placeholders().collect();
        assert_eq!(placeholders, vec!["title"]);
        let rendered = template
            .render(&PromptArguments::from([("title".into(), "Test".into())]))
            .unwrap();
        assert_eq!(rendered, "JSON {\"name\"} for Test and {open");
    }

    #[test]
    fn custom_directory_overrides_built_in() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("a.toml"),
            "[prompts.font_recommendations]\ntemplate = \"Fonts for {title}\"\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("b.yaml"),
            "prompts:\n  extra:\n    template: \"Extra {title}\"\n    description: from yaml\n",
        )
        .unwrap();

        let registry = PromptRegistry::with_custom_directories(&[dir.path()]).unwrap();
        let args = PromptArguments::from([("title".into(), "Dune".into())]);
        assert_eq!(
            registry.format("font_recommendations", &args).unwrap(),
            "Fonts for Dune"
        );
        let extra = registry.get("extra").unwrap();
        assert_eq!(extra.description(), Some("from yaml"));
        assert!(matches!(extra.source(), PromptSource::File(_)));
    }
}
