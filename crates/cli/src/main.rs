use clap::{Args, Parser, Subcommand};
use quill_adapters::{create_language_model, AdapterError};
use quill_core::export::{render_package, render_pdf, timestamp_identifier, ExportSettings};
use quill_core::{
    ApiKey, ApiKeyError, AuthoringError, Chapter, ChapterRequest, ChapterWriter, ConfigError,
    ConfigStore, FacadeLogSink, FontAsset, FontError, LanguageModel, LogLevel, LogRecord, LogSink,
    PdfError, PromptError, PromptRegistry, SessionError, SessionState, SessionStore, StoryAdvisor,
};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    if let Err(err) = run() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), CliError> {
    let cli = Cli::parse();
    let sink = FacadeLogSink::new("quillctl");

    match cli.command {
        Command::Export(command) => handle_export(&cli.config, command, &sink),
        Command::Key(command) => handle_key(&cli.config, command, &sink),
        Command::Chapter(command) => handle_chapter(&cli.config, command, &sink),
        Command::Outline(command) => handle_outline(&cli.config, command, &sink),
        Command::Characters(command) => handle_characters(&cli.config, command, &sink),
        Command::Fonts(command) => handle_fonts(&cli.config, command, &sink),
        Command::Story(command) => handle_story(&cli.config, command, &sink),
    }
}

/// Everything a command needs: the config store, the session file and the
/// prompt templates.
struct Workspace {
    store: ConfigStore,
    session: SessionStore,
    prompts: PromptRegistry,
}

impl Workspace {
    fn open(config_path: &Path) -> Result<Self, CliError> {
        let mut store = ConfigStore::open(config_path.to_path_buf())?;
        if store
            .config_mut()
            .apply_key_from_env(|name| std::env::var(name).ok())
        {
            log::debug!("using API key from the environment");
        }
        let session = SessionStore::new(&store.config().session_path);
        let prompts = PromptRegistry::from_prompt_config(&store.config().prompts)?;
        Ok(Self {
            store,
            session,
            prompts,
        })
    }

    fn load(&self, sink: &dyn LogSink) -> Result<SessionState, CliError> {
        Ok(self.session.load(sink)?)
    }

    fn save(&self, state: &SessionState, sink: &dyn LogSink) -> Result<(), CliError> {
        self.session.save(state)?;
        sink.log(LogRecord::new(
            LogLevel::Info,
            format!("session saved to {}", self.session.path().display()),
        ));
        Ok(())
    }

    fn model(&self) -> Result<Box<dyn LanguageModel>, CliError> {
        Ok(create_language_model(&self.store.config().llm)?)
    }

    /// `None` when no key is configured; suggestion commands then use their
    /// built-in fallbacks.
    fn optional_model(&self) -> Result<Option<Box<dyn LanguageModel>>, CliError> {
        match create_language_model(&self.store.config().llm) {
            Ok(model) => Ok(Some(model)),
            Err(AdapterError::MissingApiKey) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}

fn handle_export(
    config_path: &Path,
    command: ExportCommand,
    sink: &dyn LogSink,
) -> Result<(), CliError> {
    let workspace = Workspace::open(config_path)?;
    let state = workspace.load(sink)?;

    match command {
        ExportCommand::Pdf(args) => {
            let settings = load_settings(args.settings.as_deref())?;
            let bytes = render_pdf(&state.story.chapters, &settings)?;
            let out = args.out.unwrap_or_else(|| default_output(&state, "pdf"));
            write_file(&out, &bytes)?;
            sink.log(LogRecord::new(
                LogLevel::Info,
                format!(
                    "wrote {} chapters ({} bytes) to {}",
                    state.story.chapters.len(),
                    bytes.len(),
                    out.display()
                ),
            ));
        }
        ExportCommand::Epub(args) => {
            let settings = load_settings(args.settings.as_deref())?;
            let identifier = args.identifier.unwrap_or_else(timestamp_identifier);
            let package = render_package(&state.story, &settings, &identifier);
            let out = args.out.unwrap_or_else(|| default_output(&state, "opf"));
            write_file(&out, package.as_bytes())?;
            sink.log(LogRecord::new(
                LogLevel::Info,
                format!("wrote package `{identifier}` to {}", out.display()),
            ));
        }
    }
    Ok(())
}

fn handle_key(config_path: &Path, command: KeyCommand, sink: &dyn LogSink) -> Result<(), CliError> {
    match command {
        KeyCommand::Set(args) => {
            let key = ApiKey::parse(&args.key)?;
            let mut store = ConfigStore::open(config_path.to_path_buf())?;
            store.set_api_key(&key);
            store.save()?;
            sink.log(LogRecord::new(
                LogLevel::Info,
                format!("stored {key:?} in {}", store.path().display()),
            ));
            println!("API key configured successfully! You can now use AI features.");
        }
        KeyCommand::Status => {
            let workspace = Workspace::open(config_path)?;
            let configured = workspace.store.config().llm.has_api_key();
            println!("{}", serde_json::json!({ "configured": configured }));
        }
    }
    Ok(())
}

fn handle_chapter(
    config_path: &Path,
    command: ChapterCommand,
    sink: &dyn LogSink,
) -> Result<(), CliError> {
    let workspace = Workspace::open(config_path)?;
    let mut state = workspace.load(sink)?;
    let model = workspace.model()?;
    let writer = ChapterWriter::new(&workspace.prompts, sink);

    match command {
        ChapterCommand::Draft(args) => {
            let number = args
                .number
                .unwrap_or_else(|| state.story.next_chapter_number());
            let content = if args.quick {
                let genre = (!state.story.genre.trim().is_empty()).then_some(state.story.genre.as_str());
                writer.draft_simple(model.as_ref(), genre, &args.title, &args.summary)?
            } else {
                let previous: Vec<Chapter> = state
                    .story
                    .chapters
                    .iter()
                    .filter(|chapter| chapter.chapter_number < number)
                    .cloned()
                    .collect();
                let request = ChapterRequest::new(number, &args.title, &args.summary).after(&previous);
                writer.draft(model.as_ref(), &state.story, &request)?
            };

            let chapter = match state.story.chapter_by_number(number).cloned() {
                Some(mut existing) => {
                    existing.title = args.title.clone();
                    existing.summary = args.summary.clone();
                    existing.set_content(content);
                    existing
                }
                None => Chapter::new(number, args.title.clone(), content).with_summary(args.summary.clone()),
            };
            println!(
                "Chapter {}: {} ({} words)",
                chapter.chapter_number, chapter.title, chapter.word_count
            );
            state.story.upsert_chapter(chapter);
            workspace.save(&state, sink)
        }
        ChapterCommand::Edit(args) => {
            let mut chapter = state
                .story
                .chapter_by_number(args.number)
                .cloned()
                .ok_or(CliError::ChapterNotFound(args.number))?;
            let edited = writer.edit(model.as_ref(), &state.story, &chapter, &args.instructions)?;
            chapter.set_content(edited);
            println!(
                "Chapter {}: {} now has {} words",
                chapter.chapter_number, chapter.title, chapter.word_count
            );
            state.story.upsert_chapter(chapter);
            workspace.save(&state, sink)
        }
    }
}

fn handle_outline(
    config_path: &Path,
    command: OutlineCommand,
    sink: &dyn LogSink,
) -> Result<(), CliError> {
    let workspace = Workspace::open(config_path)?;
    let mut state = workspace.load(sink)?;
    let model = workspace.optional_model()?;
    let advisor = StoryAdvisor::new(&workspace.prompts, sink);

    match command {
        OutlineCommand::Enhance(args) => {
            let suggestion = advisor.enhance_outline(model.as_deref(), &state.story);
            report_fallback(sink, suggestion.fallback, suggestion.message.as_deref());
            println!("{}", suggestion.value);
            if args.apply {
                state.story.plot_outline = suggestion.value;
                workspace.save(&state, sink)?;
            }
            Ok(())
        }
    }
}

fn handle_characters(
    config_path: &Path,
    command: CharactersCommand,
    sink: &dyn LogSink,
) -> Result<(), CliError> {
    let workspace = Workspace::open(config_path)?;
    let mut state = workspace.load(sink)?;
    let model = workspace.optional_model()?;
    let advisor = StoryAdvisor::new(&workspace.prompts, sink);

    match command {
        CharactersCommand::Suggest(args) => {
            let suggestion = advisor.suggest_characters(model.as_deref(), &state.story, args.count);
            report_fallback(sink, suggestion.fallback, suggestion.message.as_deref());
            println!("{}", serde_json::to_string_pretty(&suggestion.value)?);
            if args.add {
                for character in suggestion.value {
                    state.story.add_character(character);
                }
                workspace.save(&state, sink)?;
            }
            Ok(())
        }
    }
}

fn handle_fonts(
    config_path: &Path,
    command: FontsCommand,
    sink: &dyn LogSink,
) -> Result<(), CliError> {
    let workspace = Workspace::open(config_path)?;
    let mut state = workspace.load(sink)?;

    match command {
        FontsCommand::Recommend => {
            let model = workspace.optional_model()?;
            let advisor = StoryAdvisor::new(&workspace.prompts, sink);
            let suggestion = advisor.recommend_fonts(model.as_deref(), &state.story);
            report_fallback(sink, suggestion.fallback, suggestion.message.as_deref());
            for font in suggestion.value {
                println!("{font}");
            }
            Ok(())
        }
        FontsCommand::Import(args) => {
            let bytes = fs::read(&args.file).map_err(|source| CliError::Io {
                path: args.file.clone(),
                source,
            })?;
            let file_name = args
                .file
                .file_name()
                .and_then(|name| name.to_str())
                .unwrap_or_default();
            let mime = args
                .mime
                .clone()
                .unwrap_or_else(|| font_mime_type(&args.file).to_string());
            let font = FontAsset::from_upload(file_name, &mime, &bytes, &state.story)?;
            println!(
                "{}: {:?} for {}",
                font.name,
                font.suitability,
                font.recommended_for.join(", ")
            );
            state.story.add_font(font);
            workspace.save(&state, sink)
        }
    }
}

fn handle_story(
    config_path: &Path,
    command: StoryCommand,
    sink: &dyn LogSink,
) -> Result<(), CliError> {
    let workspace = Workspace::open(config_path)?;
    let state = workspace.load(sink)?;

    match command {
        StoryCommand::Stats => {
            let story = &state.story;
            let title = if story.title.trim().is_empty() {
                "(untitled)"
            } else {
                story.title.as_str()
            };
            println!("Title:      {title}");
            println!("Genres:     {}", story.genres().join(", "));
            println!("Chapters:   {}", story.chapters.len());
            println!("Words:      {}", story.total_words());
            println!("Characters: {}", story.characters.len());
            println!("Fonts:      {}", story.fonts.len());
            for chapter in &story.chapters {
                println!(
                    "  {:>3}. {} [{}] {} words",
                    chapter.chapter_number, chapter.title, chapter.status, chapter.word_count
                );
            }
            Ok(())
        }
    }
}

fn report_fallback(sink: &dyn LogSink, fallback: bool, message: Option<&str>) {
    if fallback {
        sink.log(LogRecord::new(
            LogLevel::Warn,
            message.unwrap_or("model unavailable, showing built-in suggestions"),
        ));
    }
}

fn load_settings(path: Option<&Path>) -> Result<ExportSettings, CliError> {
    let Some(path) = path else {
        return Ok(ExportSettings::default());
    };
    let text = fs::read_to_string(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| CliError::Settings {
        path: path.to_path_buf(),
        source,
    })
}

fn default_output(state: &SessionState, extension: &str) -> PathBuf {
    let title = state.story.title.trim();
    let stem: String = if title.is_empty() {
        "Novel".to_string()
    } else {
        title
            .chars()
            .map(|ch| if ch.is_alphanumeric() || ch == '-' { ch } else { '_' })
            .collect()
    };
    PathBuf::from(format!("{stem}.{extension}"))
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<(), CliError> {
    fs::write(path, bytes).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn font_mime_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("ttf") => "font/ttf",
        Some("otf") => "font/otf",
        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",
        _ => "application/octet-stream",
    }
}

#[derive(Debug, Error)]
enum CliError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("session error: {0}")]
    Session(#[from] SessionError),
    #[error("failed to load prompts: {0}")]
    Prompt(#[from] PromptError),
    #[error("{}", .0.user_message())]
    Authoring(#[from] AuthoringError),
    #[error("adapter error: {0}")]
    Adapter(#[from] AdapterError),
    #[error("{0}")]
    ApiKey(#[from] ApiKeyError),
    #[error("{0}")]
    Font(#[from] FontError),
    #[error("{0}")]
    Pdf(#[from] PdfError),
    #[error("failed to access `{path}`: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("invalid export settings in `{path}`: {source}")]
    Settings {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to encode output: {0}")]
    Json(#[from] serde_json::Error),
    #[error("no chapter numbered {0} in the session")]
    ChapterNotFound(u32),
}

#[derive(Parser)]
#[command(name = "quillctl", version, about = "Quill novel authoring tools")]
struct Cli {
    /// Path to the configuration file
    #[arg(long, global = true, default_value = "config.json")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write the story as a PDF or an EPUB package document
    #[command(subcommand)]
    Export(ExportCommand),
    /// Manage the Gemini API key
    #[command(subcommand)]
    Key(KeyCommand),
    /// Draft or edit chapters with the model
    #[command(subcommand)]
    Chapter(ChapterCommand),
    /// Plot outline tools
    #[command(subcommand)]
    Outline(OutlineCommand),
    /// Character tools
    #[command(subcommand)]
    Characters(CharactersCommand),
    /// Font recommendations and uploads
    #[command(subcommand)]
    Fonts(FontsCommand),
    /// Inspect the saved story
    #[command(subcommand)]
    Story(StoryCommand),
}

#[derive(Subcommand)]
enum ExportCommand {
    /// One page per chapter
    Pdf(PdfArgs),
    /// OPF package document listing every chapter
    Epub(EpubArgs),
}

#[derive(Subcommand)]
enum KeyCommand {
    /// Validate and store a key in the config file
    Set(KeySetArgs),
    /// Report whether a key is configured
    Status,
}

#[derive(Subcommand)]
enum ChapterCommand {
    /// Draft a chapter and store it in the session
    Draft(ChapterDraftArgs),
    /// Rewrite an existing chapter following instructions
    Edit(ChapterEditArgs),
}

#[derive(Subcommand)]
enum OutlineCommand {
    /// Expand the plot outline
    Enhance(OutlineArgs),
}

#[derive(Subcommand)]
enum CharactersCommand {
    /// Suggest a cast for the story
    Suggest(CharacterArgs),
}

#[derive(Subcommand)]
enum FontsCommand {
    /// Suggest six fonts for the story
    Recommend,
    /// Rate a font file and add it to the story
    Import(FontImportArgs),
}

#[derive(Subcommand)]
enum StoryCommand {
    /// Print chapter and word counts
    Stats,
}

#[derive(Args)]
struct PdfArgs {
    /// Output file, defaults to `<title>.pdf`
    #[arg(long, value_name = "FILE")]
    out: Option<PathBuf>,
    /// JSON file with export settings
    #[arg(long, value_name = "FILE")]
    settings: Option<PathBuf>,
}

#[derive(Args)]
struct EpubArgs {
    /// Output file, defaults to `<title>.opf`
    #[arg(long, value_name = "FILE")]
    out: Option<PathBuf>,
    /// JSON file with export settings
    #[arg(long, value_name = "FILE")]
    settings: Option<PathBuf>,
    /// Package identifier, defaults to the current time in milliseconds
    #[arg(long)]
    identifier: Option<String>,
}

#[derive(Args)]
struct KeySetArgs {
    key: String,
}

#[derive(Args)]
struct ChapterDraftArgs {
    #[arg(long)]
    title: String,
    #[arg(long)]
    summary: String,
    /// Chapter number, defaults to one past the highest existing number
    #[arg(long, value_name = "N")]
    number: Option<u32>,
    /// Use the fast model with a title-and-summary prompt
    #[arg(long)]
    quick: bool,
}

#[derive(Args)]
struct ChapterEditArgs {
    #[arg(long, value_name = "N")]
    number: u32,
    #[arg(long, value_name = "TEXT")]
    instructions: String,
}

#[derive(Args)]
struct OutlineArgs {
    /// Replace the stored outline with the result
    #[arg(long)]
    apply: bool,
}

#[derive(Args)]
struct CharacterArgs {
    /// Number of characters, defaults to 4
    #[arg(long, value_name = "N")]
    count: Option<usize>,
    /// Add the suggestions to the story
    #[arg(long)]
    add: bool,
}

#[derive(Args)]
struct FontImportArgs {
    file: PathBuf,
    /// MIME type, guessed from the extension when omitted
    #[arg(long)]
    mime: Option<String>,
}
