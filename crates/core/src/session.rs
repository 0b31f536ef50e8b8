//! The single persisted JSON document holding the story being edited.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::logging::{LogLevel, LogRecord, LogSink};
use crate::story::Story;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to read session `{path}`: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to write session `{path}`: {source}")]
    Write { path: PathBuf, source: io::Error },
    #[error("failed to serialize session: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Story fields flattened next to the onboarding flag, matching the blob
/// the browser keeps.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    #[serde(flatten)]
    pub story: Story,
    #[serde(default)]
    pub ai_starter_completed: bool,
}

#[derive(Clone, Debug)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A missing file is an empty session. A file that does not parse is
    /// logged and also treated as empty; it is overwritten on the next save.
    pub fn load(&self, sink: &dyn LogSink) -> Result<SessionState, SessionError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Ok(SessionState::default())
            }
            Err(source) => {
                return Err(SessionError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        if text.trim().is_empty() {
            return Ok(SessionState::default());
        }
        match serde_json::from_str(&text) {
            Ok(state) => Ok(state),
            Err(err) => {
                sink.log(LogRecord::new(
                    LogLevel::Warn,
                    format!(
                        "ignoring unreadable session `{}`: {err}",
                        self.path.display()
                    ),
                ));
                Ok(SessionState::default())
            }
        }
    }

    pub fn save(&self, state: &SessionState) -> Result<(), SessionError> {
        let write_err = |source| SessionError::Write {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(write_err)?;
            }
        }
        let serialized = serde_json::to_string_pretty(state)?;
        fs::write(&self.path, serialized).map_err(write_err)
    }
}
