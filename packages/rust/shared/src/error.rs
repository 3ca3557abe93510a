//! Error types for ProspectCue.
//!
//! Library crates use [`ProspectCueError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all ProspectCue operations.
#[derive(Debug, thiserror::Error)]
pub enum ProspectCueError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// A DOM mutator could not find or modify the elements it needed.
    #[error("dom error: {message}")]
    Dom { message: String },

    /// A pipeline step failed. Carries the step label for reporting.
    #[error("step '{label}' failed: {source}")]
    Step {
        label: &'static str,
        #[source]
        source: Box<ProspectCueError>,
    },

    /// An href or location could not be parsed or resolved.
    #[error("url error: {0}")]
    Url(String),

    /// A replay session file is malformed.
    #[error("session error: {message}")]
    Session { message: String },

    /// A background task (watcher loop or settle check) died.
    #[error("task error: {0}")]
    Task(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ProspectCueError>;

impl ProspectCueError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a DOM mutation error from any displayable message.
    pub fn dom(msg: impl Into<String>) -> Self {
        Self::Dom {
            message: msg.into(),
        }
    }

    /// Create a session error from any displayable message.
    pub fn session(msg: impl Into<String>) -> Self {
        Self::Session {
            message: msg.into(),
        }
    }

    /// Attach a step label to a mutator failure.
    pub fn step(label: &'static str, source: ProspectCueError) -> Self {
        Self::Step {
            label,
            source: Box::new(source),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
