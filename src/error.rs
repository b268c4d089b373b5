//! Error types shared by every module of the crate.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ParserError>;

#[derive(Debug, Error)]
pub enum ParserError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid URL \"{url}\": {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("target content not found after {attempts} attempts")]
    TargetNotFound { attempts: u32 },

    #[error("no clipboard backend succeeded (tried: {})", tried.join(", "))]
    ClipboardUnavailable { tried: Vec<String> },

    #[error("invalid image selection \"{input}\": {reason}")]
    InvalidSelection { input: String, reason: String },

    #[error("invalid configuration value for {var}: {reason}")]
    Config { var: String, reason: String },
}

impl ParserError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
