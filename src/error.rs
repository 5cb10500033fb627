//! Error types for watch-grader

use thiserror::Error;

/// Main error type for the application
#[derive(Error, Debug)]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Grade endpoint rejected report: HTTP {status}")]
    Rejected { status: u16 },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid grader settings: {0}")]
    InvalidGrader(String),

    #[error("Invalid event on line {line}: {reason}")]
    InvalidEvent { line: usize, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

/// Result type alias using our Error
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid grader settings error
    pub fn invalid_grader(msg: impl Into<String>) -> Self {
        Self::InvalidGrader(msg.into())
    }

    /// Create an "other" error
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}
