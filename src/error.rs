use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum KlipError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Clipboard error: {0}")]
    Clipboard(String),
    #[error("Keyboard controller error: {0}")]
    Keyboard(String),
    #[error("Keyboard listener error: {0}")]
    Listener(String),
    #[error("Snippet limit reached ({count}/{max}). Upgrade to Premium for unlimited snippets!")]
    LimitReached { count: usize, max: usize },
    #[error("Snippet '{0}' already exists")]
    AlreadyExists(String),
    #[error("Snippet '{0}' does not exist")]
    NotFound(String),
    #[error("Name and code are required")]
    MissingFields,
    #[error("Invalid slot '{0}': expected a digit 0-9 or shift_<digit>")]
    InvalidSlot(String),
    #[error("No text selected or unable to copy. Make sure you have text selected in another application")]
    NoSelection,
    #[error("{0}")]
    Other(String),
}

impl From<tempfile::PersistError> for KlipError {
    fn from(err: tempfile::PersistError) -> Self {
        KlipError::Io(err.error)
    }
}

pub type Result<T> = std::result::Result<T, KlipError>;
