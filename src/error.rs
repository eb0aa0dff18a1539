use serde::Serialize;
use thiserror::Error;

/// 1-based position of a parse failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

/// Malformed JSON. Recoverable: the previous tree stays on display.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{message}")]
pub struct ParseError {
    pub message: String,
    pub location: Option<Location>,
}

impl From<serde_json::Error> for ParseError {
    fn from(err: serde_json::Error) -> Self {
        // serde_json reports line 0 when it has no position (io failures)
        let location = (err.line() > 0).then(|| Location {
            line: err.line(),
            column: err.column(),
        });
        Self {
            message: err.to_string(),
            location,
        }
    }
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("invalid JSON: {0}")]
    Parse(#[from] ParseError),
    #[error("no document loaded")]
    NoDocument,
    #[error("no node at path {0}")]
    UnknownPath(String),
    #[error("invalid config: {0}")]
    Config(#[source] serde_json::Error),
    #[error("failed to serialize JSON: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("session closed")]
    SessionClosed,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
