use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unreadable document '{name}': {reason}")]
    UnreadableDocument { name: String, reason: String },

    #[error("input text is empty")]
    EmptyInput,

    #[error("cosine similarity is undefined for a zero or non-finite vector")]
    DegenerateVector,

    #[error("vector dimensions differ: {left} vs {right}")]
    DimensionMismatch { left: usize, right: usize },

    #[error("no candidate source: supply uploaded resumes or a folder path")]
    NoCandidateSource,

    #[error("embedding model error: {0}")]
    Model(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("data directory does not exist and could not be created: {0}")]
    DataDir(PathBuf),
}

impl Error {
    /// Whether this error only affects a single candidate.
    ///
    /// Recoverable errors are recorded as skips; everything else aborts the
    /// ranking request.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::UnreadableDocument { .. }
                | Error::EmptyInput
                | Error::DegenerateVector
                | Error::DimensionMismatch { .. }
                | Error::Model(_)
        )
    }
}

impl From<candle_core::Error> for Error {
    fn from(e: candle_core::Error) -> Self {
        Error::Model(format!("tensor computation error: {e}"))
    }
}
