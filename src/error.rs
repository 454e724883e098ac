use thiserror::Error;

/// Result type alias for prompt state operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced to callers of [`crate::state::PromptState`].
///
/// Remote mirror failures never appear here: they are logged and dropped
/// where they happen.
#[derive(Debug, Error)]
pub enum Error {
    /// A required field was missing or empty.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A referenced record is not in the cache.
    #[error("{kind} '{id}' not found")]
    NotFound { kind: &'static str, id: String },

    /// The local record store failed; the mutation was aborted.
    #[error("Local storage error: {0:#}")]
    Storage(anyhow::Error),
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Storage(err)
    }
}

impl Error {
    pub(crate) fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Error::NotFound {
            kind,
            id: id.into(),
        }
    }
}
