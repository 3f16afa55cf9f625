/// The error taxonomy every layer speaks. Business-rule failures carry the
/// message shown to the caller; `Busy` is the only retryable arm.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Busy(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn internal(err: impl std::fmt::Display) -> Self {
        Error::Internal(err.to_string())
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Busy(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
