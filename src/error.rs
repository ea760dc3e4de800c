//! Error types shared by the store, the HTTP layer and the CLI.

use thiserror::Error;

/// Errors returned by review, tag, study and author operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A referenced entity does not exist, or lives in another review.
    #[error("{0} not found")]
    NotFound(String),

    /// A required field is missing or a value is outside its allowed set.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A uniqueness constraint rejected the write.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Underlying SQLite error.
    #[error("Storage error: {0}")]
    Storage(rusqlite::Error),

    /// A stored JSON column could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Catch-all for migrations and filesystem setup.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn not_found(what: impl std::fmt::Display) -> Self {
        Self::NotFound(what.to_string())
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Whether the error is caused by the caller rather than the store.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::NotFound(_) | Self::InvalidArgument(_) | Self::Conflict(_)
        )
    }
}

impl From<rusqlite::Error> for Error {
    fn from(e: rusqlite::Error) -> Self {
        match e {
            rusqlite::Error::SqliteFailure(err, ref msg)
                if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
            {
                Self::Conflict(msg.clone().unwrap_or_else(|| err.to_string()))
            }
            other => Self::Storage(other),
        }
    }
}
