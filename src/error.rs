//! Error types for geodoc.

use serde::{Deserialize, Serialize};

pub type Result<T> = std::result::Result<T, GeodocError>;

#[derive(Debug, thiserror::Error)]
pub enum GeodocError {
    /// Malformed coordinate payload or missing required field.
    #[error("validation error: {0}")]
    Validation(String),

    /// Missing or contradictory search/update criteria.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// A well-formed query matched zero documents.
    #[error("not found: {0}")]
    NotFound(String),

    /// Persistence or index fault.
    #[error("store error: {0}")]
    Store(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("database is closed")]
    DatabaseClosed,

    /// Unreadable snapshot file.
    #[error("invalid format: {0}")]
    InvalidFormat(String),
}

#[cfg(feature = "snapshot")]
impl From<bincode::Error> for GeodocError {
    fn from(err: bincode::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for GeodocError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Who is at fault for a failure, as seen by a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    ClientFault,
    NotFound,
    ServerFault,
}

impl ErrorCategory {
    /// HTTP status code conventionally used for this category.
    pub const fn status_code(self) -> u16 {
        match self {
            Self::ClientFault => 400,
            Self::NotFound => 404,
            Self::ServerFault => 500,
        }
    }
}

impl GeodocError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Validation(_) | Self::BadRequest(_) => ErrorCategory::ClientFault,
            Self::NotFound(_) => ErrorCategory::NotFound,
            Self::Store(_)
            | Self::Io(_)
            | Self::Serialization(_)
            | Self::DatabaseClosed
            | Self::InvalidFormat(_) => ErrorCategory::ServerFault,
        }
    }

    /// Client faults are never worth retrying; server faults may be transient.
    pub fn is_client_fault(&self) -> bool {
        self.category() == ErrorCategory::ClientFault
    }
}
