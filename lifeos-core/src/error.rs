//! Error types for lifeos-core

use crate::types::EntityKind;
use thiserror::Error;

/// Main error type for the lifeos-core library
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Record not found
    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: String },

    /// A persisted snapshot could not be decoded
    #[error("corrupt snapshot in slot '{slot}': {reason}")]
    CorruptState { slot: String, reason: String },

    /// A persisted snapshot was written by a newer format
    #[error("snapshot in slot '{slot}' has version {found}, newest supported is {supported}")]
    UnsupportedVersion {
        slot: String,
        found: u32,
        supported: u32,
    },

    /// Input rejected before reaching the store
    #[error("invalid input: {0}")]
    Validation(String),
}

impl Error {
    pub(crate) fn not_found(kind: EntityKind, id: impl Into<String>) -> Self {
        Error::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// True for errors caused by an unknown record id
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }
}

/// Result type alias for lifeos-core
pub type Result<T> = std::result::Result<T, Error>;
