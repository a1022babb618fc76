//! Error types for array storage operations.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::hyperslab::SelectionError;

/// Errors surfaced by [`crate::ArrayStore`] implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The identifier has no backing storage.
    #[error("array '{id}' does not exist")]
    NotFound {
        /// Recording identifier.
        id: String,
    },
    /// `create` found an existing array while refusing to overwrite.
    #[error("array '{id}' already exists")]
    AlreadyExists {
        /// Recording identifier.
        id: String,
    },
    /// A read, write, or metadata call was made before `open`.
    #[error("array '{id}' is not open")]
    NotOpen {
        /// Recording identifier.
        id: String,
    },
    /// The requested selection does not fit the stored array or the buffer.
    #[error("range error on array '{id}': {message}")]
    Range {
        /// Recording identifier.
        id: String,
        /// Description of the offending range.
        message: String,
    },
    /// The selection uses stride or block values the backend cannot serve.
    #[error("unsupported selection on array '{id}': {message}")]
    UnsupportedSelection {
        /// Recording identifier.
        id: String,
        /// Description of the unsupported parameter.
        message: String,
    },
    /// The identifier cannot be mapped to a file name.
    #[error("invalid recording identifier '{id}': {reason}")]
    InvalidIdentifier {
        /// Offending identifier.
        id: String,
        /// Why the identifier was rejected.
        reason: &'static str,
    },
    /// Metadata passed to `create` describes an impossible array.
    #[error("invalid array metadata: {message}")]
    InvalidMetadata {
        /// Description of the invalid field.
        message: String,
    },
    /// The backing file does not have the expected layout.
    #[error("array file '{path}' is corrupt: {message}")]
    Corrupt {
        /// Path of the offending file.
        path: PathBuf,
        /// Description of the layout violation.
        message: String,
    },
    /// The backend failed to read, write, or create storage.
    #[error("I/O failure on array '{id}': {source}")]
    Io {
        /// Recording identifier.
        id: String,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// A handle lock was poisoned by a panicking thread.
    #[error("handle registry lock poisoned")]
    Poisoned,
}

impl StoreError {
    /// Creates a not-found error.
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }

    /// Creates a not-open error.
    pub fn not_open(id: impl Into<String>) -> Self {
        Self::NotOpen { id: id.into() }
    }

    /// Creates a range error.
    pub fn range(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Range {
            id: id.into(),
            message: message.into(),
        }
    }

    /// Creates an IO failure error.
    pub fn io(id: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            id: id.into(),
            source,
        }
    }

    /// Creates a corrupt-file error.
    pub fn corrupt(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Corrupt {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Maps a hyperslab validation failure onto the store taxonomy.
    pub fn from_selection(id: impl Into<String>, error: &SelectionError) -> Self {
        match error {
            SelectionError::UnitStrideOnly { .. } => Self::UnsupportedSelection {
                id: id.into(),
                message: error.to_string(),
            },
            SelectionError::OutOfBounds { .. }
            | SelectionError::Reversed { .. }
            | SelectionError::BufferSize { .. } => Self::range(id, error.to_string()),
        }
    }

    /// Returns a stable snake_case label for the error kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::AlreadyExists { .. } => "already_exists",
            Self::NotOpen { .. } => "not_open",
            Self::Range { .. } => "range",
            Self::UnsupportedSelection { .. } => "unsupported_selection",
            Self::InvalidIdentifier { .. } => "invalid_identifier",
            Self::InvalidMetadata { .. } => "invalid_metadata",
            Self::Corrupt { .. } => "corrupt",
            Self::Io { .. } => "io_failure",
            Self::Poisoned => "internal",
        }
    }
}
