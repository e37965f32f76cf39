//! Storage error handling
//!
//! Provides typed errors for storage operations. Validation failures carry
//! the per-field error map so callers can report each rejected field.

use std::collections::BTreeMap;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Error codes keyed to their messages, as returned by validation
pub type FieldErrors = BTreeMap<u32, String>;

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StorageError {
    /// Failed to create data directory
    #[error("Failed to create data directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Permission denied accessing path
    #[error("Permission denied: cannot access '{path}'. Check file permissions.")]
    PermissionDenied {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Record rejected by field validation
    #[error("Validation failed: {}", format_field_errors(.0))]
    Validation(FieldErrors),

    /// Referenced row does not exist
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    /// SQLite database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

impl StorageError {
    /// Create an error from an I/O error raised while preparing `path`
    pub fn from_io(error: io::Error, path: PathBuf) -> Self {
        match error.kind() {
            io::ErrorKind::PermissionDenied => StorageError::PermissionDenied {
                path,
                source: error,
            },
            _ => StorageError::CreateDirectory {
                path,
                source: error,
            },
        }
    }

    /// Build a validation error with a single field entry
    pub fn invalid(code: u32, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(code, message.into());
        StorageError::Validation(errors)
    }

    /// Field errors, if this is a validation failure
    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            StorageError::Validation(errors) => Some(errors),
            _ => None,
        }
    }

    /// Get a recovery suggestion for this error
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            StorageError::PermissionDenied { .. } => {
                Some("Check file and directory permissions of the data directory.")
            }
            StorageError::CreateDirectory { .. } => {
                Some("Check that the parent directory exists and you have write permissions.")
            }
            _ => None,
        }
    }
}

fn format_field_errors(errors: &FieldErrors) -> String {
    errors
        .iter()
        .map(|(code, msg)| format!("[{}] {}", code, msg))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
