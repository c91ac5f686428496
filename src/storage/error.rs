//! Storage layer error types
//!
//! Defines all errors that can occur while importing into or reading from the store.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur in the storage layer
#[derive(Error, Debug)]
pub enum StorageError {
    /// I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Delimited reader or writer failed
    #[error("Delimited data error: {0}")]
    Csv(#[from] csv::Error),

    /// Import stream has no header row, or a row is unusable
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// No import has completed, so there is no schema to read records with
    #[error("Schema unavailable: {0:?} does not exist (import data first)")]
    SchemaUnavailable(PathBuf),

    /// Glob pattern built from filters was rejected
    #[error("Invalid path pattern: {0}")]
    Pattern(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<glob::PatternError> for StorageError {
    fn from(err: glob::PatternError) -> Self {
        StorageError::Pattern(err.to_string())
    }
}

impl From<glob::GlobError> for StorageError {
    fn from(err: glob::GlobError) -> Self {
        StorageError::Io(err.into())
    }
}

/// Result type alias for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
