//! Query error types
//!
//! Defines all error conditions that can occur while building or running a report.

use thiserror::Error;

/// Errors that can occur during query operations
#[derive(Error, Debug)]
pub enum QueryError {
    /// Storage layer error
    #[error("Storage error: {0}")]
    Storage(#[from] crate::storage::StorageError),

    /// Unknown aggregate operator, or one that does not apply to the field
    #[error("Unsupported aggregate: {0}")]
    UnsupportedAggregate(String),

    /// Referenced field is not part of the schema or the record
    #[error("Field not found: {0}")]
    FieldNotFound(String),

    /// A value could not be coerced for aggregation
    #[error("Invalid value {value:?} for field {field}: {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    /// Writing the report failed
    #[error("Output error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for query operations
pub type QueryResult<T> = Result<T, QueryError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StorageError;

    #[test]
    fn test_error_display() {
        let err = QueryError::FieldNotFound("RATING".to_string());
        assert_eq!(err.to_string(), "Field not found: RATING");

        let err = QueryError::InvalidValue {
            field: "REV".to_string(),
            value: "abc".to_string(),
            reason: "not a decimal".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid value \"abc\" for field REV: not a decimal"
        );
    }

    #[test]
    fn test_storage_error_conversion() {
        let err: QueryError = StorageError::MalformedInput("empty".to_string()).into();
        assert!(matches!(err, QueryError::Storage(StorageError::MalformedInput(_))));
    }
}
