use thiserror::Error;

/// Errors produced by type construction and parsing.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid identifier {value:?}: {reason}")]
    InvalidIdentifier { value: String, reason: String },

    #[error("invalid partition {name:?}: {reason}")]
    InvalidPartition { name: String, reason: String },
}

/// Result alias for type operations.
pub type TypeResult<T> = Result<T, TypeError>;
