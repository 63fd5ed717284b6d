use thiserror::Error;

/// Errors from digest computation.
#[derive(Debug, Error)]
pub enum DigestError {
    #[error("unsupported digest algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("failed to read content: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for digest operations.
pub type DigestResult<T> = Result<T, DigestError>;
