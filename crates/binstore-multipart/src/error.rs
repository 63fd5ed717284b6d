use thiserror::Error;

use crate::session::{SessionId, UploadStatus};

/// Errors from multipart upload operations.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("upload session not found: {0}")]
    SessionNotFound(SessionId),

    #[error("upload session {session} is {status} and accepts no further changes")]
    SessionClosed {
        session: SessionId,
        status: UploadStatus,
    },

    #[error("part numbers start at 1, got {0}")]
    InvalidPartNumber(u32),

    #[error("part {part} ended after {actual} of {expected} bytes")]
    ShortPart { part: u32, expected: u64, actual: u64 },

    #[error("failed to read part {part}: {source}")]
    Io {
        part: u32,
        #[source]
        source: std::io::Error,
    },

    #[error("upload session {0} has no parts")]
    NoParts(SessionId),

    #[error("integrity check failed for part {part}: expected {expected}, stored {actual}")]
    Integrity {
        part: u32,
        expected: String,
        actual: String,
    },

    #[error("expected parts {expected:?} do not match uploaded parts {uploaded:?}")]
    PartSetMismatch { expected: Vec<u32>, uploaded: Vec<u32> },
}

impl UploadError {
    /// True for failures that indicate the uploaded data does not match
    /// what the caller expected.
    pub fn is_integrity_failure(&self) -> bool {
        matches!(self, Self::Integrity { .. } | Self::PartSetMismatch { .. })
    }
}

/// Result alias for multipart upload operations.
pub type UploadResult<T> = Result<T, UploadError>;
