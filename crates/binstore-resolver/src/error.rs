use binstore_multipart::UploadError;

/// Errors from resolver operations.
///
/// Missing content is not an error: lookups return `Ok(None)` or
/// `Ok(false)` instead.
#[derive(Debug, thiserror::Error)]
pub enum ResolverError {
    /// The resolver could not be built from its configuration.
    #[error("invalid resolver configuration: {0}")]
    Configuration(String),

    /// The resolver has no storage configured for the partition.
    #[error("{resolver} resolver has no partition named {partition:?}")]
    UnknownPartition { resolver: String, partition: String },

    /// The identifier cannot be mapped to a storage location.
    #[error("identifier {identifier:?} cannot be stored: {reason}")]
    InvalidIdentifier { identifier: String, reason: String },

    /// I/O failure while reading or probing content.
    #[error("I/O error while {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// The request never produced a response (connect, TLS, timeout).
    #[error("transport error for {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The remote answered a read with an error status.
    #[error("{url} responded with status {status}")]
    Status { url: String, status: u16 },

    /// Content could not be written or removed.
    #[error("failed to write {target}: {reason}")]
    Write { target: String, reason: String },

    /// The backend does not implement the operation.
    #[error("{resolver} resolver does not support {operation}")]
    Unsupported {
        resolver: String,
        operation: &'static str,
    },

    /// Multipart upload failure.
    #[error(transparent)]
    Upload(#[from] UploadError),
}

impl ResolverError {
    pub fn unsupported(resolver: &str, operation: &'static str) -> Self {
        Self::Unsupported {
            resolver: resolver.to_string(),
            operation,
        }
    }

    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    pub fn write(target: impl Into<String>, reason: impl ToString) -> Self {
        Self::Write {
            target: target.into(),
            reason: reason.to_string(),
        }
    }

    /// True when multipart completion rejected the uploaded parts.
    pub fn is_integrity_failure(&self) -> bool {
        matches!(self, Self::Upload(e) if e.is_integrity_failure())
    }
}

/// Result alias for resolver operations.
pub type ResolverResult<T> = Result<T, ResolverError>;
