use std::path::PathBuf;

use binstore_resolver::ResolverError;
use binstore_types::TypeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// Invalid setup detected while building the service.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("failed to read configuration file {path}: {source}")]
    ConfigFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unknown partition: {0}")]
    UnknownPartition(String),

    #[error("no resolver bound for scheme {0:?}")]
    NoResolver(String),

    #[error(transparent)]
    Type(#[from] TypeError),

    #[error(transparent)]
    Resolver(#[from] ResolverError),
}

pub type ServiceResult<T> = Result<T, ServiceError>;
