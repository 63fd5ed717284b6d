//! The Binstore binary service.
//!
//! [`BinaryService`] ties the storage pieces together:
//!
//! - a [`ResolverRegistry`] routing URI schemes to [`Resolver`]s,
//! - an immutable set of [`Partition`]s, each checked at construction to
//!   have a resolver for its prefix scheme,
//! - an [`IdentifierService`] minting fresh identifiers inside a
//!   partition's hierarchy,
//! - a [`DigestEngine`] for checksums over any byte stream.
//!
//! [`ServiceConfig`] loads all of this from TOML.
//!
//! [`Resolver`]: binstore_resolver::Resolver
//! [`Partition`]: binstore_types::Partition
//! [`DigestEngine`]: binstore_digest::DigestEngine

pub mod config;
pub mod error;
pub mod identifier;
pub mod registry;
pub mod service;

pub use config::{PartitionSettings, ServiceConfig};
pub use error::{ServiceError, ServiceResult};
pub use identifier::{IdentifierService, IdentifierSupplier, UuidIdentifierService, MAX_HIERARCHY_WIDTH};
pub use registry::ResolverRegistry;
pub use service::BinaryService;
