//! Foundation types for Binstore.
//!
//! Binstore is a pluggable binary-content storage layer: opaque bytes are
//! addressed by a URI, and the URI scheme selects the backend that holds them.
//! Every other Binstore crate depends on `binstore-types`.
//!
//! # Key Types
//!
//! - [`Identifier`]: Validated URI split into scheme and scheme-specific part
//! - [`Partition`]: Named storage area bound to a prefix and an identifier hierarchy
//! - [`BinaryDescriptor`]: Summary of a finalized binary (size, digest, mime type)
//! - [`ByteStream`]: Owned, blocking byte source handed across the storage contract
//! - [`Metadata`]: String key/value pairs supplied alongside written content

pub mod descriptor;
pub mod error;
pub mod identifier;
pub mod partition;

use std::collections::BTreeMap;
use std::io::Read;

pub use descriptor::BinaryDescriptor;
pub use error::{TypeError, TypeResult};
pub use identifier::{parse_scheme, Identifier};
pub use partition::{Partition, DEFAULT_LENGTH, DEFAULT_LEVELS};

/// An owned, readable byte stream.
///
/// Ownership transfers with the value: whoever holds the box is responsible
/// for releasing it, which happens when it is dropped.
pub type ByteStream = Box<dyn Read + Send>;

/// Metadata supplied with content on write.
pub type Metadata = BTreeMap<String, String>;

/// Metadata key carrying the MIME type of written content.
pub const CONTENT_TYPE: &str = "content-type";
