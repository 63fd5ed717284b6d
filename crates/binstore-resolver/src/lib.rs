//! Storage resolvers for Binstore.
//!
//! A [`Resolver`] stores opaque content for the URI schemes it claims. The
//! registry in `binstore-service` routes each identifier to the resolver
//! bound to its scheme.
//!
//! Two backends live here:
//! - [`FileResolver`] maps each partition to a root directory and writes
//!   through an atomic rename.
//! - [`MemoryResolver`] keeps content in process and implements the
//!   multipart upload protocol.
//!
//! The HTTP backend lives in `binstore-http`.

pub mod error;
pub mod file;
pub mod memory;
pub mod traits;

pub use error::{ResolverError, ResolverResult};
pub use file::FileResolver;
pub use memory::MemoryResolver;
pub use traits::Resolver;
