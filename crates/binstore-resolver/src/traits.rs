use std::collections::BTreeMap;

use binstore_multipart::{PartListing, SessionId};
use binstore_types::{BinaryDescriptor, ByteStream, Identifier, Metadata};

use crate::error::{ResolverError, ResolverResult};

/// A storage backend for one or more URI schemes.
///
/// Implementations must uphold:
/// - `exists` is true exactly when `get_content` would return a stream.
///   I/O failures are errors, never `false`.
/// - `get_content` hands out a fresh stream positioned at the start. The
///   caller owns it and releases it by dropping it.
/// - After `set_content` returns, readers observe either the complete old
///   content or the complete new content, unless the backend documents a
///   weaker guarantee.
/// - `purge_content` on absent content succeeds.
///
/// Multipart operations are gated by [`Resolver::supports_multipart_upload`].
/// The default bodies fail with [`ResolverError::Unsupported`], so backends
/// that do not opt in never degrade silently.
pub trait Resolver: Send + Sync {
    /// Short name used in logs and errors.
    fn name(&self) -> &str;

    /// Claimed URI schemes, lower-case. Never empty.
    fn uri_schemes(&self) -> &'static [&'static str];

    fn exists(&self, partition: &str, identifier: &Identifier) -> ResolverResult<bool>;

    /// Open the content for reading. Returns `Ok(None)` if it is absent.
    fn get_content(&self, partition: &str, identifier: &Identifier) -> ResolverResult<Option<ByteStream>>;

    /// Store `content`, replacing anything already there.
    fn set_content(
        &self,
        partition: &str,
        identifier: &Identifier,
        content: ByteStream,
        metadata: &Metadata,
    ) -> ResolverResult<()>;

    /// Remove the content if present.
    fn purge_content(&self, partition: &str, identifier: &Identifier) -> ResolverResult<()>;

    fn supports_multipart_upload(&self) -> bool {
        false
    }

    /// Open an upload session for `identifier`.
    fn initiate_upload(
        &self,
        _partition: &str,
        _identifier: &Identifier,
        _mime_type: &str,
    ) -> ResolverResult<SessionId> {
        Err(ResolverError::unsupported(self.name(), "initiate_upload"))
    }

    /// Receive `length` bytes as part `part_number` and return the part digest.
    fn upload_part(
        &self,
        _session: &SessionId,
        _part_number: u32,
        _length: u64,
        _content: ByteStream,
    ) -> ResolverResult<String> {
        Err(ResolverError::unsupported(self.name(), "upload_part"))
    }

    fn list_parts(&self, _session: &SessionId) -> ResolverResult<PartListing> {
        Err(ResolverError::unsupported(self.name(), "list_parts"))
    }

    /// Verify the expected part digests, then assemble and store the content.
    fn complete_upload(
        &self,
        _session: &SessionId,
        _expected: &BTreeMap<u32, String>,
    ) -> ResolverResult<BinaryDescriptor> {
        Err(ResolverError::unsupported(self.name(), "complete_upload"))
    }

    fn abort_upload(&self, _session: &SessionId) -> ResolverResult<()> {
        Err(ResolverError::unsupported(self.name(), "abort_upload"))
    }

    fn upload_session_exists(&self, _session: &SessionId) -> ResolverResult<bool> {
        Err(ResolverError::unsupported(self.name(), "upload_session_exists"))
    }
}
