use std::collections::{BTreeMap, HashMap};
use std::io::{Cursor, Read};
use std::sync::{PoisonError, RwLock};

use binstore_multipart::{PartListing, SessionId, SessionManager};
use binstore_types::{BinaryDescriptor, ByteStream, Identifier, Metadata};

use crate::error::{ResolverError, ResolverResult};
use crate::traits::Resolver;

type Key = (String, String);

/// In-process resolver for the `mem` scheme.
///
/// Content is held in a `RwLock`ed map keyed by partition and identifier.
/// Reads return a copy, so streams stay valid after the entry changes.
/// This is the backend that implements multipart uploads: parts are tracked
/// by a [`SessionManager`] and the assembled content is stored on completion.
///
/// Completed and aborted session records are kept so a repeated abort stays
/// idempotent. Dropping them is the owner's job: call
/// `sessions().purge_terminal()` periodically.
#[derive(Debug, Default)]
pub struct MemoryResolver {
    content: RwLock<HashMap<Key, Vec<u8>>>,
    uploads: SessionManager,
}

impl MemoryResolver {
    pub const SCHEMES: &'static [&'static str] = &["mem"];

    pub fn new() -> Self {
        Self::default()
    }

    /// Resolver whose multipart sessions are tracked by `uploads`.
    pub fn with_sessions(uploads: SessionManager) -> Self {
        Self {
            content: RwLock::new(HashMap::new()),
            uploads,
        }
    }

    /// Number of stored binaries across all partitions.
    pub fn len(&self) -> usize {
        self.content.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The session manager behind the multipart operations.
    ///
    /// Terminal sessions accumulate here until [`SessionManager::purge_terminal`].
    pub fn sessions(&self) -> &SessionManager {
        &self.uploads
    }

    fn key(partition: &str, identifier: &Identifier) -> Key {
        (partition.to_string(), identifier.as_str().to_string())
    }

    fn store(&self, partition: &str, identifier: &Identifier, data: Vec<u8>) {
        self.content
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(Self::key(partition, identifier), data);
    }
}

impl Resolver for MemoryResolver {
    fn name(&self) -> &str {
        "memory"
    }

    fn uri_schemes(&self) -> &'static [&'static str] {
        Self::SCHEMES
    }

    fn exists(&self, partition: &str, identifier: &Identifier) -> ResolverResult<bool> {
        let map = self.content.read().unwrap_or_else(PoisonError::into_inner);
        Ok(map.contains_key(&Self::key(partition, identifier)))
    }

    fn get_content(&self, partition: &str, identifier: &Identifier) -> ResolverResult<Option<ByteStream>> {
        let map = self.content.read().unwrap_or_else(PoisonError::into_inner);
        Ok(map
            .get(&Self::key(partition, identifier))
            .map(|data| Box::new(Cursor::new(data.clone())) as ByteStream))
    }

    fn set_content(
        &self,
        partition: &str,
        identifier: &Identifier,
        mut content: ByteStream,
        _metadata: &Metadata,
    ) -> ResolverResult<()> {
        let mut data = Vec::new();
        content.read_to_end(&mut data).map_err(|e| {
            tracing::error!(partition, identifier = %identifier, error = %e, "failed to read content");
            ResolverError::write(identifier.as_str(), e)
        })?;
        tracing::debug!(partition, identifier = %identifier, bytes = data.len(), "content stored");
        self.store(partition, identifier, data);
        Ok(())
    }

    fn purge_content(&self, partition: &str, identifier: &Identifier) -> ResolverResult<()> {
        self.content
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&Self::key(partition, identifier));
        Ok(())
    }

    fn supports_multipart_upload(&self) -> bool {
        true
    }

    fn initiate_upload(&self, partition: &str, identifier: &Identifier, mime_type: &str) -> ResolverResult<SessionId> {
        Ok(self.uploads.initiate(partition, identifier, mime_type))
    }

    fn upload_part(
        &self,
        session: &SessionId,
        part_number: u32,
        length: u64,
        content: ByteStream,
    ) -> ResolverResult<String> {
        Ok(self.uploads.upload_part(session, part_number, length, content)?)
    }

    fn list_parts(&self, session: &SessionId) -> ResolverResult<PartListing> {
        Ok(self.uploads.list_parts(session)?)
    }

    fn complete_upload(
        &self,
        session: &SessionId,
        expected: &BTreeMap<u32, String>,
    ) -> ResolverResult<BinaryDescriptor> {
        let done = self.uploads.complete(session, expected)?;
        self.store(&done.partition, &done.descriptor.identifier, done.content);
        Ok(done.descriptor)
    }

    fn abort_upload(&self, session: &SessionId) -> ResolverResult<()> {
        Ok(self.uploads.abort(session)?)
    }

    fn upload_session_exists(&self, session: &SessionId) -> ResolverResult<bool> {
        Ok(self.uploads.exists(session))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use binstore_digest::{DigestAlgorithm, DigestEngine};
    use binstore_multipart::UploadStatus;

    fn id(s: &str) -> Identifier {
        Identifier::parse(s).unwrap()
    }

    fn stream(data: &[u8]) -> ByteStream {
        Box::new(Cursor::new(data.to_vec()))
    }

    fn read_all(mut s: ByteStream) -> Vec<u8> {
        let mut buf = Vec::new();
        s.read_to_end(&mut buf).unwrap();
        buf
    }

    #[test]
    fn round_trip_and_purge() {
        let r = MemoryResolver::new();
        let target = id("mem:thing");
        assert!(!r.exists("p", &target).unwrap());
        r.set_content("p", &target, stream(b"Some data"), &Metadata::new()).unwrap();
        assert!(r.exists("p", &target).unwrap());
        assert!(!r.exists("other", &target).unwrap());
        assert_eq!(read_all(r.get_content("p", &target).unwrap().unwrap()), b"Some data");
        assert_eq!(r.len(), 1);

        r.purge_content("p", &target).unwrap();
        r.purge_content("p", &target).unwrap();
        assert!(r.get_content("p", &target).unwrap().is_none());
        assert!(r.is_empty());
    }

    #[test]
    fn open_stream_survives_overwrite() {
        let r = MemoryResolver::new();
        let target = id("mem:x");
        r.set_content("p", &target, stream(b"old"), &Metadata::new()).unwrap();
        let reader = r.get_content("p", &target).unwrap().unwrap();
        r.set_content("p", &target, stream(b"new"), &Metadata::new()).unwrap();
        assert_eq!(read_all(reader), b"old");
        assert_eq!(read_all(r.get_content("p", &target).unwrap().unwrap()), b"new");
    }

    #[test]
    fn multipart_upload_stores_assembled_content() {
        let r = MemoryResolver::new();
        assert!(r.supports_multipart_upload());
        let target = id("mem:big/object");
        let session = r.initiate_upload("p", &target, "text/plain").unwrap();
        assert!(r.upload_session_exists(&session).unwrap());

        r.upload_part(&session, 2, 5, stream(b"world")).unwrap();
        r.upload_part(&session, 1, 6, stream(b"hello ")).unwrap();
        assert!(!r.exists("p", &target).unwrap());

        let expected: BTreeMap<u32, String> = r.list_parts(&session).unwrap().iter().collect();
        let descriptor = r.complete_upload(&session, &expected).unwrap();
        assert_eq!(descriptor.size, 11);
        assert_eq!(descriptor.mime_type, "text/plain");
        assert_eq!(
            descriptor.digest,
            DigestEngine::HEX.digest_bytes(DigestAlgorithm::Sha256, b"hello world")
        );
        assert!(!r.upload_session_exists(&session).unwrap());
        assert_eq!(read_all(r.get_content("p", &target).unwrap().unwrap()), b"hello world");
    }

    #[test]
    fn integrity_failure_stores_nothing() {
        let r = MemoryResolver::new();
        let target = id("mem:y");
        let session = r.initiate_upload("p", &target, "application/octet-stream").unwrap();
        r.upload_part(&session, 1, 3, stream(b"abc")).unwrap();

        let mut wrong = BTreeMap::new();
        wrong.insert(1, "not-the-digest".to_string());
        let err = r.complete_upload(&session, &wrong).unwrap_err();
        assert!(err.is_integrity_failure());
        assert!(!r.exists("p", &target).unwrap());
        assert_eq!(r.sessions().status(&session), Some(UploadStatus::InProgress));
        assert!(r.upload_session_exists(&session).unwrap());
    }

    #[test]
    fn abort_is_idempotent_and_discards() {
        let r = MemoryResolver::new();
        let target = id("mem:z");
        let session = r.initiate_upload("p", &target, "text/plain").unwrap();
        r.upload_part(&session, 1, 1, stream(b"z")).unwrap();
        r.abort_upload(&session).unwrap();
        r.abort_upload(&session).unwrap();
        assert!(!r.upload_session_exists(&session).unwrap());
        assert!(!r.exists("p", &target).unwrap());
        assert!(matches!(
            r.upload_part(&session, 2, 1, stream(b"z")),
            Err(ResolverError::Upload(_))
        ));
    }

    #[test]
    fn unknown_session_is_not_found() {
        let r = MemoryResolver::new();
        let session = SessionId::from("missing");
        assert!(!r.upload_session_exists(&session).unwrap());
        assert!(matches!(r.abort_upload(&session), Err(ResolverError::Upload(_))));
    }

    #[test]
    fn terminal_sessions_are_kept_until_purged() {
        let r = MemoryResolver::new();
        let done = r.initiate_upload("p", &id("mem:a"), "text/plain").unwrap();
        r.upload_part(&done, 1, 1, stream(b"a")).unwrap();
        let expected: BTreeMap<u32, String> = r.list_parts(&done).unwrap().iter().collect();
        r.complete_upload(&done, &expected).unwrap();
        let dropped = r.initiate_upload("p", &id("mem:b"), "text/plain").unwrap();
        r.abort_upload(&dropped).unwrap();
        let open = r.initiate_upload("p", &id("mem:c"), "text/plain").unwrap();

        assert_eq!(r.sessions().session_count(), 3);
        assert_eq!(r.sessions().purge_terminal(), 2);
        assert_eq!(r.sessions().session_count(), 1);
        assert!(r.upload_session_exists(&open).unwrap());
        assert_eq!(read_all(r.get_content("p", &id("mem:a")).unwrap().unwrap()), b"a");
    }
}
