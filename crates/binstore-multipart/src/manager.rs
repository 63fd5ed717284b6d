use std::collections::{BTreeMap, HashMap};
use std::io::Read;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use binstore_digest::{DigestAlgorithm, DigestEngine};
use binstore_types::{BinaryDescriptor, Identifier};
use chrono::Utc;

use crate::error::{UploadError, UploadResult};
use crate::session::{SessionId, UploadSession, UploadStatus, UploadedPart};

type SharedSession = Arc<Mutex<UploadSession>>;

fn lock(session: &SharedSession) -> MutexGuard<'_, UploadSession> {
    session.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Result of a successful completion.
#[derive(Clone, Debug)]
pub struct CompletedUpload {
    pub partition: String,
    pub descriptor: BinaryDescriptor,
    /// The assembled content, ready for the backend to persist.
    pub content: Vec<u8>,
}

/// Lazy, restartable listing of the parts of one session.
///
/// Each call to [`PartListing::iter`] observes the session as it is at that
/// moment, so parts uploaded after the listing was obtained show up on the
/// next iteration.
#[derive(Clone, Debug)]
pub struct PartListing {
    session: SharedSession,
}

impl PartListing {
    /// Ascending `(part number, digest)` pairs.
    pub fn iter(&self) -> std::vec::IntoIter<(u32, String)> {
        lock(&self.session).part_digests().into_iter()
    }
}

impl IntoIterator for &PartListing {
    type Item = (u32, String);
    type IntoIter = std::vec::IntoIter<(u32, String)>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Tracks every multipart upload of one backend.
///
/// The session table is a `RwLock`ed map; each session has its own mutex so
/// that terminal transitions on one session are serialized without blocking
/// others.
#[derive(Debug)]
pub struct SessionManager {
    sessions: RwLock<HashMap<SessionId, SharedSession>>,
    algorithm: DigestAlgorithm,
    engine: DigestEngine,
}

impl SessionManager {
    /// Manager digesting parts with SHA-256, hex encoded.
    pub fn new() -> Self {
        Self::with_digest(DigestAlgorithm::Sha256, DigestEngine::HEX)
    }

    pub fn with_digest(algorithm: DigestAlgorithm, engine: DigestEngine) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            algorithm,
            engine,
        }
    }

    /// Algorithm used for part and content digests.
    pub fn algorithm(&self) -> DigestAlgorithm {
        self.algorithm
    }

    /// Start a new session.
    pub fn initiate(&self, partition: &str, identifier: &Identifier, mime_type: &str) -> SessionId {
        let session = UploadSession::new(partition, identifier.clone(), mime_type);
        let id = session.id.clone();
        tracing::debug!(session = %id, partition, identifier = %identifier, "upload initiated");
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.clone(), Arc::new(Mutex::new(session)));
        id
    }

    /// Receive one part and return its digest.
    ///
    /// Exactly `length` bytes are read from `content`; a stream that ends
    /// early is rejected. Re-uploading a part number replaces the earlier
    /// part.
    pub fn upload_part<R: Read>(
        &self,
        id: &SessionId,
        part_number: u32,
        length: u64,
        content: R,
    ) -> UploadResult<String> {
        if part_number == 0 {
            return Err(UploadError::InvalidPartNumber(part_number));
        }
        let session = self.get(id)?;
        ensure_open(&lock(&session))?;

        let mut data = Vec::new();
        content
            .take(length)
            .read_to_end(&mut data)
            .map_err(|source| UploadError::Io {
                part: part_number,
                source,
            })?;
        if (data.len() as u64) < length {
            tracing::warn!(session = %id, part = part_number, expected = length, actual = data.len(), "short part");
            return Err(UploadError::ShortPart {
                part: part_number,
                expected: length,
                actual: data.len() as u64,
            });
        }
        let digest = self.engine.digest_bytes(self.algorithm, &data);

        let mut guard = lock(&session);
        ensure_open(&guard)?;
        guard.put_part(UploadedPart {
            number: part_number,
            size: length,
            digest: digest.clone(),
            uploaded_at: Utc::now(),
            data,
        });
        tracing::debug!(session = %id, part = part_number, bytes = length, "part uploaded");
        Ok(digest)
    }

    /// Listing of the session's parts.
    pub fn list_parts(&self, id: &SessionId) -> UploadResult<PartListing> {
        Ok(PartListing {
            session: self.get(id)?,
        })
    }

    /// Verify the expected part digests and finalize the session.
    ///
    /// `expected` must name exactly the uploaded parts. On any mismatch the
    /// session is left untouched and may be retried or aborted.
    pub fn complete(&self, id: &SessionId, expected: &BTreeMap<u32, String>) -> UploadResult<CompletedUpload> {
        let session = self.get(id)?;
        let mut guard = lock(&session);
        ensure_open(&guard)?;
        if guard.parts.is_empty() {
            return Err(UploadError::NoParts(id.clone()));
        }

        let uploaded: Vec<u32> = guard.parts.keys().copied().collect();
        if !expected.keys().copied().eq(uploaded.iter().copied()) {
            tracing::error!(session = %id, "expected part set does not match uploaded parts");
            return Err(UploadError::PartSetMismatch {
                expected: expected.keys().copied().collect(),
                uploaded,
            });
        }
        for (number, part) in &guard.parts {
            let want = &expected[number];
            if *want != part.digest {
                tracing::error!(session = %id, part = number, "part digest mismatch");
                return Err(UploadError::Integrity {
                    part: *number,
                    expected: want.clone(),
                    actual: part.digest.clone(),
                });
            }
        }

        let content = guard.take_content();
        let digest = self.engine.digest_bytes(self.algorithm, &content);
        guard.finish(UploadStatus::Completed);
        let descriptor = BinaryDescriptor::new(
            guard.identifier.clone(),
            guard.mime_type.clone(),
            content.len() as u64,
            digest,
        );
        tracing::info!(session = %id, identifier = %descriptor.identifier, bytes = descriptor.size, "upload completed");
        Ok(CompletedUpload {
            partition: guard.partition.clone(),
            descriptor,
            content,
        })
    }

    /// Discard all parts and close the session. Aborting twice is a no-op.
    pub fn abort(&self, id: &SessionId) -> UploadResult<()> {
        let session = self.get(id)?;
        let mut guard = lock(&session);
        match guard.status {
            UploadStatus::Aborted => return Ok(()),
            UploadStatus::Completed => {
                return Err(UploadError::SessionClosed {
                    session: id.clone(),
                    status: guard.status,
                })
            }
            UploadStatus::Initiated | UploadStatus::InProgress => {}
        }
        guard.parts.clear();
        guard.finish(UploadStatus::Aborted);
        tracing::debug!(session = %id, "upload aborted");
        Ok(())
    }

    /// True while the session exists and can still accept parts.
    pub fn exists(&self, id: &SessionId) -> bool {
        self.status(id).is_some_and(|s| !s.is_terminal())
    }

    /// Current status, or `None` for an unknown session.
    pub fn status(&self, id: &SessionId) -> Option<UploadStatus> {
        let session = self.get(id).ok()?;
        let status = lock(&session).status;
        Some(status)
    }

    /// Number of tracked sessions, terminal ones included.
    pub fn session_count(&self) -> usize {
        self.sessions.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Forget completed and aborted sessions. Returns how many were dropped.
    pub fn purge_terminal(&self) -> usize {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        let before = sessions.len();
        sessions.retain(|_, s| !lock(s).status.is_terminal());
        before - sessions.len()
    }

    fn get(&self, id: &SessionId) -> UploadResult<SharedSession> {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
            .ok_or_else(|| UploadError::SessionNotFound(id.clone()))
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}

fn ensure_open(session: &UploadSession) -> UploadResult<()> {
    if session.status.is_terminal() {
        return Err(UploadError::SessionClosed {
            session: session.id.clone(),
            status: session.status,
        });
    }
    Ok(())
}
