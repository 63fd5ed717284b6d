use std::collections::BTreeMap;
use std::fmt;

use binstore_types::Identifier;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque upload session identifier (UUID v4, hyphenated).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Generate a fresh random session id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Lifecycle state of an upload session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadStatus {
    Initiated,
    InProgress,
    Completed,
    Aborted,
}

impl UploadStatus {
    /// Completed and aborted sessions never change again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Aborted)
    }
}

impl fmt::Display for UploadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Initiated => "initiated",
            Self::InProgress => "in progress",
            Self::Completed => "completed",
            Self::Aborted => "aborted",
        };
        f.write_str(s)
    }
}

/// A single received part.
#[derive(Clone, Debug)]
pub struct UploadedPart {
    pub number: u32,
    pub size: u64,
    pub digest: String,
    pub uploaded_at: DateTime<Utc>,
    pub(crate) data: Vec<u8>,
}

/// State of one multipart upload.
#[derive(Clone, Debug)]
pub struct UploadSession {
    pub id: SessionId,
    pub partition: String,
    pub identifier: Identifier,
    pub mime_type: String,
    pub parts: BTreeMap<u32, UploadedPart>,
    pub status: UploadStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UploadSession {
    pub fn new(partition: impl Into<String>, identifier: Identifier, mime_type: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: SessionId::generate(),
            partition: partition.into(),
            identifier,
            mime_type: mime_type.into(),
            parts: BTreeMap::new(),
            status: UploadStatus::Initiated,
            created_at: now,
            updated_at: now,
        }
    }

    /// `(part number, digest)` pairs in ascending part order.
    pub fn part_digests(&self) -> Vec<(u32, String)> {
        self.parts
            .values()
            .map(|p| (p.number, p.digest.clone()))
            .collect()
    }

    /// Sum of all part sizes.
    pub fn total_size(&self) -> u64 {
        self.parts.values().map(|p| p.size).sum()
    }

    pub(crate) fn put_part(&mut self, part: UploadedPart) {
        self.updated_at = part.uploaded_at;
        self.parts.insert(part.number, part);
        self.status = UploadStatus::InProgress;
    }

    /// Concatenate part data in ascending order, releasing the buffers.
    pub(crate) fn take_content(&mut self) -> Vec<u8> {
        let mut content = Vec::with_capacity(self.total_size() as usize);
        for part in self.parts.values_mut() {
            content.append(&mut part.data);
        }
        content
    }

    pub(crate) fn finish(&mut self, status: UploadStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn part(number: u32, data: &[u8]) -> UploadedPart {
        UploadedPart {
            number,
            size: data.len() as u64,
            digest: format!("d{number}"),
            uploaded_at: Utc::now(),
            data: data.to_vec(),
        }
    }

    fn session() -> UploadSession {
        UploadSession::new("repo", Identifier::parse("mem:obj").unwrap(), "text/plain")
    }

    #[test]
    fn new_session_is_initiated() {
        let s = session();
        assert_eq!(s.status, UploadStatus::Initiated);
        assert!(s.parts.is_empty());
        assert_eq!(s.total_size(), 0);
        assert_eq!(s.created_at, s.updated_at);
    }

    #[test]
    fn session_ids_are_unique() {
        let a = SessionId::generate();
        let b = SessionId::generate();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 36);
    }

    #[test]
    fn put_part_moves_to_in_progress() {
        let mut s = session();
        s.put_part(part(1, b"abc"));
        assert_eq!(s.status, UploadStatus::InProgress);
        assert_eq!(s.total_size(), 3);
    }

    #[test]
    fn content_is_assembled_in_part_order() {
        let mut s = session();
        s.put_part(part(3, b"!"));
        s.put_part(part(1, b"hello"));
        s.put_part(part(2, b", world"));
        assert_eq!(
            s.part_digests(),
            vec![(1, "d1".into()), (2, "d2".into()), (3, "d3".into())]
        );
        assert_eq!(s.take_content(), b"hello, world!");
        assert!(s.parts.values().all(|p| p.data.is_empty()));
    }

    #[test]
    fn terminal_states() {
        assert!(!UploadStatus::Initiated.is_terminal());
        assert!(!UploadStatus::InProgress.is_terminal());
        assert!(UploadStatus::Completed.is_terminal());
        assert!(UploadStatus::Aborted.is_terminal());
    }

    #[test]
    fn status_serde() {
        let json = serde_json::to_string(&UploadStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
        let id: SessionId = serde_json::from_str("\"abc\"").unwrap();
        assert_eq!(id.as_str(), "abc");
    }
}
