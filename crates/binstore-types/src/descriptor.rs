use serde::{Deserialize, Serialize};

use crate::identifier::Identifier;

/// Summary of a finalized binary.
///
/// Returned when a multipart upload completes. `digest` is the digest of the
/// assembled content, computed with the backend's part-digest algorithm.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinaryDescriptor {
    pub identifier: Identifier,
    pub mime_type: String,
    pub size: u64,
    pub digest: String,
}

impl BinaryDescriptor {
    pub fn new(identifier: Identifier, mime_type: impl Into<String>, size: u64, digest: String) -> Self {
        Self {
            identifier,
            mime_type: mime_type.into(),
            size,
            digest,
        }
    }
}
