use std::collections::BTreeSet;
use std::io::{ErrorKind, Read};

use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::algorithm::DigestAlgorithm;
use crate::error::{DigestError, DigestResult};

/// Read buffer size used while hashing a stream.
const CHUNK_SIZE: usize = 8 * 1024;

/// Text encoding applied to raw digest bytes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestEncoding {
    /// Lower-case hexadecimal.
    Hex,
    /// Standard base64 alphabet with padding.
    #[default]
    Base64,
}

impl DigestEncoding {
    /// Encode raw digest bytes.
    pub fn encode(&self, raw: &[u8]) -> String {
        match self {
            Self::Hex => hex::encode(raw),
            Self::Base64 => base64::engine::general_purpose::STANDARD.encode(raw),
        }
    }
}

/// Computes digests of byte streams.
///
/// The stream is always consumed until end-of-input or the first read
/// error, and is dropped before the call returns.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DigestEngine {
    encoding: DigestEncoding,
}

impl DigestEngine {
    /// Engine producing lower-case hex digests.
    pub const HEX: Self = Self {
        encoding: DigestEncoding::Hex,
    };
    /// Engine producing base64 digests.
    pub const BASE64: Self = Self {
        encoding: DigestEncoding::Base64,
    };

    pub const fn new(encoding: DigestEncoding) -> Self {
        Self { encoding }
    }

    pub fn encoding(&self) -> DigestEncoding {
        self.encoding
    }

    /// Digest a stream using the algorithm named `algorithm`.
    ///
    /// Returns `None` when the name is not a supported algorithm or when
    /// reading the stream fails. Read failures are logged, not raised.
    pub fn digest<R: Read>(&self, algorithm: &str, stream: R) -> Option<String> {
        let Some(alg) = DigestAlgorithm::from_name(algorithm) else {
            tracing::debug!(algorithm, "unsupported digest algorithm requested");
            return None;
        };
        match self.digest_with(alg, stream) {
            Ok(digest) => Some(digest),
            Err(e) => {
                tracing::error!(algorithm = alg.name(), error = %e, "failed to compute digest");
                None
            }
        }
    }

    /// Digest a stream with a known algorithm, surfacing read errors.
    pub fn digest_with<R: Read>(&self, algorithm: DigestAlgorithm, mut stream: R) -> DigestResult<String> {
        let mut hasher = algorithm.hasher();
        let mut buf = [0u8; CHUNK_SIZE];
        let mut total = 0u64;
        loop {
            let n = match stream.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(DigestError::Io(e)),
            };
            hasher.update(&buf[..n]);
            total += n as u64;
        }
        tracing::trace!(algorithm = algorithm.name(), bytes = total, "digest computed");
        Ok(self.encoding.encode(&hasher.finalize()))
    }

    /// Digest an in-memory buffer.
    pub fn digest_bytes(&self, algorithm: DigestAlgorithm, data: &[u8]) -> String {
        let mut hasher = algorithm.hasher();
        hasher.update(data);
        self.encoding.encode(&hasher.finalize())
    }

    /// Names accepted by [`DigestEngine::digest`], aliases included.
    pub fn supported_algorithms() -> BTreeSet<&'static str> {
        DigestAlgorithm::supported_names()
    }
}
