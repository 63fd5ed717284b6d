//! Streaming message digests for Binstore.
//!
//! [`DigestEngine`] consumes a byte stream to exhaustion and returns its
//! digest as text. The algorithm is chosen by name at call time, and the
//! engine's [`DigestEncoding`] decides whether the raw digest bytes are
//! rendered as lower-case hex or standard base64.
//!
//! All hashing wraps the RustCrypto implementations. Nothing here is
//! hand-rolled.

pub mod algorithm;
pub mod engine;
pub mod error;

pub use algorithm::DigestAlgorithm;
pub use engine::{DigestEncoding, DigestEngine};
pub use error::{DigestError, DigestResult};
