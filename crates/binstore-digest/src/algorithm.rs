use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use digest::DynDigest;
use serde::{Deserialize, Serialize};

use crate::error::DigestError;

/// A supported message-digest algorithm.
///
/// Names follow the conventional registry spelling (`MD5`, `SHA-256`, ...)
/// and parse case-insensitively. `SHA` is accepted as an alias for SHA-1.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DigestAlgorithm {
    Md2,
    Md5,
    Sha1,
    Sha256,
    Sha384,
    Sha512,
}

impl DigestAlgorithm {
    /// Every supported algorithm, weakest first.
    pub const ALL: [Self; 6] = [
        Self::Md2,
        Self::Md5,
        Self::Sha1,
        Self::Sha256,
        Self::Sha384,
        Self::Sha512,
    ];

    /// Alternative names accepted by [`DigestAlgorithm::from_name`].
    pub const ALIASES: [(&'static str, Self); 1] = [("SHA", Self::Sha1)];

    /// Canonical name of the algorithm.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Md2 => "MD2",
            Self::Md5 => "MD5",
            Self::Sha1 => "SHA-1",
            Self::Sha256 => "SHA-256",
            Self::Sha384 => "SHA-384",
            Self::Sha512 => "SHA-512",
        }
    }

    /// Look up an algorithm by canonical name or alias, ignoring case.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|alg| alg.name().eq_ignore_ascii_case(name))
            .or_else(|| {
                Self::ALIASES
                    .into_iter()
                    .find(|(alias, _)| alias.eq_ignore_ascii_case(name))
                    .map(|(_, alg)| alg)
            })
    }

    /// Every accepted name, canonical names and aliases alike.
    pub fn supported_names() -> BTreeSet<&'static str> {
        Self::ALL
            .iter()
            .map(Self::name)
            .chain(Self::ALIASES.iter().map(|(alias, _)| *alias))
            .collect()
    }

    /// Length of the raw digest in bytes.
    pub fn output_len(&self) -> usize {
        match self {
            Self::Md2 | Self::Md5 => 16,
            Self::Sha1 => 20,
            Self::Sha256 => 32,
            Self::Sha384 => 48,
            Self::Sha512 => 64,
        }
    }

    /// A fresh incremental hasher for this algorithm.
    pub(crate) fn hasher(&self) -> Box<dyn DynDigest> {
        match self {
            Self::Md2 => Box::new(md2::Md2::default()),
            Self::Md5 => Box::new(md5::Md5::default()),
            Self::Sha1 => Box::new(sha1::Sha1::default()),
            Self::Sha256 => Box::new(sha2::Sha256::default()),
            Self::Sha384 => Box::new(sha2::Sha384::default()),
            Self::Sha512 => Box::new(sha2::Sha512::default()),
        }
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DigestAlgorithm {
    type Err = DigestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| DigestError::UnsupportedAlgorithm(s.to_string()))
    }
}
