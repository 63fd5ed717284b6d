use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{TypeError, TypeResult};

/// A binary identifier: an opaque URI string.
///
/// Only the scheme is interpreted here. It selects the backend that stores
/// the content. The scheme-specific part (everything after the first `:`) is
/// kept verbatim and handed to that backend, which gives it meaning locally:
/// a relative path for `file:`, the full URL for `http:`.
///
/// Schemes follow RFC 3986 (`ALPHA *( ALPHA / DIGIT / "+" / "-" / "." )`)
/// and compare case-insensitively, so [`Identifier::scheme`] is lower-cased.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identifier {
    value: String,
    scheme: String,
    ssp_start: usize,
}

impl Identifier {
    /// Parse and validate an identifier.
    pub fn parse(value: impl Into<String>) -> TypeResult<Self> {
        let value = value.into();
        let scheme = parse_scheme(&value).map_err(|reason| TypeError::InvalidIdentifier {
            value: value.clone(),
            reason: reason.to_string(),
        })?;
        let ssp_start = scheme.len() + 1;
        Ok(Self {
            scheme: scheme.to_ascii_lowercase(),
            value,
            ssp_start,
        })
    }

    /// The lower-cased URI scheme.
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Everything after the first `:`, undecoded.
    pub fn scheme_specific_part(&self) -> &str {
        &self.value[self.ssp_start..]
    }

    /// The full identifier as given.
    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// Consume the identifier and return the underlying string.
    pub fn into_string(self) -> String {
        self.value
    }
}

/// Extract the scheme of `value`, or the reason it has none.
///
/// Exposed so callers can route on a raw string without building an
/// [`Identifier`].
pub fn parse_scheme(value: &str) -> Result<&str, &'static str> {
    let Some((scheme, _)) = value.split_once(':') else {
        return Err("missing scheme separator ':'");
    };
    let mut chars = scheme.chars();
    match chars.next() {
        None => return Err("empty scheme"),
        Some(c) if !c.is_ascii_alphabetic() => return Err("scheme must start with a letter"),
        Some(_) => {}
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')) {
        return Err("scheme contains an invalid character");
    }
    Ok(scheme)
}

impl fmt::Debug for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identifier({})", self.value)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

impl FromStr for Identifier {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Identifier {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl TryFrom<&str> for Identifier {
    type Error = TypeError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<Identifier> for String {
    fn from(id: Identifier) -> Self {
        id.value
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.value
    }
}
