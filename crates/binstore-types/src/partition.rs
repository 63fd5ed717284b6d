use serde::Serialize;

use crate::error::{TypeError, TypeResult};
use crate::identifier::parse_scheme;

/// Default number of hierarchy levels for minted identifiers.
pub const DEFAULT_LEVELS: u32 = 0;

/// Default width of each hierarchy segment.
pub const DEFAULT_LENGTH: u32 = 2;

/// A named, independently configured storage area.
///
/// The prefix (`"<scheme>:<opaque-prefix>"`) binds the partition to the
/// backend registered for its scheme. `levels` and `length` shape the
/// directory-like hierarchy of identifiers minted inside the partition.
/// Partitions are immutable once built.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Partition {
    name: String,
    prefix: String,
    levels: u32,
    length: u32,
}

impl Partition {
    /// Build a partition, validating the prefix and segment length.
    pub fn new(
        name: impl Into<String>,
        prefix: impl Into<String>,
        levels: u32,
        length: u32,
    ) -> TypeResult<Self> {
        let name = name.into();
        let prefix = prefix.into();
        if let Err(reason) = parse_scheme(&prefix) {
            return Err(TypeError::InvalidPartition {
                name,
                reason: format!("prefix {prefix:?}: {reason}"),
            });
        }
        if length == 0 {
            return Err(TypeError::InvalidPartition {
                name,
                reason: "segment length must be positive".into(),
            });
        }
        Ok(Self {
            name,
            prefix,
            levels,
            length,
        })
    }

    /// Build a partition with the default hierarchy (no levels, length 2).
    pub fn with_defaults(name: impl Into<String>, prefix: impl Into<String>) -> TypeResult<Self> {
        Self::new(name, prefix, DEFAULT_LEVELS, DEFAULT_LENGTH)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Number of hierarchy segments placed before each minted token.
    pub fn levels(&self) -> u32 {
        self.levels
    }

    /// Characters per hierarchy segment.
    pub fn length(&self) -> u32 {
        self.length
    }

    /// The lower-cased scheme of the prefix.
    pub fn scheme(&self) -> String {
        self.prefix
            .split_once(':')
            .map(|(scheme, _)| scheme.to_ascii_lowercase())
            .unwrap_or_default()
    }
}
