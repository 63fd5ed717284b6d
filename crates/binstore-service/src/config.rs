use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use binstore_digest::DigestEncoding;
use binstore_http::HttpResolverConfig;
use binstore_types::{Partition, DEFAULT_LENGTH, DEFAULT_LEVELS};
use serde::{Deserialize, Serialize};

use crate::error::{ServiceError, ServiceResult};
use crate::identifier::MAX_HIERARCHY_WIDTH;

/// Top-level service configuration, usually read from `binstore.toml`.
///
/// ```toml
/// digest_encoding = "base64"
///
/// [http]
/// max_connections_per_route = 5
///
/// [partitions.repository]
/// prefix = "file:"
/// levels = 2
/// path = "/var/lib/binstore"
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub digest_encoding: DigestEncoding,
    /// Bind the in-memory resolver for the `mem` scheme.
    pub memory_resolver: bool,
    pub http: HttpResolverConfig,
    pub partitions: BTreeMap<String, PartitionSettings>,
}

/// One `[partitions.<name>]` table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionSettings {
    pub prefix: Option<String>,
    #[serde(default)]
    pub levels: u32,
    #[serde(default = "default_length")]
    pub length: u32,
    /// Root directory, for partitions stored by the file resolver.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

fn default_length() -> u32 {
    DEFAULT_LENGTH
}

impl Default for PartitionSettings {
    fn default() -> Self {
        Self {
            prefix: None,
            levels: DEFAULT_LEVELS,
            length: DEFAULT_LENGTH,
            path: None,
        }
    }
}

impl PartitionSettings {
    /// Validate the settings and build the partition called `name`.
    pub fn to_partition(&self, name: &str) -> ServiceResult<Partition> {
        let prefix = self
            .prefix
            .as_deref()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| ServiceError::Configuration(format!("partition {name:?} has no prefix")))?;
        let partition = Partition::new(name, prefix, self.levels, self.length)
            .map_err(|e| ServiceError::Configuration(e.to_string()))?;
        check_hierarchy(&partition)?;
        Ok(partition)
    }
}

/// Reject hierarchies wider than the minted token.
pub(crate) fn check_hierarchy(partition: &Partition) -> ServiceResult<()> {
    let width = u64::from(partition.levels()) * u64::from(partition.length());
    if width > u64::from(MAX_HIERARCHY_WIDTH) {
        return Err(ServiceError::Configuration(format!(
            "partition {:?}: levels x length is {width}, at most {MAX_HIERARCHY_WIDTH} allowed",
            partition.name()
        )));
    }
    Ok(())
}

impl ServiceConfig {
    pub fn from_toml_str(s: &str) -> ServiceResult<Self> {
        toml::from_str(s).map_err(|e| ServiceError::Configuration(e.to_string()))
    }

    /// Read and parse a TOML file.
    pub fn load(path: impl AsRef<Path>) -> ServiceResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ServiceError::ConfigFile {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(path = %path.display(), partitions = config.partitions.len(), "configuration loaded");
        Ok(config)
    }

    pub fn to_toml_string(&self) -> ServiceResult<String> {
        toml::to_string_pretty(self).map_err(|e| ServiceError::Configuration(e.to_string()))
    }

    /// Validated partitions, ordered by name.
    pub fn partitions(&self) -> ServiceResult<Vec<Partition>> {
        self.partitions
            .iter()
            .map(|(name, settings)| settings.to_partition(name))
            .collect()
    }

    /// Root directories of partitions that declare one.
    pub fn partition_roots(&self) -> impl Iterator<Item = (&str, &Path)> {
        self.partitions
            .iter()
            .filter_map(|(name, s)| s.path.as_deref().map(|p| (name.as_str(), p)))
    }
}
