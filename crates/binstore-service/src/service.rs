use std::collections::{BTreeMap, BTreeSet};
use std::io::Read;
use std::sync::Arc;

use binstore_digest::DigestEngine;
use binstore_http::HttpResolver;
use binstore_resolver::{FileResolver, MemoryResolver, Resolver};
use binstore_types::{parse_scheme, ByteStream, Identifier, Metadata, Partition};

use crate::config::{check_hierarchy, ServiceConfig};
use crate::error::{ServiceError, ServiceResult};
use crate::identifier::{IdentifierService, IdentifierSupplier, UuidIdentifierService};
use crate::registry::ResolverRegistry;

/// Routes binary content to the resolver for its identifier's scheme.
///
/// Partitions are fixed at construction. Every partition prefix must name a
/// scheme with a bound resolver by then, otherwise construction fails.
/// Resolvers may be bound and unbound afterwards.
pub struct BinaryService {
    registry: ResolverRegistry,
    partitions: BTreeMap<String, Partition>,
    id_service: Arc<dyn IdentifierService>,
    engine: DigestEngine,
}

impl BinaryService {
    /// Build and validate a service.
    pub fn new(
        id_service: Arc<dyn IdentifierService>,
        partitions: impl IntoIterator<Item = Partition>,
        resolvers: impl IntoIterator<Item = Arc<dyn Resolver>>,
        engine: DigestEngine,
    ) -> ServiceResult<Self> {
        let registry = ResolverRegistry::new();
        for resolver in resolvers {
            registry.bind(resolver);
        }

        let mut by_name = BTreeMap::new();
        for partition in partitions {
            check_hierarchy(&partition)?;
            let scheme = partition.scheme();
            if registry.get(&scheme).is_none() {
                tracing::error!(partition = partition.name(), scheme = %scheme, "no resolver for partition");
                return Err(ServiceError::Configuration(format!(
                    "partition {:?}: no resolver bound for scheme {scheme:?} of prefix {:?}",
                    partition.name(),
                    partition.prefix()
                )));
            }
            let name = partition.name().to_string();
            if by_name.insert(name.clone(), partition).is_some() {
                return Err(ServiceError::Configuration(format!("partition {name:?} defined twice")));
            }
        }

        tracing::info!(
            partitions = by_name.len(),
            schemes = ?registry.schemes(),
            encoding = ?engine.encoding(),
            "binary service ready"
        );
        Ok(Self {
            registry,
            partitions: by_name,
            id_service,
            engine,
        })
    }

    /// Build the standard resolvers described by `config`.
    ///
    /// The file resolver gets the `path` of every partition that has one,
    /// and `file` partitions without a path are rejected. The HTTP resolver
    /// is always bound; the memory resolver only when enabled.
    pub fn from_config(config: &ServiceConfig) -> ServiceResult<Self> {
        let partitions = config.partitions()?;

        let mut file = FileResolver::new();
        for (name, root) in config.partition_roots() {
            file = file.with_partition(name, root);
        }
        for partition in &partitions {
            if FileResolver::SCHEMES.contains(&partition.scheme().as_str()) && file.root(partition.name()).is_none() {
                return Err(ServiceError::Configuration(format!(
                    "partition {:?} uses the file scheme but has no path",
                    partition.name()
                )));
            }
        }

        let http = HttpResolver::new(config.http.clone())
            .map_err(|e| ServiceError::Configuration(e.to_string()))?;
        let mut resolvers: Vec<Arc<dyn Resolver>> = vec![Arc::new(file), Arc::new(http)];
        if config.memory_resolver {
            resolvers.push(Arc::new(MemoryResolver::new()));
        }

        Self::new(
            Arc::new(UuidIdentifierService::new()),
            partitions,
            resolvers,
            DigestEngine::new(config.digest_encoding),
        )
    }

    // ---- Registry ----

    pub fn bind(&self, resolver: Arc<dyn Resolver>) {
        self.registry.bind(resolver);
    }

    pub fn unbind(&self, resolver: &Arc<dyn Resolver>) {
        self.registry.unbind(resolver);
    }

    pub fn registry(&self) -> &ResolverRegistry {
        &self.registry
    }

    /// Resolver for the scheme of `identifier`. Never fails: identifiers
    /// without a scheme or with an unbound one give `None`.
    pub fn get_resolver(&self, identifier: &str) -> Option<Arc<dyn Resolver>> {
        let scheme = parse_scheme(identifier).ok()?;
        self.registry.get(scheme)
    }

    /// Resolver for the scheme of the partition's prefix.
    pub fn get_resolver_for_partition(&self, name: &str) -> Option<Arc<dyn Resolver>> {
        let partition = self.partitions.get(name)?;
        self.registry.get(&partition.scheme())
    }

    // ---- Partitions ----

    pub fn partition(&self, name: &str) -> Option<&Partition> {
        self.partitions.get(name)
    }

    /// All partitions, ordered by name.
    pub fn partitions(&self) -> impl Iterator<Item = &Partition> {
        self.partitions.values()
    }

    /// Fresh identifiers inside the partition's prefix and hierarchy.
    pub fn get_identifier_supplier(&self, name: &str) -> ServiceResult<IdentifierSupplier> {
        let partition = self
            .partitions
            .get(name)
            .ok_or_else(|| ServiceError::Configuration(format!("unknown partition {name:?}")))?;
        Ok(self
            .id_service
            .supplier(partition.prefix(), partition.levels(), partition.length()))
    }

    // ---- Digests ----

    /// Digest `stream` with the named algorithm. `None` covers both an
    /// unsupported algorithm and a read failure.
    pub fn digest<R: Read>(&self, algorithm: &str, stream: R) -> Option<String> {
        self.engine.digest(algorithm, stream)
    }

    pub fn supported_algorithms(&self) -> BTreeSet<&'static str> {
        DigestEngine::supported_algorithms()
    }

    pub fn digest_engine(&self) -> DigestEngine {
        self.engine
    }

    // ---- Content ----

    pub fn exists(&self, partition: &str, identifier: &Identifier) -> ServiceResult<bool> {
        let resolver = self.route(partition, identifier)?;
        Ok(resolver.exists(partition, identifier)?)
    }

    pub fn get_content(&self, partition: &str, identifier: &Identifier) -> ServiceResult<Option<ByteStream>> {
        let resolver = self.route(partition, identifier)?;
        Ok(resolver.get_content(partition, identifier)?)
    }

    pub fn set_content(
        &self,
        partition: &str,
        identifier: &Identifier,
        content: ByteStream,
        metadata: &Metadata,
    ) -> ServiceResult<()> {
        let resolver = self.route(partition, identifier)?;
        Ok(resolver.set_content(partition, identifier, content, metadata)?)
    }

    pub fn purge_content(&self, partition: &str, identifier: &Identifier) -> ServiceResult<()> {
        let resolver = self.route(partition, identifier)?;
        Ok(resolver.purge_content(partition, identifier)?)
    }

    fn route(&self, partition: &str, identifier: &Identifier) -> ServiceResult<Arc<dyn Resolver>> {
        if !self.partitions.contains_key(partition) {
            tracing::warn!(partition, identifier = %identifier, "unknown partition");
            return Err(ServiceError::UnknownPartition(partition.to_string()));
        }
        self.registry.get(identifier.scheme()).ok_or_else(|| {
            tracing::warn!(scheme = identifier.scheme(), identifier = %identifier, "no resolver bound for scheme");
            ServiceError::NoResolver(identifier.scheme().to_string())
        })
    }
}

impl std::fmt::Debug for BinaryService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BinaryService")
            .field("registry", &self.registry)
            .field("partitions", &self.partitions)
            .field("engine", &self.engine)
            .finish()
    }
}
