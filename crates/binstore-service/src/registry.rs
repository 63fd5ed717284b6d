use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use binstore_resolver::Resolver;

/// Scheme to resolver routing table.
///
/// Binding is last-writer-wins per scheme. Unbinding removes a scheme only
/// while it still points at the given resolver, compared by identity.
/// Mutations take the write lock once for all of a resolver's schemes;
/// lookups hold the read lock for a single map access.
#[derive(Default)]
pub struct ResolverRegistry {
    resolvers: RwLock<HashMap<String, Arc<dyn Resolver>>>,
}

impl ResolverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route every scheme of `resolver` to it, replacing earlier bindings.
    pub fn bind(&self, resolver: Arc<dyn Resolver>) {
        let mut map = self.write();
        for scheme in resolver.uri_schemes() {
            let scheme = scheme.to_ascii_lowercase();
            if let Some(previous) = map.insert(scheme.clone(), Arc::clone(&resolver)) {
                if !same(&previous, &resolver) {
                    tracing::info!(
                        scheme = %scheme,
                        previous = previous.name(),
                        resolver = resolver.name(),
                        "scheme rebound"
                    );
                }
            }
            tracing::debug!(scheme = %scheme, resolver = resolver.name(), "resolver bound");
        }
    }

    /// Drop the schemes of `resolver` that are still bound to it.
    pub fn unbind(&self, resolver: &Arc<dyn Resolver>) {
        let mut map = self.write();
        for scheme in resolver.uri_schemes() {
            let scheme = scheme.to_ascii_lowercase();
            if map.get(&scheme).is_some_and(|bound| same(bound, resolver)) {
                map.remove(&scheme);
                tracing::debug!(scheme = %scheme, resolver = resolver.name(), "resolver unbound");
            }
        }
    }

    /// The resolver bound to `scheme`, compared case-insensitively.
    pub fn get(&self, scheme: &str) -> Option<Arc<dyn Resolver>> {
        self.read().get(&scheme.to_ascii_lowercase()).cloned()
    }

    /// Bound schemes in sorted order.
    pub fn schemes(&self) -> Vec<String> {
        let mut schemes: Vec<String> = self.read().keys().cloned().collect();
        schemes.sort();
        schemes
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Arc<dyn Resolver>>> {
        self.resolvers.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Arc<dyn Resolver>>> {
        self.resolvers.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for ResolverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolverRegistry")
            .field("schemes", &self.schemes())
            .finish()
    }
}

fn same(a: &Arc<dyn Resolver>, b: &Arc<dyn Resolver>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use binstore_resolver::{FileResolver, MemoryResolver, ResolverResult};
    use binstore_types::{ByteStream, Identifier, Metadata};
    use std::thread;

    /// Resolver that only answers to its name.
    struct Named {
        name: &'static str,
        schemes: &'static [&'static str],
    }

    impl Resolver for Named {
        fn name(&self) -> &str {
            self.name
        }
        fn uri_schemes(&self) -> &'static [&'static str] {
            self.schemes
        }
        fn exists(&self, _: &str, _: &Identifier) -> ResolverResult<bool> {
            Ok(false)
        }
        fn get_content(&self, _: &str, _: &Identifier) -> ResolverResult<Option<ByteStream>> {
            Ok(None)
        }
        fn set_content(&self, _: &str, _: &Identifier, _: ByteStream, _: &Metadata) -> ResolverResult<()> {
            Ok(())
        }
        fn purge_content(&self, _: &str, _: &Identifier) -> ResolverResult<()> {
            Ok(())
        }
    }

    fn named(name: &'static str, schemes: &'static [&'static str]) -> Arc<dyn Resolver> {
        Arc::new(Named { name, schemes })
    }

    #[test]
    fn bind_routes_every_scheme() {
        let reg = ResolverRegistry::new();
        reg.bind(named("web", &["http", "https"]));
        assert_eq!(reg.schemes(), vec!["http", "https"]);
        assert_eq!(reg.get("https").unwrap().name(), "web");
        assert_eq!(reg.get("HTTP").unwrap().name(), "web");
        assert!(reg.get("ftp").is_none());
    }

    #[test]
    fn last_bind_wins() {
        let reg = ResolverRegistry::new();
        reg.bind(named("first", &["file"]));
        reg.bind(named("second", &["file", "mem"]));
        assert_eq!(reg.get("file").unwrap().name(), "second");
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn unbind_is_compare_and_remove() {
        let reg = ResolverRegistry::new();
        let first = named("first", &["file"]);
        let second = named("second", &["file"]);
        reg.bind(Arc::clone(&first));
        reg.bind(Arc::clone(&second));

        reg.unbind(&first);
        assert_eq!(reg.get("file").unwrap().name(), "second");

        reg.unbind(&second);
        assert!(reg.get("file").is_none());
        assert!(reg.is_empty());

        // unbinding again is harmless
        reg.unbind(&second);
    }

    #[test]
    fn unbind_keeps_schemes_taken_over() {
        let reg = ResolverRegistry::new();
        let web = named("web", &["http", "https"]);
        let tls = named("tls", &["https"]);
        reg.bind(Arc::clone(&web));
        reg.bind(Arc::clone(&tls));
        reg.unbind(&web);
        assert!(reg.get("http").is_none());
        assert_eq!(reg.get("https").unwrap().name(), "tls");
    }

    #[test]
    fn identity_not_equality() {
        let reg = ResolverRegistry::new();
        let bound: Arc<dyn Resolver> = Arc::new(MemoryResolver::new());
        let twin: Arc<dyn Resolver> = Arc::new(MemoryResolver::new());
        reg.bind(Arc::clone(&bound));
        reg.unbind(&twin);
        assert!(reg.get("mem").is_some());
    }

    #[test]
    fn concurrent_bind_and_lookup() {
        let reg = Arc::new(ResolverRegistry::new());
        reg.bind(Arc::new(FileResolver::new()));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let reg = Arc::clone(&reg);
                thread::spawn(move || {
                    for _ in 0..200 {
                        if i % 2 == 0 {
                            let r: Arc<dyn Resolver> = Arc::new(MemoryResolver::new());
                            reg.bind(Arc::clone(&r));
                            reg.unbind(&r);
                        } else {
                            assert_eq!(reg.get("file").unwrap().name(), "file");
                        }
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert!(reg.get("file").is_some());
    }
}
