//! Per-tenant resource cache with at-most-once creation.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::backend::ResourceFactory;
use crate::context::Context;
use crate::error::Error;

/// Lazily-populated cache of tenant-scoped resources.
///
/// Lookups take a read lock; a miss upgrades to the write lock and
/// re-checks before invoking the factory, so concurrent first access to a
/// tenant creates its resource exactly once and every caller gets the same
/// [`Arc`]. A failed creation leaves the key absent, so the next caller
/// retries. Creation holds the one write lock for all keys; first access to
/// distinct tenants therefore serializes.
///
/// Teardown is explicit: [`TenantCache::close`] releases every cached
/// resource through the factory exactly once, and dropping the cache closes
/// whatever remains.
pub struct TenantCache<F: ResourceFactory> {
    factory: F,
    entries: RwLock<HashMap<String, Arc<F::Resource>>>,
}

impl<F: ResourceFactory> TenantCache<F> {
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// The resource for `tenant`, creating it on first access.
    pub fn resource_for(&self, ctx: &Context, tenant: &str) -> Result<Arc<F::Resource>, Error> {
        ctx.check()?;

        {
            let entries = self.entries.read();
            if let Some(resource) = entries.get(tenant) {
                return Ok(Arc::clone(resource));
            }
        }

        let mut entries = self.entries.write();
        // Another caller may have created the entry while this one waited
        // for the write lock.
        if let Some(resource) = entries.get(tenant) {
            return Ok(Arc::clone(resource));
        }

        let resource = Arc::new(self.factory.create(ctx, tenant)?);
        debug!(tenant, "created tenant resource");
        entries.insert(tenant.to_string(), Arc::clone(&resource));
        Ok(resource)
    }

    /// Number of cached resources.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Release every cached resource. Idempotent: entries are drained under
    /// the write lock, so each resource is closed once.
    pub fn close(&self) {
        let drained: Vec<(String, Arc<F::Resource>)> = self.entries.write().drain().collect();
        for (tenant, resource) in drained {
            debug!(tenant = %tenant, "closing tenant resource");
            self.factory.close(&resource);
        }
    }
}

impl<F: ResourceFactory> Drop for TenantCache<F> {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Clone)]
    struct CountingFactory {
        creates: Arc<AtomicUsize>,
        closes: Arc<AtomicUsize>,
        remaining_failures: Arc<AtomicUsize>,
    }

    impl CountingFactory {
        fn new() -> Self {
            Self {
                creates: Arc::new(AtomicUsize::new(0)),
                closes: Arc::new(AtomicUsize::new(0)),
                remaining_failures: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn failing_once() -> Self {
            let f = Self::new();
            f.remaining_failures.store(1, Ordering::SeqCst);
            f
        }
    }

    impl ResourceFactory for CountingFactory {
        type Resource = String;

        fn create(&self, _ctx: &Context, tenant: &str) -> Result<String, Error> {
            let failed = self
                .remaining_failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                    (n > 0).then(|| n - 1)
                })
                .is_ok();
            if failed {
                return Err(Error::backend("connection refused"));
            }
            self.creates.fetch_add(1, Ordering::SeqCst);
            Ok(format!("resource-{tenant}"))
        }

        fn close(&self, _resource: &String) {
            self.closes.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_at_most_once_creation_under_contention() {
        let factory = CountingFactory::new();
        let cache = Arc::new(TenantCache::new(factory.clone()));
        let ctx = Context::background();

        let mut handles = Vec::new();
        for _ in 0..16 {
            let cache = Arc::clone(&cache);
            let ctx = ctx.clone();
            handles.push(std::thread::spawn(move || {
                cache.resource_for(&ctx, "acme").unwrap()
            }));
        }

        let resources: Vec<Arc<String>> =
            handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(factory.creates.load(Ordering::SeqCst), 1);
        for resource in &resources {
            assert!(Arc::ptr_eq(resource, &resources[0]));
        }
    }

    #[test]
    fn test_distinct_tenants_get_distinct_resources() {
        let cache = TenantCache::new(CountingFactory::new());
        let ctx = Context::background();

        let a = cache.resource_for(&ctx, "a").unwrap();
        let b = cache.resource_for(&ctx, "b").unwrap();
        assert_ne!(*a, *b);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_failed_creation_leaves_key_absent_for_retry() {
        let factory = CountingFactory::failing_once();
        let cache = TenantCache::new(factory.clone());
        let ctx = Context::background();

        assert!(cache.resource_for(&ctx, "acme").is_err());
        assert!(cache.is_empty());

        let resource = cache.resource_for(&ctx, "acme").unwrap();
        assert_eq!(*resource, "resource-acme");
        assert_eq!(factory.creates.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_close_releases_each_resource_once() {
        let factory = CountingFactory::new();
        let cache = TenantCache::new(factory.clone());
        let ctx = Context::background();

        cache.resource_for(&ctx, "a").unwrap();
        cache.resource_for(&ctx, "b").unwrap();
        cache.resource_for(&ctx, "a").unwrap();

        cache.close();
        assert_eq!(factory.closes.load(Ordering::SeqCst), 2);
        assert!(cache.is_empty());

        // Second close and the eventual drop find nothing left.
        cache.close();
        drop(cache);
        assert_eq!(factory.closes.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_drop_closes_remaining_resources() {
        let factory = CountingFactory::new();
        {
            let cache = TenantCache::new(factory.clone());
            let ctx = Context::background();
            cache.resource_for(&ctx, "a").unwrap();
            assert_eq!(factory.closes.load(Ordering::SeqCst), 0);
        }
        assert_eq!(factory.closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_cancelled_context_is_rejected() {
        let factory = CountingFactory::new();
        let cache = TenantCache::new(factory.clone());
        let ctx = Context::background();
        ctx.cancel();
        assert!(matches!(
            cache.resource_for(&ctx, "acme"),
            Err(Error::Cancelled)
        ));
        assert_eq!(factory.creates.load(Ordering::SeqCst), 0);
    }
}
