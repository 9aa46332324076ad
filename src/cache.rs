// Per-path cache of rendered list views, bounded by an LRU.
// Mutations name the path they made stale; the HTTP layer calls revalidate_path.

use lru::LruCache;
use parking_lot::RwLock;
use std::num::NonZeroUsize;

/// Path under which invoice mutations invalidate cached views
pub const INVOICES_PATH: &str = "/dashboard/invoices";

/// Views kept before the least recently used one is evicted
pub const DEFAULT_CAPACITY: usize = 256;

struct Entries<V> {
    // (path, search key) -> view
    views: LruCache<(String, String), V>,
    // Bumped by every revalidation
    generation: u64,
}

pub struct PageCache<V> {
    entries: RwLock<Entries<V>>,
}

impl<V: Clone> PageCache<V> {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: RwLock::new(Entries {
                views: LruCache::new(capacity),
                generation: 0,
            }),
        }
    }

    /// Current generation. Capture it before reading the rows a view is built
    /// from and hand it back to [`PageCache::insert`].
    pub fn generation(&self) -> u64 {
        self.entries.read().generation
    }

    pub fn get(&self, path: &str, key: &str) -> Option<V> {
        let mut entries = self.entries.write();
        entries
            .views
            .get(&(path.to_string(), key.to_string()))
            .cloned()
    }

    /// Store `view` unless a revalidation happened after `generation` was
    /// read. Returns whether the view was stored.
    pub fn insert(&self, path: &str, key: impl Into<String>, view: V, generation: u64) -> bool {
        let mut entries = self.entries.write();
        if entries.generation != generation {
            tracing::debug!(path, "skipped caching view built before revalidation");
            return false;
        }
        entries.views.put((path.to_string(), key.into()), view);
        true
    }

    /// Drop every cached view of `path`. Returns how many were dropped.
    pub fn revalidate_path(&self, path: &str) -> usize {
        let mut entries = self.entries.write();
        entries.generation += 1;

        let stale: Vec<(String, String)> = entries
            .views
            .iter()
            .filter(|((cached_path, _), _)| cached_path == path)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &stale {
            entries.views.pop(key);
        }

        tracing::debug!(
            path,
            dropped = stale.len(),
            generation = entries.generation,
            "revalidated path"
        );
        stale.len()
    }

    pub fn len(&self) -> usize {
        self.entries.read().views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.entries.read().views.cap().get()
    }
}

impl<V: Clone> Default for PageCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_hit_and_miss() {
        let cache = PageCache::new();
        let generation = cache.generation();
        assert!(cache.insert(INVOICES_PATH, "query=&page=1", 3, generation));

        assert_eq!(cache.get(INVOICES_PATH, "query=&page=1"), Some(3));
        assert!(cache.get(INVOICES_PATH, "query=&page=2").is_none());
        assert!(cache.get("/dashboard/customers", "query=&page=1").is_none());
    }

    #[test]
    fn test_revalidate_drops_only_that_path() {
        let cache = PageCache::new();
        let generation = cache.generation();
        cache.insert(INVOICES_PATH, "query=&page=1", 1, generation);
        cache.insert(INVOICES_PATH, "query=paid&page=1", 2, generation);
        cache.insert("/dashboard/customers", "query=", 3, generation);

        assert_eq!(cache.revalidate_path(INVOICES_PATH), 2);

        assert_eq!(cache.len(), 1);
        assert!(cache.get(INVOICES_PATH, "query=&page=1").is_none());
        assert_eq!(cache.get("/dashboard/customers", "query="), Some(3));
        assert_eq!(cache.revalidate_path(INVOICES_PATH), 0);
    }

    #[test]
    fn test_distinct_queries_stay_within_capacity() {
        let cache = PageCache::with_capacity(8);
        let generation = cache.generation();

        for i in 0..100 {
            cache.insert(INVOICES_PATH, format!("query=zz{i}&page=1"), i, generation);
            assert!(cache.len() <= cache.capacity());
        }

        assert_eq!(cache.len(), 8);
        // Oldest evicted, newest kept
        assert!(cache.get(INVOICES_PATH, "query=zz0&page=1").is_none());
        assert_eq!(cache.get(INVOICES_PATH, "query=zz99&page=1"), Some(99));
    }

    #[test]
    fn test_default_capacity_is_bounded() {
        let cache: PageCache<u32> = PageCache::default();
        assert_eq!(cache.capacity(), DEFAULT_CAPACITY);

        let zero: PageCache<u32> = PageCache::with_capacity(0);
        assert_eq!(zero.capacity(), 1);
    }

    #[test]
    fn test_view_built_before_revalidation_is_not_stored() {
        let cache = PageCache::new();

        // Reader captures the generation, then a mutation revalidates
        let before_read = cache.generation();
        cache.revalidate_path(INVOICES_PATH);

        assert!(!cache.insert(INVOICES_PATH, "query=&page=1", "stale", before_read));
        assert!(cache.get(INVOICES_PATH, "query=&page=1").is_none());

        let after = cache.generation();
        assert!(cache.insert(INVOICES_PATH, "query=&page=1", "fresh", after));
        assert_eq!(cache.get(INVOICES_PATH, "query=&page=1"), Some("fresh"));
    }
}
