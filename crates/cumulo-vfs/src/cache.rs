//! TTL cache for read/stat/listing results.
//!
//! Process-local and informational only: an externally mutated backend can
//! always be ahead of it, so nothing correctness-critical may depend on a
//! hit. Entries expire lazily on lookup; writes through the manager
//! invalidate the affected paths.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::{Duration, Instant};

use serde::Serialize;

use cumulo_types::VfsNode;

use crate::path;

/// TTL for cached file contents.
pub const CONTENT_TTL: Duration = Duration::from_secs(300);
/// TTL for cached stat results.
pub const STAT_TTL: Duration = Duration::from_secs(60);
/// TTL for cached directory listings.
pub const LISTING_TTL: Duration = Duration::from_secs(30);

/// Which operation a cache entry memoizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKind {
    Content,
    Stat,
    Listing,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    kind: CacheKind,
    path: String,
}

/// A cached result.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Content(Vec<u8>),
    Stat(VfsNode),
    Listing(Vec<VfsNode>),
}

#[derive(Debug)]
struct CacheEntry {
    value: CacheValue,
    inserted: Instant,
    ttl: Duration,
}

impl CacheEntry {
    fn is_fresh(&self, now: Instant) -> bool {
        now.duration_since(self.inserted) < self.ttl
    }
}

/// Hit/miss counters plus current size, for observability.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

/// TTL-keyed store of recent adapter results.
///
/// Keys use the same normalized virtual paths as the mount table, so cache
/// invalidation and mount resolution can never disagree about what a path
/// means.
#[derive(Debug, Default)]
pub struct Cache {
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl Cache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch a fresh entry, evicting it if stale.
    pub fn get(&self, kind: CacheKind, vpath: &str) -> Option<CacheValue> {
        let key = CacheKey {
            kind,
            path: vpath.to_string(),
        };
        let now = Instant::now();

        {
            let entries = match self.entries.read() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            if let Some(entry) = entries.get(&key) {
                if entry.is_fresh(now) {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    return Some(entry.value.clone());
                }
            } else {
                self.misses.fetch_add(1, Ordering::Relaxed);
                return None;
            }
        }

        // Stale: purge under the write lock, count as a miss.
        let mut entries = self.write_lock();
        if entries.get(&key).is_some_and(|e| !e.is_fresh(now)) {
            entries.remove(&key);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Store a value unconditionally, overwriting any prior entry.
    pub fn set(&self, kind: CacheKind, vpath: &str, value: CacheValue, ttl: Duration) {
        let key = CacheKey {
            kind,
            path: vpath.to_string(),
        };
        self.write_lock().insert(
            key,
            CacheEntry {
                value,
                inserted: Instant::now(),
                ttl,
            },
        );
    }

    /// Drop every entry for this path and anything under it, plus the
    /// parent's listing (the mutation changed what the parent contains).
    pub fn invalidate(&self, vpath: &str) {
        let parent = path::parent(vpath).map(str::to_string);
        let mut entries = self.write_lock();
        entries.retain(|key, _| {
            if path::is_under(&key.path, vpath) {
                return false;
            }
            if key.kind == CacheKind::Listing && Some(&key.path) == parent.as_ref() {
                return false;
            }
            true
        });
    }

    /// Evict everything under a prefix, or everything.
    pub fn clear(&self, prefix: Option<&str>) {
        let mut entries = self.write_lock();
        match prefix {
            Some(prefix) => entries.retain(|key, _| !path::is_under(&key.path, prefix)),
            None => entries.clear(),
        }
    }

    pub fn stats(&self) -> CacheStats {
        let entries = match self.entries.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: entries.len(),
        }
    }

    fn write_lock(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<CacheKey, CacheEntry>> {
        match self.entries.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn content(bytes: &[u8]) -> CacheValue {
        CacheValue::Content(bytes.to_vec())
    }

    #[test]
    fn hit_within_ttl() {
        let cache = Cache::new();
        cache.set(CacheKind::Content, "/a.txt", content(b"hi"), CONTENT_TTL);

        match cache.get(CacheKind::Content, "/a.txt") {
            Some(CacheValue::Content(data)) => assert_eq!(data, b"hi"),
            other => panic!("expected content hit, got {other:?}"),
        }
        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 0);
    }

    #[test]
    fn expired_entry_is_purged_and_counted_as_miss() {
        let cache = Cache::new();
        cache.set(
            CacheKind::Content,
            "/a.txt",
            content(b"hi"),
            Duration::from_millis(0),
        );
        std::thread::sleep(Duration::from_millis(5));

        assert!(cache.get(CacheKind::Content, "/a.txt").is_none());
        let stats = cache.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.entries, 0);
    }

    #[test]
    fn entry_near_ttl_boundary() {
        let cache = Cache::new();
        let ttl = Duration::from_millis(80);
        cache.set(CacheKind::Content, "/a.txt", content(b"hi"), ttl);

        // well inside the ttl
        std::thread::sleep(Duration::from_millis(10));
        assert!(cache.get(CacheKind::Content, "/a.txt").is_some());

        // past the ttl
        std::thread::sleep(Duration::from_millis(90));
        assert!(cache.get(CacheKind::Content, "/a.txt").is_none());
    }

    #[test]
    fn kinds_are_keyed_separately() {
        let cache = Cache::new();
        cache.set(CacheKind::Content, "/a", content(b"x"), CONTENT_TTL);
        assert!(cache.get(CacheKind::Stat, "/a").is_none());
        assert!(cache.get(CacheKind::Content, "/a").is_some());
    }

    #[test]
    fn invalidate_covers_subtree_and_parent_listing() {
        let cache = Cache::new();
        cache.set(CacheKind::Content, "/d/a.txt", content(b"x"), CONTENT_TTL);
        cache.set(CacheKind::Stat, "/d/a.txt", content(b"x"), STAT_TTL);
        cache.set(CacheKind::Listing, "/d", content(b"x"), LISTING_TTL);
        cache.set(CacheKind::Content, "/other.txt", content(b"y"), CONTENT_TTL);

        cache.invalidate("/d/a.txt");

        assert!(cache.get(CacheKind::Content, "/d/a.txt").is_none());
        assert!(cache.get(CacheKind::Stat, "/d/a.txt").is_none());
        assert!(cache.get(CacheKind::Listing, "/d").is_none());
        assert!(cache.get(CacheKind::Content, "/other.txt").is_some());
    }

    #[test]
    fn invalidate_directory_covers_children() {
        let cache = Cache::new();
        cache.set(CacheKind::Content, "/d/x/y.txt", content(b"x"), CONTENT_TTL);
        cache.invalidate("/d");
        assert!(cache.get(CacheKind::Content, "/d/x/y.txt").is_none());
    }

    #[test]
    fn clear_with_prefix() {
        let cache = Cache::new();
        cache.set(CacheKind::Content, "/mem/a", content(b"a"), CONTENT_TTL);
        cache.set(CacheKind::Content, "/disk/b", content(b"b"), CONTENT_TTL);

        cache.clear(Some("/mem"));
        assert!(cache.get(CacheKind::Content, "/mem/a").is_none());
        assert!(cache.get(CacheKind::Content, "/disk/b").is_some());

        cache.clear(None);
        assert_eq!(cache.stats().entries, 0);
    }
}
