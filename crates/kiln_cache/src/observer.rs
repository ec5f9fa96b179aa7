//! Injected observation hook for cache diagnostics.
//!
//! The cache never logs through an ambient process-wide logger. Callers that
//! want visibility inject an observer at construction; the cache invokes it
//! at defined points (hit, miss, invalidation).

use crate::entry::CacheEntry;

/// Callbacks invoked by the cache at its observable decision points.
///
/// All methods default to no-ops so implementors can subscribe to a subset.
pub trait CacheObserver: Send + Sync {
    /// A lookup was served from the in-memory table without reading content.
    fn cache_hit(&self, _cache_key: &str) {}

    /// A lookup found no usable entry; fresh metadata is being computed.
    fn cache_miss(&self, _cache_key: &str) {}

    /// A stored entry failed revalidation and will be replaced.
    fn entry_invalidated(&self, _cache_key: &str, _stale: &CacheEntry) {}
}

/// Observer that discards all events. The default.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl CacheObserver for NullObserver {}

/// Observer that reports events as `tracing` debug records.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl CacheObserver for TracingObserver {
    fn cache_hit(&self, cache_key: &str) {
        tracing::debug!(cache_key, "cache hit");
    }

    fn cache_miss(&self, cache_key: &str) {
        tracing::debug!(cache_key, "cache miss, computing fresh metadata");
    }

    fn entry_invalidated(&self, cache_key: &str, stale: &CacheEntry) {
        tracing::debug!(
            cache_key,
            stale_ctime = stale.ctime,
            stale_size = stale.size,
            "invalidating cache entry"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::FileMetadata;
    use kiln_common::ContentHash;
    use std::sync::Mutex;

    /// Records event names in order, for asserting call sequences.
    #[derive(Default)]
    struct RecordingObserver {
        events: Mutex<Vec<String>>,
    }

    impl CacheObserver for RecordingObserver {
        fn cache_hit(&self, cache_key: &str) {
            self.events.lock().unwrap().push(format!("hit {cache_key}"));
        }

        fn cache_miss(&self, cache_key: &str) {
            self.events
                .lock()
                .unwrap()
                .push(format!("miss {cache_key}"));
        }

        fn entry_invalidated(&self, cache_key: &str, _stale: &CacheEntry) {
            self.events
                .lock()
                .unwrap()
                .push(format!("invalidate {cache_key}"));
        }
    }

    #[test]
    fn default_methods_are_noops() {
        let entry = CacheEntry {
            ctime: 0,
            size: 0,
            info: FileMetadata {
                content_hash: ContentHash::from_bytes(b""),
                is_minified: false,
                is_in_dependency_tree: false,
                has_inline_source_map: false,
                is_binary: false,
            },
        };
        let observer = NullObserver;
        observer.cache_hit("k");
        observer.cache_miss("k");
        observer.entry_invalidated("k", &entry);
    }

    #[test]
    fn recording_observer_orders_events() {
        let observer = RecordingObserver::default();
        observer.cache_miss("a.js");
        observer.cache_hit("a.js");
        let events = observer.events.lock().unwrap();
        assert_eq!(*events, vec!["miss a.js", "hit a.js"]);
    }
}
