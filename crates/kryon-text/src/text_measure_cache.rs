//! Bounded, thread-safe cache of text measurements

use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{trace, warn};

use crate::measure_key::MeasurementKey;
use crate::measurement::TextMeasurement;

/// Default number of measurements kept per layout manager
pub const DEFAULT_CACHE_CAPACITY: usize = 1024;

/// Counters describing how the cache has been used
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Keys added; replacing the value of a present key is not counted
    pub insertions: u64,
    pub evictions: u64,
}

struct CacheState {
    entries: LruCache<MeasurementKey, Arc<TextMeasurement>>,
    stats: CacheStats,
}

/// LRU store from [`MeasurementKey`] to measurement.
///
/// Lookups count as accesses. A single lock guards the entries, the recency
/// list and the counters; it is never held while a measurement is computed.
pub struct TextMeasureCache {
    state: Mutex<CacheState>,
}

impl TextMeasureCache {
    /// Create a cache holding at most `capacity` entries (at least one)
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or_else(|| {
            warn!("Text measure cache capacity must be positive, using 1");
            NonZeroUsize::MIN
        });
        Self {
            state: Mutex::new(CacheState {
                entries: LruCache::new(capacity),
                stats: CacheStats::default(),
            }),
        }
    }

    /// Cached measurement for `key`, marking it most recently used
    pub fn lookup(&self, key: &MeasurementKey) -> Option<Arc<TextMeasurement>> {
        let mut state = self.state.lock();
        let found = state.entries.get(key).cloned();
        if found.is_some() {
            state.stats.hits += 1;
        } else {
            state.stats.misses += 1;
        }
        found
    }

    /// Insert or replace the measurement for `key`, evicting the least recently
    /// used entry when a new key arrives at capacity
    pub fn insert(&self, key: MeasurementKey, measurement: Arc<TextMeasurement>) {
        let mut state = self.state.lock();
        let replacing = state.entries.contains(&key);
        let displaced = state.entries.push(key, measurement);
        if !replacing {
            state.stats.insertions += 1;
            if let Some((evicted, _)) = displaced {
                state.stats.evictions += 1;
                trace!(query = ?evicted.query(), "Evicted text measurement");
            }
        }
        debug_assert!(state.entries.len() <= state.entries.cap().get());
    }

    /// Presence check that leaves recency untouched
    pub fn contains(&self, key: &MeasurementKey) -> bool {
        self.state.lock().entries.contains(key)
    }

    /// Drop every entry
    pub fn clear(&self) {
        self.state.lock().entries.clear();
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.state.lock().entries.cap().get()
    }

    pub fn stats(&self) -> CacheStats {
        self.state.lock().stats
    }
}

impl Default for TextMeasureCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}
