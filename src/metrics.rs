//! Operation counters for the response cache.
//!
//! Counters are relaxed atomics bumped on the hot paths and read through
//! [`MetricsSnapshot`]; a snapshot is a consistent-enough view for dashboards
//! and tests, not a linearized one.
use std::sync::atomic::{AtomicU64, Ordering};

/// Internal counter block owned by the cache.
#[derive(Debug, Default)]
pub(crate) struct CacheCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    inserts: AtomicU64,
    duplicate_inserts: AtomicU64,
    oversize_rejections: AtomicU64,
    evictions: AtomicU64,
    removes: AtomicU64,
}

impl CacheCounters {
    pub(crate) fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            inserts: self.inserts.load(Ordering::Relaxed),
            duplicate_inserts: self.duplicate_inserts.load(Ordering::Relaxed),
            oversize_rejections: self.oversize_rejections.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            removes: self.removes.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_insert(&self) {
        self.inserts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_duplicate(&self) {
        self.duplicate_inserts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_oversize(&self) {
        self.oversize_rejections.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_eviction(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_remove(&self) {
        self.removes.fetch_add(1, Ordering::Relaxed);
    }
}

/// Point-in-time view of the cache's operation counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Lookups that found an entry.
    pub hits: u64,
    /// Lookups that found nothing.
    pub misses: u64,
    /// Entries admitted into the cache.
    pub inserts: u64,
    /// Inserts refused because the key was already cached.
    pub duplicate_inserts: u64,
    /// Inserts refused because the value exceeded the object limit.
    pub oversize_rejections: u64,
    /// Entries pushed out to make room.
    pub evictions: u64,
    /// Entries removed explicitly.
    pub removes: u64,
}
