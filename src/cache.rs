//! Byte-budgeted LRU response cache shared by proxy workers.
//!
//! ## Architecture
//!
//! ```text
//!   ┌───────────────────────────────────────────────────────────────────┐
//!   │                        ResponseCache                              │
//!   │                                                                   │
//!   │   AccessGate (FIFO reader/writer admission)                       │
//!   │        │                                                          │
//!   │        ▼                                                          │
//!   │   RwLock<IndexState>                 Mutex<RecencyList>           │
//!   │   ┌──────────────────────────┐       ┌────────────────────────┐   │
//!   │   │ RobinHoodIndex           │       │ head ─► MRU ◄──► ...   │   │
//!   │   │   key ──► EntryRef ──────┼──────►│         ◄──► LRU ◄─┐   │   │
//!   │   │ bytes_used               │       │  tail = head.prev ─┘   │   │
//!   │   └──────────────────────────┘       └────────────────────────┘   │
//!   │                                                                   │
//!   │   Entry: key bytes · value bytes · slot/node back-links ·         │
//!   │          reader count · tombstone      (shared via Arc)           │
//!   └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A lookup hit promotes the entry to the head of the recency list and
//! returns a [`ReadHandle`]; an insert charges the value against the byte
//! budget and evicts from the tail until it fits again.
//!
//! ## Concurrency model
//!
//! The gate admits readers together and writers alone, in strict FIFO
//! order. Under that regime:
//!
//! - the index and `bytes_used` are only written while a writer holds
//!   admission (the `RwLock` is the compiler-visible boundary for that
//!   rule);
//! - the recency list is also written by *readers* (promotion on hit), so
//!   it sits behind its own small mutex;
//! - lock order is gate → index lock → list mutex, never reversed, and no
//!   cache operation takes locks it does not own.
//!
//! Eviction can never free bytes a reader is still using: handles hold
//! strong references, and an evicted entry is merely tombstoned until its
//! last handle drops. This holds even though handles outlive the read
//! admission they were created under.
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::{Mutex, RwLock};

use crate::config::CacheConfig;
use crate::ds::recency_list::RecencyList;
use crate::ds::robin_hood::RobinHoodIndex;
use crate::entry::{Entry, EntryRef, ReadHandle};
use crate::error::{ConfigError, InsertError};
use crate::gate::AccessGate;
use crate::metrics::{CacheCounters, MetricsSnapshot};

/// Result of a successful [`ResponseCache::insert`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The value was admitted and is now cached.
    Inserted,
    /// The key was already cached; the existing value and its recency
    /// position are untouched (first writer wins).
    AlreadyPresent,
}

/// Index plus budget accounting; mutated only under writer admission.
#[derive(Debug)]
struct IndexState {
    index: RobinHoodIndex,
    bytes_used: usize,
}

/// Shared in-memory cache of serialized responses keyed by request bytes.
///
/// One instance is shared by reference across all proxy workers. All
/// methods take `&self`.
#[derive(Debug)]
pub struct ResponseCache {
    gate: AccessGate,
    state: RwLock<IndexState>,
    recency: Mutex<RecencyList>,
    config: CacheConfig,
    counters: CacheCounters,
    open_handles: Arc<AtomicUsize>,
}

impl ResponseCache {
    /// Creates a cache with the given value-byte budget.
    ///
    /// The per-object limit defaults to
    /// [`DEFAULT_MAX_OBJECT_SIZE`](crate::config::DEFAULT_MAX_OBJECT_SIZE),
    /// clamped to the budget. A budget of zero is legal: every insert is
    /// rejected as too large.
    pub fn new(max_size: usize) -> Self {
        Self::from_config(CacheConfig::with_max_size(max_size))
    }

    /// Creates a cache from an explicit configuration.
    pub fn with_config(config: CacheConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::from_config(config))
    }

    fn from_config(config: CacheConfig) -> Self {
        Self {
            gate: AccessGate::new(),
            state: RwLock::new(IndexState {
                index: RobinHoodIndex::new(1),
                bytes_used: 0,
            }),
            recency: Mutex::new(RecencyList::new()),
            config,
            counters: CacheCounters::default(),
            open_handles: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Looks up `key`, promoting the entry on a hit.
    ///
    /// The returned handle keeps the value bytes alive until it is dropped,
    /// even across a concurrent eviction of the entry.
    pub fn find(&self, key: &[u8]) -> Option<ReadHandle> {
        let _pass = self.gate.acquire_read();
        let found = self.state.read().index.find(key).cloned();
        let Some(entry) = found else {
            self.counters.record_miss();
            return None;
        };
        {
            let mut recency = self.recency.lock();
            recency.move_to_front(entry.node());
        }
        self.counters.record_hit();
        Some(ReadHandle::new(entry, Arc::clone(&self.open_handles)))
    }

    /// Looks up `key` without touching its recency position or the hit and
    /// miss counters.
    pub fn peek(&self, key: &[u8]) -> Option<ReadHandle> {
        let _pass = self.gate.acquire_read();
        let entry = self.state.read().index.find(key).cloned()?;
        Some(ReadHandle::new(entry, Arc::clone(&self.open_handles)))
    }

    /// Caches a copy of `value` under a copy of `key`.
    ///
    /// First writer wins: if the key is already cached the existing value
    /// stays, untouched down to its recency position, and the call reports
    /// [`InsertOutcome::AlreadyPresent`]. Otherwise entries are evicted
    /// from the cold end until the new value fits, and the value lands at
    /// the hot end.
    pub fn insert(&self, key: &[u8], value: &[u8]) -> Result<InsertOutcome, InsertError> {
        debug_assert!(!key.is_empty(), "cache keys carry at least one byte");
        debug_assert!(!value.is_empty(), "cached values carry at least one byte");

        let limit = self.config.object_limit();
        if value.len() > limit {
            self.counters.record_oversize();
            return Err(InsertError::TooLarge {
                size: value.len(),
                limit,
            });
        }

        let _pass = self.gate.acquire_write();
        let mut state = self.state.write();
        if state.index.contains(key) {
            self.counters.record_duplicate();
            return Ok(InsertOutcome::AlreadyPresent);
        }

        let entry: EntryRef = Arc::new(Entry::new(key, value));
        let mut recency = self.recency.lock();

        // Charge the new value first, then evict from the tail until the
        // budget holds again. The new entry is not linked yet, so it can
        // never evict itself.
        state.bytes_used += entry.size();
        while state.bytes_used > self.config.max_size {
            let Some(victim_id) = recency.back() else {
                break;
            };
            let Some(victim) = recency.unlink(victim_id) else {
                break;
            };
            state.index.remove_entry(&victim);
            state.bytes_used -= victim.size();
            victim.tombstone();
            self.counters.record_eviction();
        }

        if let Err(err) = state.index.insert(Arc::clone(&entry)) {
            // Nothing was linked; un-charge the value. Evictions that
            // already ran stay evicted.
            state.bytes_used -= entry.size();
            return Err(err.into());
        }
        let node = recency.push_front(Arc::clone(&entry));
        entry.set_node(node);
        self.counters.record_insert();
        Ok(InsertOutcome::Inserted)
    }

    /// Deletes `key` from the cache; returns `false` if it was not cached.
    ///
    /// Outstanding read handles for the entry stay valid; its storage is
    /// released once the last one drops.
    pub fn remove(&self, key: &[u8]) -> bool {
        let _pass = self.gate.acquire_write();
        let mut state = self.state.write();
        let Some(entry) = state.index.remove(key) else {
            return false;
        };
        {
            let mut recency = self.recency.lock();
            recency.unlink(entry.node());
        }
        state.bytes_used -= entry.size();
        entry.tombstone();
        self.counters.record_remove();
        true
    }

    /// Drops every cached entry.
    ///
    /// Calling this while read handles are outstanding is a caller bug and
    /// trips a debug assertion; the handles themselves remain valid either
    /// way, because each one pins its entry.
    pub fn clear(&self) {
        let _pass = self.gate.acquire_write();
        debug_assert_eq!(
            self.open_handles.load(Ordering::Acquire),
            0,
            "clear called with outstanding read handles"
        );
        let mut state = self.state.write();
        let mut recency = self.recency.lock();
        while let Some(victim_id) = recency.back() {
            match recency.unlink(victim_id) {
                Some(entry) => entry.tombstone(),
                None => break,
            }
        }
        state.index.clear();
        state.bytes_used = 0;
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.state.read().index.len()
    }

    /// Returns `true` if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Value bytes currently charged against the budget.
    pub fn bytes_used(&self) -> usize {
        self.state.read().bytes_used
    }

    /// Total value-byte budget.
    pub fn max_size(&self) -> usize {
        self.config.max_size
    }

    /// Effective per-object limit.
    pub fn max_object_size(&self) -> usize {
        self.config.object_limit()
    }

    /// Returns `true` if `key` is cached, without promoting it.
    pub fn contains(&self, key: &[u8]) -> bool {
        let _pass = self.gate.acquire_read();
        self.state.read().index.contains(key)
    }

    /// Recency position of `key`: 0 is the most recently used entry.
    pub fn recency_rank(&self, key: &[u8]) -> Option<usize> {
        let _pass = self.gate.acquire_read();
        let state = self.state.read();
        let target = state.index.find(key)?;
        let recency = self.recency.lock();
        recency.iter().position(|entry| Arc::ptr_eq(entry, target))
    }

    /// Current bin count of the hash index.
    pub fn index_capacity(&self) -> usize {
        self.state.read().index.capacity()
    }

    /// Read handles currently open across all entries.
    pub fn open_handles(&self) -> usize {
        self.open_handles.load(Ordering::Acquire)
    }

    /// Snapshot of the operation counters.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.counters.snapshot()
    }

    #[cfg(any(test, debug_assertions))]
    pub fn debug_validate_invariants(&self) {
        let _pass = self.gate.acquire_read();
        let state = self.state.read();
        let recency = self.recency.lock();

        state.index.debug_validate_invariants();
        recency.debug_validate_invariants();
        assert_eq!(state.index.len(), recency.len());

        let mut total = 0usize;
        for entry in recency.iter() {
            total += entry.size();
            let indexed = state
                .index
                .find(entry.key())
                .expect("listed entry missing from the index");
            assert!(
                Arc::ptr_eq(indexed, entry),
                "index and list disagree on the entry for a key"
            );
            assert!(!entry.is_tombstoned(), "tombstoned entry still linked");
        }
        assert_eq!(total, state.bytes_used);
        assert!(state.bytes_used <= self.config.max_size);
    }
}

impl Default for ResponseCache {
    /// A cache with the proxy's stock limits (1 MiB budget, 100 KiB
    /// objects).
    fn default() -> Self {
        Self::from_config(CacheConfig::default())
    }
}
