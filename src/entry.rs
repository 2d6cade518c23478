//! Cached response records and reader-safe value handles.
//!
//! An [`Entry`] owns copies of one request key and one serialized response,
//! plus the back-links that let the cache unlink it from the hash index and
//! the recency list without re-probing or scanning.
//!
//! ## Lifetime rule
//!
//! Eviction unlinks an entry (it becomes unreachable through lookups) but
//! never frees it while a [`ReadHandle`] is outstanding. Each handle holds a
//! strong `Arc` reference to its entry, so the bytes stay valid until the
//! last handle drops. The per-entry reader count and tombstone flag make
//! that lifecycle observable:
//!
//! ```text
//!   linked ──(unlink)──► tombstoned ──(readers drain to 0)──► storage freed
//! ```
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::ds::recency_list::NodeId;
use crate::ds::robin_hood::hash_key;

/// Shared reference to a cache entry.
pub type EntryRef = Arc<Entry>;

/// Sentinel for back-links that have not been assigned yet.
const UNLINKED: usize = usize::MAX;

/// One cached response: owned key and value bytes plus cache metadata.
///
/// The key and value are copied out of the caller's buffers on construction;
/// the caller may reuse or free its originals immediately.
#[derive(Debug)]
pub struct Entry {
    key: Box<[u8]>,
    value: Box<[u8]>,
    hash: u64,
    // Back-links into the index and recency list. Written only while a
    // writer holds admission; relaxed atomics are enough.
    slot: AtomicUsize,
    node: AtomicUsize,
    readers: AtomicUsize,
    tombstoned: AtomicBool,
}

impl Entry {
    /// Creates an entry by copying `key` and `value`.
    pub fn new(key: &[u8], value: &[u8]) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            hash: hash_key(key),
            slot: AtomicUsize::new(UNLINKED),
            node: AtomicUsize::new(UNLINKED),
            readers: AtomicUsize::new(0),
            tombstoned: AtomicBool::new(false),
        }
    }

    /// Returns the request key.
    pub fn key(&self) -> &[u8] {
        &self.key
    }

    /// Returns the cached response bytes.
    pub fn value(&self) -> &[u8] {
        &self.value
    }

    /// Number of value bytes this entry charges against the cache budget.
    ///
    /// Key bytes and bookkeeping overhead are not counted, only the payload.
    pub fn size(&self) -> usize {
        self.value.len()
    }

    /// Returns the precomputed hash of the key.
    pub fn hash(&self) -> u64 {
        self.hash
    }

    /// Records the index bin currently holding this entry.
    pub(crate) fn set_slot(&self, slot: usize) {
        self.slot.store(slot, Ordering::Relaxed);
    }

    /// Returns the index bin recorded for this entry.
    pub(crate) fn slot(&self) -> usize {
        self.slot.load(Ordering::Relaxed)
    }

    /// Records the recency-list node holding this entry.
    pub(crate) fn set_node(&self, node: NodeId) {
        self.node.store(node.index(), Ordering::Relaxed);
    }

    /// Returns the recency-list node recorded for this entry.
    pub(crate) fn node(&self) -> NodeId {
        let raw = self.node.load(Ordering::Relaxed);
        debug_assert_ne!(raw, UNLINKED, "entry was never linked into the list");
        NodeId(raw)
    }

    /// Number of read handles currently open on this entry.
    pub fn readers(&self) -> usize {
        self.readers.load(Ordering::Acquire)
    }

    /// Marks the entry as unlinked from the index and the recency list.
    pub(crate) fn tombstone(&self) {
        self.tombstoned.store(true, Ordering::Release);
    }

    /// Returns `true` once the entry has been unlinked.
    pub fn is_tombstoned(&self) -> bool {
        self.tombstoned.load(Ordering::Acquire)
    }
}

/// Scoped read access to a cached response.
///
/// The handle pins its entry: the value bytes remain valid for the life of
/// the handle even if the entry is evicted or deleted in the meantime.
pub struct ReadHandle {
    entry: EntryRef,
    open_handles: Arc<AtomicUsize>,
}

impl ReadHandle {
    /// Opens a handle, bumping the per-entry and cache-wide reader counts.
    pub(crate) fn new(entry: EntryRef, open_handles: Arc<AtomicUsize>) -> Self {
        entry.readers.fetch_add(1, Ordering::AcqRel);
        open_handles.fetch_add(1, Ordering::AcqRel);
        Self {
            entry,
            open_handles,
        }
    }

    /// Returns the request key this response was cached under.
    pub fn key(&self) -> &[u8] {
        self.entry.key()
    }

    /// Returns the cached response bytes.
    pub fn value(&self) -> &[u8] {
        self.entry.value()
    }

    /// Returns the number of response bytes.
    pub fn len(&self) -> usize {
        self.entry.size()
    }

    /// Returns `true` if the cached response is empty.
    pub fn is_empty(&self) -> bool {
        self.entry.size() == 0
    }

    /// Returns `true` if the underlying entry has been unlinked since this
    /// handle was opened.
    pub fn is_stale(&self) -> bool {
        self.entry.is_tombstoned()
    }
}

impl AsRef<[u8]> for ReadHandle {
    fn as_ref(&self) -> &[u8] {
        self.value()
    }
}

impl fmt::Debug for ReadHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadHandle")
            .field("key_len", &self.entry.key().len())
            .field("value_len", &self.entry.size())
            .field("stale", &self.entry.is_tombstoned())
            .finish()
    }
}

impl Drop for ReadHandle {
    fn drop(&mut self) {
        self.entry.readers.fetch_sub(1, Ordering::AcqRel);
        self.open_handles.fetch_sub(1, Ordering::AcqRel);
    }
}
