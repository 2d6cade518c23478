//! Open-addressed Robin Hood hash index from byte keys to cache entries.
//!
//! Maps opaque request keys to [`EntryRef`]s. Collisions are resolved with
//! the Robin Hood displacement policy: on insertion, the probing key steals
//! the bin from any incumbent with a strictly smaller probe sequence length
//! (PSL), keeping probe chains short and bounded.
//!
//! ## Architecture
//!
//! ```text
//!   bins: Vec<Option<Bin>>
//!
//!   index:   0          1          2          3
//!          ┌──────────┬──────────┬──────────┬──────────┐
//!          │ (h, 0, e)│ (h, 1, e)│    []    │ (h, 0, e)│
//!          └──────────┴──────────┴──────────┴──────────┘
//!                          ▲
//!                          └─ psl 1: ideal bin was 0, displaced one step
//! ```
//!
//! Each occupied bin stores the key's full hash, its PSL, and a shared
//! reference to the entry. Key bytes live in the entry itself; the bin keeps
//! the hash alongside so probe comparisons rarely touch the entry at all.
//! Every time a bin lands in a slot — placement, displacement, backward
//! shift, or resize re-insert — the entry's slot back-link is updated, which
//! keeps [`RobinHoodIndex::remove_entry`] free of re-probing.
//!
//! ## Operations
//! - `find`: probe from the ideal bin, stop at an empty bin or when the
//!   probe distance exceeds the incumbent's PSL (no later bin can match)
//! - `insert`: Robin Hood displacement; duplicate keys overwrite in place
//! - `remove` / `remove_entry`: backward-shift deletion, which restores the
//!   PSL invariant without leaving tombstone bins behind
//!
//! ## Resizing
//!
//! The load factor is steered into roughly (0.40, 0.85): the table doubles
//! (capped at a `1 << 20` bin growth step) once an insert would pass ~85%
//! occupancy, and halves toward `minsize` once a removal leaves it under
//! ~40%. Rebuilds re-insert every live bin; PSLs are recomputed for the new
//! modulus, never copied.
//!
//! `debug_validate_invariants()` is available in debug/test builds.
use std::fmt;
use std::sync::Arc;

use crate::entry::EntryRef;

/// Largest number of bins added in one resize step.
const GROWTH_STEP: usize = 1 << 20;

/// Hard cap on the number of bins.
const MAX_CAPACITY: usize = u32::MAX as usize;

/// Hashes a byte key with the djb2 function (`h = h * 33 + byte`).
///
/// Deterministic and non-cryptographic; collision resistance is not a
/// security property of the cache.
pub fn hash_key(key: &[u8]) -> u64 {
    let mut hash: u64 = 5381;
    for &byte in key {
        hash = hash.wrapping_mul(33).wrapping_add(u64::from(byte));
    }
    hash
}

/// ~85% of `capacity`; above this occupancy the table grows.
fn grow_threshold(capacity: usize) -> usize {
    (capacity * 870) >> 10
}

/// ~40% of `capacity`; below this occupancy the table shrinks.
fn shrink_threshold(capacity: usize) -> usize {
    (capacity * 409) >> 10
}

/// Error raised when the index cannot make room for another entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexError {
    /// The table is already at its maximum bin count.
    CapacityExhausted,
    /// Allocating the resized bin array failed.
    AllocationFailed,
}

impl fmt::Display for IndexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexError::CapacityExhausted => f.write_str("hash index is at maximum capacity"),
            IndexError::AllocationFailed => f.write_str("hash index resize allocation failed"),
        }
    }
}

impl std::error::Error for IndexError {}

#[derive(Debug, Clone)]
struct Bin {
    hash: u64,
    psl: u32,
    entry: EntryRef,
}

/// Robin Hood hash table from byte keys to entry references.
#[derive(Debug)]
pub struct RobinHoodIndex {
    bins: Vec<Option<Bin>>,
    len: usize,
    minsize: usize,
}

impl RobinHoodIndex {
    /// Creates an index that will never shrink below `minsize` bins.
    ///
    /// A `minsize` of zero is treated as one.
    pub fn new(minsize: usize) -> Self {
        let minsize = minsize.clamp(1, MAX_CAPACITY);
        let mut bins = Vec::new();
        bins.resize_with(minsize, || None);
        Self {
            bins,
            len: 0,
            minsize,
        }
    }

    /// Returns the number of live entries.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the index holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the current number of bins.
    pub fn capacity(&self) -> usize {
        self.bins.len()
    }

    /// Returns the configured minimum bin count.
    pub fn minsize(&self) -> usize {
        self.minsize
    }

    /// Looks up an entry by key.
    pub fn find(&self, key: &[u8]) -> Option<&EntryRef> {
        let capacity = self.bins.len();
        let hash = hash_key(key);
        let mut i = (hash % capacity as u64) as usize;
        let mut probed: u32 = 0;
        loop {
            let bin = self.bins[i].as_ref()?;
            if bin.hash == hash && bin.entry.key() == key {
                return Some(&bin.entry);
            }
            // Robin Hood early exit: anything stored further along the
            // chain would carry a PSL of at least `probed`.
            if probed > bin.psl {
                return None;
            }
            probed += 1;
            i = (i + 1) % capacity;
        }
    }

    /// Returns `true` if `key` is present.
    pub fn contains(&self, key: &[u8]) -> bool {
        self.find(key).is_some()
    }

    /// Inserts an entry, growing the table first if it is near capacity.
    ///
    /// If the entry's key is already present the existing bin keeps its
    /// position and the displaced entry reference is returned.
    pub fn insert(&mut self, entry: EntryRef) -> Result<Option<EntryRef>, IndexError> {
        self.ensure_room()?;
        Ok(self.place(entry))
    }

    /// Removes an entry by key, returning it if present.
    pub fn remove(&mut self, key: &[u8]) -> Option<EntryRef> {
        let capacity = self.bins.len();
        let hash = hash_key(key);
        let mut i = (hash % capacity as u64) as usize;
        let mut probed: u32 = 0;
        loop {
            let bin = self.bins[i].as_ref()?;
            if bin.hash == hash && bin.entry.key() == key {
                break;
            }
            if probed > bin.psl {
                return None;
            }
            probed += 1;
            i = (i + 1) % capacity;
        }
        self.remove_slot(i)
    }

    /// Removes an entry through its slot back-link, skipping the probe.
    ///
    /// Returns `None` if the recorded slot no longer holds this entry.
    pub fn remove_entry(&mut self, entry: &EntryRef) -> Option<EntryRef> {
        let slot = entry.slot();
        let occupied = self
            .bins
            .get(slot)
            .and_then(|bin| bin.as_ref())
            .is_some_and(|bin| Arc::ptr_eq(&bin.entry, entry));
        if !occupied {
            return None;
        }
        self.remove_slot(slot)
    }

    /// Drops every entry and resets the table to `minsize` bins.
    pub fn clear(&mut self) {
        self.bins.clear();
        self.bins.resize_with(self.minsize, || None);
        self.len = 0;
    }

    /// Grows the table if one more insert would pass the upper threshold.
    fn ensure_room(&mut self) -> Result<(), IndexError> {
        let capacity = self.bins.len();
        if self.len + 1 <= grow_threshold(capacity) {
            return Ok(());
        }
        let next = (capacity * 2).min(capacity + GROWTH_STEP);
        if next > MAX_CAPACITY {
            return Err(IndexError::CapacityExhausted);
        }
        self.resize(next)
    }

    /// Shrinks the table after a removal that left it underloaded.
    fn maybe_shrink(&mut self) {
        let capacity = self.bins.len();
        if self.len > self.minsize && self.len < shrink_threshold(capacity) {
            let target = (capacity / 2).max(self.minsize);
            if target < capacity {
                // Shrinking is best-effort; a failed allocation just leaves
                // the table larger than it needs to be.
                let _ = self.resize(target);
            }
        }
    }

    /// Rebuilds the table at `new_capacity`, re-inserting every live bin.
    ///
    /// PSLs are recomputed against the new modulus. On allocation failure
    /// the existing table is untouched.
    fn resize(&mut self, new_capacity: usize) -> Result<(), IndexError> {
        let mut fresh: Vec<Option<Bin>> = Vec::new();
        fresh
            .try_reserve_exact(new_capacity)
            .map_err(|_| IndexError::AllocationFailed)?;
        fresh.resize_with(new_capacity, || None);

        let old = std::mem::replace(&mut self.bins, fresh);
        self.len = 0;
        for bin in old.into_iter().flatten() {
            self.place(bin.entry);
        }
        Ok(())
    }

    /// Places an entry using Robin Hood displacement. Infallible: the
    /// caller guarantees at least one empty bin.
    fn place(&mut self, entry: EntryRef) -> Option<EntryRef> {
        let capacity = self.bins.len();
        let hash = entry.hash();
        let mut incoming = Bin {
            hash,
            psl: 0,
            entry,
        };
        let mut i = (hash % capacity as u64) as usize;
        loop {
            if let Some(bin) = self.bins[i].as_mut() {
                if bin.hash == incoming.hash && bin.entry.key() == incoming.entry.key() {
                    // Duplicate key: overwrite the payload in place.
                    incoming.entry.set_slot(i);
                    let displaced = std::mem::replace(&mut bin.entry, incoming.entry);
                    return Some(displaced);
                }
                if incoming.psl > bin.psl {
                    // The incumbent is richer; it gives up the bin and
                    // continues probing from here.
                    std::mem::swap(bin, &mut incoming);
                    bin.entry.set_slot(i);
                }
                incoming.psl += 1;
            } else {
                incoming.entry.set_slot(i);
                self.bins[i] = Some(incoming);
                self.len += 1;
                return None;
            }
            i = (i + 1) % capacity;
        }
    }

    /// Clears `slot` and backward-shifts the following chain, then checks
    /// whether the table should shrink.
    fn remove_slot(&mut self, slot: usize) -> Option<EntryRef> {
        let capacity = self.bins.len();
        let removed = self.bins[slot].take()?.entry;
        self.len -= 1;

        let mut i = slot;
        loop {
            let j = (i + 1) % capacity;
            match self.bins[j].take() {
                Some(mut bin) if bin.psl > 0 => {
                    bin.psl -= 1;
                    bin.entry.set_slot(i);
                    self.bins[i] = Some(bin);
                    i = j;
                }
                // An empty bin or a key sitting in its ideal position ends
                // the chain.
                other => {
                    self.bins[j] = other;
                    break;
                }
            }
        }

        self.maybe_shrink();
        Some(removed)
    }

    #[cfg(any(test, debug_assertions))]
    pub fn debug_validate_invariants(&self) {
        let capacity = self.bins.len();
        assert!(capacity >= self.minsize);
        assert!(self.len <= capacity);
        assert!(self.len <= grow_threshold(capacity));
        if self.len > self.minsize {
            assert!(self.len >= shrink_threshold(capacity));
        }

        let mut live = 0usize;
        for (i, slot) in self.bins.iter().enumerate() {
            let Some(bin) = slot else { continue };
            live += 1;

            assert_eq!(bin.hash, hash_key(bin.entry.key()));
            assert_eq!(bin.entry.slot(), i, "stale slot back-link");

            let ideal = (bin.hash % capacity as u64) as usize;
            let distance = (i + capacity - ideal) % capacity;
            assert_eq!(bin.psl as usize, distance, "stored PSL disagrees with position");

            // Robin Hood ordering: a displaced key never sits behind a bin
            // whose PSL is more than one smaller than its own.
            if bin.psl > 0 {
                let prev = (i + capacity - 1) % capacity;
                let prev_bin = self.bins[prev]
                    .as_ref()
                    .expect("probe chain has a gap before a displaced key");
                assert!(prev_bin.psl + 1 >= bin.psl);
            }
        }
        assert_eq!(live, self.len);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::Entry;

    fn entry(key: &[u8], value: &[u8]) -> EntryRef {
        Arc::new(Entry::new(key, value))
    }

    #[test]
    fn minsize_has_a_floor_of_one() {
        let index = RobinHoodIndex::new(0);
        assert_eq!(index.capacity(), 1);
        assert_eq!(index.minsize(), 1);
        assert!(index.is_empty());
    }

    #[test]
    fn insert_then_find_returns_the_entry() {
        let mut index = RobinHoodIndex::new(1);
        index.insert(entry(b"alpha", b"one")).unwrap();
        index.insert(entry(b"beta", b"two")).unwrap();

        assert_eq!(index.len(), 2);
        assert_eq!(index.find(b"alpha").unwrap().value(), b"one");
        assert_eq!(index.find(b"beta").unwrap().value(), b"two");
        assert!(index.find(b"gamma").is_none());
        index.debug_validate_invariants();
    }

    #[test]
    fn duplicate_insert_overwrites_payload_in_place() {
        let mut index = RobinHoodIndex::new(1);
        index.insert(entry(b"key", b"first")).unwrap();

        let displaced = index.insert(entry(b"key", b"second")).unwrap();
        assert_eq!(displaced.unwrap().value(), b"first");
        assert_eq!(index.len(), 1);
        assert_eq!(index.find(b"key").unwrap().value(), b"second");
        index.debug_validate_invariants();
    }

    #[test]
    fn remove_clears_the_key_and_returns_the_entry() {
        let mut index = RobinHoodIndex::new(1);
        index.insert(entry(b"key", b"value")).unwrap();

        let removed = index.remove(b"key").unwrap();
        assert_eq!(removed.value(), b"value");
        assert!(index.find(b"key").is_none());
        assert!(index.remove(b"key").is_none());
        assert!(index.is_empty());
        index.debug_validate_invariants();
    }

    #[test]
    fn backward_shift_keeps_the_rest_of_the_chain_findable() {
        let mut index = RobinHoodIndex::new(1);
        let keys: Vec<Vec<u8>> = (b'a'..=b'p').map(|c| vec![b'k', c]).collect();
        for key in &keys {
            index.insert(entry(key, key)).unwrap();
        }

        // Delete keys one at a time from the front; every survivor must
        // stay reachable and the PSL layout must stay canonical.
        for (removed_at, key) in keys.iter().enumerate() {
            assert!(index.remove(key).is_some());
            index.debug_validate_invariants();
            for survivor in &keys[removed_at + 1..] {
                assert_eq!(index.find(survivor).unwrap().key(), &survivor[..]);
            }
        }
        assert!(index.is_empty());
    }

    #[test]
    fn growth_tracks_the_upper_threshold() {
        let mut index = RobinHoodIndex::new(1);
        let mut resizes = 0;
        let mut last_capacity = index.capacity();

        for a in [b'a', b'b'] {
            for c in b'a'..=b'z' {
                index.insert(entry(&[a, c], &[a, c, b'!'])).unwrap();
                if index.capacity() != last_capacity {
                    resizes += 1;
                    last_capacity = index.capacity();
                }
            }
        }

        assert_eq!(index.len(), 52);
        assert!(resizes >= 6, "expected at least 6 growths, saw {resizes}");
        assert!(index.capacity() >= 64);
        for a in [b'a', b'b'] {
            for c in b'a'..=b'z' {
                assert_eq!(index.find(&[a, c]).unwrap().value(), &[a, c, b'!'][..]);
            }
        }
        index.debug_validate_invariants();
    }

    #[test]
    fn shrink_respects_the_minsize_floor() {
        let mut index = RobinHoodIndex::new(1);
        let keys: Vec<Vec<u8>> = (0u8..52).map(|i| vec![i, i ^ 0x5a]).collect();
        for key in &keys {
            index.insert(entry(key, key)).unwrap();
        }
        let grown = index.capacity();

        for key in &keys {
            index.remove(key);
            index.debug_validate_invariants();
        }

        assert!(index.is_empty());
        assert!(index.capacity() < grown);
        assert!(index.capacity() >= index.minsize());
    }

    #[test]
    fn remove_entry_uses_the_slot_back_link() {
        let mut index = RobinHoodIndex::new(1);
        let kept = entry(b"kept", b"kept");
        let victim = entry(b"victim", b"victim");
        index.insert(Arc::clone(&kept)).unwrap();
        index.insert(Arc::clone(&victim)).unwrap();

        assert!(index.remove_entry(&victim).is_some());
        assert!(index.find(b"victim").is_none());
        assert_eq!(index.find(b"kept").unwrap().value(), b"kept");

        // A second removal through the same (now stale) back-link is a no-op.
        assert!(index.remove_entry(&victim).is_none());
        index.debug_validate_invariants();
    }

    #[test]
    fn clear_resets_to_minsize() {
        let mut index = RobinHoodIndex::new(2);
        for i in 0u8..40 {
            index.insert(entry(&[i], &[i])).unwrap();
        }
        assert!(index.capacity() > 2);

        index.clear();
        assert!(index.is_empty());
        assert_eq!(index.capacity(), 2);
        assert!(index.find(&[7]).is_none());
        index.debug_validate_invariants();
    }

    #[test]
    fn hash_key_matches_djb2() {
        // djb2 of "a": 5381 * 33 + 97
        assert_eq!(hash_key(b"a"), 5381 * 33 + 97);
        assert_eq!(hash_key(b""), 5381);
        assert_ne!(hash_key(b"ab"), hash_key(b"ba"));
    }
}
