//! Circular doubly linked recency list with head insertion.
//!
//! Tracks usage order for LRU eviction: the head is the most recently used
//! entry and, because the list is circular, `head.prev` is the least
//! recently used tail. Nodes live in an internal slab (`Vec<Option<Node>>`
//! plus a free list) and are addressed by stable [`NodeId`] handles, so
//! `move_to_front` relinks in place and never invalidates a handle.
//!
//! ```text
//!            ┌──────────────────────────────────┐
//!            ▼                                  │
//!   head ─► [MRU] ◄──► [ · ] ◄──► [LRU/tail] ◄──┘
//! ```
//!
//! All operations are O(1) except iteration.
use crate::entry::EntryRef;

/// Stable handle to a node in a [`RecencyList`].
///
/// Valid until the node is unlinked; the numeric index may be reused by a
/// later `push_front`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// Returns the underlying slab index.
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug)]
struct Node {
    prev: usize,
    next: usize,
    entry: EntryRef,
}

/// Circular MRU-at-head list of cache entries.
#[derive(Debug, Default)]
pub struct RecencyList {
    nodes: Vec<Option<Node>>,
    free: Vec<usize>,
    head: Option<usize>,
    len: usize,
}

impl RecencyList {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of linked nodes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the list is empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns `true` if `id` refers to a currently linked node.
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes
            .get(id.0)
            .map(|slot| slot.is_some())
            .unwrap_or(false)
    }

    /// Returns the most recently used node.
    pub fn front(&self) -> Option<NodeId> {
        self.head.map(NodeId)
    }

    /// Returns the least recently used node (the eviction victim).
    pub fn back(&self) -> Option<NodeId> {
        let head = self.head?;
        self.nodes[head].as_ref().map(|node| NodeId(node.prev))
    }

    /// Returns the entry held by `id`, if linked.
    pub fn get(&self, id: NodeId) -> Option<&EntryRef> {
        self.nodes
            .get(id.0)
            .and_then(|slot| slot.as_ref())
            .map(|node| &node.entry)
    }

    /// Links a new node at the head and returns its handle.
    pub fn push_front(&mut self, entry: EntryRef) -> NodeId {
        let idx = self.alloc(entry);
        match self.head {
            Some(head) => {
                let tail = match self.nodes[head].as_ref() {
                    Some(node) => node.prev,
                    None => idx,
                };
                if let Some(node) = self.nodes[idx].as_mut() {
                    node.prev = tail;
                    node.next = head;
                }
                if let Some(node) = self.nodes[tail].as_mut() {
                    node.next = idx;
                }
                if let Some(node) = self.nodes[head].as_mut() {
                    node.prev = idx;
                }
            }
            None => {
                if let Some(node) = self.nodes[idx].as_mut() {
                    node.prev = idx;
                    node.next = idx;
                }
            }
        }
        self.head = Some(idx);
        self.len += 1;
        NodeId(idx)
    }

    /// Unlinks `id` and returns its entry, freeing the slot for reuse.
    pub fn unlink(&mut self, id: NodeId) -> Option<EntryRef> {
        let node = self.nodes.get_mut(id.0)?.take()?;
        self.free.push(id.0);
        self.len -= 1;

        if self.len == 0 {
            self.head = None;
        } else {
            if let Some(prev) = self.nodes[node.prev].as_mut() {
                prev.next = node.next;
            }
            if let Some(next) = self.nodes[node.next].as_mut() {
                next.prev = node.prev;
            }
            if self.head == Some(id.0) {
                self.head = Some(node.next);
            }
        }
        Some(node.entry)
    }

    /// Promotes `id` to the head; returns `false` if it is not linked.
    ///
    /// A no-op when the node already is the head. The handle stays valid.
    pub fn move_to_front(&mut self, id: NodeId) -> bool {
        let Some(head) = self.head else {
            return false;
        };
        if head == id.0 {
            return self.contains(id);
        }
        let (prev, next) = match self.nodes.get(id.0).and_then(|slot| slot.as_ref()) {
            Some(node) => (node.prev, node.next),
            None => return false,
        };

        // Detach from the current position.
        if let Some(node) = self.nodes[prev].as_mut() {
            node.next = next;
        }
        if let Some(node) = self.nodes[next].as_mut() {
            node.prev = prev;
        }

        // Reattach between the tail and the current head.
        let tail = match self.nodes[head].as_ref() {
            Some(node) => node.prev,
            None => return false,
        };
        if let Some(node) = self.nodes[id.0].as_mut() {
            node.prev = tail;
            node.next = head;
        }
        if let Some(node) = self.nodes[tail].as_mut() {
            node.next = id.0;
        }
        if let Some(node) = self.nodes[head].as_mut() {
            node.prev = id.0;
        }
        self.head = Some(id.0);
        true
    }

    /// Unlinks every node and drops the slab.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.free.clear();
        self.head = None;
        self.len = 0;
    }

    /// Iterates entries from most to least recently used.
    pub fn iter(&self) -> RecencyIter<'_> {
        RecencyIter {
            list: self,
            next: self.head,
            remaining: self.len,
        }
    }

    fn alloc(&mut self, entry: EntryRef) -> usize {
        let node = Node {
            prev: 0,
            next: 0,
            entry,
        };
        match self.free.pop() {
            Some(idx) => {
                self.nodes[idx] = Some(node);
                idx
            }
            None => {
                self.nodes.push(Some(node));
                self.nodes.len() - 1
            }
        }
    }

    #[cfg(any(test, debug_assertions))]
    pub fn debug_validate_invariants(&self) {
        assert_eq!(self.nodes.len(), self.len + self.free.len());
        for &idx in &self.free {
            assert!(self.nodes[idx].is_none());
        }

        let Some(head) = self.head else {
            assert_eq!(self.len, 0);
            return;
        };
        assert!(self.len > 0);

        let mut seen = std::collections::HashSet::new();
        let mut current = head;
        for _ in 0..self.len {
            assert!(seen.insert(current), "cycle shorter than len");
            let node = self.nodes[current].as_ref().expect("linked node missing");
            let next_node = self.nodes[node.next].as_ref().expect("next node missing");
            assert_eq!(next_node.prev, current, "prev/next links disagree");
            current = node.next;
        }
        assert_eq!(current, head, "list does not close back on the head");
    }
}

/// Front-to-back iterator over a [`RecencyList`].
pub struct RecencyIter<'a> {
    list: &'a RecencyList,
    next: Option<usize>,
    remaining: usize,
}

impl<'a> Iterator for RecencyIter<'a> {
    type Item = &'a EntryRef;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let idx = self.next?;
        let node = self.list.nodes.get(idx)?.as_ref()?;
        self.remaining -= 1;
        self.next = Some(node.next);
        Some(&node.entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::Entry;
    use std::sync::Arc;

    fn entry(key: &[u8]) -> EntryRef {
        Arc::new(Entry::new(key, b"v"))
    }

    fn keys(list: &RecencyList) -> Vec<Vec<u8>> {
        list.iter().map(|e| e.key().to_vec()).collect()
    }

    #[test]
    fn push_front_orders_mru_first() {
        let mut list = RecencyList::new();
        list.push_front(entry(b"a"));
        list.push_front(entry(b"b"));
        list.push_front(entry(b"c"));

        assert_eq!(list.len(), 3);
        assert_eq!(keys(&list), vec![b"c".to_vec(), b"b".to_vec(), b"a".to_vec()]);
        list.debug_validate_invariants();
    }

    #[test]
    fn back_is_the_oldest_node() {
        let mut list = RecencyList::new();
        let a = list.push_front(entry(b"a"));
        list.push_front(entry(b"b"));

        assert_eq!(list.back(), Some(a));
        assert_eq!(list.get(a).unwrap().key(), b"a");
    }

    #[test]
    fn single_node_is_its_own_neighbor() {
        let mut list = RecencyList::new();
        let only = list.push_front(entry(b"solo"));

        assert_eq!(list.front(), Some(only));
        assert_eq!(list.back(), Some(only));
        assert!(list.move_to_front(only));
        list.debug_validate_invariants();

        assert_eq!(list.unlink(only).unwrap().key(), b"solo");
        assert!(list.is_empty());
        assert_eq!(list.front(), None);
        assert_eq!(list.back(), None);
        list.debug_validate_invariants();
    }

    #[test]
    fn unlink_middle_head_and_tail() {
        let mut list = RecencyList::new();
        let a = list.push_front(entry(b"a"));
        let b = list.push_front(entry(b"b"));
        let c = list.push_front(entry(b"c"));

        assert!(list.unlink(b).is_some());
        assert_eq!(keys(&list), vec![b"c".to_vec(), b"a".to_vec()]);
        list.debug_validate_invariants();

        assert!(list.unlink(c).is_some());
        assert_eq!(keys(&list), vec![b"a".to_vec()]);
        list.debug_validate_invariants();

        assert!(list.unlink(a).is_some());
        assert!(list.is_empty());
        assert!(list.unlink(a).is_none());
    }

    #[test]
    fn move_to_front_promotes_the_tail() {
        let mut list = RecencyList::new();
        let a = list.push_front(entry(b"a"));
        list.push_front(entry(b"b"));
        list.push_front(entry(b"c"));

        assert!(list.move_to_front(a));
        assert_eq!(keys(&list), vec![b"a".to_vec(), b"c".to_vec(), b"b".to_vec()]);
        assert_eq!(list.front(), Some(a));
        list.debug_validate_invariants();
    }

    #[test]
    fn move_to_front_of_head_is_a_no_op() {
        let mut list = RecencyList::new();
        list.push_front(entry(b"a"));
        let b = list.push_front(entry(b"b"));

        assert!(list.move_to_front(b));
        assert_eq!(keys(&list), vec![b"b".to_vec(), b"a".to_vec()]);
        list.debug_validate_invariants();
    }

    #[test]
    fn move_to_front_in_a_two_node_ring() {
        let mut list = RecencyList::new();
        let a = list.push_front(entry(b"a"));
        list.push_front(entry(b"b"));

        assert!(list.move_to_front(a));
        assert_eq!(keys(&list), vec![b"a".to_vec(), b"b".to_vec()]);
        list.debug_validate_invariants();
    }

    #[test]
    fn unlinked_handles_are_rejected() {
        let mut list = RecencyList::new();
        let a = list.push_front(entry(b"a"));
        list.push_front(entry(b"b"));
        list.unlink(a);

        assert!(!list.contains(a));
        assert!(!list.move_to_front(a));
        assert!(list.get(a).is_none());
    }

    #[test]
    fn freed_slots_are_reused() {
        let mut list = RecencyList::new();
        let a = list.push_front(entry(b"a"));
        list.unlink(a);

        let b = list.push_front(entry(b"b"));
        assert_eq!(a.index(), b.index());
        assert_eq!(list.len(), 1);
        list.debug_validate_invariants();
    }

    #[test]
    fn clear_resets_everything() {
        let mut list = RecencyList::new();
        let a = list.push_front(entry(b"a"));
        list.push_front(entry(b"b"));

        list.clear();
        assert!(list.is_empty());
        assert_eq!(list.front(), None);
        assert_eq!(list.back(), None);
        assert!(!list.contains(a));
        list.debug_validate_invariants();
    }
}
