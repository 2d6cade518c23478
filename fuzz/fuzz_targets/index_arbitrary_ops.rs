#![no_main]

use std::sync::Arc;

use libfuzzer_sys::fuzz_target;
use relay_cache::ds::RobinHoodIndex;
use relay_cache::entry::Entry;

// Fuzz arbitrary operation sequences on RobinHoodIndex
//
// Tests random sequences of insert, remove, remove_entry, find, and clear
// against the structural invariants (PSL layout, slot back-links, length
// accounting) after every step.
fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }

    let mut index = RobinHoodIndex::new(1);
    let mut live: Vec<Vec<u8>> = Vec::new();

    let mut cursor = 0;
    while cursor + 1 < data.len() {
        let op = data[cursor] % 5;
        let selector = data[cursor + 1];
        let key = vec![b'k', selector % 48];

        match op {
            0 => {
                // insert
                let entry = Arc::new(Entry::new(&key, &[selector]));
                let displaced = index.insert(entry).unwrap();
                if displaced.is_none() {
                    live.push(key.clone());
                }
                assert!(index.contains(&key));
            }
            1 => {
                // remove by key
                let removed = index.remove(&key);
                let was_live = live.iter().position(|k| k == &key);
                assert_eq!(removed.is_some(), was_live.is_some());
                if let Some(pos) = was_live {
                    live.swap_remove(pos);
                }
                assert!(!index.contains(&key));
            }
            2 => {
                // remove through the slot back-link
                if let Some(found) = index.find(&key).cloned() {
                    assert!(index.remove_entry(&found).is_some());
                    if let Some(pos) = live.iter().position(|k| k == &key) {
                        live.swap_remove(pos);
                    }
                    // The stale back-link must not remove anything else.
                    assert!(index.remove_entry(&found).is_none());
                }
            }
            3 => {
                // find (read-only)
                let found = index.find(&key);
                assert_eq!(found.is_some(), live.iter().any(|k| k == &key));
            }
            4 => {
                // clear
                index.clear();
                live.clear();
                assert!(index.is_empty());
            }
            _ => unreachable!(),
        }

        #[cfg(debug_assertions)]
        index.debug_validate_invariants();
        assert_eq!(index.len(), live.len());

        cursor += 2;
    }

    for key in &live {
        assert!(index.find(key).is_some());
    }
});
