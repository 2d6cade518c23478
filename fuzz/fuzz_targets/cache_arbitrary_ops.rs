#![no_main]

use libfuzzer_sys::fuzz_target;
use relay_cache::cache::ResponseCache;

// Fuzz arbitrary operation sequences on ResponseCache
//
// Tests random find/insert/remove/clear sequences against the budget and
// composition invariants after every step. Handles are held across later
// operations to exercise the tombstone path.
fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }

    let budget = 1 + usize::from(data[0]);
    let cache = ResponseCache::new(budget);
    let mut parked = Vec::new();

    let mut cursor = 1;
    while cursor + 2 < data.len() {
        let op = data[cursor] % 5;
        let selector = data[cursor + 1];
        let size = 1 + usize::from(data[cursor + 2]) % 48;
        let key = [b'k', selector % 24];

        match op {
            0 | 1 => {
                let _ = cache.insert(&key, &vec![selector; size]);
            }
            2 => {
                if let Some(handle) = cache.find(&key) {
                    let value = handle.value();
                    assert!(!value.is_empty());
                    assert!(value.iter().all(|&b| b == value[0]));
                    // Park some handles so evictions race live readers.
                    if parked.len() < 16 {
                        parked.push(handle);
                    }
                }
            }
            3 => {
                cache.remove(&key);
                assert!(cache.peek(&key).is_none());
            }
            4 => {
                parked.clear();
                cache.clear();
                assert!(cache.is_empty());
                assert_eq!(cache.bytes_used(), 0);
            }
            _ => unreachable!(),
        }

        assert!(cache.bytes_used() <= cache.max_size());
        #[cfg(debug_assertions)]
        cache.debug_validate_invariants();

        cursor += 3;
    }

    // Parked handles still read their original bytes, evicted or not.
    for handle in &parked {
        let value = handle.value();
        assert!(value.iter().all(|&b| b == value[0]));
    }
});
