// ==============================================
// END-TO-END CACHE SCENARIOS (integration)
// ==============================================
//
// Byte-level walks through the cache's observable behavior: replacement in
// a single-slot budget, oversize rejection, alphabet churn through a small
// budget, index growth under key load, and promotion-driven eviction order.

use relay_cache::cache::{InsertOutcome, ResponseCache};
use relay_cache::error::InsertError;

fn payload(len: usize, fill: u8) -> Vec<u8> {
    vec![fill; len]
}

// ==============================================
// Single-slot replacement
// ==============================================

mod single_slot {
    use super::*;

    #[test]
    fn second_exact_fit_insert_replaces_the_first() {
        let cache = ResponseCache::new(16);
        let first: Vec<u8> = (0u8..16).collect();
        let second: Vec<u8> = (0u8..16).rev().collect();

        assert_eq!(cache.insert(b"abc", &first).unwrap(), InsertOutcome::Inserted);
        assert_eq!(cache.bytes_used(), 16);

        assert_eq!(cache.insert(b"cba", &second).unwrap(), InsertOutcome::Inserted);
        assert!(cache.find(b"abc").is_none());

        let handle = cache.find(b"cba").expect("replacement entry must be cached");
        assert_eq!(handle.value(), &second[..]);
        assert_eq!(cache.bytes_used(), 16);
        cache.debug_validate_invariants();
    }

    #[test]
    fn over_budget_value_is_refused_up_front() {
        let cache = ResponseCache::new(16);
        let too_big: Vec<u8> = (0u8..17).collect();

        assert_eq!(
            cache.insert(b"x", &too_big).unwrap_err(),
            InsertError::TooLarge { size: 17, limit: 16 }
        );
        assert_eq!(cache.bytes_used(), 0);
        assert!(cache.is_empty());
    }
}

// ==============================================
// Alphabet churn
// ==============================================
//
// 26 ten-byte entries pushed through a 64-byte budget leave exactly the
// last six, in insertion-recency order.

mod alphabet_churn {
    use super::*;

    #[test]
    fn only_the_six_newest_keys_survive() {
        let cache = ResponseCache::new(64);
        for letter in b'a'..=b'z' {
            cache.insert(&[letter], &payload(10, letter)).unwrap();
        }

        assert_eq!(cache.len(), 6);
        assert!(cache.bytes_used() <= 64);
        assert_eq!(cache.bytes_used(), 60);

        let expected_order = [b'z', b'y', b'x', b'w', b'v', b'u'];
        for (rank, letter) in expected_order.iter().enumerate() {
            assert_eq!(
                cache.recency_rank(&[*letter]),
                Some(rank),
                "letter {} should sit at rank {rank}",
                *letter as char
            );
        }
        for letter in b'a'..=b't' {
            assert!(cache.peek(&[letter]).is_none());
        }
        cache.debug_validate_invariants();
    }
}

// ==============================================
// Index growth under key load
// ==============================================
//
// 52 distinct two-byte keys drive the index from a single bin up through
// the occupancy threshold repeatedly; nothing may be lost on the way.

mod index_growth {
    use super::*;

    #[test]
    fn fifty_two_keys_grow_the_index_without_losing_any() {
        // Budget big enough that nothing is ever evicted.
        let cache = ResponseCache::new(64 * 1024);
        let mut resizes = 0;
        let mut last_capacity = cache.index_capacity();
        assert_eq!(last_capacity, 1);

        for prefix in [b'a', b'b'] {
            for suffix in b'a'..=b'z' {
                let key = [prefix, suffix];
                cache.insert(&key, &payload(8, prefix ^ suffix)).unwrap();
                if cache.index_capacity() != last_capacity {
                    resizes += 1;
                    last_capacity = cache.index_capacity();
                }
            }
        }

        assert_eq!(cache.len(), 52);
        assert!(resizes >= 6, "expected at least 6 index growths, saw {resizes}");

        for prefix in [b'a', b'b'] {
            for suffix in b'a'..=b'z' {
                let key = [prefix, suffix];
                let handle = cache.find(&key).expect("every inserted key stays findable");
                assert_eq!(handle.value(), &payload(8, prefix ^ suffix)[..]);
            }
        }
        cache.debug_validate_invariants();
    }
}

// ==============================================
// Promotion changes the eviction victim
// ==============================================

mod promotion {
    use super::*;

    #[test]
    fn hit_on_the_oldest_entry_redirects_eviction() {
        let cache = ResponseCache::new(30);
        cache.insert(b"a", &payload(10, b'a')).unwrap();
        cache.insert(b"b", &payload(10, b'b')).unwrap();
        cache.insert(b"c", &payload(10, b'c')).unwrap();

        // Promote "a": order becomes a, c, b.
        assert!(cache.find(b"a").is_some());
        assert_eq!(cache.recency_rank(b"a"), Some(0));
        assert_eq!(cache.recency_rank(b"c"), Some(1));
        assert_eq!(cache.recency_rank(b"b"), Some(2));

        // The next insert must evict "b".
        cache.insert(b"d", &payload(10, b'd')).unwrap();
        assert!(cache.peek(b"b").is_none());
        assert!(cache.peek(b"a").is_some());
        assert!(cache.peek(b"c").is_some());
        assert!(cache.peek(b"d").is_some());
        cache.debug_validate_invariants();
    }
}
