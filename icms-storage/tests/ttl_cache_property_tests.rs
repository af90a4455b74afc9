//! Property tests for the TTL cache.
//!
//! - get after set returns the value until the TTL elapses, then nothing
//! - a full cache evicts exactly the entry with the oldest store time

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use icms_core::ManualClock;
use icms_storage::{CacheConfig, CacheOptions, TtlCache};
use proptest::prelude::*;

fn new_cache(max_size: usize) -> (TtlCache<i64>, ManualClock) {
    let clock = ManualClock::at_epoch_2024();
    let cache = TtlCache::with_clock(
        CacheConfig::default().with_max_size(max_size),
        Arc::new(clock.clone()),
    );
    (cache, clock)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_get_after_set_then_expires(
        key in "[a-z:]{1,24}",
        value in any::<i64>(),
        ttl_ms in 1u64..600_000,
    ) {
        let (cache, clock) = new_cache(16);
        let ttl = Duration::from_millis(ttl_ms);

        cache.set(key.clone(), value, CacheOptions::ttl(ttl));
        prop_assert_eq!(cache.get(&key), Some(value));

        clock.advance(ttl + Duration::from_millis(1));
        prop_assert_eq!(cache.get(&key), None);
        prop_assert!(!cache.has(&key));
    }

    #[test]
    fn prop_value_survives_until_ttl(
        value in any::<i64>(),
        ttl_ms in 2u64..600_000,
        fraction in 0.0f64..1.0,
    ) {
        let (cache, clock) = new_cache(16);
        cache.set("k", value, CacheOptions::ttl(Duration::from_millis(ttl_ms)));

        let elapsed = ((ttl_ms as f64) * fraction) as u64;
        clock.advance(Duration::from_millis(elapsed));
        prop_assert_eq!(cache.get("k"), Some(value));
    }

    #[test]
    fn prop_capacity_evicts_single_oldest(
        max_size in 1usize..32,
        step_ms in proptest::collection::vec(0u64..5_000, 32),
    ) {
        let (cache, clock) = new_cache(max_size);

        // Insert max_size + 1 distinct keys with non-decreasing timestamps.
        for i in 0..=max_size {
            cache.set(format!("key-{i}"), i as i64, CacheOptions::default());
            clock.advance(Duration::from_millis(step_ms[i]));
        }

        let remaining: HashSet<String> = cache.keys().into_iter().collect();
        prop_assert_eq!(remaining.len(), max_size);
        prop_assert!(!remaining.contains("key-0"));
        for i in 1..=max_size {
            let key = format!("key-{i}");
            prop_assert!(remaining.contains(&key));
        }
        prop_assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn prop_refreshed_entry_is_not_evicted_first(
        max_size in 2usize..16,
        refreshed in 0usize..16,
    ) {
        let refreshed = refreshed % max_size;
        let (cache, clock) = new_cache(max_size);
        let refreshed_key = format!("key-{refreshed}");

        for i in 0..max_size {
            cache.set(format!("key-{i}"), i as i64, CacheOptions::default());
            clock.advance(Duration::from_millis(10));
        }
        prop_assert!(cache.refresh(&refreshed_key));
        cache.set("fresh", -1, CacheOptions::default());

        let expected_victim = if refreshed == 0 { "key-1".to_string() } else { "key-0".to_string() };
        prop_assert!(!cache.has(&expected_victim));
        prop_assert!(cache.has(&refreshed_key));
        prop_assert!(cache.has("fresh"));
    }
}
