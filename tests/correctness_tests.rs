//! Correctness Tests for the Partitioned Cache
//!
//! These tests drive the cache from a single thread so that every outcome is
//! predictable. They check the replacement policy against a step-by-step
//! trace of each scenario.
//!
//! ## Segments
//!
//! 1. **Scenarios**: short traces with known hit/miss sequences
//! 2. **Replacement Policy**: invalid-first, LRU victim, shared aging
//! 3. **Partition Isolation**: lookups and victims stay in the caller's range

use partitioned_cache::config::PartitionedCacheConfig;
use partitioned_cache::{AccessResult, CacheLine, Partition, PartitionedCache, WayRange};

fn make_cache(num_sets: usize, num_ways: usize) -> PartitionedCache {
    PartitionedCache::init(PartitionedCacheConfig::try_new(num_sets, num_ways).unwrap())
}

fn recency_of(cache: &PartitionedCache, set: usize, way: usize) -> Option<u64> {
    cache
        .with_set(set, |lines| {
            let line: &CacheLine = &lines[way];
            line.is_valid().then(|| line.recency())
        })
        .unwrap()
}

// ============================================================================
// SEGMENT 1: SCENARIOS
// ============================================================================

#[test]
fn test_single_way_partition_trace() {
    // 1 set, 2 ways, core0 owns [0,1), core1 owns [1,2)
    let cache = make_cache(1, 2);
    let partition = Partition::from_ranges(&[WayRange::new(0, 1), WayRange::new(1, 2)], 2).unwrap();
    let core0 = partition.range(0).unwrap();

    let outcomes: Vec<bool> = [5u64, 5, 7]
        .iter()
        .map(|&tag| cache.access(0, tag, core0).unwrap().is_hit())
        .collect();
    assert_eq!(outcomes, vec![false, true, false]);

    // Tag 7 replaced tag 5 in way 0; way 1 was never touched.
    let lines = cache.lines(0).unwrap();
    assert_eq!(lines[0].tag(), Some(7));
    assert!(!lines[1].is_valid());
}

#[test]
fn test_first_access_always_misses() {
    let cache = make_cache(8, 8);
    let ways = WayRange::new(0, 8);

    for address in [0u64, 13, 511, 1023] {
        let fresh = make_cache(8, 8);
        let set = (address % 8) as usize;
        let result = fresh.access(set, address / 8, ways).unwrap();
        assert_eq!(
            result,
            AccessResult::Miss {
                way: 0,
                evicted: None
            }
        );
    }

    // Distinct tags in one set miss until the set has been filled.
    for tag in 0..8u64 {
        assert!(cache.access(3, tag, ways).unwrap().is_miss());
    }
    for tag in 0..8u64 {
        assert!(cache.access(3, tag, ways).unwrap().is_hit());
    }
}

#[test]
fn test_repeat_after_hit_hits_again() {
    let cache = make_cache(2, 4);
    let ways = WayRange::new(0, 2);

    cache.access(1, 42, ways).unwrap();
    assert!(cache.access(1, 42, ways).unwrap().is_hit());
    assert!(cache.access(1, 42, ways).unwrap().is_hit());

    // Accesses to the other set do not disturb it.
    for tag in 0..10u64 {
        cache.access(0, tag, ways).unwrap();
    }
    assert!(cache.access(1, 42, ways).unwrap().is_hit());

    // Two new tags in a two-way range push it out.
    cache.access(1, 1, ways).unwrap();
    cache.access(1, 2, ways).unwrap();
    assert!(cache.access(1, 42, ways).unwrap().is_miss());
}

// ============================================================================
// SEGMENT 2: REPLACEMENT POLICY
// ============================================================================

#[test]
fn test_invalid_way_preferred_over_lru() {
    let cache = make_cache(1, 4);
    let ways = WayRange::new(0, 4);

    cache.access(0, 1, ways).unwrap();
    cache.access(0, 2, ways).unwrap();
    for _ in 0..20 {
        cache.access(0, 2, ways).unwrap();
    }
    // Way 0 is very old, but ways 2 and 3 are still empty.
    assert_eq!(
        cache.access(0, 3, ways).unwrap(),
        AccessResult::Miss {
            way: 2,
            evicted: None
        }
    );
}

#[test]
fn test_victim_has_max_recency() {
    let cache = make_cache(1, 4);
    let ways = WayRange::new(0, 4);

    for tag in [10u64, 11, 12, 13] {
        cache.access(0, tag, ways).unwrap();
    }
    // Refresh 10 and 12, leaving 11 as the oldest.
    cache.access(0, 10, ways).unwrap();
    cache.access(0, 12, ways).unwrap();

    let max_recency = (0..4).filter_map(|w| recency_of(&cache, 0, w)).max();
    assert_eq!(recency_of(&cache, 0, 1), max_recency);

    assert_eq!(
        cache.access(0, 99, ways).unwrap(),
        AccessResult::Miss {
            way: 1,
            evicted: Some(11)
        }
    );
}

#[test]
fn test_foreign_traffic_does_not_change_victim() {
    let cache = make_cache(1, 3);
    let shared = WayRange::new(0, 2);
    let other = WayRange::new(2, 3);

    cache.access(0, 1, shared).unwrap();
    cache.access(0, 2, shared).unwrap();
    cache.access(0, 1, shared).unwrap();
    cache.access(0, 2, shared).unwrap();
    // Ages ways 0 and 1 by the same amount.
    for tag in 50..60u64 {
        cache.access(0, tag, other).unwrap();
    }

    assert_eq!(recency_of(&cache, 0, 0), Some(12));
    assert_eq!(recency_of(&cache, 0, 1), Some(11));
    assert_eq!(
        cache.access(0, 3, shared).unwrap(),
        AccessResult::Miss {
            way: 0,
            evicted: Some(1)
        }
    );
}

#[test]
fn test_aging_applies_to_whole_set() {
    let cache = make_cache(1, 4);
    let low = WayRange::new(0, 2);
    let high = WayRange::new(2, 4);

    cache.access(0, 1, low).unwrap();
    assert_eq!(recency_of(&cache, 0, 0), Some(1));

    for tag in 0..5u64 {
        cache.access(0, 100 + tag % 2, high).unwrap();
    }
    assert_eq!(recency_of(&cache, 0, 0), Some(6));
    // Invalid line in the low range stays unaged.
    assert_eq!(recency_of(&cache, 0, 1), None);
}

// ============================================================================
// SEGMENT 3: PARTITION ISOLATION
// ============================================================================

#[test]
fn test_tag_in_other_partition_is_not_a_hit() {
    let cache = make_cache(1, 4);
    let partition = Partition::from_widths(&[2, 2], 4).unwrap();
    let core0 = partition.range(0).unwrap();
    let core1 = partition.range(1).unwrap();

    cache.access(0, 9, core0).unwrap();
    let result = cache.access(0, 9, core1).unwrap();
    assert_eq!(
        result,
        AccessResult::Miss {
            way: 2,
            evicted: None
        }
    );

    // Both copies now live in their own partitions.
    let tags: Vec<Option<u64>> = cache.lines(0).unwrap().iter().map(CacheLine::tag).collect();
    assert_eq!(tags, vec![Some(9), None, Some(9), None]);
}

#[test]
fn test_victims_stay_inside_range() {
    let cache = make_cache(2, 6);
    let partition = Partition::from_widths(&[1, 2, 3], 6).unwrap();

    for step in 0..300u64 {
        for (core, &ways) in partition.ranges().iter().enumerate() {
            let set = (step % 2) as usize;
            let tag = (step * 7 + core as u64) % 11;
            let result = cache.access(set, tag, ways).unwrap();
            assert!(ways.contains(result.way()), "core {core} used way {}", result.way());
        }
    }
}

#[test]
fn test_no_duplicate_tags_within_a_range() {
    let cache = make_cache(4, 8);
    let partition = Partition::from_widths(&[3, 5], 8).unwrap();

    for i in 0..5000u64 {
        let core = (i % 2) as usize;
        let ways = partition.range(core).unwrap();
        cache.access((i % 4) as usize, (i * 31) % 13, ways).unwrap();
    }

    for set in 0..4 {
        let lines = cache.lines(set).unwrap();
        for &ways in partition.ranges() {
            let mut tags: Vec<u64> = ways.iter().filter_map(|w| lines[w].tag()).collect();
            let len = tags.len();
            tags.sort_unstable();
            tags.dedup();
            assert_eq!(len, tags.len());
        }
    }
}

#[test]
fn test_widths_exceeding_ways_fail_before_any_access() {
    let cache = make_cache(8, 8);
    assert!(Partition::from_widths(&[4, 4, 1], 8).is_err());
    assert_eq!(cache.total_metrics().accesses, 0);
}
