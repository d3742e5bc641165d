//! Partitioned Cache
//!
//! A thread-safe set-associative cache where each set is protected by its
//! own lock. This is the shared structure every simulated core probes.
//!
//! # How It Works
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                        PartitionedCache                              │
//! │                                                                      │
//! │  address % num_sets  ──▶  Set Selection                              │
//! │                                                                      │
//! │  ┌──────────────┐ ┌──────────────┐     ┌──────────────┐              │
//! │  │    Set 0     │ │    Set 1     │ ... │   Set N-1    │              │
//! │  │  ┌────────┐  │ │  ┌────────┐  │     │  ┌────────┐  │              │
//! │  │  │ Mutex  │  │ │  │ Mutex  │  │     │  │ Mutex  │  │              │
//! │  │  └────┬───┘  │ │  └────┬───┘  │     │  └────┬───┘  │              │
//! │  │  ┌────▼───┐  │ │  ┌────▼───┐  │     │  ┌────▼───┐  │              │
//! │  │  │ ways   │  │ │  │ ways   │  │     │  │ ways   │  │              │
//! │  │  └────────┘  │ │  └────────┘  │     │  └────────┘  │              │
//! │  └──────────────┘ └──────────────┘     └──────────────┘              │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! An access only touches the ways of its caller's partition when probing
//! and choosing a victim, but it ages every valid line in the set. The lock
//! therefore covers the whole set rather than one partition of it. Accesses
//! to one set are linearizable; accesses to different sets never contend.
//!
//! ## Why Mutex Instead of RwLock?
//!
//! Every access writes: a hit resets a recency counter, a miss installs a
//! tag, and both age the set. An `RwLock` would always be taken for writing.
//!
//! # Example
//!
//! ```
//! use partitioned_cache::{PartitionedCache, Partition};
//! use core::num::NonZeroUsize;
//! use std::sync::Arc;
//! use std::thread;
//!
//! let cache = Arc::new(PartitionedCache::new(
//!     NonZeroUsize::new(8).unwrap(),
//!     NonZeroUsize::new(8).unwrap(),
//! ));
//! let partition = Partition::from_widths(&[4, 4], 8).unwrap();
//!
//! let handles: Vec<_> = partition
//!     .ranges()
//!     .iter()
//!     .map(|&ways| {
//!         let cache = Arc::clone(&cache);
//!         thread::spawn(move || {
//!             let mut hits = 0;
//!             for address in 0..1000u64 {
//!                 let set = (address % 8) as usize;
//!                 if cache.access(set, address / 8 % 16, ways).unwrap().is_hit() {
//!                     hits += 1;
//!                 }
//!             }
//!             hits
//!         })
//!     })
//!     .collect();
//!
//! for h in handles {
//!     let _hits: u32 = h.join().unwrap();
//! }
//! assert!(cache.valid_lines() <= 64);
//! ```

use std::collections::BTreeMap;

use core::num::NonZeroUsize;
use parking_lot::Mutex;

use crate::config::PartitionedCacheConfig;
use crate::error::AccessError;
use crate::line::CacheLine;
use crate::metrics::{CacheMetrics, SetMetrics};
use crate::partition::WayRange;
use crate::set::{AccessResult, CacheSet};

/// A shared set-associative cache with one lock per set.
///
/// The grid of lines is fixed at construction. Callers pass the way range
/// they own with every access; the cache validates it but does not know
/// which core is calling.
pub struct PartitionedCache {
    sets: Box<[Mutex<CacheSet>]>,
    num_ways: usize,
}

impl PartitionedCache {
    /// Creates an empty cache from a configuration.
    pub fn init(config: PartitionedCacheConfig) -> Self {
        let num_ways = config.num_ways.get();
        let sets: Vec<_> = (0..config.num_sets.get())
            .map(|_| Mutex::new(CacheSet::new(num_ways)))
            .collect();

        Self {
            sets: sets.into_boxed_slice(),
            num_ways,
        }
    }

    /// Creates an empty cache with `num_sets` sets of `num_ways` ways.
    pub fn new(num_sets: NonZeroUsize, num_ways: NonZeroUsize) -> Self {
        Self::init(PartitionedCacheConfig { num_sets, num_ways })
    }

    /// Number of sets.
    pub fn num_sets(&self) -> usize {
        self.sets.len()
    }

    /// Number of ways per set.
    pub fn num_ways(&self) -> usize {
        self.num_ways
    }

    /// Probes `set_index` for `tag` within `ways`, installing it on a miss.
    ///
    /// The whole operation, including aging the set, happens under the
    /// set's lock.
    ///
    /// # Errors
    ///
    /// - [`AccessError::SetOutOfRange`] if `set_index >= num_sets()`
    /// - [`AccessError::EmptyWayRange`] if `ways` holds no way
    /// - [`AccessError::WayRangeOutOfBounds`] if `ways.end > num_ways()`
    ///
    /// Nothing is modified when an error is returned.
    pub fn access(
        &self,
        set_index: usize,
        tag: u64,
        ways: WayRange,
    ) -> Result<AccessResult, AccessError> {
        self.check_ways(ways)?;
        let set = self.set(set_index)?;
        let result = set.lock().access(tag, ways);
        Ok(result)
    }

    /// Copies the lines of one set.
    pub fn lines(&self, set_index: usize) -> Result<Vec<CacheLine>, AccessError> {
        self.with_set(set_index, <[CacheLine]>::to_vec)
    }

    /// Runs `f` on the lines of one set while holding its lock.
    ///
    /// Use this to inspect a set without copying it. The lock is released
    /// when `f` returns.
    pub fn with_set<F, R>(&self, set_index: usize, f: F) -> Result<R, AccessError>
    where
        F: FnOnce(&[CacheLine]) -> R,
    {
        let set = self.set(set_index)?;
        let guard = set.lock();
        Ok(f(guard.lines()))
    }

    /// Counters of one set.
    pub fn set_metrics(&self, set_index: usize) -> Result<SetMetrics, AccessError> {
        let set = self.set(set_index)?;
        let metrics = *set.lock().metrics();
        Ok(metrics)
    }

    /// Counters summed over every set.
    ///
    /// Sets are locked one after another, so under concurrent traffic the
    /// total is not a single point-in-time snapshot.
    pub fn total_metrics(&self) -> SetMetrics {
        let mut total = SetMetrics::default();
        for set in self.sets.iter() {
            total.merge(set.lock().metrics());
        }
        total
    }

    /// Number of valid lines across all sets.
    pub fn valid_lines(&self) -> usize {
        self.sets.iter().map(|s| s.lock().valid_lines()).sum()
    }

    /// Invalidates every line and resets the counters.
    pub fn clear(&self) {
        for set in self.sets.iter() {
            set.lock().clear();
        }
    }

    fn set(&self, set_index: usize) -> Result<&Mutex<CacheSet>, AccessError> {
        self.sets.get(set_index).ok_or(AccessError::SetOutOfRange {
            set_index,
            num_sets: self.sets.len(),
        })
    }

    fn check_ways(&self, ways: WayRange) -> Result<(), AccessError> {
        if ways.is_empty() {
            return Err(AccessError::EmptyWayRange(ways));
        }
        if ways.end > self.num_ways {
            return Err(AccessError::WayRangeOutOfBounds {
                range: ways,
                num_ways: self.num_ways,
            });
        }
        Ok(())
    }
}

impl CacheMetrics for PartitionedCache {
    fn metrics(&self) -> BTreeMap<String, f64> {
        self.total_metrics().to_btreemap()
    }

    fn algorithm_name(&self) -> &'static str {
        "PartitionedLRU"
    }
}

impl core::fmt::Debug for PartitionedCache {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PartitionedCache")
            .field("num_sets", &self.sets.len())
            .field("num_ways", &self.num_ways)
            .field("valid_lines", &self.valid_lines())
            .finish()
    }
}
