//! Cache Metrics System
//!
//! Each cache set keeps a [`SetMetrics`] record that is updated while the
//! set's lock is held, so the counters are exact rather than sampled. The
//! [`CacheMetrics`] trait reports them as a `BTreeMap` so that key order is
//! stable across runs and exports.

use std::collections::BTreeMap;

/// Counters kept for one cache set.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SetMetrics {
    /// Accesses that probed the set.
    pub accesses: u64,

    /// Accesses that found their tag.
    pub hits: u64,

    /// Misses that installed into an invalid way.
    pub fills: u64,

    /// Misses that displaced a valid line.
    pub evictions: u64,
}

impl SetMetrics {
    /// Records an access that found its tag.
    pub fn record_hit(&mut self) {
        self.accesses += 1;
        self.hits += 1;
    }

    /// Records a miss. `evicted` tells whether a valid line was displaced.
    pub fn record_miss(&mut self, evicted: bool) {
        self.accesses += 1;
        if evicted {
            self.evictions += 1;
        } else {
            self.fills += 1;
        }
    }

    /// Misses recorded for the set.
    pub fn misses(&self) -> u64 {
        self.accesses - self.hits
    }

    /// Fraction of accesses that hit, or `0.0` before any access.
    pub fn hit_rate(&self) -> f64 {
        if self.accesses > 0 {
            self.hits as f64 / self.accesses as f64
        } else {
            0.0
        }
    }

    /// Adds another record into this one.
    pub fn merge(&mut self, other: &SetMetrics) {
        self.accesses += other.accesses;
        self.hits += other.hits;
        self.fills += other.fills;
        self.evictions += other.evictions;
    }

    /// Converts the counters to a `BTreeMap` for reporting.
    pub fn to_btreemap(&self) -> BTreeMap<String, f64> {
        let mut metrics = BTreeMap::new();

        metrics.insert("accesses".to_string(), self.accesses as f64);
        metrics.insert("evictions".to_string(), self.evictions as f64);
        metrics.insert("fills".to_string(), self.fills as f64);
        metrics.insert("hit_rate".to_string(), self.hit_rate());
        metrics.insert("hits".to_string(), self.hits as f64);
        metrics.insert("misses".to_string(), self.misses() as f64);

        metrics
    }
}

/// Common reporting interface for cache models.
pub trait CacheMetrics {
    /// Returns all metrics in deterministic key order.
    fn metrics(&self) -> BTreeMap<String, f64>;

    /// Short name of the cache model.
    fn algorithm_name(&self) -> &'static str;
}
