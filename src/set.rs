//! A single cache set and its replacement policy.
//!
//! [`CacheSet`] is the unit of mutual exclusion in
//! [`PartitionedCache`](crate::PartitionedCache): every method takes
//! `&mut self` and the owning cache wraps each set in its own lock.
//!
//! # Access algorithm
//!
//! For an access to `tag` restricted to ways `[start, end)`:
//!
//! 1. Probe the range for a valid line holding `tag`. On a hit the line is
//!    reset to recency 0.
//! 2. On a miss pick a victim inside the range: the first invalid way if
//!    there is one, otherwise the valid way with the largest recency
//!    (lowest way index wins a tie). The tag is installed there.
//! 3. Age every valid line of the whole set by one, including lines owned
//!    by other partitions.
//!
//! Step 3 is the only cross-partition side effect. It shifts every valid
//! line by the same amount, so it never changes which line of a range is
//! the least recently used.

use crate::line::CacheLine;
use crate::metrics::SetMetrics;
use crate::partition::WayRange;

/// Outcome of one access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessResult {
    /// The tag was resident in `way`.
    Hit {
        /// Way that held the tag.
        way: usize,
    },
    /// The tag was missing and has been installed in `way`.
    Miss {
        /// Way that received the tag.
        way: usize,
        /// Tag displaced from `way`, if it was valid.
        evicted: Option<u64>,
    },
}

impl AccessResult {
    /// Returns `true` for a hit.
    #[inline]
    pub fn is_hit(&self) -> bool {
        matches!(self, AccessResult::Hit { .. })
    }

    /// Returns `true` for a miss.
    #[inline]
    pub fn is_miss(&self) -> bool {
        !self.is_hit()
    }

    /// Way that now holds the accessed tag.
    #[inline]
    pub fn way(&self) -> usize {
        match *self {
            AccessResult::Hit { way } | AccessResult::Miss { way, .. } => way,
        }
    }
}

/// The lines of one set plus the set's counters.
#[derive(Debug, Clone)]
pub(crate) struct CacheSet {
    lines: Box<[CacheLine]>,
    metrics: SetMetrics,
}

impl CacheSet {
    pub(crate) fn new(num_ways: usize) -> Self {
        Self {
            lines: vec![CacheLine::empty(); num_ways].into_boxed_slice(),
            metrics: SetMetrics::default(),
        }
    }

    /// Runs the probe-or-install algorithm. `ways` must already be checked
    /// against the set's width.
    pub(crate) fn access(&mut self, tag: u64, ways: WayRange) -> AccessResult {
        debug_assert!(!ways.is_empty() && ways.end <= self.lines.len());

        let result = match self.find(tag, ways) {
            Some(way) => {
                self.lines[way].touch();
                self.metrics.record_hit();
                AccessResult::Hit { way }
            }
            None => {
                let way = self.select_victim(ways);
                let evicted = self.lines[way].install(tag);
                self.metrics.record_miss(evicted.is_some());
                AccessResult::Miss { way, evicted }
            }
        };

        for line in self.lines.iter_mut() {
            line.age();
        }

        result
    }

    fn find(&self, tag: u64, ways: WayRange) -> Option<usize> {
        ways.iter().find(|&way| self.lines[way].matches(tag))
    }

    /// First invalid way, else the least recently used valid way with ties
    /// going to the lowest index.
    fn select_victim(&self, ways: WayRange) -> usize {
        if let Some(way) = ways.iter().find(|&way| !self.lines[way].is_valid()) {
            return way;
        }

        let mut victim = ways.start;
        for way in ways.iter().skip(1) {
            if self.lines[way].recency() > self.lines[victim].recency() {
                victim = way;
            }
        }
        victim
    }

    pub(crate) fn lines(&self) -> &[CacheLine] {
        &self.lines
    }

    pub(crate) fn metrics(&self) -> &SetMetrics {
        &self.metrics
    }

    pub(crate) fn valid_lines(&self) -> usize {
        self.lines.iter().filter(|line| line.is_valid()).count()
    }

    pub(crate) fn clear(&mut self) {
        for line in self.lines.iter_mut() {
            line.invalidate();
        }
        self.metrics = SetMetrics::default();
    }
}
