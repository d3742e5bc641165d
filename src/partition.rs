//! Static way partitioning.
//!
//! Every core owns the same contiguous slice of ways in every set. Slices
//! never overlap and never extend past the last way:
//!
//! ```text
//!            way:  0   1   2   3   4   5   6   7
//!               ┌───────┬───────┬───────────┬───┐
//!   every set   │ core0 │ core1 │   core2   │   │  (way 7 unassigned)
//!               └───────┴───────┴───────────┴───┘
//!   widths = [2, 2, 3]  ->  [0,2) [2,4) [4,7)
//! ```
//!
//! [`Partition::from_widths`] lays cores out back to back (prefix sums of
//! the widths). [`Partition::from_ranges`] accepts explicit ranges and
//! rejects any layout where two cores share a way.

use core::fmt;
use core::ops::Range;

use crate::error::ConfigError;

/// A half-open range of way indices, `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WayRange {
    /// First way in the range.
    pub start: usize,
    /// One past the last way in the range.
    pub end: usize,
}

impl WayRange {
    /// Creates a range. Empty and reversed ranges are representable; the
    /// cache rejects them at access time.
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Number of ways in the range.
    pub const fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Returns `true` if the range contains no ways.
    pub const fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Returns `true` if `way` lies inside the range.
    pub const fn contains(&self, way: usize) -> bool {
        self.start <= way && way < self.end
    }

    /// Returns `true` if the two ranges share at least one way.
    pub const fn overlaps(&self, other: &WayRange) -> bool {
        !self.is_empty() && !other.is_empty() && self.start < other.end && other.start < self.end
    }

    /// Iterates the way indices in ascending order.
    pub fn iter(&self) -> Range<usize> {
        self.start..self.end
    }
}

impl From<Range<usize>> for WayRange {
    fn from(range: Range<usize>) -> Self {
        Self::new(range.start, range.end)
    }
}

impl fmt::Display for WayRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// Assignment of one [`WayRange`] per core, valid for every set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    ranges: Box<[WayRange]>,
    num_ways: usize,
}

impl Partition {
    /// Builds the canonical back-to-back layout: core `i` starts where core
    /// `i - 1` ends.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::Zero`] if `widths` is empty or `num_ways` is zero
    /// - [`ConfigError::EmptyPartition`] if any width is zero
    /// - [`ConfigError::WaysExceeded`] if the widths sum past `num_ways`
    ///
    /// # Example
    ///
    /// ```
    /// use partitioned_cache::{Partition, WayRange};
    ///
    /// let partition = Partition::from_widths(&[1, 3, 2], 8).unwrap();
    /// assert_eq!(partition.range(1), Some(WayRange::new(1, 4)));
    /// assert_eq!(partition.assigned_ways(), 6);
    ///
    /// assert!(Partition::from_widths(&[4, 4, 4], 8).is_err());
    /// ```
    pub fn from_widths(widths: &[usize], num_ways: usize) -> Result<Self, ConfigError> {
        if num_ways == 0 {
            return Err(ConfigError::Zero("num_ways"));
        }
        if widths.is_empty() {
            return Err(ConfigError::Zero("num_cores"));
        }

        let mut ranges = Vec::with_capacity(widths.len());
        let mut start = 0usize;
        for (core_id, &width) in widths.iter().enumerate() {
            if width == 0 {
                return Err(ConfigError::EmptyPartition { core_id });
            }
            let end = start.saturating_add(width);
            ranges.push(WayRange::new(start, end));
            start = end;
        }

        if start > num_ways {
            return Err(ConfigError::WaysExceeded {
                requested: start,
                num_ways,
            });
        }

        Ok(Self {
            ranges: ranges.into_boxed_slice(),
            num_ways,
        })
    }

    /// Builds a partition from explicit per-core ranges.
    ///
    /// Ranges need not be adjacent or sorted, but each must be non-empty,
    /// lie within `[0, num_ways)` and share no way with any other range.
    pub fn from_ranges(ranges: &[WayRange], num_ways: usize) -> Result<Self, ConfigError> {
        if num_ways == 0 {
            return Err(ConfigError::Zero("num_ways"));
        }
        if ranges.is_empty() {
            return Err(ConfigError::Zero("num_cores"));
        }

        for (core_id, range) in ranges.iter().enumerate() {
            if range.is_empty() {
                return Err(ConfigError::EmptyPartition { core_id });
            }
            if range.end > num_ways {
                return Err(ConfigError::RangeOutOfBounds {
                    core_id,
                    range: *range,
                    num_ways,
                });
            }
        }

        for (first, a) in ranges.iter().enumerate() {
            for (offset, b) in ranges[first + 1..].iter().enumerate() {
                if a.overlaps(b) {
                    return Err(ConfigError::Overlap {
                        first,
                        second: first + 1 + offset,
                    });
                }
            }
        }

        Ok(Self {
            ranges: ranges.into(),
            num_ways,
        })
    }

    /// Range owned by `core_id`, or `None` for an unknown core.
    pub fn range(&self, core_id: usize) -> Option<WayRange> {
        self.ranges.get(core_id).copied()
    }

    /// All ranges, indexed by core id.
    pub fn ranges(&self) -> &[WayRange] {
        &self.ranges
    }

    /// Number of cores in the partition.
    pub fn num_cores(&self) -> usize {
        self.ranges.len()
    }

    /// Ways per set the partition was validated against.
    pub fn num_ways(&self) -> usize {
        self.num_ways
    }

    /// Total ways handed out to cores.
    pub fn assigned_ways(&self) -> usize {
        self.ranges.iter().map(WayRange::len).sum()
    }
}
