//! Cache Configuration Module
//!
//! Configuration structs have public fields for simple instantiation. The
//! geometry is expressed with `NonZeroUsize` so that a zero-sized cache
//! cannot be described at all.
//!
//! # Examples
//!
//! ```
//! use partitioned_cache::config::PartitionedCacheConfig;
//! use partitioned_cache::PartitionedCache;
//! use core::num::NonZeroUsize;
//!
//! // The reference geometry: 8 sets of 8 ways
//! let config = PartitionedCacheConfig {
//!     num_sets: NonZeroUsize::new(8).unwrap(),
//!     num_ways: NonZeroUsize::new(8).unwrap(),
//! };
//! let cache = PartitionedCache::init(config);
//! assert_eq!(cache.num_sets(), 8);
//! ```

use core::fmt;
use core::num::NonZeroUsize;

use crate::error::ConfigError;

/// Geometry of a [`PartitionedCache`](crate::PartitionedCache).
///
/// # Fields
///
/// - `num_sets`: number of sets; the set of an address is `address % num_sets`
/// - `num_ways`: associativity, shared out between cores by a
///   [`Partition`](crate::Partition)
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct PartitionedCacheConfig {
    /// Number of sets in the cache.
    pub num_sets: NonZeroUsize,
    /// Number of ways in every set.
    pub num_ways: NonZeroUsize,
}

impl PartitionedCacheConfig {
    /// Builds a config from plain integers.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Zero`] naming the first zero dimension.
    pub fn try_new(num_sets: usize, num_ways: usize) -> Result<Self, ConfigError> {
        Ok(Self {
            num_sets: NonZeroUsize::new(num_sets).ok_or(ConfigError::Zero("num_sets"))?,
            num_ways: NonZeroUsize::new(num_ways).ok_or(ConfigError::Zero("num_ways"))?,
        })
    }

    /// Total number of lines, `num_sets * num_ways`.
    pub fn total_lines(&self) -> usize {
        self.num_sets.get() * self.num_ways.get()
    }
}

impl fmt::Debug for PartitionedCacheConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PartitionedCacheConfig")
            .field("num_sets", &self.num_sets)
            .field("num_ways", &self.num_ways)
            .finish()
    }
}
