//! Error types for the partitioned cache.
//!
//! Two categories exist and neither is retryable:
//!
//! - [`ConfigError`]: the cache geometry or the way partition is malformed.
//!   Raised while building a [`Partition`](crate::Partition) or validating a
//!   configuration, before any access is simulated.
//! - [`AccessError`]: a caller passed an out-of-range set index or way range
//!   to [`PartitionedCache::access`](crate::PartitionedCache::access). This is
//!   a bug in the caller, not a runtime condition.

use core::fmt;

use crate::partition::WayRange;

/// A malformed cache or partition configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A dimension that must be positive was zero.
    Zero(&'static str),
    /// A per-core list does not have one entry per core.
    CountMismatch {
        /// What the list holds, e.g. `"partition widths"`.
        what: &'static str,
        /// Number of cores.
        cores: usize,
        /// Number of entries provided.
        actual: usize,
    },
    /// A bounded value exceeds its maximum.
    OutOfRange {
        /// Field name.
        field: &'static str,
        /// Value given.
        value: u64,
        /// Largest accepted value.
        max: u64,
    },
    /// A core was given a partition with no ways.
    EmptyPartition {
        /// Core owning the empty partition.
        core_id: usize,
    },
    /// The partitions need more ways than each set has.
    WaysExceeded {
        /// Ways requested across all cores.
        requested: usize,
        /// Ways available per set.
        num_ways: usize,
    },
    /// A partition extends past the last way of the set.
    RangeOutOfBounds {
        /// Core owning the range.
        core_id: usize,
        /// The offending range.
        range: WayRange,
        /// Ways available per set.
        num_ways: usize,
    },
    /// Two cores were given ranges that share at least one way.
    Overlap {
        /// First core.
        first: usize,
        /// Second core.
        second: usize,
    },
    /// A trace contains an address outside the configured address space.
    AddressOutOfRange {
        /// The offending address.
        address: u64,
        /// Size of the address space.
        address_space_size: u64,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Zero(field) => write!(f, "{field} must be greater than zero"),
            ConfigError::CountMismatch {
                what,
                cores,
                actual,
            } => write!(f, "{actual} {what} given for {cores} cores"),
            ConfigError::OutOfRange { field, value, max } => {
                write!(f, "{field} is {value} but must be at most {max}")
            }
            ConfigError::EmptyPartition { core_id } => {
                write!(f, "core {core_id} has an empty partition")
            }
            ConfigError::WaysExceeded {
                requested,
                num_ways,
            } => write!(
                f,
                "partitions require {requested} ways but each set has {num_ways}"
            ),
            ConfigError::RangeOutOfBounds {
                core_id,
                range,
                num_ways,
            } => write!(
                f,
                "core {core_id} range {range} exceeds the {num_ways} ways of a set"
            ),
            ConfigError::Overlap { first, second } => {
                write!(f, "partitions of cores {first} and {second} overlap")
            }
            ConfigError::AddressOutOfRange {
                address,
                address_space_size,
            } => write!(
                f,
                "address {address} is outside the address space of size {address_space_size}"
            ),
        }
    }
}

impl std::error::Error for ConfigError {}

/// An invalid argument passed to [`PartitionedCache::access`](crate::PartitionedCache::access).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessError {
    /// The set index is not smaller than the number of sets.
    SetOutOfRange {
        /// Requested set.
        set_index: usize,
        /// Number of sets in the cache.
        num_sets: usize,
    },
    /// The way range contains no ways.
    EmptyWayRange(WayRange),
    /// The way range ends past the last way of the set.
    WayRangeOutOfBounds {
        /// Requested range.
        range: WayRange,
        /// Ways per set.
        num_ways: usize,
    },
}

impl fmt::Display for AccessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessError::SetOutOfRange {
                set_index,
                num_sets,
            } => write!(f, "set index {set_index} out of range for {num_sets} sets"),
            AccessError::EmptyWayRange(range) => write!(f, "way range {range} is empty"),
            AccessError::WayRangeOutOfBounds { range, num_ways } => {
                write!(f, "way range {range} exceeds {num_ways} ways")
            }
        }
    }
}

impl std::error::Error for AccessError {}
