#![doc = include_str!("../README.md")]
//!
//! ---
//!
//! # Code Reference
//!
//! ## Access Semantics
//!
//! ```text
//! access(set, tag, [start, end))
//!   │
//!   ├── tag valid in [start, end)? ──Yes──▶ recency := 0 ──────────────┐
//!   │                                                                   │
//!   No                                                                  │
//!   ▼                                                                   │
//!   invalid way in range? ──Yes──▶ install there ───────────────────────┤
//!   │                                                                   │
//!   No                                                                  │
//!   ▼                                                                   │
//!   evict max recency (lowest way on tie), install ─────────────────────┤
//!                                                                       ▼
//!                              age every valid line of the set by one
//! ```
//!
//! ## Quick Reference
//!
//! | Type | Description |
//! |------|-------------|
//! | [`PartitionedCache`] | Shared set/way grid, one lock per set |
//! | [`Partition`] | Per-core way ranges, validated for overlap |
//! | [`WayRange`] | Half-open `[start, end)` range of ways |
//! | [`CacheLine`] | One way-slot: valid bit, tag, recency |
//! | [`AccessResult`] | Hit or miss, with the way used and any evicted tag |
//!
//! ## Example
//!
//! ```rust
//! use partitioned_cache::{AccessResult, Partition, PartitionedCache};
//! use partitioned_cache::config::PartitionedCacheConfig;
//!
//! let config = PartitionedCacheConfig::try_new(1, 2).unwrap();
//! let cache = PartitionedCache::init(config);
//! let partition = Partition::from_widths(&[1, 1], 2).unwrap();
//! let core0 = partition.range(0).unwrap();
//!
//! assert!(cache.access(0, 5, core0).unwrap().is_miss());
//! assert!(cache.access(0, 5, core0).unwrap().is_hit());
//! assert_eq!(
//!     cache.access(0, 7, core0).unwrap(),
//!     AccessResult::Miss { way: 0, evicted: Some(5) },
//! );
//! ```
//!
//! ## Modules
//!
//! - [`concurrent`]: the shared cache with per-set locking
//! - [`partition`]: way ranges and per-core partitions
//! - [`line`]: cache line state
//! - [`config`]: cache geometry
//! - [`metrics`]: per-set counters and the reporting trait
//! - [`error`]: configuration and argument errors

#[cfg(test)]
extern crate scoped_threadpool;

/// Shared set-associative cache with one lock per set.
pub mod concurrent;

/// Cache geometry configuration.
pub mod config;

/// Configuration and argument errors.
pub mod error;

/// State of a single way-slot.
pub mod line;

/// Per-set counters and the [`CacheMetrics`](metrics::CacheMetrics) trait.
pub mod metrics;

/// Way ranges and static per-core partitions.
pub mod partition;

/// The per-set replacement algorithm. Internal; reached through
/// [`PartitionedCache`].
mod set;

pub use concurrent::PartitionedCache;
pub use config::PartitionedCacheConfig;
pub use error::{AccessError, ConfigError};
pub use line::CacheLine;
pub use metrics::{CacheMetrics, SetMetrics};
pub use partition::{Partition, WayRange};
pub use set::AccessResult;
