//! Thread-per-core driver for the way-partitioned shared cache.
//!
//! ```no_run
//! use cache_simulator::models::{AddressPattern, SimulationConfig};
//! use cache_simulator::runner::SimulationDriver;
//!
//! let mut driver = SimulationDriver::new();
//! driver.configure(SimulationConfig {
//!     num_cores: 4,
//!     num_sets: 8,
//!     num_ways: 8,
//!     partition_widths: vec![2, 2, 2, 2],
//!     accesses_per_core: 2_500_000,
//!     address_space_size: 1024,
//!     seed: 1,
//!     batch_size: 10,
//!     pattern: AddressPattern::Uniform,
//! })?;
//! let report = driver.run()?;
//! println!("overall hit rate: {:.4}", report.overall_hit_rate);
//! # Ok::<(), cache_simulator::error::SimulationError>(())
//! ```

pub mod error;
pub mod generator;
pub mod input;
pub mod models;
pub mod runner;
pub mod stats;
