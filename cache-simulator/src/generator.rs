//! Address generation for simulated cores
//!
//! Every worker pulls addresses from its own [`AddressSource`]. Synthetic
//! sources are seeded per core so that a run can be replayed exactly, and
//! [`TraceGenerator`] records the addresses a configuration would produce as
//! a CSV trace.

use crate::error::SimulationError;
use crate::input::{TraceAddressSource, TraceError, TraceReader};
use crate::models::{AddressPattern, SimulationConfig, TraceRecord};
use partitioned_cache::ConfigError;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fs;
use std::path::Path;
use tracing::info;

/// Produces the address stream of one simulated core.
///
/// Addresses must lie in `[0, address_space_size)` of the configuration the
/// source was built for.
pub trait AddressSource: Send {
    fn next_address(&mut self) -> u64;
}

impl<S: AddressSource + ?Sized> AddressSource for Box<S> {
    fn next_address(&mut self) -> u64 {
        (**self).next_address()
    }
}

/// Uniformly distributed addresses.
#[derive(Debug, Clone)]
pub struct UniformAddressSource {
    rng: StdRng,
    address_space_size: u64,
}

impl UniformAddressSource {
    pub fn new(seed: u64, address_space_size: u64) -> Result<Self, ConfigError> {
        if address_space_size == 0 {
            return Err(ConfigError::Zero("address_space_size"));
        }
        Ok(Self {
            rng: StdRng::seed_from_u64(seed),
            address_space_size,
        })
    }
}

impl AddressSource for UniformAddressSource {
    fn next_address(&mut self) -> u64 {
        self.rng.gen_range(0..self.address_space_size)
    }
}

/// Skewed addresses: a small hot region receives most of the traffic.
#[derive(Debug, Clone)]
pub struct HotSetAddressSource {
    rng: StdRng,
    address_space_size: u64,
    /// Addresses below this bound are hot. Never zero.
    hot_size: u64,
    hot_traffic_percent: u8,
}

impl HotSetAddressSource {
    pub fn new(
        seed: u64,
        address_space_size: u64,
        hot_set_percent: u8,
        hot_traffic_percent: u8,
    ) -> Result<Self, ConfigError> {
        if address_space_size == 0 {
            return Err(ConfigError::Zero("address_space_size"));
        }
        if hot_set_percent == 0 {
            return Err(ConfigError::Zero("hot_set_percent"));
        }
        if hot_set_percent > 100 || hot_traffic_percent > 100 {
            let (field, value) = if hot_set_percent > 100 {
                ("hot_set_percent", hot_set_percent)
            } else {
                ("hot_traffic_percent", hot_traffic_percent)
            };
            return Err(ConfigError::OutOfRange {
                field,
                value: u64::from(value),
                max: 100,
            });
        }

        // Widened so large address spaces cannot overflow; the quotient
        // never exceeds `address_space_size`.
        let hot_size = u128::from(address_space_size) * u128::from(hot_set_percent) / 100;
        let hot_size = u64::try_from(hot_size).unwrap_or(address_space_size).max(1);
        Ok(Self {
            rng: StdRng::seed_from_u64(seed),
            address_space_size,
            hot_size,
            hot_traffic_percent,
        })
    }

    pub fn hot_size(&self) -> u64 {
        self.hot_size
    }
}

impl AddressSource for HotSetAddressSource {
    fn next_address(&mut self) -> u64 {
        let hot = self.rng.gen_range(0..100u8) < self.hot_traffic_percent;
        if hot || self.hot_size == self.address_space_size {
            self.rng.gen_range(0..self.hot_size)
        } else {
            self.rng.gen_range(self.hot_size..self.address_space_size)
        }
    }
}

/// Build one address source per core for `config`.
///
/// Trace patterns read the whole file up front, so I/O and range errors
/// surface here instead of inside a worker.
pub fn build_sources(
    config: &SimulationConfig,
) -> Result<Vec<Box<dyn AddressSource>>, SimulationError> {
    let size = config.address_space_size;
    let mut sources: Vec<Box<dyn AddressSource>> = Vec::with_capacity(config.num_cores);

    match &config.pattern {
        AddressPattern::Uniform => {
            for core_id in 0..config.num_cores {
                let source = UniformAddressSource::new(config.core_seed(core_id), size)?;
                sources.push(Box::new(source));
            }
        }
        AddressPattern::HotSet {
            hot_set_percent,
            hot_traffic_percent,
        } => {
            for core_id in 0..config.num_cores {
                let source = HotSetAddressSource::new(
                    config.core_seed(core_id),
                    size,
                    *hot_set_percent,
                    *hot_traffic_percent,
                )?;
                sources.push(Box::new(source));
            }
        }
        AddressPattern::Trace { path } => {
            for addresses in TraceReader::new(path).read_per_core(config.num_cores)? {
                sources.push(Box::new(TraceAddressSource::new(addresses, size)?));
            }
        }
    }

    Ok(sources)
}

/// Writes the address stream of a configuration as a `core,address` CSV trace.
pub struct TraceGenerator {
    config: SimulationConfig,
}

impl TraceGenerator {
    pub fn new(config: SimulationConfig) -> Self {
        Self { config }
    }

    /// Write `accesses_per_core` records for every core, grouped by core.
    /// Returns the number of records written.
    pub fn generate<P: AsRef<Path>>(&self, path: P) -> Result<u64, SimulationError> {
        let path = path.as_ref();
        self.config.validate()?;
        let mut sources = build_sources(&self.config)?;

        let written = self.write(path, &mut sources)?;
        info!(
            path = %path.display(),
            records = written,
            pattern = %self.config.pattern,
            seed = self.config.seed,
            "wrote trace"
        );
        Ok(written)
    }

    fn write(
        &self,
        path: &Path,
        sources: &mut [Box<dyn AddressSource>],
    ) -> Result<u64, TraceError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut writer = csv::Writer::from_path(path)?;
        let mut written = 0;
        for (core, source) in sources.iter_mut().enumerate() {
            for _ in 0..self.config.accesses_per_core {
                writer.serialize(TraceRecord {
                    core,
                    address: source.next_address(),
                })?;
                written += 1;
            }
        }
        writer.flush()?;
        Ok(written)
    }
}
