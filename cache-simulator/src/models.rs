// Data models for the partitioned cache simulation

use eyre::WrapErr;
use partitioned_cache::{AccessResult, ConfigError, Partition, WayRange};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// How worker addresses are produced.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AddressPattern {
    /// Uniform over the whole address space.
    #[default]
    Uniform,
    /// `hot_traffic_percent` of accesses land in the first
    /// `hot_set_percent` of the address space.
    HotSet {
        hot_set_percent: u8,
        hot_traffic_percent: u8,
    },
    /// Replay a recorded `core,address` CSV trace.
    Trace { path: PathBuf },
}

impl AddressPattern {
    pub fn as_str(&self) -> &'static str {
        match self {
            AddressPattern::Uniform => "uniform",
            AddressPattern::HotSet { .. } => "hot_set",
            AddressPattern::Trace { .. } => "trace",
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if let AddressPattern::HotSet {
            hot_set_percent,
            hot_traffic_percent,
        } = *self
        {
            check_percent("hot_set_percent", hot_set_percent)?;
            check_percent("hot_traffic_percent", hot_traffic_percent)?;
        }
        Ok(())
    }
}

impl fmt::Display for AddressPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

fn check_percent(field: &'static str, value: u8) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::Zero(field));
    }
    if value > 100 {
        return Err(ConfigError::OutOfRange {
            field,
            value: u64::from(value),
            max: 100,
        });
    }
    Ok(())
}

/// Parameters of one simulation run. Every field must be given.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Number of simulated cores, one worker thread each.
    pub num_cores: usize,
    /// Number of sets in the shared cache.
    pub num_sets: usize,
    /// Ways per set.
    pub num_ways: usize,
    /// Ways owned by each core, assigned left to right.
    pub partition_widths: Vec<usize>,
    /// Accesses issued by every core.
    pub accesses_per_core: u64,
    /// Addresses are drawn from `[0, address_space_size)`.
    pub address_space_size: u64,
    /// Base seed; core `i` uses `seed + i`.
    pub seed: u64,
    /// Addresses pulled from a source per batch.
    pub batch_size: usize,
    /// Address pattern, uniform when omitted from a config file.
    #[serde(default)]
    pub pattern: AddressPattern,
}

impl SimulationConfig {
    /// Load a configuration from a TOML file.
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> eyre::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .wrap_err_with(|| format!("cannot read config file {}", path.display()))?;
        let config = toml::from_str(&content)
            .wrap_err_with(|| format!("cannot parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Render as TOML, in the format [`from_toml_file`](Self::from_toml_file) reads.
    pub fn to_toml_string(&self) -> eyre::Result<String> {
        toml::to_string(self).wrap_err("cannot serialize config")
    }

    /// Check every field and build the way partition.
    pub fn validate(&self) -> Result<Partition, ConfigError> {
        let positive = [
            ("num_cores", self.num_cores as u64),
            ("num_sets", self.num_sets as u64),
            ("num_ways", self.num_ways as u64),
            ("accesses_per_core", self.accesses_per_core),
            ("address_space_size", self.address_space_size),
            ("batch_size", self.batch_size as u64),
        ];
        if let Some((field, _)) = positive.iter().find(|(_, value)| *value == 0) {
            return Err(ConfigError::Zero(field));
        }

        if self.partition_widths.len() != self.num_cores {
            return Err(ConfigError::CountMismatch {
                what: "partition widths",
                cores: self.num_cores,
                actual: self.partition_widths.len(),
            });
        }
        self.pattern.validate()?;

        Partition::from_widths(&self.partition_widths, self.num_ways)
    }

    /// Seed used by the address source of `core_id`.
    pub fn core_seed(&self, core_id: usize) -> u64 {
        self.seed.wrapping_add(core_id as u64)
    }
}

/// Lifecycle of a [`SimulationDriver`](crate::runner::SimulationDriver).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DriverState {
    Created,
    Configured,
    Running,
    Completed,
    /// The run failed or was cancelled. Terminal.
    Aborted,
}

impl DriverState {
    pub fn as_str(&self) -> &'static str {
        match self {
            DriverState::Created => "Created",
            DriverState::Configured => "Configured",
            DriverState::Running => "Running",
            DriverState::Completed => "Completed",
            DriverState::Aborted => "Aborted",
        }
    }
}

impl fmt::Display for DriverState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Hit rate as a fraction in `[0, 1]`, zero when nothing was accessed.
pub fn hit_rate(hits: u64, misses: u64) -> f64 {
    let total = hits + misses;
    if total == 0 {
        0.0
    } else {
        hits as f64 / total as f64
    }
}

/// Counters owned by one worker until it is joined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PerCoreCounters {
    pub hits: u64,
    pub misses: u64,
}

impl PerCoreCounters {
    pub fn record(&mut self, result: &AccessResult) {
        if result.is_hit() {
            self.hits += 1;
        } else {
            self.misses += 1;
        }
    }

    pub fn accesses(&self) -> u64 {
        self.hits + self.misses
    }

    pub fn hit_rate(&self) -> f64 {
        hit_rate(self.hits, self.misses)
    }
}

/// Outcome of one core.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoreReport {
    pub core_id: usize,
    /// First way owned by the core.
    pub way_start: usize,
    /// One past the last way owned by the core.
    pub way_end: usize,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
}

impl CoreReport {
    pub fn ways(&self) -> WayRange {
        WayRange::new(self.way_start, self.way_end)
    }
}

/// Immutable result of a completed run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub cores: Vec<CoreReport>,
    pub total_hits: u64,
    pub total_misses: u64,
    pub overall_hit_rate: f64,
}

impl Report {
    /// Aggregate per-core counters, listed in core order.
    pub fn from_counters(ranges: &[WayRange], counters: &[PerCoreCounters]) -> Self {
        let cores: Vec<CoreReport> = ranges
            .iter()
            .zip(counters)
            .enumerate()
            .map(|(core_id, (ways, counters))| CoreReport {
                core_id,
                way_start: ways.start,
                way_end: ways.end,
                hits: counters.hits,
                misses: counters.misses,
                hit_rate: counters.hit_rate(),
            })
            .collect();
        let total_hits = cores.iter().map(|c| c.hits).sum();
        let total_misses = cores.iter().map(|c| c.misses).sum();

        Self {
            cores,
            total_hits,
            total_misses,
            overall_hit_rate: hit_rate(total_hits, total_misses),
        }
    }

    pub fn total_accesses(&self) -> u64 {
        self.total_hits + self.total_misses
    }
}

/// One record of a CSV address trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceRecord {
    pub core: usize,
    pub address: u64,
}

/// CSV row for exporting results
#[derive(Debug, Serialize)]
pub struct CsvResultRow {
    /// Core id, or `total` for the aggregate row
    pub core: String,
    /// Way range such as `[0, 2)`, empty for the aggregate row
    pub ways: String,
    pub hits: u64,
    pub misses: u64,
    /// Percentage in `[0, 100]`
    pub hit_rate: f64,
}
