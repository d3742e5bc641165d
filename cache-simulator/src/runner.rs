//! Simulation runner for the partitioned cache
//!
//! A [`SimulationDriver`] owns one run. It validates a [`SimulationConfig`],
//! builds one address source per core, then starts one OS thread per core
//! (named `core-{id}`). Every worker issues its accesses against a single
//! shared [`PartitionedCache`] restricted to its own way range, counting hits
//! and misses locally. The driver joins all workers before it aggregates the
//! counters into a [`Report`].
//!
//! ```text
//! Created --configure--> Configured --run--> Running --> Completed
//!                                               |
//!                                               +------> Aborted
//! ```
//!
//! Workers check a shared [`CancellationToken`] between batches. A worker
//! that fails raises the same token so that its siblings stop early.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use partitioned_cache::config::PartitionedCacheConfig;
use partitioned_cache::{ConfigError, Partition, PartitionedCache, WayRange};
use tracing::{debug, info, warn};

use crate::error::SimulationError;
use crate::generator::{build_sources, AddressSource};
use crate::models::{DriverState, PerCoreCounters, Report, SimulationConfig};

/// Cooperative stop flag shared between a driver, its workers, and any
/// caller holding a clone.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Runs one simulation from configuration to report.
pub struct SimulationDriver {
    state: DriverState,
    config: Option<SimulationConfig>,
    partition: Option<Partition>,
    sources: Vec<Box<dyn AddressSource>>,
    cancel: CancellationToken,
    cache: Option<Arc<PartitionedCache>>,
    report: Option<Report>,
    elapsed: Option<Duration>,
}

impl Default for SimulationDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulationDriver {
    pub fn new() -> Self {
        Self {
            state: DriverState::Created,
            config: None,
            partition: None,
            sources: Vec::new(),
            cancel: CancellationToken::new(),
            cache: None,
            report: None,
            elapsed: None,
        }
    }

    /// Validate `config` and build its address sources.
    ///
    /// Only valid in [`DriverState::Created`]. A rejected configuration
    /// leaves the driver in `Created`.
    pub fn configure(&mut self, config: SimulationConfig) -> Result<(), SimulationError> {
        self.expect_state(DriverState::Created)?;
        let partition = config.validate()?;
        let sources = build_sources(&config)?;
        self.install(config, partition, sources);
        Ok(())
    }

    /// Like [`configure`](Self::configure), but core `i` reads its addresses
    /// from `sources[i]`. The configured pattern is ignored.
    ///
    /// An injected source that yields an address outside
    /// `[0, address_space_size)` aborts the run with
    /// [`ConfigError::AddressOutOfRange`].
    pub fn configure_with_sources(
        &mut self,
        config: SimulationConfig,
        sources: Vec<Box<dyn AddressSource>>,
    ) -> Result<(), SimulationError> {
        self.expect_state(DriverState::Created)?;
        let partition = config.validate()?;
        if sources.len() != config.num_cores {
            return Err(ConfigError::CountMismatch {
                what: "address sources",
                cores: config.num_cores,
                actual: sources.len(),
            }
            .into());
        }
        self.install(config, partition, sources);
        Ok(())
    }

    fn install(
        &mut self,
        config: SimulationConfig,
        partition: Partition,
        sources: Vec<Box<dyn AddressSource>>,
    ) {
        info!(
            cores = config.num_cores,
            sets = config.num_sets,
            ways = config.num_ways,
            accesses_per_core = config.accesses_per_core,
            pattern = %config.pattern,
            seed = config.seed,
            "simulation configured"
        );
        self.config = Some(config);
        self.partition = Some(partition);
        self.sources = sources;
        self.state = DriverState::Configured;
    }

    /// Run every worker to completion and aggregate the report.
    ///
    /// Only valid in [`DriverState::Configured`]. Any failure leaves the
    /// driver in [`DriverState::Aborted`] without a report.
    pub fn run(&mut self) -> Result<&Report, SimulationError> {
        self.expect_state(DriverState::Configured)?;
        let (Some(config), Some(partition)) = (self.config.as_ref(), self.partition.as_ref())
        else {
            return Err(self.invalid_state(DriverState::Configured));
        };
        let ranges = partition.ranges().to_vec();
        let accesses = config.accesses_per_core;
        let batch_size = config.batch_size;
        let address_space_size = config.address_space_size;

        let cache = match PartitionedCacheConfig::try_new(config.num_sets, config.num_ways) {
            Ok(cache_config) => Arc::new(PartitionedCache::init(cache_config)),
            Err(err) => {
                self.state = DriverState::Aborted;
                return Err(err.into());
            }
        };
        self.cache = Some(Arc::clone(&cache));
        self.state = DriverState::Running;
        info!(
            cores = ranges.len(),
            seed = config.seed,
            batch_size,
            "simulation started"
        );

        let start = Instant::now();
        let workers = std::mem::take(&mut self.sources)
            .into_iter()
            .zip(&ranges)
            .enumerate()
            .map(|(core_id, (source, &ways))| Worker {
                core_id,
                ways,
                source,
                accesses,
                batch_size,
                address_space_size,
                num_sets: cache.num_sets() as u64,
                cache: Arc::clone(&cache),
                cancel: self.cancel.clone(),
            });
        let outcome = run_workers(workers, &self.cancel);
        let elapsed = start.elapsed();
        self.elapsed = Some(elapsed);

        match outcome {
            Ok(counters) => {
                let report = Report::from_counters(&ranges, &counters);
                info!(
                    hits = report.total_hits,
                    misses = report.total_misses,
                    hit_rate = report.overall_hit_rate,
                    elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
                    "simulation completed"
                );
                self.state = DriverState::Completed;
                Ok(self.report.insert(report))
            }
            Err(err) => {
                warn!(error = %err, "simulation aborted");
                self.state = DriverState::Aborted;
                Err(err)
            }
        }
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn config(&self) -> Option<&SimulationConfig> {
        self.config.as_ref()
    }

    pub fn partition(&self) -> Option<&Partition> {
        self.partition.as_ref()
    }

    /// The report of a completed run.
    pub fn report(&self) -> Option<&Report> {
        self.report.as_ref()
    }

    /// Wall-clock time spent running workers.
    pub fn elapsed(&self) -> Option<Duration> {
        self.elapsed
    }

    /// The cache of the last run, kept for inspecting its final contents
    /// and metrics.
    pub fn cache(&self) -> Option<&PartitionedCache> {
        self.cache.as_deref()
    }

    /// A handle that stops the run when cancelled, from any thread.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    fn expect_state(&self, expected: DriverState) -> Result<(), SimulationError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(self.invalid_state(expected))
        }
    }

    fn invalid_state(&self, expected: DriverState) -> SimulationError {
        SimulationError::InvalidState {
            expected,
            actual: self.state,
        }
    }
}

/// Everything one core's thread needs.
struct Worker {
    core_id: usize,
    ways: WayRange,
    source: Box<dyn AddressSource>,
    accesses: u64,
    batch_size: usize,
    address_space_size: u64,
    num_sets: u64,
    cache: Arc<PartitionedCache>,
    cancel: CancellationToken,
}

impl Worker {
    fn run(mut self) -> Result<PerCoreCounters, SimulationError> {
        debug!(core = self.core_id, ways = %self.ways, "worker started");
        let mut counters = PerCoreCounters::default();
        let mut batch = Vec::with_capacity(self.batch_size);
        let mut remaining = self.accesses;

        while remaining > 0 {
            if self.cancel.is_cancelled() {
                debug!(core = self.core_id, remaining, "worker cancelled");
                return Err(SimulationError::Cancelled);
            }

            let len = remaining.min(self.batch_size as u64) as usize;
            batch.clear();
            batch.extend((0..len).map(|_| self.source.next_address()));

            for &address in &batch {
                if address >= self.address_space_size {
                    self.cancel.cancel();
                    return Err(ConfigError::AddressOutOfRange {
                        address,
                        address_space_size: self.address_space_size,
                    }
                    .into());
                }
                let set_index = (address % self.num_sets) as usize;
                let tag = address / self.num_sets;
                let result = self
                    .cache
                    .access(set_index, tag, self.ways)
                    .map_err(|source| {
                        self.cancel.cancel();
                        SimulationError::Access {
                            core_id: self.core_id,
                            source,
                        }
                    })?;
                counters.record(&result);
            }
            remaining -= len as u64;
        }

        debug!(
            core = self.core_id,
            hits = counters.hits,
            misses = counters.misses,
            "worker finished"
        );
        Ok(counters)
    }
}

/// Start one named thread per worker and join all of them.
///
/// On failure the first error that is not a plain cancellation wins, so the
/// caller sees the cause rather than the siblings it stopped.
fn run_workers(
    workers: impl Iterator<Item = Worker>,
    cancel: &CancellationToken,
) -> Result<Vec<PerCoreCounters>, SimulationError> {
    let mut handles: Vec<JoinHandle<Result<PerCoreCounters, SimulationError>>> = Vec::new();
    let mut failure = None;

    for worker in workers {
        let core_id = worker.core_id;
        let spawned = thread::Builder::new()
            .name(format!("core-{core_id}"))
            .spawn(move || worker.run());
        match spawned {
            Ok(handle) => handles.push(handle),
            Err(source) => {
                cancel.cancel();
                failure = Some(SimulationError::Spawn { core_id, source });
                break;
            }
        }
    }

    let mut counters = Vec::with_capacity(handles.len());
    for (core_id, handle) in handles.into_iter().enumerate() {
        let result = handle.join().unwrap_or_else(|_| {
            cancel.cancel();
            Err(SimulationError::WorkerPanicked { core_id })
        });
        match result {
            Ok(core_counters) => counters.push(core_counters),
            Err(err) => {
                failure = match failure {
                    None | Some(SimulationError::Cancelled) => Some(err),
                    kept => kept,
                };
            }
        }
    }

    match failure {
        Some(err) => Err(err),
        None => Ok(counters),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::TraceAddressSource;
    use crate::models::AddressPattern;
    use std::sync::Mutex;

    fn config(num_cores: usize, accesses_per_core: u64) -> SimulationConfig {
        SimulationConfig {
            num_cores,
            num_sets: 8,
            num_ways: 8,
            partition_widths: vec![8 / num_cores; num_cores],
            accesses_per_core,
            address_space_size: 1024,
            seed: 12345,
            batch_size: 10,
            pattern: AddressPattern::Uniform,
        }
    }

    fn run(config: SimulationConfig) -> Report {
        let mut driver = SimulationDriver::new();
        driver.configure(config).unwrap();
        driver.run().unwrap().clone()
    }

    fn trace(addresses: &[u64], address_space_size: u64) -> Box<dyn AddressSource> {
        Box::new(TraceAddressSource::new(addresses.to_vec(), address_space_size).unwrap())
    }

    /// Cancels a token after handing out `after` addresses.
    struct CancelAfter {
        token: CancellationToken,
        after: u64,
        issued: u64,
    }

    impl AddressSource for CancelAfter {
        fn next_address(&mut self) -> u64 {
            self.issued += 1;
            if self.issued == self.after {
                self.token.cancel();
            }
            0
        }
    }

    struct Panicking;

    impl AddressSource for Panicking {
        fn next_address(&mut self) -> u64 {
            panic!("source failed");
        }
    }

    /// Records the name of the thread that pulls from it.
    struct NameRecorder(Arc<Mutex<Vec<String>>>);

    impl AddressSource for NameRecorder {
        fn next_address(&mut self) -> u64 {
            let name = thread::current().name().unwrap_or_default().to_string();
            let mut names = self.0.lock().unwrap();
            if !names.contains(&name) {
                names.push(name);
            }
            0
        }
    }

    #[test]
    fn test_totals_match_configured_accesses() {
        let report = run(config(4, 5_000));
        assert_eq!(report.total_accesses(), 20_000);
        assert_eq!(report.cores.len(), 4);
        for core in &report.cores {
            assert_eq!(core.hits + core.misses, 5_000);
            assert_eq!(core.ways().len(), 2);
        }
    }

    #[test]
    fn test_same_seed_gives_identical_reports() {
        let first = run(config(4, 20_000));
        let second = run(config(4, 20_000));
        assert_eq!(first, second);

        let mut other_seed = config(4, 20_000);
        other_seed.seed += 1;
        assert_ne!(run(other_seed), first);
    }

    #[test]
    fn test_batch_size_does_not_change_results() {
        let reference = run(config(2, 3_000));
        for batch_size in [1, 7, 10_000] {
            let mut cfg = config(2, 3_000);
            cfg.batch_size = batch_size;
            assert_eq!(run(cfg), reference, "batch size {batch_size}");
        }
    }

    #[test]
    fn test_injected_trace_scenario() {
        let mut cfg = config(2, 3);
        cfg.num_sets = 1;
        cfg.num_ways = 2;
        cfg.partition_widths = vec![1, 1];

        let mut driver = SimulationDriver::new();
        driver
            .configure_with_sources(cfg, vec![trace(&[5, 5, 7], 1024), trace(&[9], 1024)])
            .unwrap();
        let report = driver.run().unwrap();

        // Core 0: miss, hit, miss. Core 1 replays one address: miss, hit, hit.
        assert_eq!((report.cores[0].hits, report.cores[0].misses), (1, 2));
        assert_eq!((report.cores[1].hits, report.cores[1].misses), (2, 1));
        assert_eq!(report.total_hits, 3);

        let lines = driver.cache().unwrap().lines(0).unwrap();
        assert_eq!(lines[0].tag(), Some(7));
        assert_eq!(lines[1].tag(), Some(9));
    }

    #[test]
    fn test_state_transitions() {
        let mut driver = SimulationDriver::new();
        assert_eq!(driver.state(), DriverState::Created);
        assert!(matches!(
            driver.run(),
            Err(SimulationError::InvalidState {
                expected: DriverState::Configured,
                actual: DriverState::Created
            })
        ));

        driver.configure(config(2, 100)).unwrap();
        assert_eq!(driver.state(), DriverState::Configured);
        assert!(matches!(
            driver.configure(config(2, 100)),
            Err(SimulationError::InvalidState { .. })
        ));

        driver.run().unwrap();
        assert_eq!(driver.state(), DriverState::Completed);
        assert!(matches!(
            driver.run(),
            Err(SimulationError::InvalidState {
                actual: DriverState::Completed,
                ..
            })
        ));

        // The report stays readable.
        assert_eq!(driver.report().unwrap().total_accesses(), 200);
        assert_eq!(driver.report(), driver.report());
        assert!(driver.elapsed().is_some());
    }

    #[test]
    fn test_rejected_config_stays_created() {
        let mut driver = SimulationDriver::new();
        let mut cfg = config(4, 100);
        cfg.partition_widths = vec![2, 2, 2, 3];

        let err = driver.configure(cfg).unwrap_err();
        assert!(matches!(
            err,
            SimulationError::Config(ConfigError::WaysExceeded { .. })
        ));
        assert_eq!(driver.state(), DriverState::Created);
        assert!(driver.cache().is_none());

        driver.configure(config(4, 100)).unwrap();
        assert_eq!(driver.state(), DriverState::Configured);
    }

    #[test]
    fn test_zero_fields_are_rejected_before_running() {
        for field in ["num_cores", "num_sets", "accesses_per_core"] {
            let mut cfg = config(2, 100);
            match field {
                "num_cores" => cfg.num_cores = 0,
                "num_sets" => cfg.num_sets = 0,
                _ => cfg.accesses_per_core = 0,
            }

            let mut driver = SimulationDriver::new();
            let err = driver.configure(cfg).unwrap_err();
            assert!(
                matches!(err, SimulationError::Config(ConfigError::Zero(f)) if f == field),
                "{field}: {err}"
            );
            assert_eq!(driver.state(), DriverState::Created);
        }
    }

    #[test]
    fn test_hot_set_over_huge_address_space() {
        let mut cfg = config(2, 1_000);
        cfg.address_space_size = 1 << 62;
        cfg.pattern = AddressPattern::HotSet {
            hot_set_percent: 20,
            hot_traffic_percent: 80,
        };

        let mut driver = SimulationDriver::new();
        driver.configure(cfg).unwrap();
        assert_eq!(driver.run().unwrap().total_accesses(), 2_000);
    }

    #[test]
    fn test_injected_address_outside_space_aborts() {
        let mut driver = SimulationDriver::new();
        // The second source replays addresses valid for a larger space.
        driver
            .configure_with_sources(
                config(2, 100),
                vec![trace(&[1, 2, 3], 1024), trace(&[5, 4096], 8192)],
            )
            .unwrap();

        let err = driver.run().unwrap_err();
        assert!(matches!(
            err,
            SimulationError::Config(ConfigError::AddressOutOfRange {
                address: 4096,
                address_space_size: 1024
            })
        ));
        assert_eq!(driver.state(), DriverState::Aborted);
    }

    #[test]
    fn test_source_count_must_match_cores() {
        let mut driver = SimulationDriver::new();
        let err = driver
            .configure_with_sources(config(2, 10), vec![trace(&[1], 1024)])
            .unwrap_err();
        assert!(matches!(
            err,
            SimulationError::Config(ConfigError::CountMismatch {
                what: "address sources",
                cores: 2,
                actual: 1
            })
        ));
    }

    #[test]
    fn test_cancel_before_run_aborts() {
        let mut driver = SimulationDriver::new();
        driver.configure(config(2, 1_000)).unwrap();
        driver.cancellation_token().cancel();

        assert!(matches!(driver.run(), Err(SimulationError::Cancelled)));
        assert_eq!(driver.state(), DriverState::Aborted);
        assert!(driver.report().is_none());
    }

    #[test]
    fn test_cancel_during_run_stops_between_batches() {
        let mut driver = SimulationDriver::new();
        let token = driver.cancellation_token();
        let mut cfg = config(1, 1_000_000);
        cfg.partition_widths = vec![8];
        driver
            .configure_with_sources(
                cfg,
                vec![Box::new(CancelAfter {
                    token,
                    after: 25,
                    issued: 0,
                })],
            )
            .unwrap();

        assert!(matches!(driver.run(), Err(SimulationError::Cancelled)));
        assert_eq!(driver.state(), DriverState::Aborted);
        // The batch holding the 25th address completes before the check.
        let accesses = driver.cache().unwrap().total_metrics().accesses;
        assert_eq!(accesses, 30);
    }

    #[test]
    fn test_worker_panic_is_reported() {
        let mut driver = SimulationDriver::new();
        driver
            .configure_with_sources(
                config(2, 100),
                vec![trace(&[1, 2, 3], 1024), Box::new(Panicking)],
            )
            .unwrap();

        assert!(matches!(
            driver.run(),
            Err(SimulationError::WorkerPanicked { core_id: 1 })
        ));
        assert_eq!(driver.state(), DriverState::Aborted);
    }

    #[test]
    fn test_workers_run_on_named_threads() {
        let names = Arc::new(Mutex::new(Vec::new()));
        let sources: Vec<Box<dyn AddressSource>> = (0..2)
            .map(|_| Box::new(NameRecorder(Arc::clone(&names))) as Box<dyn AddressSource>)
            .collect();

        let mut driver = SimulationDriver::new();
        driver.configure_with_sources(config(2, 5), sources).unwrap();
        driver.run().unwrap();

        let mut names = names.lock().unwrap().clone();
        names.sort();
        assert_eq!(names, vec!["core-0".to_string(), "core-1".to_string()]);
    }
}
