use cache_simulator::generator::TraceGenerator;
use cache_simulator::models::{AddressPattern, SimulationConfig};
use cache_simulator::runner::SimulationDriver;
use cache_simulator::stats::SimulationStats;
use clap::{Parser, Subcommand, ValueEnum};
use eyre::WrapErr;
use partitioned_cache::CacheMetrics;
use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Way-partitioned shared cache simulator CLI
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,

    /// Log filter such as `debug` or `cache_simulator=trace` (overrides RUST_LOG)
    #[arg(long, global = true, value_name = "FILTER")]
    log_level: Option<String>,
}

/// Subcommands for the CLI
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a simulation and print per-core hit rates
    Simulate {
        #[command(flatten)]
        params: SimulationArgs,

        /// Load the whole configuration from a TOML file instead of flags
        #[arg(long, value_name = "PATH")]
        config: Option<PathBuf>,

        /// Write the effective configuration as TOML, e.g. to replay a run
        #[arg(long, value_name = "PATH")]
        save_config: Option<PathBuf>,

        /// Export results to CSV file
        #[arg(long, value_name = "PATH")]
        output_csv: Option<PathBuf>,

        /// Export results to JSON file
        #[arg(long, value_name = "PATH")]
        output_json: Option<PathBuf>,
    },

    /// Write the addresses a configuration would generate as a CSV trace
    Generate {
        #[command(flatten)]
        params: SimulationArgs,

        /// Output trace file
        #[arg(short, long, default_value = "trace.csv")]
        output: PathBuf,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum PatternArg {
    Uniform,
    HotSet,
}

/// Simulation parameters shared by both subcommands
#[derive(clap::Args, Debug)]
struct SimulationArgs {
    /// Number of simulated cores
    #[arg(long, default_value = "4")]
    cores: usize,

    /// Number of cache sets
    #[arg(long, default_value = "8")]
    sets: usize,

    /// Ways per set
    #[arg(long, default_value = "8")]
    ways: usize,

    /// Ways owned by each core, assigned from way 0 upward
    #[arg(long, value_delimiter = ',', default_value = "2,2,2,2")]
    partition: Vec<usize>,

    /// Accesses issued by each core
    #[arg(long, default_value = "2500000")]
    accesses: u64,

    /// Addresses are drawn from [0, SIZE)
    #[arg(long, value_name = "SIZE", default_value = "1024")]
    address_space: u64,

    /// Random seed (default: current time, logged so the run can be replayed)
    #[arg(long)]
    seed: Option<u64>,

    /// Addresses pulled per batch
    #[arg(long, default_value = "10")]
    batch_size: usize,

    /// Address pattern
    #[arg(long, value_enum, default_value = "uniform")]
    pattern: PatternArg,

    /// Percentage of the address space that is hot (hot-set pattern)
    #[arg(long, default_value = "20")]
    hot_set_percent: u8,

    /// Percentage of accesses that go to the hot set (hot-set pattern)
    #[arg(long, default_value = "80")]
    hot_traffic_percent: u8,

    /// Replay a `core,address` CSV trace instead of generating addresses
    #[arg(long, value_name = "PATH")]
    trace: Option<PathBuf>,
}

impl SimulationArgs {
    fn into_config(self) -> SimulationConfig {
        let seed = self.seed.unwrap_or_else(|| {
            let seed = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map_or(0, |d| d.as_secs());
            info!(seed, "no seed given, using current time");
            seed
        });

        let pattern = match (self.trace, self.pattern) {
            (Some(path), _) => AddressPattern::Trace { path },
            (None, PatternArg::Uniform) => AddressPattern::Uniform,
            (None, PatternArg::HotSet) => AddressPattern::HotSet {
                hot_set_percent: self.hot_set_percent,
                hot_traffic_percent: self.hot_traffic_percent,
            },
        };

        SimulationConfig {
            num_cores: self.cores,
            num_sets: self.sets,
            num_ways: self.ways,
            partition_widths: self.partition,
            accesses_per_core: self.accesses,
            address_space_size: self.address_space,
            seed,
            batch_size: self.batch_size,
            pattern,
        }
    }
}

fn init_tracing(log_level: Option<&str>) {
    let filter = match log_level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> eyre::Result<()> {
    let args = Args::parse();
    init_tracing(args.log_level.as_deref());

    match args.command {
        Commands::Simulate {
            params,
            config,
            save_config,
            output_csv,
            output_json,
        } => {
            let config = match config {
                Some(path) => SimulationConfig::from_toml_file(path)?,
                None => params.into_config(),
            };
            if let Some(path) = save_config {
                fs::write(&path, config.to_toml_string()?)
                    .wrap_err_with(|| format!("cannot write config to {}", path.display()))?;
                info!(path = %path.display(), "saved configuration");
            }

            let mut driver = SimulationDriver::new();
            driver.configure(config)?;
            driver.run()?;

            let (Some(report), Some(cache)) = (driver.report(), driver.cache()) else {
                eyre::bail!("simulation finished without a report");
            };
            let stats = SimulationStats::new(report).with_metrics(cache.metrics());
            stats.print_summary();

            if let Some(path) = output_csv {
                stats
                    .export_csv(&path)
                    .wrap_err_with(|| format!("cannot write CSV to {}", path.display()))?;
                info!(path = %path.display(), "exported CSV results");
            }
            if let Some(path) = output_json {
                stats
                    .export_json(&path)
                    .wrap_err_with(|| format!("cannot write JSON to {}", path.display()))?;
                info!(path = %path.display(), "exported JSON results");
            }
            Ok(())
        }

        Commands::Generate { params, output } => {
            TraceGenerator::new(params.into_config()).generate(&output)?;
            Ok(())
        }
    }
}
