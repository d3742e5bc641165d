//! Input data handling for cache simulation
//!
//! Reads recorded address traces (`core,address` CSV files) and replays them
//! as per-core address sources.

use crate::generator::AddressSource;
use crate::models::TraceRecord;
use partitioned_cache::ConfigError;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Error types for trace parsing
#[derive(Debug)]
pub enum TraceError {
    Io(io::Error),
    Csv(csv::Error),
    /// A record names a core the simulation does not have.
    UnknownCore { core: usize, num_cores: usize },
    /// A core has no addresses in the trace.
    MissingCore(usize),
}

impl fmt::Display for TraceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraceError::Io(err) => write!(f, "{err}"),
            TraceError::Csv(err) => write!(f, "{err}"),
            TraceError::UnknownCore { core, num_cores } => {
                write!(f, "trace names core {core} but only {num_cores} cores exist")
            }
            TraceError::MissingCore(core) => write!(f, "trace has no addresses for core {core}"),
        }
    }
}

impl std::error::Error for TraceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TraceError::Io(err) => Some(err),
            TraceError::Csv(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for TraceError {
    fn from(err: io::Error) -> Self {
        TraceError::Io(err)
    }
}

impl From<csv::Error> for TraceError {
    fn from(err: csv::Error) -> Self {
        TraceError::Csv(err)
    }
}

/// Reader for `core,address` trace files
pub struct TraceReader {
    path: PathBuf,
}

impl TraceReader {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Read every record in file order. Lines starting with `#` are skipped.
    pub fn read(&self) -> Result<Vec<TraceRecord>, TraceError> {
        let mut reader = csv::ReaderBuilder::new()
            .comment(Some(b'#'))
            .trim(csv::Trim::All)
            .from_path(&self.path)?;

        let records = reader
            .deserialize()
            .collect::<Result<Vec<TraceRecord>, _>>()?;
        info!(
            path = %self.path.display(),
            records = records.len(),
            "loaded trace"
        );
        Ok(records)
    }

    /// Read the trace and split it into one address list per core, keeping
    /// each core's order.
    pub fn read_per_core(&self, num_cores: usize) -> Result<Vec<Vec<u64>>, TraceError> {
        let mut per_core = vec![Vec::new(); num_cores];
        for record in self.read()? {
            let addresses = per_core
                .get_mut(record.core)
                .ok_or(TraceError::UnknownCore {
                    core: record.core,
                    num_cores,
                })?;
            addresses.push(record.address);
        }

        if let Some(core) = per_core.iter().position(Vec::is_empty) {
            return Err(TraceError::MissingCore(core));
        }
        Ok(per_core)
    }
}

/// Replays a fixed address list, starting over when it runs out.
#[derive(Debug, Clone)]
pub struct TraceAddressSource {
    addresses: Arc<[u64]>,
    position: usize,
}

impl TraceAddressSource {
    /// Wrap a non-empty list whose addresses all lie in `[0, address_space_size)`.
    pub fn new(addresses: Vec<u64>, address_space_size: u64) -> Result<Self, ConfigError> {
        if addresses.is_empty() {
            return Err(ConfigError::Zero("trace length"));
        }
        if let Some(&address) = addresses.iter().find(|&&a| a >= address_space_size) {
            return Err(ConfigError::AddressOutOfRange {
                address,
                address_space_size,
            });
        }
        Ok(Self {
            addresses: addresses.into(),
            position: 0,
        })
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }
}

impl AddressSource for TraceAddressSource {
    fn next_address(&mut self) -> u64 {
        let address = self.addresses[self.position];
        self.position = (self.position + 1) % self.addresses.len();
        address
    }
}
