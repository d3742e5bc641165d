//! Errors raised while configuring or running a simulation.

use partitioned_cache::{AccessError, ConfigError};
use std::fmt;
use std::io;

use crate::input::TraceError;
use crate::models::DriverState;

/// Everything that can stop a simulation from producing a report.
///
/// No variant is transient; the driver never retries.
#[derive(Debug)]
pub enum SimulationError {
    /// The configuration was rejected before any worker started.
    Config(ConfigError),
    /// A worker passed an invalid argument to the cache.
    Access {
        /// Core whose worker issued the access.
        core_id: usize,
        /// What the cache rejected.
        source: AccessError,
    },
    /// A trace file could not be read.
    Trace(TraceError),
    /// An operation was called in the wrong lifecycle state.
    InvalidState {
        /// State the operation requires.
        expected: DriverState,
        /// State the driver was in.
        actual: DriverState,
    },
    /// A worker thread could not be started.
    Spawn {
        /// Core the thread was meant for.
        core_id: usize,
        /// OS error.
        source: io::Error,
    },
    /// A worker thread panicked.
    WorkerPanicked {
        /// Core whose worker panicked.
        core_id: usize,
    },
    /// The run was cancelled through its [`CancellationToken`](crate::runner::CancellationToken).
    Cancelled,
}

impl fmt::Display for SimulationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimulationError::Config(err) => write!(f, "invalid configuration: {err}"),
            SimulationError::Access { core_id, source } => {
                write!(f, "core {core_id} issued an invalid access: {source}")
            }
            SimulationError::Trace(err) => write!(f, "cannot load trace: {err}"),
            SimulationError::InvalidState { expected, actual } => write!(
                f,
                "driver is {actual} but the operation requires {expected}"
            ),
            SimulationError::Spawn { core_id, source } => {
                write!(f, "cannot start worker for core {core_id}: {source}")
            }
            SimulationError::WorkerPanicked { core_id } => {
                write!(f, "worker for core {core_id} panicked")
            }
            SimulationError::Cancelled => write!(f, "simulation cancelled"),
        }
    }
}

impl std::error::Error for SimulationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SimulationError::Config(err) => Some(err),
            SimulationError::Access { source, .. } => Some(source),
            SimulationError::Trace(err) => Some(err),
            SimulationError::Spawn { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<ConfigError> for SimulationError {
    fn from(err: ConfigError) -> Self {
        SimulationError::Config(err)
    }
}

impl From<TraceError> for SimulationError {
    fn from(err: TraceError) -> Self {
        SimulationError::Trace(err)
    }
}
