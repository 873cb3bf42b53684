//! Error types of the orchestration layer
//!
//! Unknown instance ids and misaligned routing cursors are caller bugs and
//! panic; they never show up here.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use super::instance::InstanceId;

/// Recoverable failure while building or driving instances
#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Cannot read trace {path}: {source}")]
    TraceIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Malformed trace {path} line {line}: {reason}")]
    TraceParse {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("Cannot create workspace directory {path}: {source}")]
    Workspace {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Cannot open output file {path}: {source}")]
    Sink {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Trace artifact {path}: {reason}")]
    Artifact { path: PathBuf, reason: String },

    #[error("Experiment '{tag}' aborted: {reason}")]
    ExperimentAborted { tag: String, reason: String },
}

/// Failure of a speculative rollout
///
/// A rollout error means the prediction for that candidate is unavailable;
/// it never stands for a zero or negative outcome.
#[derive(Debug, Error)]
pub enum RolloutError {
    #[error("Cannot spawn rollout worker for instance {id}: {source}")]
    WorkerSpawn {
        id: InstanceId,
        #[source]
        source: io::Error,
    },

    #[error("Rollout worker for instance {id} panicked")]
    WorkerPanicked { id: InstanceId },

    #[error("Rollout of instance {id} did not end within {steps} steps")]
    StepBudgetExhausted { id: InstanceId, steps: u64 },

    #[error("Rollout of instance {id} sent {expected} records but {received} arrived")]
    Truncated {
        id: InstanceId,
        expected: usize,
        received: usize,
    },
}
