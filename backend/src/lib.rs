//! Metascheduling Simulator Core - Rust Engine
//!
//! Multi-instance HPC batch-scheduling simulator with speculative rollouts.
//!
//! # Architecture
//!
//! - **core**: Virtual time and experiment workspace layout
//! - **models**: Domain types (jobs, result records, masks, node pool, events)
//! - **trace**: SWF parsing, formatted artifacts, trace deduplication
//! - **policy**: Per-instance scheduling collaborators (FCFS, EASY backfill)
//! - **sinks**: Debug and result output of an instance
//! - **orchestrator**: Instance manager, stepper, rollouts and routing
//! - **experiment**: Whole-trace experiments and parallel sweeps
//! - **rng**: Deterministic random number generation
//!
//! # Critical Invariants
//!
//! 1. Instance ids are dense and stable
//! 2. `cursor` and `ended` change only through `step`
//! 3. A rollout never mutates its source instance
//! 4. All randomness is deterministic (seeded RNG)

pub mod core;
pub mod experiment;
pub mod models;
pub mod orchestrator;
pub mod policy;
pub mod rng;
pub mod sinks;
pub mod trace;

pub use core::time::TimeManager;
pub use experiment::{run_experiment, run_sweep, ExperimentOutcome, ExperimentSpec};
pub use models::{AdmissionMask, JobResult, TraceJob};
pub use orchestrator::{
    InstanceId, InstanceManager, ManagerConfig, RolloutConfig, RolloutError, Router,
    RoutingGroup, RoutingPolicy, SimulationError, StepOutcome, WorkspaceName,
};
pub use policy::{PolicyConfig, SchedulingPolicy};
pub use rng::RngManager;
pub use trace::{load_job_data, JobData};

// FFI module (when feature enabled)
#[cfg(feature = "pyo3")]
pub mod ffi;

#[cfg(feature = "pyo3")]
use pyo3::prelude::*;

#[cfg(feature = "pyo3")]
#[pymodule]
fn metasim_core_rs(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<ffi::manager::PyInstanceManager>()?;
    m.add_function(wrap_pyfunction!(ffi::manager::load_job_data, m)?)?;
    Ok(())
}
