//! Orchestrator - multi-instance simulation and speculative rollouts
//!
//! - `manager`: instance registry, stepping and admission controls
//! - `instance`: one simulated cluster and its event stepper
//! - `rollout`: isolated drain-to-completion of an instance copy
//! - `routing`: one job stream shared by competing instances

pub mod config;
pub mod error;
pub mod instance;
pub mod manager;
pub mod rollout;
pub mod routing;
pub mod snapshot;

pub use config::{ManagerConfig, RolloutConfig, WorkspaceName};
pub use error::{RolloutError, SimulationError};
pub use instance::{InstanceId, InstanceStats, SimulationInstance, StepOutcome};
pub use manager::InstanceManager;
pub use routing::{
    PendingJob, Router, RoutingDecision, RoutingGroup, RoutingPolicy, RoutingReport,
};
pub use snapshot::InstanceProbe;
