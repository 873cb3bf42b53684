//! Scheduling policy collaborators
//!
//! Each instance owns exactly one scheduling policy. The simulator core does
//! not decide which waiting job runs next; it asks its policy, validates the
//! answer against the processor pool and starts the chosen jobs.
//!
//! # Policy Interface
//!
//! ```rust
//! use metasim_core_rs::models::{ActiveJob, NodeStructure, RunningJob};
//! use metasim_core_rs::policy::SchedulingPolicy;
//!
//! #[derive(Debug, Clone)]
//! struct Nothing;
//!
//! impl SchedulingPolicy for Nothing {
//!     fn name(&self) -> &'static str {
//!         "nothing"
//!     }
//!
//!     fn select(
//!         &mut self,
//!         _now: f64,
//!         _waiting: &[ActiveJob],
//!         _running: &[RunningJob],
//!         _nodes: &NodeStructure,
//!     ) -> Vec<usize> {
//!         vec![]
//!     }
//!
//!     fn snapshot(&self) -> Box<dyn SchedulingPolicy> {
//!         Box::new(self.clone())
//!     }
//! }
//! ```
//!
//! A policy that never starts anything never lets its instance end; rollouts
//! rely on the policy draining a finite backlog once admissions stop.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::{ActiveJob, NodeStructure, RunningJob};

mod backfill;
mod fcfs;

pub use backfill::EasyBackfillPolicy;
pub use fcfs::FcfsPolicy;

/// Decides which waiting jobs start
///
/// Implementations must be deterministic given their own state (seed any
/// randomness) so that two rollouts from the same snapshot agree.
pub trait SchedulingPolicy: Send + fmt::Debug {
    fn name(&self) -> &'static str;

    /// Positions in `waiting` to start at `now`, in start order
    ///
    /// `waiting` is in arrival order. Positions whose job does not fit the
    /// remaining free processors are ignored by the caller.
    fn select(
        &mut self,
        now: f64,
        waiting: &[ActiveJob],
        running: &[RunningJob],
        nodes: &NodeStructure,
    ) -> Vec<usize>;

    /// Independent deep copy, used when an instance is cloned for a rollout
    fn snapshot(&self) -> Box<dyn SchedulingPolicy>;
}

/// Policy selection for an instance
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PolicyConfig {
    /// Strict first-come first-served
    Fcfs,

    /// FCFS with EASY backfilling around the head job's reservation
    #[default]
    EasyBackfill,
}

impl PolicyConfig {
    pub fn build(self) -> Box<dyn SchedulingPolicy> {
        match self {
            PolicyConfig::Fcfs => Box::new(FcfsPolicy::new()),
            PolicyConfig::EasyBackfill => Box::new(EasyBackfillPolicy::new()),
        }
    }
}
