//! Cross-instance job routing
//!
//! Several instances replay the same trace and share one job-stream
//! position at a time. For every position exactly one candidate admits the
//! job; every other candidate sees it disabled. Observers (for example a
//! reference cluster that should see the whole workload) admit every job.
//!
//! Per position `i`:
//!
//! 1. feasible = candidates with `capacity >= procs[i]`
//! 2. none feasible: disable `i` everywhere and step every member
//! 3. otherwise pick one feasible candidate with the routing policy
//! 4. enable `i` on the pick, disable it on the other candidates, enable it
//!    on observers, step every member exactly once
//!
//! Every member is stepped exactly once per position, so cursors stay
//! aligned on the shared index.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::instance::InstanceId;
use super::manager::InstanceManager;
use super::SimulationError;
use crate::rng::RngManager;
use crate::trace::JobData;

/// How a job is assigned among feasible candidates
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RoutingPolicy {
    /// First feasible candidate in group order
    FirstFeasible,

    /// Weighted random choice; one weight per candidate in group order.
    /// Weights of infeasible candidates are ignored.
    Probabilistic { weights: Vec<f64> },

    /// Candidate with the smallest rollout-predicted turnaround; exact ties
    /// are broken uniformly at random
    #[default]
    PredictedTurnaround,
}

/// Instances sharing one job stream
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoutingGroup {
    /// Compete for each job; exactly one admits it
    pub candidates: Vec<InstanceId>,
    /// Admit every job, never compete
    pub observers: Vec<InstanceId>,
}

impl RoutingGroup {
    pub fn new(candidates: Vec<InstanceId>) -> Self {
        Self {
            candidates,
            observers: Vec::new(),
        }
    }

    pub fn with_observers(mut self, observers: Vec<InstanceId>) -> Self {
        self.observers = observers;
        self
    }

    /// Candidates then observers
    pub fn members(&self) -> impl Iterator<Item = InstanceId> + '_ {
        self.candidates.iter().chain(self.observers.iter()).copied()
    }
}

/// The job at the shared cursor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingJob {
    pub index: usize,
    pub id: i64,
    pub procs: u32,
}

/// Outcome of routing one position
#[derive(Debug, Clone, PartialEq)]
pub enum RoutingDecision {
    /// No candidate can ever run the job; every member skipped it
    Skipped,
    Routed {
        target: InstanceId,
        /// Predicted turnaround per feasible candidate (empty unless the
        /// policy predicts)
        predictions: BTreeMap<InstanceId, f64>,
    },
}

impl RoutingDecision {
    pub fn target(&self) -> Option<InstanceId> {
        match self {
            RoutingDecision::Skipped => None,
            RoutingDecision::Routed { target, .. } => Some(*target),
        }
    }
}

/// Assignment of a whole trace
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoutingReport {
    /// Admitting candidate per job-stream position
    pub assignments: Vec<Option<InstanceId>>,
    pub skipped: usize,
}

impl RoutingReport {
    /// Jobs admitted by `id`
    pub fn count_for(&self, id: InstanceId) -> usize {
        self.assignments.iter().filter(|a| **a == Some(id)).count()
    }
}

/// Drives one routing group through a shared job stream
#[derive(Debug)]
pub struct Router {
    group: RoutingGroup,
    policy: RoutingPolicy,
    rng: RngManager,
}

impl Router {
    pub fn new(
        group: RoutingGroup,
        policy: RoutingPolicy,
        seed: u64,
    ) -> Result<Self, SimulationError> {
        if group.candidates.is_empty() {
            return Err(SimulationError::InvalidConfig(
                "routing group needs at least one candidate".to_string(),
            ));
        }
        if let RoutingPolicy::Probabilistic { weights } = &policy {
            if weights.len() != group.candidates.len() {
                return Err(SimulationError::InvalidConfig(format!(
                    "{} routing weights for {} candidates",
                    weights.len(),
                    group.candidates.len()
                )));
            }
        }
        let mut seen = BTreeSet::new();
        for id in group.members() {
            if !seen.insert(id) {
                return Err(SimulationError::InvalidConfig(format!(
                    "instance {id} appears more than once in the routing group"
                )));
            }
        }
        Ok(Self {
            group,
            policy,
            rng: RngManager::new(seed),
        })
    }

    pub fn group(&self) -> &RoutingGroup {
        &self.group
    }

    /// Route the job at the shared cursor and step every member once
    ///
    /// # Panics
    ///
    /// Panics if a member's cursor is not at `job.index`.
    pub fn route(&mut self, manager: &mut InstanceManager, job: &PendingJob) -> RoutingDecision {
        for id in self.group.members() {
            let cursor = manager.cursor(id);
            assert_eq!(
                cursor, job.index,
                "instance {id} is at position {cursor}, routing position {}",
                job.index
            );
        }

        let feasible: Vec<InstanceId> = self
            .group
            .candidates
            .iter()
            .copied()
            .filter(|&id| manager.capacity(id) >= job.procs)
            .collect();

        if feasible.is_empty() {
            tracing::debug!(
                index = job.index,
                job_id = job.id,
                procs = job.procs,
                "no feasible candidate; skipping job"
            );
            for id in self.group.members() {
                manager.disable_next(id);
                manager.step(id);
            }
            return RoutingDecision::Skipped;
        }

        let (target, predictions) = self.select(manager, job, &feasible);
        tracing::debug!(index = job.index, job_id = job.id, %target, "job routed");

        for &id in &self.group.candidates {
            if id == target {
                manager.enable_next(id);
            } else {
                manager.disable_next(id);
            }
            manager.step(id);
        }
        for &id in &self.group.observers {
            manager.enable_next(id);
            manager.step(id);
        }

        RoutingDecision::Routed {
            target,
            predictions,
        }
    }

    fn select(
        &mut self,
        manager: &InstanceManager,
        job: &PendingJob,
        feasible: &[InstanceId],
    ) -> (InstanceId, BTreeMap<InstanceId, f64>) {
        match &self.policy {
            RoutingPolicy::FirstFeasible => (feasible[0], BTreeMap::new()),
            RoutingPolicy::Probabilistic { weights } => {
                let feasible_weights: Vec<f64> = feasible
                    .iter()
                    .map(|id| {
                        self.group
                            .candidates
                            .iter()
                            .position(|c| c == id)
                            .map_or(0.0, |pos| weights[pos])
                    })
                    .collect();
                let pick = self.rng.pick_weighted(&feasible_weights);
                (feasible[pick], BTreeMap::new())
            }
            RoutingPolicy::PredictedTurnaround => {
                let predictions = manager.predict_turnaround(feasible, job.id, job.procs);
                let best = predictions
                    .values()
                    .copied()
                    .min_by(|a, b| a.total_cmp(b));
                let Some(best) = best else {
                    tracing::warn!(
                        index = job.index,
                        job_id = job.id,
                        "no prediction available; routing to first feasible candidate"
                    );
                    return (feasible[0], predictions);
                };
                let ties: Vec<InstanceId> = predictions
                    .iter()
                    .filter(|&(_, &v)| v == best)
                    .map(|(&id, _)| id)
                    .collect();
                let target = ties[self.rng.pick(ties.len())];
                (target, predictions)
            }
        }
    }

    /// Route every position of `jobs`, then drain the group in lockstep
    ///
    /// `on_job` sees each routing decision as it is made.
    pub fn run<F>(&mut self, manager: &mut InstanceManager, jobs: &JobData, mut on_job: F) -> RoutingReport
    where
        F: FnMut(&PendingJob, &RoutingDecision),
    {
        let mut report = RoutingReport::default();
        for index in 0..jobs.len() {
            let job = PendingJob {
                index,
                id: jobs.ids[index],
                procs: jobs.procs[index],
            };
            let decision = self.route(manager, &job);
            on_job(&job, &decision);
            if decision == RoutingDecision::Skipped {
                report.skipped += 1;
            }
            report.assignments.push(decision.target());
        }

        let members: Vec<InstanceId> = self.group.members().collect();
        manager.run_to_end(&members);
        tracing::info!(
            jobs = jobs.len(),
            skipped = report.skipped,
            "routing finished"
        );
        report
    }
}
