//! Experiments and parameter sweeps
//!
//! An experiment replays one trace across a set of clusters under one
//! routing policy and summarizes what each cluster completed. A sweep runs
//! many experiments side by side, one thread each; experiments share no
//! simulation state, only the progress display.
//!
//! # Example
//!
//! ```json
//! {
//!   "tag": "optimal_turnaround_50",
//!   "trace_dir": "data/traces",
//!   "trace_file": "theta_2022.swf",
//!   "clusters": [
//!     {"name": "theta_a", "capacity": 2180},
//!     {"name": "theta_b", "capacity": 2180, "run_scale": 0.5},
//!     {"name": "reference", "capacity": 4360, "role": "Observer"}
//!   ],
//!   "routing": {"type": "PredictedTurnaround"},
//!   "seed": 7
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::HashSet;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::thread;

use crate::models::JobResult;
use crate::orchestrator::{
    InstanceId, InstanceManager, ManagerConfig, Router, RoutingGroup, RoutingPolicy,
    SimulationError, WorkspaceName,
};
use crate::policy::PolicyConfig;
use crate::trace::load_job_data;

// ============================================================================
// Configuration
// ============================================================================

/// Part a cluster plays in its routing group
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClusterRole {
    #[default]
    Candidate,
    Observer,
}

/// One simulated cluster of an experiment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterSpec {
    pub name: String,
    pub capacity: u32,
    #[serde(default = "unit_scale")]
    pub run_scale: f64,
    #[serde(default = "unit_scale")]
    pub wall_scale: f64,
    #[serde(default)]
    pub role: ClusterRole,
    /// Overrides the experiment-wide policy
    #[serde(default)]
    pub policy: Option<PolicyConfig>,
}

fn unit_scale() -> f64 {
    1.0
}

impl ClusterSpec {
    pub fn new(name: impl Into<String>, capacity: u32) -> Self {
        Self {
            name: name.into(),
            capacity,
            run_scale: 1.0,
            wall_scale: 1.0,
            role: ClusterRole::Candidate,
            policy: None,
        }
    }
}

/// Complete description of one experiment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentSpec {
    /// Workspace directory name under the sweep root
    pub tag: String,
    pub trace_dir: PathBuf,
    pub trace_file: String,
    pub clusters: Vec<ClusterSpec>,
    #[serde(default)]
    pub routing: RoutingPolicy,
    #[serde(default)]
    pub seed: u64,
    /// Scheduling policy of clusters without their own
    #[serde(default)]
    pub policy: PolicyConfig,
}

impl ExperimentSpec {
    pub fn validate(&self) -> Result<(), SimulationError> {
        if self.clusters.is_empty() {
            return Err(SimulationError::InvalidConfig(format!(
                "experiment '{}' has no clusters",
                self.tag
            )));
        }
        if !self
            .clusters
            .iter()
            .any(|c| c.role == ClusterRole::Candidate)
        {
            return Err(SimulationError::InvalidConfig(format!(
                "experiment '{}' has no candidate cluster",
                self.tag
            )));
        }
        let mut names = HashSet::new();
        for cluster in &self.clusters {
            if !names.insert(cluster.name.as_str()) {
                return Err(SimulationError::InvalidConfig(format!(
                    "experiment '{}' names cluster '{}' twice",
                    self.tag, cluster.name
                )));
            }
        }
        Ok(())
    }

    /// Load a sweep file: a JSON array of experiments
    pub fn load_sweep(path: &Path) -> Result<Vec<ExperimentSpec>, SimulationError> {
        let text = fs::read_to_string(path).map_err(|e| {
            SimulationError::InvalidConfig(format!("cannot read {}: {e}", path.display()))
        })?;
        serde_json::from_str(&text).map_err(|e| {
            SimulationError::InvalidConfig(format!("cannot parse {}: {e}", path.display()))
        })
    }
}

// ============================================================================
// Outcome
// ============================================================================

/// Aggregate statistics over completed jobs
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub jobs: usize,
    pub mean_wait: f64,
    pub mean_turnaround: f64,
    /// Last completion minus first submission
    pub makespan: f64,
}

impl Summary {
    pub fn from_results(results: &[JobResult]) -> Self {
        if results.is_empty() {
            return Self::default();
        }
        let n = results.len() as f64;
        let first_submit = results
            .iter()
            .map(|r| r.submit)
            .fold(f64::INFINITY, f64::min);
        let last_end = results
            .iter()
            .map(|r| r.end)
            .fold(f64::NEG_INFINITY, f64::max);
        Self {
            jobs: results.len(),
            mean_wait: results.iter().map(|r| r.wait).sum::<f64>() / n,
            mean_turnaround: results.iter().map(JobResult::turnaround).sum::<f64>() / n,
            makespan: last_end - first_submit,
        }
    }
}

/// What one cluster did during an experiment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterOutcome {
    pub name: String,
    pub capacity: u32,
    pub role: ClusterRole,
    /// Jobs routed to this cluster (observers: every routed job)
    pub admitted: usize,
    pub rejected: usize,
    pub summary: Summary,
}

/// Result of one experiment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentOutcome {
    pub tag: String,
    pub clusters: Vec<ClusterOutcome>,
    /// Candidate name per job-stream position; `None` when skipped
    pub assignments: Vec<Option<String>>,
    pub skipped: usize,
}

impl ExperimentOutcome {
    pub fn cluster(&self, name: &str) -> Option<&ClusterOutcome> {
        self.clusters.iter().find(|c| c.name == name)
    }

    pub fn write_json(&self, path: &Path) -> Result<(), SimulationError> {
        let json = serde_json::to_string_pretty(self).map_err(|e| SimulationError::Artifact {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        fs::write(path, json).map_err(|e| SimulationError::Artifact {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }
}

// ============================================================================
// Progress display
// ============================================================================

/// Progress output shared by concurrently running experiments
///
/// Every line is written while holding one lock, so lines from different
/// experiments never interleave.
pub struct ProgressBoard {
    out: Mutex<Box<dyn Write + Send>>,
    every: usize,
}

impl ProgressBoard {
    /// Report every `every` routed jobs to `out`
    pub fn new(out: Box<dyn Write + Send>, every: usize) -> Self {
        Self {
            out: Mutex::new(out),
            every: every.max(1),
        }
    }

    pub fn stderr(every: usize) -> Self {
        Self::new(Box::new(io::stderr()), every)
    }

    pub fn silent() -> Self {
        Self::new(Box::new(io::sink()), usize::MAX)
    }

    fn job_done(&self, tag: &str, done: usize, total: usize) {
        if done % self.every == 0 || done == total {
            self.line(&format!("[{tag}] {done}/{total} jobs routed"));
        }
    }

    fn line(&self, text: &str) {
        // A poisoned lock only means another experiment panicked mid-line.
        let mut out = match self.out.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let _ = writeln!(out, "{text}");
    }
}

impl std::fmt::Debug for ProgressBoard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressBoard")
            .field("every", &self.every)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Runners
// ============================================================================

/// Run one experiment in `<root>/<tag>/`
pub fn run_experiment(
    spec: &ExperimentSpec,
    root: &Path,
    progress: &ProgressBoard,
) -> Result<ExperimentOutcome, SimulationError> {
    spec.validate()?;
    let mut config = ManagerConfig::new(root, WorkspaceName::tagged(spec.tag.clone()));
    config.policy = spec.policy;
    let mut manager = InstanceManager::new(config)?;

    let jobs = load_job_data(&spec.trace_dir, &spec.trace_file)?;
    tracing::info!(
        tag = %spec.tag,
        jobs = jobs.len(),
        clusters = spec.clusters.len(),
        "experiment started"
    );

    let mut ids: Vec<InstanceId> = Vec::with_capacity(spec.clusters.len());
    let mut group = RoutingGroup::default();
    for cluster in &spec.clusters {
        let policy = cluster.policy.unwrap_or(spec.policy).build();
        let id = manager.create_instance_with_policy(
            &spec.trace_dir,
            &spec.trace_file,
            cluster.capacity,
            policy,
        )?;
        if cluster.run_scale != 1.0 || cluster.wall_scale != 1.0 {
            manager.set_scale_factors(id, cluster.run_scale, cluster.wall_scale);
        }
        match cluster.role {
            ClusterRole::Candidate => group.candidates.push(id),
            ClusterRole::Observer => group.observers.push(id),
        }
        ids.push(id);
    }

    let mut router = Router::new(group, spec.routing.clone(), spec.seed)?;
    let total = jobs.len();
    let report = router.run(&mut manager, &jobs, |job, _| {
        progress.job_done(&spec.tag, job.index + 1, total);
    });

    let name_of = |id: InstanceId| {
        ids.iter()
            .position(|&x| x == id)
            .map(|pos| spec.clusters[pos].name.clone())
    };
    let clusters = spec
        .clusters
        .iter()
        .zip(&ids)
        .map(|(cluster, &id)| {
            let stats = manager.instance(id).stats();
            ClusterOutcome {
                name: cluster.name.clone(),
                capacity: cluster.capacity,
                role: cluster.role,
                admitted: stats.admitted,
                rejected: stats.rejected,
                summary: Summary::from_results(manager.get_results(id)),
            }
        })
        .collect();

    let outcome = ExperimentOutcome {
        tag: spec.tag.clone(),
        clusters,
        assignments: report
            .assignments
            .iter()
            .map(|a| a.and_then(name_of))
            .collect(),
        skipped: report.skipped,
    };
    tracing::info!(tag = %spec.tag, skipped = outcome.skipped, "experiment finished");
    progress.line(&format!("[{}] done", spec.tag));
    Ok(outcome)
}

/// Run every experiment on its own thread
///
/// Results come back in input order. A panicking experiment turns into
/// [`SimulationError::ExperimentAborted`] without affecting the others.
/// Experiments that reuse an earlier tag are refused, since they would
/// share a workspace.
pub fn run_sweep(
    specs: &[ExperimentSpec],
    root: &Path,
    progress: &ProgressBoard,
) -> Vec<Result<ExperimentOutcome, SimulationError>> {
    let mut seen = HashSet::new();
    let duplicate: Vec<bool> = specs
        .iter()
        .map(|s| !seen.insert(s.tag.as_str()))
        .collect();

    thread::scope(|scope| {
        let handles: Vec<_> = specs
            .iter()
            .zip(&duplicate)
            .map(|(spec, &dup)| {
                if dup {
                    return None;
                }
                let handle = thread::Builder::new()
                    .name(format!("exp-{}", spec.tag))
                    .spawn_scoped(scope, move || run_experiment(spec, root, progress));
                Some(handle)
            })
            .collect();

        specs
            .iter()
            .zip(handles)
            .map(|(spec, handle)| match handle {
                None => Err(SimulationError::InvalidConfig(format!(
                    "experiment tag '{}' used more than once",
                    spec.tag
                ))),
                Some(Err(e)) => Err(SimulationError::ExperimentAborted {
                    tag: spec.tag.clone(),
                    reason: format!("cannot spawn thread: {e}"),
                }),
                Some(Ok(handle)) => handle.join().unwrap_or_else(|payload| {
                    Err(SimulationError::ExperimentAborted {
                        tag: spec.tag.clone(),
                        reason: panic_message(payload.as_ref()),
                    })
                }),
            })
            .collect()
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic".to_string()
    }
}
