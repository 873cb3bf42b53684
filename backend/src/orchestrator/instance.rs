//! Simulation instance and its single-event stepper
//!
//! An instance is one simulated cluster: a cursor into a shared job stream,
//! an admission mask, a processor pool, a scheduling policy and its sinks.
//! It is advanced only through [`SimulationInstance::step`], an explicit
//! resumable state machine:
//!
//! ```text
//! cursor < visible        consume position `cursor`:
//!                           advance clock to its submit time (completing
//!                           jobs on the way), then admit / skip / reject it
//! cursor == visible       drain one completion time of the backlog
//! nothing left            ended = true (irreversible, later steps are no-ops)
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::core::time::TimeManager;
use crate::models::{
    ActiveJob, AdmissionMask, JobResult, NodeStructure, RunningJob, SimEvent, TraceJob,
};
use crate::policy::SchedulingPolicy;
use crate::sinks::{DebugLog, OutputLog, SystemSnapshot};
use crate::trace::TraceKey;

/// Stable, dense id of an instance inside its manager
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceId(usize);

impl InstanceId {
    /// Wrap a raw index; only ids returned by the manager are valid
    pub fn from_index(index: usize) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a single `step` did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Position consumed as a real arrival
    Admitted,
    /// Position consumed with the mask disabled
    Skipped,
    /// Position consumed but the job can never fit this cluster
    Rejected,
    /// Stream exhausted; one completion time of the backlog processed
    Drained { completed: usize },
    /// Stream exhausted, jobs waiting, but the policy started nothing
    Stalled,
    /// Nothing left; the instance is (now) ended
    Ended,
}

/// Counters over the instance's lifetime
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceStats {
    pub admitted: usize,
    pub skipped: usize,
    pub rejected: usize,
    pub completed: usize,
}

/// Collaborators exclusively owned by one instance
#[derive(Debug)]
pub struct Collaborators {
    pub policy: Box<dyn SchedulingPolicy>,
    pub nodes: NodeStructure,
    pub output: OutputLog,
    pub debug: DebugLog,
}

/// Everything needed to build an instance
#[derive(Debug)]
pub struct InstanceParts {
    pub id: InstanceId,
    pub trace_key: TraceKey,
    pub trace_name: String,
    pub workspace: PathBuf,
    pub jobs: Arc<[TraceJob]>,
    pub start_time: i64,
    pub collaborators: Collaborators,
}

/// One simulated cluster
#[derive(Debug)]
pub struct SimulationInstance {
    id: InstanceId,
    trace_key: TraceKey,
    trace_name: String,
    workspace: PathBuf,
    capacity: u32,
    run_scale: f64,
    wall_scale: f64,

    /// Immutable job stream, shared read-only with instances on the same trace
    jobs: Arc<[TraceJob]>,
    cursor: usize,
    visible: usize,
    ended: bool,
    mask: AdmissionMask,

    clock: TimeManager,
    waiting: Vec<ActiveJob>,
    running: Vec<RunningJob>,
    stats: InstanceStats,

    collab: Collaborators,
}

impl SimulationInstance {
    pub fn new(parts: InstanceParts) -> Self {
        let visible = parts.jobs.len();
        Self {
            id: parts.id,
            trace_key: parts.trace_key,
            trace_name: parts.trace_name,
            workspace: parts.workspace,
            capacity: parts.collaborators.nodes.total(),
            run_scale: 1.0,
            wall_scale: 1.0,
            jobs: parts.jobs,
            cursor: 0,
            visible,
            ended: false,
            mask: AdmissionMask::new(),
            clock: TimeManager::new(parts.start_time, 0),
            waiting: Vec::new(),
            running: Vec::new(),
            stats: InstanceStats::default(),
            collab: parts.collaborators,
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn id(&self) -> InstanceId {
        self.id
    }

    pub fn trace_key(&self) -> &TraceKey {
        &self.trace_key
    }

    pub fn trace_name(&self) -> &str {
        &self.trace_name
    }

    pub fn workspace(&self) -> &Path {
        &self.workspace
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn scale_factors(&self) -> (f64, f64) {
        (self.run_scale, self.wall_scale)
    }

    /// Job-stream positions consumed so far
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    pub fn mask(&self) -> &AdmissionMask {
        &self.mask
    }

    /// Positions this instance will ever reveal to its scheduler
    pub fn visible_lines(&self) -> usize {
        self.visible
    }

    pub fn job_count(&self) -> usize {
        self.jobs.len()
    }

    pub fn now(&self) -> f64 {
        self.clock.now()
    }

    pub fn stats(&self) -> InstanceStats {
        self.stats
    }

    pub fn waiting_len(&self) -> usize {
        self.waiting.len()
    }

    pub fn running_len(&self) -> usize {
        self.running.len()
    }

    pub fn policy_name(&self) -> &'static str {
        self.collab.policy.name()
    }

    /// Completed-job records, in completion order
    pub fn results(&self) -> &[JobResult] {
        self.collab.output.results()
    }

    // ========================================================================
    // Administrative setters
    // ========================================================================

    /// Multipliers for jobs admitted from now on
    pub fn set_scale_factors(&mut self, run_scale: f64, wall_scale: f64) {
        self.run_scale = run_scale;
        self.wall_scale = wall_scale;
        self.collab.debug.log(&SimEvent::ScaleChange {
            run_scale,
            wall_scale,
        });
        let line = format!("{};run={run_scale};wall={wall_scale}", self.clock.now());
        self.collab.output.record_adapt(&line);
    }

    /// Clamp the visible job stream to `lines` positions (never beyond the
    /// trace length)
    pub fn set_max_visible_lines(&mut self, lines: usize) {
        self.visible = lines.min(self.jobs.len());
        self.collab.debug.log(&SimEvent::VisibleLimit {
            limit: self.visible,
        });
    }

    pub fn set_admission(&mut self, index: usize, enabled: bool) {
        self.mask.set(index, enabled);
    }

    pub fn replace_mask(&mut self, mask: AdmissionMask) {
        self.mask = mask;
    }

    /// Re-anchor trace time: `virtual = raw - real_start + virtual_start`
    pub fn set_sim_times(&mut self, real_start: i64, virtual_start: i64) {
        self.clock.set_origin(real_start, virtual_start);
    }

    // ========================================================================
    // Stepper
    // ========================================================================

    /// Advance by exactly one event
    ///
    /// Once the instance has ended this is a no-op returning
    /// [`StepOutcome::Ended`].
    pub fn step(&mut self) -> StepOutcome {
        if self.ended {
            return StepOutcome::Ended;
        }
        if self.cursor < self.visible {
            return self.consume_position();
        }
        self.drain_once()
    }

    fn consume_position(&mut self) -> StepOutcome {
        let index = self.cursor;
        let job = self.jobs[index].clone();
        let submit = self.clock.to_virtual(job.submit);
        self.advance_to(submit);

        let outcome = if !self.mask.is_enabled(index) {
            self.stats.skipped += 1;
            self.collab.debug.log(&SimEvent::Skip {
                index,
                job_id: job.id,
            });
            StepOutcome::Skipped
        } else if job.req_proc > self.capacity {
            self.stats.rejected += 1;
            tracing::warn!(
                instance = %self.id,
                job_id = job.id,
                req_proc = job.req_proc,
                capacity = self.capacity,
                "job can never fit; consumed without admission"
            );
            self.collab.debug.log(&SimEvent::Reject {
                index,
                job_id: job.id,
                req_proc: job.req_proc,
                capacity: self.capacity,
            });
            StepOutcome::Rejected
        } else {
            let active = ActiveJob::admit(&job, submit, self.run_scale, self.wall_scale);
            self.collab.debug.log(&SimEvent::Submit {
                time: self.clock.now(),
                index,
                job_id: job.id,
                req_proc: job.req_proc,
            });
            self.waiting.push(active);
            self.stats.admitted += 1;
            self.schedule();
            self.record_system();
            StepOutcome::Admitted
        };

        self.cursor += 1;
        outcome
    }

    fn drain_once(&mut self) -> StepOutcome {
        if let Some(next) = self.next_completion() {
            let completed = self.complete_at(next);
            self.schedule();
            self.record_system();
            return StepOutcome::Drained { completed };
        }
        if !self.waiting.is_empty() {
            if self.schedule() == 0 {
                return StepOutcome::Stalled;
            }
            self.record_system();
            return StepOutcome::Drained { completed: 0 };
        }

        self.ended = true;
        self.collab.debug.log(&SimEvent::End {
            time: self.clock.now(),
            completed: self.stats.completed,
        });
        self.collab.debug.flush();
        self.collab.output.flush();
        StepOutcome::Ended
    }

    /// Process every completion up to `t`, then move the clock to `t`
    fn advance_to(&mut self, t: f64) {
        while let Some(next) = self.next_completion() {
            if next > t {
                break;
            }
            self.complete_at(next);
            self.schedule();
            self.record_system();
        }
        self.clock.advance_to(t);
    }

    fn next_completion(&self) -> Option<f64> {
        self.running
            .iter()
            .map(|r| r.end)
            .min_by(|a, b| a.total_cmp(b))
    }

    /// Finish every running job ending at or before `time`; returns how many
    fn complete_at(&mut self, time: f64) -> usize {
        self.clock.advance_to(time);
        let (mut done, still): (Vec<RunningJob>, Vec<RunningJob>) = std::mem::take(&mut self.running)
            .into_iter()
            .partition(|r| r.end <= time);
        self.running = still;
        done.sort_by(|a, b| a.end.total_cmp(&b.end).then(a.job.id.cmp(&b.job.id)));

        for finished in &done {
            self.collab.nodes.release(finished.job.req_proc);
            self.collab.debug.log(&SimEvent::Finish {
                time: finished.end,
                job_id: finished.job.id,
            });
            self.collab.output.record_result(JobResult {
                id: finished.job.id,
                req_proc: finished.job.req_proc,
                req_proc2: finished.job.req_proc,
                walltime: finished.job.walltime,
                run: finished.job.run,
                wait: finished.start - finished.job.submit,
                submit: finished.job.submit,
                start: finished.start,
                end: finished.end,
            });
        }
        self.stats.completed += done.len();
        done.len()
    }

    /// Ask the policy which waiting jobs to start now; returns how many started
    fn schedule(&mut self) -> usize {
        if self.waiting.is_empty() {
            return 0;
        }
        let now = self.clock.now();
        let picks = self.collab.policy.select(
            now,
            &self.waiting,
            &self.running,
            &self.collab.nodes,
        );

        let mut slots: Vec<Option<ActiveJob>> =
            std::mem::take(&mut self.waiting).into_iter().map(Some).collect();
        let mut started = 0;
        for pos in picks {
            let Some(slot) = slots.get_mut(pos) else {
                continue;
            };
            let fits = slot
                .as_ref()
                .is_some_and(|job| self.collab.nodes.fits(job.req_proc));
            if !fits {
                continue;
            }
            let Some(job) = slot.take() else {
                continue;
            };
            self.collab.nodes.allocate(job.req_proc);
            self.collab.debug.log(&SimEvent::Start {
                time: now,
                job_id: job.id,
                procs: job.req_proc,
            });
            self.running.push(RunningJob {
                start: now,
                end: now + job.run,
                job,
            });
            started += 1;
        }
        self.waiting = slots.into_iter().flatten().collect();
        started
    }

    fn record_system(&mut self) {
        self.collab.output.record_system(SystemSnapshot {
            time: self.clock.now(),
            total: self.collab.nodes.total(),
            used: self.collab.nodes.used(),
            waiting: self.waiting.len(),
            running: self.running.len(),
        });
    }

    // ========================================================================
    // Isolation
    // ========================================================================

    /// Deep, independent copy of the full mutable state
    ///
    /// The copy has its debug and output sinks detached: it accumulates
    /// results in memory but never writes to the experiment workspace. The
    /// immutable job stream is shared read-only.
    pub fn snapshot(&self) -> SimulationInstance {
        SimulationInstance {
            id: self.id,
            trace_key: self.trace_key.clone(),
            trace_name: self.trace_name.clone(),
            workspace: self.workspace.clone(),
            capacity: self.capacity,
            run_scale: self.run_scale,
            wall_scale: self.wall_scale,
            jobs: Arc::clone(&self.jobs),
            cursor: self.cursor,
            visible: self.visible,
            ended: self.ended,
            mask: self.mask.clone(),
            clock: self.clock.clone(),
            waiting: self.waiting.clone(),
            running: self.running.clone(),
            stats: self.stats,
            collab: Collaborators {
                policy: self.collab.policy.snapshot(),
                nodes: self.collab.nodes.clone(),
                output: self.collab.output.detached(),
                debug: self.collab.debug.detached(),
            },
        }
    }
}
