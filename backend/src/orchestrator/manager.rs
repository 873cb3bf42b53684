//! Instance manager
//!
//! Owns every simulation instance of one experiment, the experiment
//! workspace and the trace registry. All operations address instances by
//! the [`InstanceId`] returned from `create_instance`; an id the manager
//! never issued is a caller bug and panics.
//!
//! # Example
//!
//! ```rust,no_run
//! use metasim_core_rs::orchestrator::{InstanceManager, ManagerConfig, WorkspaceName};
//!
//! let config = ManagerConfig::new("results", WorkspaceName::tagged("baseline"));
//! let mut manager = InstanceManager::new(config)?;
//!
//! let theta = manager.create_instance("traces".as_ref(), "theta.swf", 4360)?;
//! manager.run_to_end(&[theta]);
//! println!("{} jobs completed", manager.get_results(theta).len());
//! # Ok::<(), metasim_core_rs::orchestrator::SimulationError>(())
//! ```

use std::path::Path;
use std::sync::Arc;

use super::config::ManagerConfig;
use super::instance::{
    Collaborators, InstanceId, InstanceParts, SimulationInstance, StepOutcome,
};
use super::SimulationError;
use crate::core::workspace::{self, ExperimentWorkspace};
use crate::models::{AdmissionMask, JobResult, NodeStructure};
use crate::policy::SchedulingPolicy;
use crate::sinks::{DebugLog, OutputLog};
use crate::trace::artifacts;
use crate::trace::registry::Lookup;
use crate::trace::{swf, TraceEntry, TraceKey, TraceRegistry, TraceSource};

/// Registry and driver of all instances in one experiment
#[derive(Debug)]
pub struct InstanceManager {
    config: ManagerConfig,
    workspace: ExperimentWorkspace,
    instances: Vec<SimulationInstance>,
    traces: TraceRegistry,
}

impl InstanceManager {
    /// Validate `config`; the workspace itself is created by the first
    /// `create_instance`
    pub fn new(config: ManagerConfig) -> Result<Self, SimulationError> {
        config.validate()?;
        let workspace = ExperimentWorkspace::new(config.workspace_dir());
        Ok(Self {
            config,
            workspace,
            instances: Vec::new(),
            traces: TraceRegistry::new(),
        })
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    pub fn workspace(&self) -> &ExperimentWorkspace {
        &self.workspace
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Every issued id, in creation order
    pub fn ids(&self) -> Vec<InstanceId> {
        (0..self.instances.len()).map(InstanceId::from_index).collect()
    }

    /// Instance that owns the `Fmt/` job artifacts of a trace
    pub fn trace_owner(&self, trace_dir: &Path, trace_file: &str) -> Option<InstanceId> {
        self.traces
            .owner_of(&TraceKey::new(trace_dir, trace_file))
            .map(InstanceId::from_index)
    }

    /// # Panics
    ///
    /// Panics if `id` was not issued by this manager.
    pub fn instance(&self, id: InstanceId) -> &SimulationInstance {
        match self.instances.get(id.index()) {
            Some(instance) => instance,
            None => panic!("unknown instance id {id}"),
        }
    }

    fn instance_mut(&mut self, id: InstanceId) -> &mut SimulationInstance {
        match self.instances.get_mut(id.index()) {
            Some(instance) => instance,
            None => panic!("unknown instance id {id}"),
        }
    }

    // ========================================================================
    // Registration
    // ========================================================================

    /// Register a cluster of `capacity` processors replaying a trace, using
    /// the configured default policy
    pub fn create_instance(
        &mut self,
        trace_dir: &Path,
        trace_file: &str,
        capacity: u32,
    ) -> Result<InstanceId, SimulationError> {
        let policy = self.config.policy;
        self.create_instance_with_policy(trace_dir, trace_file, capacity, policy.build())
    }

    /// Same as [`create_instance`](Self::create_instance) with an explicit
    /// scheduling policy
    pub fn create_instance_with_policy(
        &mut self,
        trace_dir: &Path,
        trace_file: &str,
        capacity: u32,
        policy: Box<dyn SchedulingPolicy>,
    ) -> Result<InstanceId, SimulationError> {
        if capacity == 0 {
            return Err(SimulationError::InvalidConfig(
                "cluster capacity must be > 0".to_string(),
            ));
        }
        self.workspace.ensure()?;

        let id = InstanceId::from_index(self.instances.len());
        let key = TraceKey::new(trace_dir, trace_file);
        let name = workspace::trace_name(trace_file).to_string();
        let source = TraceSource::read(&key.path())?;

        let entry = match self.traces.lookup(&key, &source.fingerprint) {
            Lookup::Hit(entry) => {
                tracing::debug!(
                    trace = %key.path().display(),
                    owner = entry.owner,
                    "reusing parsed trace"
                );
                entry.clone()
            }
            Lookup::Stale(entry) => {
                tracing::warn!(
                    trace = %key.path().display(),
                    previous_owner = entry.owner,
                    "trace changed on disk since it was parsed; parsing again"
                );
                self.parse_and_register(&key, &source, &name, id)?
            }
            Lookup::Miss => self.parse_and_register(&key, &source, &name, id)?,
        };

        let nodes = NodeStructure::new(capacity);
        artifacts::write_node_artifacts(
            &nodes,
            &self.workspace.node_artifact(&name, id.index()),
            &self.workspace.node_config_artifact(&name, id.index()),
        )?;

        let debug = DebugLog::open(
            &self.workspace.debug_file(&name, id.index()),
            self.config.debug_level,
        )?;
        let output = OutputLog::open(
            &self.workspace.result_file(&name, id.index()),
            &self.workspace.system_file(&name, id.index()),
            &self.workspace.adapt_file(&name, id.index()),
        )?;

        tracing::info!(
            instance = %id,
            trace = %key.path().display(),
            jobs = entry.jobs.len(),
            capacity,
            policy = policy.name(),
            "instance created"
        );

        self.instances.push(SimulationInstance::new(InstanceParts {
            id,
            trace_key: key,
            trace_name: name,
            workspace: self.workspace.root().to_path_buf(),
            jobs: Arc::clone(&entry.jobs),
            start_time: entry.start_time,
            collaborators: Collaborators {
                policy,
                nodes,
                output,
                debug,
            },
        }));
        Ok(id)
    }

    fn parse_and_register(
        &mut self,
        key: &TraceKey,
        source: &TraceSource,
        name: &str,
        owner: InstanceId,
    ) -> Result<TraceEntry, SimulationError> {
        let parsed = swf::parse(source)?;
        let config = artifacts::write_job_artifacts(
            &parsed,
            &self.workspace.job_artifact(name, owner.index()),
            &self.workspace.job_config_artifact(name, owner.index()),
        )?;
        let entry = TraceEntry {
            owner: owner.index(),
            fingerprint: parsed.fingerprint,
            jobs: Arc::from(parsed.jobs),
            start_time: config.start_time,
        };
        self.traces.insert(key.clone(), entry.clone());
        Ok(entry)
    }

    // ========================================================================
    // Stepping
    // ========================================================================

    /// Advance one instance by one event
    pub fn step(&mut self, id: InstanceId) -> StepOutcome {
        self.instance_mut(id).step()
    }

    pub fn is_ended(&self, id: InstanceId) -> bool {
        self.instance(id).is_ended()
    }

    /// True when every listed instance has ended (vacuously true for `[]`)
    pub fn all_ended(&self, ids: &[InstanceId]) -> bool {
        ids.iter().all(|&id| self.is_ended(id))
    }

    /// Step the listed instances in lockstep rounds until all have ended
    ///
    /// Instances that already ended are skipped. Returns the number of
    /// rounds.
    pub fn run_to_end(&mut self, ids: &[InstanceId]) -> u64 {
        let mut rounds = 0;
        while !self.all_ended(ids) {
            for &id in ids {
                if !self.is_ended(id) {
                    self.step(id);
                }
            }
            rounds += 1;
        }
        tracing::debug!(instances = ids.len(), rounds, "lockstep drain finished");
        rounds
    }

    // ========================================================================
    // Controls
    // ========================================================================

    pub fn set_scale_factors(&mut self, id: InstanceId, run_scale: f64, wall_scale: f64) {
        self.instance_mut(id).set_scale_factors(run_scale, wall_scale);
    }

    pub fn set_max_visible_lines(&mut self, id: InstanceId, lines: usize) {
        self.instance_mut(id).set_max_visible_lines(lines);
    }

    /// Enable or disable job-stream position `index`
    pub fn set_admission_mask(&mut self, id: InstanceId, index: usize, enabled: bool) {
        self.instance_mut(id).set_admission(index, enabled);
    }

    /// Enable the position the next `step` will consume
    pub fn enable_next(&mut self, id: InstanceId) {
        let instance = self.instance_mut(id);
        let index = instance.cursor();
        instance.set_admission(index, true);
    }

    /// Disable the position the next `step` will consume
    pub fn disable_next(&mut self, id: InstanceId) {
        let instance = self.instance_mut(id);
        let index = instance.cursor();
        instance.set_admission(index, false);
    }

    pub fn get_mask(&self, id: InstanceId) -> AdmissionMask {
        self.instance(id).mask().clone()
    }

    pub fn set_mask(&mut self, id: InstanceId, mask: AdmissionMask) {
        self.instance_mut(id).replace_mask(mask);
    }

    pub fn set_sim_times(&mut self, id: InstanceId, real_start: i64, virtual_start: i64) {
        self.instance_mut(id).set_sim_times(real_start, virtual_start);
    }

    pub fn cursor(&self, id: InstanceId) -> usize {
        self.instance(id).cursor()
    }

    pub fn capacity(&self, id: InstanceId) -> u32 {
        self.instance(id).capacity()
    }

    /// Completed-job records of an instance, in completion order
    pub fn get_results(&self, id: InstanceId) -> &[JobResult] {
        self.instance(id).results()
    }
}
