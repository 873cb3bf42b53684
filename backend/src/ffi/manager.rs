//! PyO3 wrapper for InstanceManager

use pyo3::exceptions::{PyIndexError, PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::{PyDict, PyList};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::models::{AdmissionMask, JobResult};
use crate::orchestrator::{
    InstanceId, InstanceManager as RustManager, ManagerConfig, StepOutcome, WorkspaceName,
};
use crate::policy::PolicyConfig;
use crate::trace::load_job_data as rust_load_job_data;

/// Python wrapper for the Rust instance manager
///
/// # Example (from Python)
///
/// ```python
/// from metasim_core_rs import InstanceManager, load_job_data
///
/// jobs = load_job_data("data", "theta.swf")
/// mgr = InstanceManager("results", tag="optimal_50")
/// a = mgr.create_instance("data", "theta.swf", 2180)
/// b = mgr.create_instance("data", "theta.swf", 2180)
///
/// for i, procs in enumerate(jobs["procs"]):
///     preds = mgr.predict_turnaround([a, b], jobs["ids"][i], procs)
///     target = min(preds, key=preds.get) if preds else None
///     for sim in (a, b):
///         if sim == target:
///             mgr.enable_next(sim)
///         else:
///             mgr.disable_next(sim)
///         mgr.step(sim)
/// mgr.run_to_end([a, b])
/// ```
#[pyclass(name = "InstanceManager")]
pub struct PyInstanceManager {
    inner: RustManager,
}

impl PyInstanceManager {
    fn checked(&self, id: usize) -> PyResult<InstanceId> {
        if id < self.inner.len() {
            Ok(InstanceId::from_index(id))
        } else {
            Err(PyIndexError::new_err(format!("unknown instance id {id}")))
        }
    }

    fn checked_all(&self, ids: &[usize]) -> PyResult<Vec<InstanceId>> {
        ids.iter().map(|&id| self.checked(id)).collect()
    }
}

#[pymethods]
impl PyInstanceManager {
    /// Create a manager writing into `<root>/<tag>`
    ///
    /// Without `tag` a fresh `exp_<uuid>` name is generated. `policy` is
    /// `"Fcfs"` or `"EasyBackfill"`.
    #[new]
    #[pyo3(signature = (root, tag=None, debug_level=3, policy=None, max_rollout_steps=None))]
    fn new(
        root: PathBuf,
        tag: Option<String>,
        debug_level: u8,
        policy: Option<&str>,
        max_rollout_steps: Option<u64>,
    ) -> PyResult<Self> {
        let workspace = match tag {
            Some(tag) => WorkspaceName::tagged(tag),
            None => WorkspaceName::generate(),
        };
        let mut config = ManagerConfig::new(root, workspace);
        config.debug_level = debug_level;
        config.rollout.max_steps = max_rollout_steps;
        if let Some(name) = policy {
            config.policy = parse_policy(name)?;
        }

        let inner = RustManager::new(config)
            .map_err(|e| PyValueError::new_err(format!("Failed to create manager: {e}")))?;
        Ok(Self { inner })
    }

    /// Register a cluster replaying `trace_dir/trace_file`; returns its id
    fn create_instance(&mut self, trace_dir: PathBuf, trace_file: &str, capacity: u32) -> PyResult<usize> {
        self.inner
            .create_instance(&trace_dir, trace_file, capacity)
            .map(InstanceId::index)
            .map_err(|e| PyRuntimeError::new_err(e.to_string()))
    }

    /// Workspace directory of this experiment
    fn workspace(&self) -> PathBuf {
        self.inner.workspace().root().to_path_buf()
    }

    fn __len__(&self) -> usize {
        self.inner.len()
    }

    /// Advance one event; returns what happened
    /// (`admitted`, `skipped`, `rejected`, `drained`, `stalled`, `ended`)
    fn step(&mut self, id: usize) -> PyResult<&'static str> {
        let id = self.checked(id)?;
        Ok(match self.inner.step(id) {
            StepOutcome::Admitted => "admitted",
            StepOutcome::Skipped => "skipped",
            StepOutcome::Rejected => "rejected",
            StepOutcome::Drained { .. } => "drained",
            StepOutcome::Stalled => "stalled",
            StepOutcome::Ended => "ended",
        })
    }

    fn is_ended(&self, id: usize) -> PyResult<bool> {
        Ok(self.inner.is_ended(self.checked(id)?))
    }

    fn all_ended(&self, ids: Vec<usize>) -> PyResult<bool> {
        Ok(self.inner.all_ended(&self.checked_all(&ids)?))
    }

    /// Step the listed instances in lockstep until every one has ended
    fn run_to_end(&mut self, ids: Vec<usize>) -> PyResult<u64> {
        let ids = self.checked_all(&ids)?;
        Ok(self.inner.run_to_end(&ids))
    }

    fn set_scale_factors(&mut self, id: usize, run_scale: f64, wall_scale: f64) -> PyResult<()> {
        let id = self.checked(id)?;
        self.inner.set_scale_factors(id, run_scale, wall_scale);
        Ok(())
    }

    fn set_max_visible_lines(&mut self, id: usize, lines: usize) -> PyResult<()> {
        let id = self.checked(id)?;
        self.inner.set_max_visible_lines(id, lines);
        Ok(())
    }

    fn enable_next(&mut self, id: usize) -> PyResult<()> {
        let id = self.checked(id)?;
        self.inner.enable_next(id);
        Ok(())
    }

    fn disable_next(&mut self, id: usize) -> PyResult<()> {
        let id = self.checked(id)?;
        self.inner.disable_next(id);
        Ok(())
    }

    fn set_admission_mask(&mut self, id: usize, index: usize, enabled: bool) -> PyResult<()> {
        let id = self.checked(id)?;
        self.inner.set_admission_mask(id, index, enabled);
        Ok(())
    }

    /// Explicit mask entries as `{index: enabled}`; unset positions are enabled
    fn get_mask(&self, id: usize) -> PyResult<HashMap<usize, bool>> {
        let id = self.checked(id)?;
        Ok(self.inner.get_mask(id).entries().collect())
    }

    fn set_mask(&mut self, id: usize, mask: HashMap<usize, bool>) -> PyResult<()> {
        let id = self.checked(id)?;
        self.inner
            .set_mask(id, mask.into_iter().collect::<AdmissionMask>());
        Ok(())
    }

    fn set_sim_times(&mut self, id: usize, real_start: i64, virtual_start: i64) -> PyResult<()> {
        let id = self.checked(id)?;
        self.inner.set_sim_times(id, real_start, virtual_start);
        Ok(())
    }

    fn cursor(&self, id: usize) -> PyResult<usize> {
        Ok(self.inner.cursor(self.checked(id)?))
    }

    fn capacity(&self, id: usize) -> PyResult<u32> {
        Ok(self.inner.capacity(self.checked(id)?))
    }

    /// Completed-job records as a list of dicts, in completion order
    fn get_results<'py>(&self, py: Python<'py>, id: usize) -> PyResult<Bound<'py, PyList>> {
        let id = self.checked(id)?;
        results_to_py(py, self.inner.get_results(id))
    }

    /// Drain an isolated copy of the instance and return its records
    #[pyo3(signature = (id, admit_one_more=false))]
    fn rollout<'py>(&self, py: Python<'py>, id: usize, admit_one_more: bool) -> PyResult<Bound<'py, PyList>> {
        let id = self.checked(id)?;
        let records = self
            .inner
            .rollout(id, admit_one_more)
            .map_err(|e| PyRuntimeError::new_err(e.to_string()))?;
        results_to_py(py, &records)
    }

    /// `{id: predicted turnaround}` over feasible candidates; empty when
    /// none can run the job
    fn predict_turnaround(
        &self,
        ids: Vec<usize>,
        pending_job_id: i64,
        pending_job_procs: u32,
    ) -> PyResult<HashMap<usize, f64>> {
        let ids = self.checked_all(&ids)?;
        let predictions = self
            .inner
            .predict_turnaround(&ids, pending_job_id, pending_job_procs);
        Ok(predictions
            .into_iter()
            .map(|(id, t)| (id.index(), t))
            .collect())
    }
}

/// Parse a trace without registering it: `{"ids": [...], "procs": [...], "submits": [...]}`
#[pyfunction]
pub fn load_job_data<'py>(
    py: Python<'py>,
    trace_dir: PathBuf,
    trace_file: &str,
) -> PyResult<Bound<'py, PyDict>> {
    let data = rust_load_job_data(&trace_dir, trace_file)
        .map_err(|e| PyRuntimeError::new_err(e.to_string()))?;
    let dict = PyDict::new_bound(py);
    dict.set_item("ids", data.ids)?;
    dict.set_item("procs", data.procs)?;
    dict.set_item("submits", data.submits)?;
    Ok(dict)
}

fn parse_policy(name: &str) -> PyResult<PolicyConfig> {
    match name {
        "Fcfs" => Ok(PolicyConfig::Fcfs),
        "EasyBackfill" => Ok(PolicyConfig::EasyBackfill),
        other => Err(PyValueError::new_err(format!(
            "Unknown policy '{other}' (expected Fcfs or EasyBackfill)"
        ))),
    }
}

fn results_to_py<'py>(py: Python<'py>, results: &[JobResult]) -> PyResult<Bound<'py, PyList>> {
    let list = PyList::empty_bound(py);
    for r in results {
        let dict = PyDict::new_bound(py);
        dict.set_item("id", r.id)?;
        dict.set_item("req_proc", r.req_proc)?;
        dict.set_item("req_proc2", r.req_proc2)?;
        dict.set_item("walltime", r.walltime)?;
        dict.set_item("run", r.run)?;
        dict.set_item("wait", r.wait)?;
        dict.set_item("submit", r.submit)?;
        dict.set_item("start", r.start)?;
        dict.set_item("end", r.end)?;
        list.append(dict)?;
    }
    Ok(list)
}
