//! Trace ingestion: SWF parsing, formatted artifacts and deduplication

pub mod artifacts;
pub mod registry;
pub mod swf;

pub use artifacts::{NodeConfig, TraceConfig};
pub use registry::{TraceEntry, TraceKey, TraceRegistry};
pub use swf::{ParsedTrace, TraceSource};

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::orchestrator::SimulationError;

/// Per-job columns a policy driver needs to plan routing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobData {
    pub ids: Vec<i64>,
    pub procs: Vec<u32>,
    /// Raw trace submit times
    pub submits: Vec<i64>,
}

impl JobData {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Parse a trace without registering an instance or writing artifacts
///
/// Index `i` of every column refers to job-stream position `i`, the same
/// position instances use for stepping and masking.
pub fn load_job_data(trace_dir: &Path, trace_file: &str) -> Result<JobData, SimulationError> {
    let source = TraceSource::read(&trace_dir.join(trace_file))?;
    let parsed = swf::parse(&source)?;
    let mut data = JobData::default();
    for job in &parsed.jobs {
        data.ids.push(job.id);
        data.procs.push(job.req_proc);
        data.submits.push(job.submit);
    }
    Ok(data)
}
