//! Jobs as they appear in a trace and while they live inside an instance

use serde::{Deserialize, Serialize};

/// Number of whitespace-separated fields in an SWF job line
pub const SWF_FIELD_COUNT: usize = 18;

/// One raw job line of a Standard Workload Format trace
///
/// Field order follows the file. Missing values are `-1` in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwfRecord {
    pub id: i64,
    pub submit: i64,
    pub wait: i64,
    pub run: i64,
    pub used_proc: i64,
    pub used_avg_cpu: i64,
    pub used_mem: i64,
    pub req_proc: i64,
    pub req_time: i64,
    pub req_mem: i64,
    pub status: i64,
    pub cluster_id: i64,
    pub cluster_job_id: i64,
    pub num_exe: i64,
    pub num_queue: i64,
    pub num_part: i64,
    pub num_pre: i64,
    pub think_time: i64,
}

impl SwfRecord {
    /// Build from the 18 parsed fields, in file order
    pub fn from_fields(f: [i64; SWF_FIELD_COUNT]) -> Self {
        Self {
            id: f[0],
            submit: f[1],
            wait: f[2],
            run: f[3],
            used_proc: f[4],
            used_avg_cpu: f[5],
            used_mem: f[6],
            req_proc: f[7],
            req_time: f[8],
            req_mem: f[9],
            status: f[10],
            cluster_id: f[11],
            cluster_job_id: f[12],
            num_exe: f[13],
            num_queue: f[14],
            num_part: f[15],
            num_pre: f[16],
            think_time: f[17],
        }
    }
}

/// Normalized job, one per job-stream position
///
/// This is the row format of the `Fmt/<trace>_<id>.csv` artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceJob {
    /// Position in the job stream (0-based)
    pub index: usize,
    pub id: i64,
    /// Raw trace submit time
    pub submit: i64,
    /// Run time in seconds, before scaling
    pub run: i64,
    /// Processor demand, at least 1
    pub req_proc: u32,
    /// Requested walltime in seconds, before scaling
    pub req_time: i64,
    /// Cluster the job was recorded on (SWF field 12)
    pub cluster_id: i64,
}

impl TraceJob {
    /// Normalize a raw record
    ///
    /// - requested processors fall back to used processors, then to 1
    /// - requested time falls back to the run time
    /// - negative run times clamp to 0
    ///
    /// ```
    /// use metasim_core_rs::models::{SwfRecord, TraceJob};
    ///
    /// let mut fields = [-1i64; 18];
    /// fields[0] = 7;   // id
    /// fields[1] = 100; // submit
    /// fields[3] = 30;  // run
    /// fields[4] = 16;  // used procs
    /// let job = TraceJob::from_record(0, &SwfRecord::from_fields(fields));
    /// assert_eq!(job.req_proc, 16);
    /// assert_eq!(job.req_time, 30);
    /// ```
    pub fn from_record(index: usize, record: &SwfRecord) -> Self {
        let run = record.run.max(0);
        let procs = if record.req_proc > 0 {
            record.req_proc
        } else {
            record.used_proc
        };
        let req_time = if record.req_time > 0 {
            record.req_time
        } else {
            run
        };
        Self {
            index,
            id: record.id,
            submit: record.submit,
            run,
            req_proc: procs.clamp(1, i64::from(u32::MAX)) as u32,
            req_time,
            cluster_id: record.cluster_id,
        }
    }
}

/// A job admitted into an instance, with scale factors already applied
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveJob {
    pub id: i64,
    pub index: usize,
    pub req_proc: u32,
    /// Virtual submit time
    pub submit: f64,
    /// Scaled run time
    pub run: f64,
    /// Scaled requested walltime
    pub walltime: f64,
}

impl ActiveJob {
    pub fn admit(job: &TraceJob, submit: f64, run_scale: f64, wall_scale: f64) -> Self {
        Self {
            id: job.id,
            index: job.index,
            req_proc: job.req_proc,
            submit,
            run: job.run as f64 * run_scale,
            walltime: job.req_time as f64 * wall_scale,
        }
    }
}

/// A job holding processors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunningJob {
    pub job: ActiveJob,
    pub start: f64,
    /// Actual completion time (`start + run`)
    pub end: f64,
}

impl RunningJob {
    /// Completion time the scheduler may assume: start plus requested walltime
    pub fn estimated_end(&self) -> f64 {
        self.start + self.job.walltime
    }
}
