//! Simulation events written to an instance's debug log
//!
//! Every significant state change inside an instance is described by a
//! `SimEvent`. The debug sink filters them by level and writes one line per
//! event; rollout clones drop them entirely.
//!
//! # Example
//!
//! ```rust
//! use metasim_core_rs::models::{EventLevel, SimEvent};
//!
//! let event = SimEvent::Start { time: 10.0, job_id: 42, procs: 4 };
//! assert_eq!(event.level(), EventLevel::Detail);
//! assert_eq!(event.to_string(), "[10] start job=42 procs=4");
//! ```

use std::fmt;

/// Verbosity of an event; a sink configured with level `n` writes events
/// whose level is `<= n`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EventLevel {
    Info = 1,
    Detail = 2,
    Trace = 3,
}

/// State change inside one instance
#[derive(Debug, Clone, PartialEq)]
pub enum SimEvent {
    /// Enabled job offered to the scheduler
    Submit {
        time: f64,
        index: usize,
        job_id: i64,
        req_proc: u32,
    },

    /// Disabled job consumed as a bookkeeping-only step
    Skip { index: usize, job_id: i64 },

    /// Enabled job that can never fit this cluster
    Reject {
        index: usize,
        job_id: i64,
        req_proc: u32,
        capacity: u32,
    },

    Start { time: f64, job_id: i64, procs: u32 },

    Finish { time: f64, job_id: i64 },

    /// Run/walltime multipliers changed
    ScaleChange { run_scale: f64, wall_scale: f64 },

    /// Visible job stream clamped
    VisibleLimit { limit: usize },

    /// Job stream exhausted and backlog drained
    End { time: f64, completed: usize },
}

impl SimEvent {
    pub fn level(&self) -> EventLevel {
        match self {
            SimEvent::Reject { .. }
            | SimEvent::ScaleChange { .. }
            | SimEvent::VisibleLimit { .. }
            | SimEvent::End { .. } => EventLevel::Info,
            SimEvent::Submit { .. } | SimEvent::Start { .. } | SimEvent::Finish { .. } => {
                EventLevel::Detail
            }
            SimEvent::Skip { .. } => EventLevel::Trace,
        }
    }
}

impl fmt::Display for SimEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimEvent::Submit {
                time,
                index,
                job_id,
                req_proc,
            } => write!(f, "[{time}] submit #{index} job={job_id} procs={req_proc}"),
            SimEvent::Skip { index, job_id } => write!(f, "skip #{index} job={job_id}"),
            SimEvent::Reject {
                index,
                job_id,
                req_proc,
                capacity,
            } => write!(
                f,
                "reject #{index} job={job_id} procs={req_proc} capacity={capacity}"
            ),
            SimEvent::Start {
                time,
                job_id,
                procs,
            } => write!(f, "[{time}] start job={job_id} procs={procs}"),
            SimEvent::Finish { time, job_id } => write!(f, "[{time}] finish job={job_id}"),
            SimEvent::ScaleChange {
                run_scale,
                wall_scale,
            } => write!(f, "scale run={run_scale} wall={wall_scale}"),
            SimEvent::VisibleLimit { limit } => write!(f, "visible lines={limit}"),
            SimEvent::End { time, completed } => {
                write!(f, "[{time}] end completed={completed}")
            }
        }
    }
}
