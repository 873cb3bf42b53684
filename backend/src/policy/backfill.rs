//! EASY backfilling
//!
//! Jobs start in arrival order until one does not fit. That head job gets a
//! reservation at the earliest time enough processors free up (by requested
//! walltime of running jobs). Later jobs may jump ahead if they either finish
//! before the reservation or only use processors the head job will not need.

use super::SchedulingPolicy;
use crate::models::{ActiveJob, NodeStructure, RunningJob};

#[derive(Debug, Clone, Default)]
pub struct EasyBackfillPolicy;

impl EasyBackfillPolicy {
    pub fn new() -> Self {
        Self
    }

    /// Reservation for a job needing `procs`: (shadow time, spare processors
    /// at shadow time)
    fn reservation(procs: u32, free: u32, ends: &mut [(f64, u32)]) -> (f64, u32) {
        ends.sort_by(|a, b| a.0.total_cmp(&b.0));
        let mut avail = free;
        for &(time, released) in ends.iter() {
            avail += released;
            if avail >= procs {
                return (time, avail - procs);
            }
        }
        (f64::INFINITY, 0)
    }
}

impl SchedulingPolicy for EasyBackfillPolicy {
    fn name(&self) -> &'static str {
        "easy-backfill"
    }

    fn select(
        &mut self,
        now: f64,
        waiting: &[ActiveJob],
        running: &[RunningJob],
        nodes: &NodeStructure,
    ) -> Vec<usize> {
        let mut free = nodes.free();
        let mut picks = Vec::new();

        let mut head = None;
        for (pos, job) in waiting.iter().enumerate() {
            if job.req_proc > free {
                head = Some(pos);
                break;
            }
            free -= job.req_proc;
            picks.push(pos);
        }
        let Some(head) = head else {
            return picks;
        };

        let mut ends: Vec<(f64, u32)> = running
            .iter()
            .map(|r| (r.estimated_end(), r.job.req_proc))
            .chain(
                picks
                    .iter()
                    .map(|&p| (now + waiting[p].walltime, waiting[p].req_proc)),
            )
            .collect();
        let (shadow, mut extra) = Self::reservation(waiting[head].req_proc, free, &mut ends);

        for (pos, job) in waiting.iter().enumerate().skip(head + 1) {
            if job.req_proc > free {
                continue;
            }
            if now + job.walltime <= shadow {
                free -= job.req_proc;
                picks.push(pos);
            } else if job.req_proc <= extra {
                free -= job.req_proc;
                extra -= job.req_proc;
                picks.push(pos);
            }
        }
        picks
    }

    fn snapshot(&self) -> Box<dyn SchedulingPolicy> {
        Box::new(self.clone())
    }
}
