//! First-come first-served
//!
//! Starts waiting jobs in arrival order and stops at the first one that does
//! not fit. Nothing overtakes the head of the queue.

use super::SchedulingPolicy;
use crate::models::{ActiveJob, NodeStructure, RunningJob};

#[derive(Debug, Clone, Default)]
pub struct FcfsPolicy;

impl FcfsPolicy {
    pub fn new() -> Self {
        Self
    }
}

impl SchedulingPolicy for FcfsPolicy {
    fn name(&self) -> &'static str {
        "fcfs"
    }

    fn select(
        &mut self,
        _now: f64,
        waiting: &[ActiveJob],
        _running: &[RunningJob],
        nodes: &NodeStructure,
    ) -> Vec<usize> {
        let mut free = nodes.free();
        let mut picks = Vec::new();
        for (pos, job) in waiting.iter().enumerate() {
            if job.req_proc > free {
                break;
            }
            free -= job.req_proc;
            picks.push(pos);
        }
        picks
    }

    fn snapshot(&self) -> Box<dyn SchedulingPolicy> {
        Box::new(self.clone())
    }
}
