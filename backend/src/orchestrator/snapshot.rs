//! Observable-state probes of an instance
//!
//! A probe captures what other code can observe of an instance (cursor,
//! ended flag, mask, accumulated results). Rollouts take one before and one
//! after running a clone; any difference means the clone leaked into its
//! source.
//!
//! # Critical Invariants
//!
//! - **Non-interference**: a rollout never changes its source's probe
//! - **Determinism**: equal probes hash to equal digests

use serde::Serialize;
use sha2::{Digest, Sha256};

use super::instance::SimulationInstance;
use crate::models::{AdmissionMask, JobResult};

/// Observable state of one instance at one moment
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstanceProbe {
    pub cursor: usize,
    pub ended: bool,
    pub mask: AdmissionMask,
    pub results_len: usize,
    /// Digest of every result line so far
    pub results_digest: String,
}

impl InstanceProbe {
    pub fn capture(instance: &SimulationInstance) -> Self {
        Self {
            cursor: instance.cursor(),
            ended: instance.is_ended(),
            mask: instance.mask().clone(),
            results_len: instance.results().len(),
            results_digest: results_digest(instance.results()),
        }
    }
}

/// Hex SHA-256 over the `.rst` lines of `results`
pub fn results_digest(results: &[JobResult]) -> String {
    let mut hasher = Sha256::new();
    for result in results {
        hasher.update(result.to_line().as_bytes());
        hasher.update(b"\n");
    }
    format!("{:x}", hasher.finalize())
}
