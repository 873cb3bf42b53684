//! Speculative rollouts
//!
//! A rollout answers "what if this instance's backlog drained right now?".
//! The live instance is deep-copied, the copy is frozen at the current
//! cursor (optionally one position further) and moved to a worker thread
//! that steps it to the end. Result records come back over a bounded
//! channel in completion order; the worker closes the channel when it is
//! done.
//!
//! ```text
//! caller                         worker "rollout-<id>"
//!   snapshot ──── move clone ───▶  send accumulated records
//!   recv ◀──────── Record ──────   step until ended, send new records
//!   recv ◀──────── Done{sent} ──   drop sender (channel closes)
//!   join, check count
//! ```
//!
//! The live instance is only read while the snapshot is taken.

use crossbeam_channel::{bounded, Sender};
use std::collections::BTreeMap;
use std::thread;

use super::instance::{InstanceId, SimulationInstance};
use super::manager::InstanceManager;
use super::snapshot::InstanceProbe;
use super::RolloutError;
use crate::models::JobResult;

/// Worker to caller message
#[derive(Debug)]
enum RolloutMessage {
    Record(JobResult),
    /// Clone ended after streaming `sent` records
    Done { sent: usize },
    /// Step budget ran out before the clone ended
    Exhausted { steps: u64 },
}

impl InstanceManager {
    /// Drain an isolated copy of `id` and return its result records
    ///
    /// With `admit_one_more` the copy may consume exactly one more
    /// job-stream position, which is enabled in the copy regardless of the
    /// live mask.
    ///
    /// The live instance is never modified: the method only borrows the
    /// manager immutably and the worker owns a deep snapshot, so the borrow
    /// checker is what guarantees non-interference. The [`InstanceProbe`]
    /// comparison after the worker joins is only a debug-build cross-check.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not issued by this manager.
    pub fn rollout(
        &self,
        id: InstanceId,
        admit_one_more: bool,
    ) -> Result<Vec<JobResult>, RolloutError> {
        let source = self.instance(id);
        let before = InstanceProbe::capture(source);

        let pending = source.cursor();
        let freeze = pending + usize::from(admit_one_more);
        let mut clone = source.snapshot();
        clone.set_max_visible_lines(freeze.min(clone.visible_lines()));
        if admit_one_more {
            clone.set_admission(pending, true);
        }

        let max_steps = self.config().rollout.max_steps;
        let (tx, rx) = bounded(self.config().rollout.channel_capacity);
        let worker = thread::Builder::new()
            .name(format!("rollout-{id}"))
            .spawn(move || drive_clone(clone, max_steps, &tx))
            .map_err(|source| RolloutError::WorkerSpawn { id, source })?;

        let mut records = Vec::new();
        let mut outcome = None;
        for message in rx.iter() {
            match message {
                RolloutMessage::Record(record) => records.push(record),
                other => outcome = Some(other),
            }
        }

        if worker.join().is_err() {
            return Err(RolloutError::WorkerPanicked { id });
        }
        debug_assert_eq!(
            before,
            InstanceProbe::capture(self.instance(id)),
            "rollout modified its source instance"
        );

        match outcome {
            Some(RolloutMessage::Done { sent }) if sent == records.len() => {
                tracing::debug!(
                    instance = %id,
                    admit_one_more,
                    records = records.len(),
                    "rollout finished"
                );
                Ok(records)
            }
            Some(RolloutMessage::Done { sent }) => Err(RolloutError::Truncated {
                id,
                expected: sent,
                received: records.len(),
            }),
            Some(RolloutMessage::Exhausted { steps }) => {
                Err(RolloutError::StepBudgetExhausted { id, steps })
            }
            Some(RolloutMessage::Record(_)) | None => Err(RolloutError::Truncated {
                id,
                expected: records.len() + 1,
                received: records.len(),
            }),
        }
    }

    /// Predicted turnaround of a pending job on every feasible candidate
    ///
    /// Candidates with `capacity < pending_job_procs` are omitted, so the
    /// map is empty when no candidate can ever run the job. A candidate
    /// whose rollout fails, or whose rollout does not complete the pending
    /// job, is omitted as well and reported through `tracing`.
    pub fn predict_turnaround(
        &self,
        ids: &[InstanceId],
        pending_job_id: i64,
        pending_job_procs: u32,
    ) -> BTreeMap<InstanceId, f64> {
        let mut predictions = BTreeMap::new();
        for &id in ids {
            if self.capacity(id) < pending_job_procs {
                continue;
            }
            match self.rollout(id, true) {
                Ok(records) => match records.iter().rev().find(|r| r.id == pending_job_id) {
                    Some(record) => {
                        predictions.insert(id, record.turnaround());
                    }
                    None => tracing::warn!(
                        instance = %id,
                        job_id = pending_job_id,
                        "rollout did not complete the pending job; prediction unavailable"
                    ),
                },
                Err(error) => tracing::warn!(
                    instance = %id,
                    job_id = pending_job_id,
                    %error,
                    "prediction unavailable"
                ),
            }
        }
        predictions
    }
}

/// Worker body: stream what the clone already holds, then step it to the end
fn drive_clone(
    mut clone: SimulationInstance,
    max_steps: Option<u64>,
    tx: &Sender<RolloutMessage>,
) {
    let mut sent = 0;
    if !send_new(&clone, &mut sent, tx) {
        return;
    }

    let mut steps = 0u64;
    while !clone.is_ended() {
        if max_steps.is_some_and(|max| steps >= max) {
            let _ = tx.send(RolloutMessage::Exhausted { steps });
            return;
        }
        clone.step();
        steps += 1;
        if !send_new(&clone, &mut sent, tx) {
            return;
        }
    }
    let _ = tx.send(RolloutMessage::Done { sent });
}

/// Send records past `sent`; false once the caller has gone away
fn send_new(clone: &SimulationInstance, sent: &mut usize, tx: &Sender<RolloutMessage>) -> bool {
    for record in &clone.results()[*sent..] {
        if tx.send(RolloutMessage::Record(record.clone())).is_err() {
            return false;
        }
        *sent += 1;
    }
    true
}
