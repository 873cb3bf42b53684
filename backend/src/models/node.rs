//! Resource model: a static pool of interchangeable processors

use serde::{Deserialize, Serialize};

/// Processor pool of one simulated cluster
///
/// `total` is fixed at creation; `used` moves as jobs start and finish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeStructure {
    total: u32,
    used: u32,
}

/// Row of the `_node.csv` artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRow {
    pub id: u32,
    pub procs: u32,
}

impl NodeStructure {
    pub fn new(total: u32) -> Self {
        Self { total, used: 0 }
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    pub fn used(&self) -> u32 {
        self.used
    }

    pub fn free(&self) -> u32 {
        self.total - self.used
    }

    pub fn fits(&self, procs: u32) -> bool {
        procs <= self.free()
    }

    /// Claim `procs` processors; returns false (and changes nothing) if they
    /// are not free
    pub fn allocate(&mut self, procs: u32) -> bool {
        if !self.fits(procs) {
            return false;
        }
        self.used += procs;
        true
    }

    /// Return processors to the pool
    ///
    /// # Panics
    /// Panics if more processors are released than are in use
    pub fn release(&mut self, procs: u32) {
        assert!(
            procs <= self.used,
            "released {procs} processors but only {} in use",
            self.used
        );
        self.used -= procs;
    }

    /// One row per processor, for the node artifact
    pub fn rows(&self) -> impl Iterator<Item = NodeRow> {
        (0..self.total).map(|id| NodeRow { id, procs: 1 })
    }
}
