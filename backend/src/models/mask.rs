//! Admission mask
//!
//! Sparse map from job-stream index to enabled/disabled. Unset indices are
//! enabled. The value for an index is read exactly once, when that index is
//! stepped; changing it afterwards has no effect on the simulation.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdmissionMask {
    entries: BTreeMap<usize, bool>,
}

impl AdmissionMask {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `index` is treated as a real arrival
    ///
    /// ```
    /// use metasim_core_rs::AdmissionMask;
    ///
    /// let mut mask = AdmissionMask::new();
    /// assert!(mask.is_enabled(5));
    /// mask.disable(5);
    /// assert!(!mask.is_enabled(5));
    /// ```
    pub fn is_enabled(&self, index: usize) -> bool {
        self.entries.get(&index).copied().unwrap_or(true)
    }

    pub fn set(&mut self, index: usize, enabled: bool) {
        self.entries.insert(index, enabled);
    }

    pub fn enable(&mut self, index: usize) {
        self.set(index, true);
    }

    pub fn disable(&mut self, index: usize) {
        self.set(index, false);
    }

    /// Explicitly set entries, in index order
    pub fn entries(&self) -> impl Iterator<Item = (usize, bool)> + '_ {
        self.entries.iter().map(|(i, e)| (*i, *e))
    }

    /// Number of disabled indices
    pub fn disabled_count(&self) -> usize {
        self.entries.values().filter(|e| !**e).count()
    }
}

impl FromIterator<(usize, bool)> for AdmissionMask {
    fn from_iter<I: IntoIterator<Item = (usize, bool)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
