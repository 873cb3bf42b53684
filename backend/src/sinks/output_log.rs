use std::path::Path;

use super::LineFile;
use crate::models::JobResult;
use crate::orchestrator::SimulationError;

/// One line of the system trace (`.ult`)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SystemSnapshot {
    pub time: f64,
    pub total: u32,
    pub used: u32,
    pub waiting: usize,
    pub running: usize,
}

impl SystemSnapshot {
    fn to_line(self) -> String {
        format!(
            "{};{};{};{};{};{}",
            self.time,
            self.total,
            self.used,
            self.total - self.used,
            self.waiting,
            self.running
        )
    }
}

/// Result sink of one instance
///
/// Completed-job records accumulate in memory in completion order; the
/// accumulator is what `get_results` and rollouts read.
#[derive(Debug)]
pub struct OutputLog {
    results: Vec<JobResult>,
    result_file: Option<LineFile>,
    system_file: Option<LineFile>,
    adapt_file: Option<LineFile>,
}

impl OutputLog {
    pub fn open(result: &Path, system: &Path, adapt: &Path) -> Result<Self, SimulationError> {
        Ok(Self {
            results: Vec::new(),
            result_file: Some(LineFile::create(result)?),
            system_file: Some(LineFile::create(system)?),
            adapt_file: Some(LineFile::create(adapt)?),
        })
    }

    /// In-memory accumulator only
    pub fn in_memory() -> Self {
        Self {
            results: Vec::new(),
            result_file: None,
            system_file: None,
            adapt_file: None,
        }
    }

    /// Copy for an isolated clone: same results, no files
    pub fn detached(&self) -> Self {
        Self {
            results: self.results.clone(),
            ..Self::in_memory()
        }
    }

    pub fn record_result(&mut self, result: JobResult) {
        if let Some(file) = self.result_file.as_mut() {
            file.write_line(&result.to_line());
        }
        self.results.push(result);
    }

    pub fn record_system(&mut self, snapshot: SystemSnapshot) {
        if let Some(file) = self.system_file.as_mut() {
            file.write_line(&snapshot.to_line());
        }
    }

    pub fn record_adapt(&mut self, line: &str) {
        if let Some(file) = self.adapt_file.as_mut() {
            file.write_line(line);
        }
    }

    pub fn results(&self) -> &[JobResult] {
        &self.results
    }

    pub fn flush(&mut self) {
        for file in [
            &mut self.result_file,
            &mut self.system_file,
            &mut self.adapt_file,
        ]
        .into_iter()
        .flatten()
        {
            file.flush();
        }
    }
}
