//! Experiment workspace layout
//!
//! ```text
//! <root>/<name>/
//!     Results/  <trace>_<id>.ult | .adp | .rst
//!     Debug/    <trace>_<id>_debug.log
//!     Fmt/      <trace>_<id>.csv | .con | _node.csv | _node.con
//! ```
//!
//! The directories are created lazily the first time an instance registers
//! and are never removed by the simulator.

use std::fs;
use std::path::{Path, PathBuf};

use crate::orchestrator::SimulationError;

const RESULTS_DIR: &str = "Results";
const DEBUG_DIR: &str = "Debug";
const FMT_DIR: &str = "Fmt";

/// Root directory of one experiment plus its naming rules
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExperimentWorkspace {
    root: PathBuf,
    created: bool,
}

impl ExperimentWorkspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            created: false,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create `Results/`, `Debug/` and `Fmt/` if they do not exist yet
    pub fn ensure(&mut self) -> Result<(), SimulationError> {
        if self.created {
            return Ok(());
        }
        for dir in [RESULTS_DIR, DEBUG_DIR, FMT_DIR] {
            let path = self.root.join(dir);
            fs::create_dir_all(&path).map_err(|source| SimulationError::Workspace {
                path: path.clone(),
                source,
            })?;
        }
        self.created = true;
        Ok(())
    }

    pub fn results_dir(&self) -> PathBuf {
        self.root.join(RESULTS_DIR)
    }

    pub fn debug_dir(&self) -> PathBuf {
        self.root.join(DEBUG_DIR)
    }

    pub fn fmt_dir(&self) -> PathBuf {
        self.root.join(FMT_DIR)
    }

    /// System trace (`.ult`)
    pub fn system_file(&self, trace_name: &str, id: usize) -> PathBuf {
        self.results_dir().join(format!("{trace_name}_{id}.ult"))
    }

    /// Adaptive trace (`.adp`)
    pub fn adapt_file(&self, trace_name: &str, id: usize) -> PathBuf {
        self.results_dir().join(format!("{trace_name}_{id}.adp"))
    }

    /// Result trace (`.rst`)
    pub fn result_file(&self, trace_name: &str, id: usize) -> PathBuf {
        self.results_dir().join(format!("{trace_name}_{id}.rst"))
    }

    pub fn debug_file(&self, trace_name: &str, id: usize) -> PathBuf {
        self.debug_dir().join(format!("{trace_name}_{id}_debug.log"))
    }

    pub fn job_artifact(&self, trace_name: &str, id: usize) -> PathBuf {
        self.fmt_dir().join(format!("{trace_name}_{id}.csv"))
    }

    pub fn job_config_artifact(&self, trace_name: &str, id: usize) -> PathBuf {
        self.fmt_dir().join(format!("{trace_name}_{id}.con"))
    }

    pub fn node_artifact(&self, trace_name: &str, id: usize) -> PathBuf {
        self.fmt_dir().join(format!("{trace_name}_{id}_node.csv"))
    }

    pub fn node_config_artifact(&self, trace_name: &str, id: usize) -> PathBuf {
        self.fmt_dir().join(format!("{trace_name}_{id}_node.con"))
    }
}

/// Trace name used in file names: the file name up to its first `.`
///
/// ```
/// use metasim_core_rs::core::workspace::trace_name;
///
/// assert_eq!(trace_name("theta_2022.swf"), "theta_2022");
/// assert_eq!(trace_name("trace"), "trace");
/// ```
pub fn trace_name(trace_file: &str) -> &str {
    trace_file.split('.').next().unwrap_or(trace_file)
}
