//! Per-instance output sinks
//!
//! - `DebugLog`: level-filtered simulation events (`Debug/..._debug.log`)
//! - `OutputLog`: result records plus the system and adaptive traces
//!   (`Results/...rst|.ult|.adp`)
//!
//! Lines are buffered and flushed when the instance ends (or the sink is
//! dropped). Sinks never fail the simulation: a write error is reported once
//! through `tracing` and the affected file is detached. A detached sink (used by
//! rollout clones) keeps in-memory state but touches no file.

mod debug_log;
mod output_log;

pub use debug_log::DebugLog;
pub use output_log::{OutputLog, SystemSnapshot};

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::orchestrator::SimulationError;

/// Line-oriented file handle that detaches itself on the first write error
#[derive(Debug)]
struct LineFile {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
}

impl LineFile {
    fn create(path: &Path) -> Result<Self, SimulationError> {
        let file = File::create(path).map_err(|source| SimulationError::Sink {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            writer: Some(BufWriter::new(file)),
        })
    }

    fn write_line(&mut self, line: &str) {
        let Some(writer) = self.writer.as_mut() else {
            return;
        };
        if let Err(err) = writeln!(writer, "{line}") {
            self.detach(&err);
        }
    }

    /// Push buffered lines to disk; dropping the file does the same
    fn flush(&mut self) {
        let Some(writer) = self.writer.as_mut() else {
            return;
        };
        if let Err(err) = writer.flush() {
            self.detach(&err);
        }
    }

    fn detach(&mut self, err: &std::io::Error) {
        tracing::warn!(path = %self.path.display(), error = %err, "sink write failed; detaching");
        self.writer = None;
    }
}
