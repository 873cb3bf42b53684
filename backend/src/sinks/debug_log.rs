use std::path::Path;

use super::LineFile;
use crate::models::SimEvent;
use crate::orchestrator::SimulationError;

/// Debug sink of one instance
#[derive(Debug)]
pub struct DebugLog {
    level: u8,
    file: Option<LineFile>,
}

impl DebugLog {
    /// Open (truncating) the debug log at `path`
    pub fn open(path: &Path, level: u8) -> Result<Self, SimulationError> {
        Ok(Self {
            level,
            file: Some(LineFile::create(path)?),
        })
    }

    /// A sink that records nothing
    #[cfg(test)]
    pub(crate) fn disabled() -> Self {
        Self {
            level: 0,
            file: None,
        }
    }

    /// Copy for an isolated clone: same level, no file
    pub fn detached(&self) -> Self {
        Self {
            level: self.level,
            file: None,
        }
    }

    pub fn log(&mut self, event: &SimEvent) {
        if event.level() as u8 > self.level {
            return;
        }
        if let Some(file) = self.file.as_mut() {
            file.write_line(&event.to_string());
        }
    }

    pub fn flush(&mut self) {
        if let Some(file) = self.file.as_mut() {
            file.flush();
        }
    }
}
