//! Manager configuration
//!
//! Everything an `InstanceManager` needs is passed in explicitly at
//! construction time, including the workspace name.
//!
//! # Example
//!
//! ```rust
//! use metasim_core_rs::orchestrator::{ManagerConfig, WorkspaceName};
//!
//! let config = ManagerConfig::new("/tmp/results", WorkspaceName::tagged("optimal_110"));
//! assert!(config.workspace_dir().ends_with("optimal_110"));
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use super::SimulationError;
use crate::policy::PolicyConfig;

/// Name of the experiment directory under the results root
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name")]
pub enum WorkspaceName {
    /// Chosen by the caller, e.g. `probable_user_110_50`
    Tagged(String),
    /// Opaque generated name
    Generated(String),
}

impl WorkspaceName {
    pub fn tagged(tag: impl Into<String>) -> Self {
        WorkspaceName::Tagged(tag.into())
    }

    /// Fresh `exp_<uuid>` name
    pub fn generate() -> Self {
        WorkspaceName::Generated(format!("exp_{}", Uuid::new_v4().simple()))
    }

    pub fn dir_name(&self) -> &str {
        match self {
            WorkspaceName::Tagged(name) | WorkspaceName::Generated(name) => name,
        }
    }
}

/// Rollout worker settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RolloutConfig {
    /// Upper bound on clone steps; `None` trusts the policy to drain
    #[serde(default)]
    pub max_steps: Option<u64>,

    /// Capacity of the result channel between worker and caller
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

fn default_channel_capacity() -> usize {
    1024
}

impl Default for RolloutConfig {
    fn default() -> Self {
        Self {
            max_steps: None,
            channel_capacity: default_channel_capacity(),
        }
    }
}

/// Complete manager configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManagerConfig {
    /// Directory that holds experiment workspaces
    pub root: PathBuf,

    pub workspace: WorkspaceName,

    /// Debug sink verbosity (0 = nothing, 3 = every event)
    #[serde(default = "default_debug_level")]
    pub debug_level: u8,

    /// Scheduling policy for instances created without an explicit one
    #[serde(default)]
    pub policy: PolicyConfig,

    #[serde(default)]
    pub rollout: RolloutConfig,
}

fn default_debug_level() -> u8 {
    3
}

impl ManagerConfig {
    pub fn new(root: impl Into<PathBuf>, workspace: WorkspaceName) -> Self {
        Self {
            root: root.into(),
            workspace,
            debug_level: default_debug_level(),
            policy: PolicyConfig::default(),
            rollout: RolloutConfig::default(),
        }
    }

    /// Load from a JSON file
    pub fn from_json_file(path: &Path) -> Result<Self, SimulationError> {
        let text = fs::read_to_string(path).map_err(|e| {
            SimulationError::InvalidConfig(format!("cannot read {}: {e}", path.display()))
        })?;
        serde_json::from_str(&text).map_err(|e| {
            SimulationError::InvalidConfig(format!("cannot parse {}: {e}", path.display()))
        })
    }

    /// `<root>/<workspace name>`
    pub fn workspace_dir(&self) -> PathBuf {
        self.root.join(self.workspace.dir_name())
    }

    pub fn validate(&self) -> Result<(), SimulationError> {
        let name = self.workspace.dir_name();
        if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
            return Err(SimulationError::InvalidConfig(format!(
                "workspace name '{name}' must be a single path component"
            )));
        }
        if self.rollout.channel_capacity == 0 {
            return Err(SimulationError::InvalidConfig(
                "rollout.channel_capacity must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}
