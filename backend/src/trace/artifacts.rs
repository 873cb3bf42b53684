//! Formatted trace artifacts in the workspace `Fmt/` area
//!
//! - `<trace>_<id>.csv`: normalized jobs
//! - `<trace>_<id>.con`: JSON metadata of the job stream
//! - `<trace>_<id>_node.csv`: processor pool, one row per processor
//! - `<trace>_<id>_node.con`: JSON metadata of the pool

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use super::swf::ParsedTrace;
use crate::models::node::NodeRow;
use crate::models::NodeStructure;
use crate::orchestrator::SimulationError;

/// Contents of the job `.con` file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceConfig {
    pub source: PathBuf,
    pub fingerprint: String,
    pub job_count: usize,
    /// Raw submit time of the first job
    pub start_time: i64,
}

/// Contents of the node `.con` file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    pub capacity: u32,
    pub procs_per_node: u32,
}

pub fn write_job_artifacts(
    parsed: &ParsedTrace,
    csv_path: &Path,
    con_path: &Path,
) -> Result<TraceConfig, SimulationError> {
    write_rows(csv_path, parsed.jobs.iter())?;
    let config = TraceConfig {
        source: parsed.source.clone(),
        fingerprint: parsed.fingerprint.clone(),
        job_count: parsed.jobs.len(),
        start_time: parsed.first_submit(),
    };
    write_json(con_path, &config)?;
    Ok(config)
}

pub fn write_node_artifacts(
    nodes: &NodeStructure,
    csv_path: &Path,
    con_path: &Path,
) -> Result<(), SimulationError> {
    write_rows(csv_path, nodes.rows())?;
    write_json(
        con_path,
        &NodeConfig {
            capacity: nodes.total(),
            procs_per_node: 1,
        },
    )
}

fn write_rows<T: Serialize>(
    path: &Path,
    rows: impl Iterator<Item = T>,
) -> Result<(), SimulationError> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| artifact_error(path, e))?;
    for row in rows {
        writer.serialize(row).map_err(|e| artifact_error(path, e))?;
    }
    writer.flush().map_err(|source| SimulationError::Artifact {
        path: path.to_path_buf(),
        reason: source.to_string(),
    })
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), SimulationError> {
    let json = serde_json::to_string_pretty(value).map_err(|e| SimulationError::Artifact {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    fs::write(path, json).map_err(|source| SimulationError::Artifact {
        path: path.to_path_buf(),
        reason: source.to_string(),
    })
}

fn artifact_error(path: &Path, err: csv::Error) -> SimulationError {
    SimulationError::Artifact {
        path: path.to_path_buf(),
        reason: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TraceJob;
    use crate::trace::swf::{parse, TraceSource};

    #[test]
    fn test_job_artifacts_hold_normalized_jobs() {
        let dir = tempfile::tempdir().unwrap();
        let trace = dir.path().join("t.swf");
        fs::write(
            &trace,
            "; header\n1 100 0 10 4 -1 -1 4 20 -1 1 1 1 -1 1 -1 -1 -1\n\
             2 160 0 30 2 -1 -1 -1 -1 -1 1 1 1 -1 1 -1 -1 -1\n",
        )
        .unwrap();
        let parsed = parse(&TraceSource::read(&trace).unwrap()).unwrap();

        let csv_path = dir.path().join("t_0.csv");
        let con_path = dir.path().join("t_0.con");
        let written = write_job_artifacts(&parsed, &csv_path, &con_path).unwrap();
        let config: TraceConfig =
            serde_json::from_str(&fs::read_to_string(&con_path).unwrap()).unwrap();
        let jobs: Vec<TraceJob> = csv::Reader::from_path(&csv_path)
            .unwrap()
            .deserialize()
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(config, written);
        assert_eq!(config.start_time, 100);
        assert_eq!(jobs, parsed.jobs);
    }
}
