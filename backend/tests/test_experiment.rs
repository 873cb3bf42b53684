//! Whole experiments and parallel sweeps

mod common;

use common::{uniform_jobs, write_trace};
use metasim_core_rs::experiment::{
    run_experiment, run_sweep, ClusterRole, ClusterSpec, ExperimentOutcome, ExperimentSpec,
    ProgressBoard,
};
use metasim_core_rs::{PolicyConfig, RoutingPolicy, SimulationError};
use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};

fn spec(tag: &str, trace_dir: &Path, routing: RoutingPolicy) -> ExperimentSpec {
    let mut reference = ClusterSpec::new("reference", 8);
    reference.role = ClusterRole::Observer;
    ExperimentSpec {
        tag: tag.to_string(),
        trace_dir: trace_dir.to_path_buf(),
        trace_file: "trace.swf".to_string(),
        clusters: vec![ClusterSpec::new("a", 4), ClusterSpec::new("b", 4), reference],
        routing,
        seed: 7,
        policy: PolicyConfig::EasyBackfill,
    }
}

#[test]
fn test_experiment_routes_every_job() {
    let dir = tempfile::tempdir().unwrap();
    write_trace(dir.path(), "trace.swf", &uniform_jobs(10, 5, 12, 2));

    let outcome = run_experiment(
        &spec("predicted", dir.path(), RoutingPolicy::PredictedTurnaround),
        &dir.path().join("results"),
        &ProgressBoard::silent(),
    )
    .unwrap();

    assert_eq!(outcome.assignments.len(), 10);
    assert_eq!(outcome.skipped, 0);
    let a = outcome.cluster("a").unwrap();
    let b = outcome.cluster("b").unwrap();
    assert_eq!(a.summary.jobs + b.summary.jobs, 10);
    assert_eq!(a.admitted + b.admitted, 10);
    assert_eq!(outcome.cluster("reference").unwrap().summary.jobs, 10);
    assert!(dir.path().join("results/predicted/Results").is_dir());
}

#[test]
fn test_oversized_jobs_are_skipped_by_all_clusters() {
    let dir = tempfile::tempdir().unwrap();
    write_trace(dir.path(), "trace.swf", &[(1, 0, 5, 2), (2, 1, 5, 16), (3, 2, 5, 2)]);

    let outcome = run_experiment(
        &spec("skip", dir.path(), RoutingPolicy::FirstFeasible),
        &dir.path().join("results"),
        &ProgressBoard::silent(),
    )
    .unwrap();

    assert_eq!(outcome.skipped, 1);
    assert_eq!(
        outcome.assignments,
        vec![Some("a".to_string()), None, Some("a".to_string())]
    );
    // the observer never sees a skipped job either
    assert_eq!(outcome.cluster("reference").unwrap().summary.jobs, 2);
}

#[test]
fn test_scaled_cluster_reports_longer_runs() {
    let dir = tempfile::tempdir().unwrap();
    write_trace(dir.path(), "trace.swf", &uniform_jobs(4, 100, 10, 1));
    let mut s = spec("scaled", dir.path(), RoutingPolicy::FirstFeasible);
    s.clusters[0].run_scale = 2.0;

    let outcome = run_experiment(&s, &dir.path().join("results"), &ProgressBoard::silent()).unwrap();

    let a = outcome.cluster("a").unwrap();
    assert_eq!(a.summary.jobs, 4);
    assert_eq!(a.summary.mean_turnaround, 20.0);
}

#[test]
fn test_sweep_runs_independent_experiments() {
    let dir = tempfile::tempdir().unwrap();
    write_trace(dir.path(), "trace.swf", &uniform_jobs(8, 3, 6, 1));
    let root = dir.path().join("results");

    let specs = vec![
        spec("first", dir.path(), RoutingPolicy::FirstFeasible),
        spec(
            "weighted",
            dir.path(),
            RoutingPolicy::Probabilistic {
                weights: vec![1.0, 3.0],
            },
        ),
        spec("predicted", dir.path(), RoutingPolicy::PredictedTurnaround),
    ];
    let outcomes = run_sweep(&specs, &root, &ProgressBoard::silent());

    assert_eq!(outcomes.len(), 3);
    for (spec, outcome) in specs.iter().zip(&outcomes) {
        let outcome = outcome.as_ref().unwrap();
        assert_eq!(outcome.tag, spec.tag);
        assert!(root.join(&spec.tag).join("Fmt").is_dir());
    }
}

#[test]
fn test_sweep_is_reproducible() {
    let dir = tempfile::tempdir().unwrap();
    write_trace(dir.path(), "trace.swf", &uniform_jobs(12, 2, 9, 2));
    let weighted = RoutingPolicy::Probabilistic {
        weights: vec![1.0, 1.0],
    };

    let first = run_experiment(
        &spec("one", dir.path(), weighted.clone()),
        &dir.path().join("r1"),
        &ProgressBoard::silent(),
    )
    .unwrap();
    let second = run_experiment(
        &spec("one", dir.path(), weighted),
        &dir.path().join("r2"),
        &ProgressBoard::silent(),
    )
    .unwrap();
    assert_eq!(first.assignments, second.assignments);
}

#[test]
fn test_duplicate_tags_refused() {
    let dir = tempfile::tempdir().unwrap();
    write_trace(dir.path(), "trace.swf", &uniform_jobs(2, 1, 1, 1));
    let specs = vec![
        spec("same", dir.path(), RoutingPolicy::FirstFeasible),
        spec("same", dir.path(), RoutingPolicy::FirstFeasible),
    ];

    let outcomes = run_sweep(&specs, &dir.path().join("results"), &ProgressBoard::silent());

    assert!(outcomes[0].is_ok());
    assert!(matches!(outcomes[1], Err(SimulationError::InvalidConfig(_))));
}

#[test]
fn test_failing_experiment_does_not_stop_the_sweep() {
    let dir = tempfile::tempdir().unwrap();
    write_trace(dir.path(), "trace.swf", &uniform_jobs(2, 1, 1, 1));
    let mut broken = spec("broken", dir.path(), RoutingPolicy::FirstFeasible);
    broken.trace_file = "missing.swf".to_string();
    let specs = vec![broken, spec("fine", dir.path(), RoutingPolicy::FirstFeasible)];

    let outcomes = run_sweep(&specs, &dir.path().join("results"), &ProgressBoard::silent());

    assert!(matches!(outcomes[0], Err(SimulationError::TraceIo { .. })));
    assert!(outcomes[1].is_ok());
}

/// Collects progress output for inspection
#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl Write for Captured {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[test]
fn test_progress_lines_do_not_interleave() {
    let dir = tempfile::tempdir().unwrap();
    write_trace(dir.path(), "trace.swf", &uniform_jobs(20, 1, 2, 1));
    let captured = Captured::default();
    let board = ProgressBoard::new(Box::new(captured.clone()), 5);

    let specs = vec![
        spec("x", dir.path(), RoutingPolicy::FirstFeasible),
        spec("y", dir.path(), RoutingPolicy::FirstFeasible),
    ];
    run_sweep(&specs, &dir.path().join("results"), &board);

    let text = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert!(lines.contains(&"[x] 20/20 jobs routed"));
    assert!(lines.contains(&"[y] done"));
    for line in lines {
        assert!(line.starts_with("[x] ") || line.starts_with("[y] "), "{line}");
    }
}

#[test]
fn test_outcome_written_as_json() {
    let dir = tempfile::tempdir().unwrap();
    write_trace(dir.path(), "trace.swf", &uniform_jobs(3, 1, 1, 1));
    let root = dir.path().join("results");
    let outcome = run_experiment(
        &spec("json", dir.path(), RoutingPolicy::FirstFeasible),
        &root,
        &ProgressBoard::silent(),
    )
    .unwrap();

    let path = root.join("json").join("outcome.json");
    outcome.write_json(&path).unwrap();
    let back: ExperimentOutcome = serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
    assert_eq!(back, outcome);
}

#[test]
fn test_sweep_file_parses() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sweep.json");
    fs::write(
        &path,
        r#"[{
            "tag": "probable_110",
            "trace_dir": "data",
            "trace_file": "theta.swf",
            "clusters": [
                {"name": "theta", "capacity": 4360},
                {"name": "polaris", "capacity": 2240, "run_scale": 1.1, "policy": {"type": "Fcfs"}}
            ],
            "routing": {"type": "Probabilistic", "weights": [0.5, 0.5]},
            "seed": 3
        }]"#,
    )
    .unwrap();

    let specs = ExperimentSpec::load_sweep(&path).unwrap();
    assert_eq!(specs.len(), 1);
    assert_eq!(specs[0].clusters[1].policy, Some(PolicyConfig::Fcfs));
    assert_eq!(specs[0].policy, PolicyConfig::EasyBackfill);
}
