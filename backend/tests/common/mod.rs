//! Shared fixtures: SWF traces in a temp directory and managers over them
#![allow(dead_code)]

use std::fs;
use std::path::Path;

use metasim_core_rs::orchestrator::{InstanceId, InstanceManager, ManagerConfig, WorkspaceName};
use metasim_core_rs::PolicyConfig;
use tempfile::TempDir;

/// (id, submit, run, procs) of one trace job
pub type Job = (i64, i64, i64, u32);

/// One SWF line; requested time equals run time
pub fn swf_line(&(id, submit, run, procs): &Job) -> String {
    format!("{id} {submit} 0 {run} {procs} -1 -1 {procs} {run} -1 1 1 -1 -1 -1 -1 -1 -1")
}

pub fn write_trace(dir: &Path, file: &str, jobs: &[Job]) {
    let mut text = String::from("; Version: 2.2\n; Computer: test\n");
    for job in jobs {
        text.push_str(&swf_line(job));
        text.push('\n');
    }
    fs::write(dir.join(file), text).unwrap();
}

/// Temp directory holding `trace.swf` plus a manager writing into it
pub struct Fixture {
    pub dir: TempDir,
    pub manager: InstanceManager,
}

impl Fixture {
    pub fn new(jobs: &[Job]) -> Self {
        Self::with_policy(jobs, PolicyConfig::Fcfs)
    }

    pub fn with_policy(jobs: &[Job], policy: PolicyConfig) -> Self {
        let dir = tempfile::tempdir().unwrap();
        write_trace(dir.path(), "trace.swf", jobs);
        let mut config = ManagerConfig::new(dir.path().join("results"), WorkspaceName::tagged("exp"));
        config.policy = policy;
        let manager = InstanceManager::new(config).unwrap();
        Self { dir, manager }
    }

    pub fn trace_dir(&self) -> &Path {
        self.dir.path()
    }

    pub fn instance(&mut self, capacity: u32) -> InstanceId {
        let dir = self.dir.path().to_path_buf();
        self.manager
            .create_instance(&dir, "trace.swf", capacity)
            .unwrap()
    }
}

/// Step one instance until it has ended; returns the number of steps
pub fn drain(manager: &mut InstanceManager, id: InstanceId) -> usize {
    let mut steps = 0;
    while !manager.is_ended(id) {
        manager.step(id);
        steps += 1;
        assert!(steps < 100_000, "instance {id} does not end");
    }
    steps
}

/// Jobs `1..=n`, one every `gap` seconds, all `run` long on `procs` processors
pub fn uniform_jobs(n: i64, gap: i64, run: i64, procs: u32) -> Vec<Job> {
    (1..=n).map(|i| (i, (i - 1) * gap, run, procs)).collect()
}
