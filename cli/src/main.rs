//! metasim - command-line driver for the metascheduling simulator
//!
//! ```text
//! metasim job-data data/theta_2022.swf
//! metasim run sweeps/theta_split.json --root results
//! ```

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use metasim_core_rs::experiment::{ExperimentSpec, ProgressBoard};
use metasim_core_rs::{load_job_data, run_sweep};

#[derive(Parser)]
#[command(name = "metasim")]
#[command(about = "Multi-cluster HPC scheduling simulator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize the jobs of an SWF trace
    JobData {
        /// Trace file
        trace: PathBuf,

        /// Print every job as JSON instead of a summary
        #[arg(long)]
        json: bool,
    },

    /// Run a sweep of experiments, one thread per experiment
    Run {
        /// JSON array of experiment descriptions
        sweep: PathBuf,

        /// Directory that receives one workspace per experiment tag
        #[arg(long, default_value = "results")]
        root: PathBuf,

        /// Progress line every N routed jobs
        #[arg(long, default_value_t = 1000)]
        progress_every: usize,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::JobData { trace, json } => job_data(&trace, json),
        Commands::Run {
            sweep,
            root,
            progress_every,
        } => run(&sweep, &root, progress_every),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            tracing::error!("{message}");
            ExitCode::FAILURE
        }
    }
}

fn job_data(trace: &Path, json: bool) -> Result<(), String> {
    let dir = trace.parent().unwrap_or_else(|| Path::new("."));
    let file = trace
        .file_name()
        .and_then(|f| f.to_str())
        .ok_or_else(|| format!("not a trace file: {}", trace.display()))?;
    let data = load_job_data(dir, file).map_err(|e| e.to_string())?;

    if json {
        let text = serde_json::to_string_pretty(&data).map_err(|e| e.to_string())?;
        println!("{text}");
        return Ok(());
    }

    println!("trace:  {}", trace.display());
    println!("jobs:   {}", data.len());
    if data.is_empty() {
        return Ok(());
    }
    let max_procs = data.procs.iter().copied().max().unwrap_or(0);
    let mean_procs = data.procs.iter().map(|&p| f64::from(p)).sum::<f64>() / data.len() as f64;
    let first = data.submits.iter().copied().min().unwrap_or(0);
    let last = data.submits.iter().copied().max().unwrap_or(0);
    println!("procs:  max {max_procs}, mean {mean_procs:.1}");
    println!("span:   {}s", last.saturating_sub(first));
    Ok(())
}

fn run(sweep: &Path, root: &Path, progress_every: usize) -> Result<(), String> {
    let specs = ExperimentSpec::load_sweep(sweep).map_err(|e| e.to_string())?;
    tracing::info!(experiments = specs.len(), root = %root.display(), "sweep started");

    let progress = ProgressBoard::stderr(progress_every);
    let outcomes = run_sweep(&specs, root, &progress);

    let mut failed = 0;
    for (spec, outcome) in specs.iter().zip(outcomes) {
        match outcome {
            Ok(outcome) => {
                let path = root.join(&spec.tag).join("outcome.json");
                outcome.write_json(&path).map_err(|e| e.to_string())?;
                println!("{} (skipped {})", outcome.tag, outcome.skipped);
                for cluster in &outcome.clusters {
                    println!(
                        "  {:<16} jobs {:>7}  wait {:>10.1}  turnaround {:>10.1}",
                        cluster.name,
                        cluster.summary.jobs,
                        cluster.summary.mean_wait,
                        cluster.summary.mean_turnaround
                    );
                }
            }
            Err(e) => {
                failed += 1;
                tracing::error!(tag = %spec.tag, "{e}");
            }
        }
    }

    if failed > 0 {
        return Err(format!("{failed} of {} experiments failed", specs.len()));
    }
    Ok(())
}
