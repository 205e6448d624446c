//! CryoSim command-line interface.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use cryo_exec::{Execution, Executor, JobOutcome, RemoteJob, RouterConfig};
use cryo_types::config::{
    AnalysisSpec, MarginOptions, SimulationRequest, SystemDescription, TransientOptions,
};
use cryo_types::progress::ProgressUpdate;
use cryo_types::state::SimulationResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum AnalysisKind {
    Steady,
    Transient,
    Field,
    Margin,
}

#[derive(Parser)]
#[command(name = "cryosim")]
#[command(about = "Cryogenic thermal and superconducting magnet simulator", long_about = None)]
#[command(version)]
struct Cli {
    /// System description or full simulation request (JSON)
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Analysis to run; overrides the one in a request file
    #[arg(short, long, value_enum)]
    analysis: Option<AnalysisKind>,

    /// Simulated time for transient runs [s]
    #[arg(long, default_value_t = 3600.0)]
    max_time: f64,

    /// Write the JSON result to this file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Element count at which thermal runs go remote
    #[arg(long, value_name = "N")]
    threshold: Option<usize>,

    /// Segment evaluations at which field and margin runs go remote
    #[arg(long, value_name = "N")]
    field_threshold: Option<usize>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let request = load_request(&cli.input, cli.analysis, cli.max_time)?;

    let mut config = RouterConfig::default();
    if let Some(n) = cli.threshold {
        config.local_threshold = n;
    }
    if let Some(n) = cli.field_threshold {
        config.local_field_evaluations = n;
    }
    let executor = Executor::new(config);
    if cli.verbose {
        eprintln!(
            "System '{}': {} analysis, size {}",
            request.system.name,
            request.analysis.name(),
            cryo_exec::problem_size(&request)
        );
    }

    let execution = executor.submit(request).context("Failed to start analysis")?;
    if cli.verbose {
        eprintln!("Execution: {}", execution.target());
    }
    let result = match execution {
        Execution::Local(result) => result.context("Analysis failed")?,
        Execution::Remote(job) => follow_remote(job, cli.verbose)?,
    };

    if cli.verbose {
        if let Some(meta) = result.metadata() {
            eprintln!(
                "Done: {} iterations, converged={}, {:.3} s",
                meta.iterations, meta.converged, meta.wall_time_s
            );
        }
    }
    write_result(&result, cli.output.as_deref())
}

/// Accept either a `SimulationRequest` or a bare `SystemDescription`.
fn load_request(
    path: &Path,
    analysis: Option<AnalysisKind>,
    max_time: f64,
) -> Result<SimulationRequest> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read input: {}", path.display()))?;

    if let Ok(mut request) = serde_json::from_str::<SimulationRequest>(&content) {
        if let Some(kind) = analysis {
            request.analysis = analysis_spec(kind, max_time, Some(request.analysis))?;
        }
        return Ok(request);
    }

    let system = SystemDescription::from_json(&content)
        .with_context(|| format!("Failed to parse system description: {}", path.display()))?;
    let kind = analysis.unwrap_or(AnalysisKind::Steady);
    Ok(SimulationRequest {
        system,
        analysis: analysis_spec(kind, max_time, None)?,
    })
}

fn analysis_spec(
    kind: AnalysisKind,
    max_time: f64,
    existing: Option<AnalysisSpec>,
) -> Result<AnalysisSpec> {
    Ok(match (kind, existing) {
        (AnalysisKind::Steady, _) => AnalysisSpec::SteadyState,
        (AnalysisKind::Transient, Some(spec @ AnalysisSpec::Transient(_))) => spec,
        (AnalysisKind::Transient, _) => AnalysisSpec::Transient(TransientOptions::new(max_time)),
        (AnalysisKind::Field, Some(spec @ AnalysisSpec::FieldMap(_))) => spec,
        (AnalysisKind::Field, _) => {
            bail!("Field maps need a request file that defines the sampling grid")
        }
        (AnalysisKind::Margin, Some(spec @ AnalysisSpec::Margin(_))) => spec,
        (AnalysisKind::Margin, _) => AnalysisSpec::Margin(MarginOptions::default()),
    })
}

fn print_progress(update: &ProgressUpdate) {
    eprintln!(
        "  [{:5.1}%] step {:>6}  metric {:.3e}",
        100.0 * update.fraction_complete,
        update.current_step,
        update.residual_or_metric
    );
}

/// Forward progress until the worker drops its sender. Returns the number
/// of updates seen.
fn drain_progress(
    progress: &Receiver<ProgressUpdate>,
    poll: Duration,
    mut on_update: impl FnMut(&ProgressUpdate),
) -> usize {
    let mut seen = 0;
    loop {
        match progress.recv_timeout(poll) {
            Ok(update) => {
                seen += 1;
                on_update(&update);
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => return seen,
        }
    }
}

/// Follow a remote job to its terminal state.
fn follow_remote(job: RemoteJob, verbose: bool) -> Result<SimulationResult> {
    eprintln!("Running on a worker thread...");
    drain_progress(job.progress(), Duration::from_millis(250), |update| {
        if verbose {
            print_progress(update);
        }
    });

    match job.wait() {
        JobOutcome::Completed(result) => Ok(result),
        JobOutcome::Failed(err) => Err(err).context("Analysis failed"),
        JobOutcome::Cancelled { step } => bail!("Analysis cancelled at step {step}"),
        JobOutcome::Crashed(message) => bail!("Worker crashed: {message}"),
    }
}

fn write_result(result: &SimulationResult, output: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(result).context("Failed to serialize result")?;
    match output {
        Some(path) => {
            fs::write(path, json)
                .with_context(|| format!("Failed to write result: {}", path.display()))?;
            eprintln!("Wrote {} result to {}", result.analysis(), path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_flags() {
        let cli = Cli::try_parse_from([
            "cryosim",
            "system.json",
            "--analysis",
            "transient",
            "--max-time",
            "120",
            "--threshold",
            "10",
            "-v",
        ])
        .unwrap();
        assert_eq!(cli.analysis, Some(AnalysisKind::Transient));
        assert_eq!(cli.max_time, 120.0);
        assert_eq!(cli.threshold, Some(10));
        assert!(cli.verbose);
    }

    #[test]
    fn test_field_needs_grid() {
        assert!(analysis_spec(AnalysisKind::Field, 1.0, None).is_err());
        let kept = analysis_spec(
            AnalysisKind::Margin,
            1.0,
            Some(AnalysisSpec::Margin(MarginOptions::default())),
        )
        .unwrap();
        assert_eq!(kept.name(), "margin");
    }

    #[test]
    fn test_loads_bare_system_and_request() {
        let root = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../configs");
        let steady = load_request(&root.join("support_rod_cooldown.json"), None, 60.0).unwrap();
        assert_eq!(steady.analysis.name(), "steady_state");
        let margin = load_request(&root.join("solenoid_margin.json"), None, 60.0).unwrap();
        assert_eq!(margin.analysis.name(), "margin");
        let transient = load_request(
            &root.join("support_rod_cooldown.json"),
            Some(AnalysisKind::Transient),
            60.0,
        )
        .unwrap();
        match transient.analysis {
            AnalysisSpec::Transient(opts) => assert_eq!(opts.max_time, 60.0),
            other => panic!("expected transient, got {}", other.name()),
        }
    }

    #[test]
    fn test_progress_drain_stops_when_worker_hangs_up() {
        let (tx, rx) = std::sync::mpsc::sync_channel(4);
        for step in 1..=2 {
            tx.send(ProgressUpdate {
                fraction_complete: step as f64 / 2.0,
                current_step: step,
                residual_or_metric: 0.0,
            })
            .unwrap();
        }
        drop(tx);
        let mut steps = Vec::new();
        let seen = drain_progress(&rx, Duration::from_secs(60), |u| steps.push(u.current_step));
        assert_eq!(seen, 2);
        assert_eq!(steps, vec![1, 2]);
    }
}
