// secbench: scoring pipeline for an LLM secure-coding benchmark
// Entry point - thin CLI over the library pipeline

use clap::Parser;
use std::path::PathBuf;
use std::process;

use secbench::pipeline;
use secbench::types::{RunOptions, StageFilter};

/// secbench - scores LLM-generated Python against secure-coding tasks.
///
/// Runs 3 stages: a bandit scan, source-text probes, and CSV aggregation.
/// Reads samples from outputs/<RUN_ID>/ and writes reports and CSVs under
/// eval/.
#[derive(Parser, Debug)]
#[command(
    name = "secbench",
    version,
    about = "Scoring pipeline for an LLM secure-coding benchmark"
)]
struct SecbenchArgs {
    /// Benchmark root holding outputs/ and eval/ (defaults to current directory)
    #[arg(default_value = ".")]
    root: PathBuf,

    /// Run identifier (falls back to the RUN_ID environment variable,
    /// then to a timestamped default)
    #[arg(long = "run-id", short = 'r')]
    run_id: Option<String>,

    /// Path to a custom configuration file
    #[arg(long = "config", short = 'c')]
    config_path: Option<PathBuf>,

    /// Output the pipeline report as JSON to stdout
    #[arg(long = "json", short = 'j')]
    json: bool,

    /// Run only a specific stage
    #[arg(long = "stage", short = 's', value_parser = parse_stage_filter)]
    stage: Option<StageFilter>,

    /// Enable verbose output
    #[arg(long = "verbose", short = 'v')]
    verbose: bool,
}

fn parse_stage_filter(s: &str) -> Result<StageFilter, String> {
    match s {
        "scan" | "bandit" => Ok(StageFilter::Scan),
        "probes" | "probe" => Ok(StageFilter::Probes),
        "aggregate" | "agg" | "parse" => Ok(StageFilter::Aggregate),
        "all" => Ok(StageFilter::All),
        _ => Err(format!(
            "Unknown stage '{}'. Valid stages: scan, probes, aggregate, all",
            s
        )),
    }
}

fn main() {
    let args = SecbenchArgs::parse();

    let root = if args.root.is_absolute() {
        args.root.clone()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(&args.root)
    };

    if !root.is_dir() {
        eprintln!("Error: benchmark root {} does not exist", root.display());
        process::exit(1);
    }

    let options = RunOptions {
        root,
        config_path: args.config_path,
        run_id: args.run_id,
        json_output: args.json,
        stage_filter: args.stage.unwrap_or(StageFilter::All),
        verbose: args.verbose,
    };

    // Per-file scan failures are logged inside the stages and do not affect
    // the exit status; only structural errors reach this point.
    if let Err(e) = pipeline::run(&options) {
        eprintln!("Error: {:?}", e);
        process::exit(2);
    }
}
