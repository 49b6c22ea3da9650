use anyhow::Result;

use crate::aggregate_bandit;
use crate::aggregate_probes;
use crate::config;
use crate::json_output;
use crate::stage_probes;
use crate::stage_scan;
use crate::types::{
    BanditAggregation, PipelineReport, ProbeAggregation, ProbeStats, RunOptions, ScanStats,
    StageFilter,
};

/// Run the full secbench pipeline according to the given options.
/// Returns the aggregated pipeline report.
pub fn run(options: &RunOptions) -> Result<PipelineReport> {
    let config = config::resolve(options)?;

    if options.verbose {
        eprintln!("[pipeline] Root: {}", config.root.display());
        eprintln!("[pipeline] Run id: {}", config.run_id);
    }

    // Stage 1: Bandit scan
    let scan = if should_run_stage(&options.stage_filter, &StageFilter::Scan) {
        if options.verbose {
            eprintln!("[pipeline] === Stage 1: Bandit scan ===");
        }
        stage_scan::run(&config, options.verbose)?
    } else {
        if options.verbose {
            eprintln!("[pipeline] Skipping Stage 1 (bandit scan)");
        }
        ScanStats::default()
    };

    // Stage 2: Probes
    let probes = if should_run_stage(&options.stage_filter, &StageFilter::Probes) {
        if options.verbose {
            eprintln!("[pipeline] === Stage 2: Probes ===");
        }
        stage_probes::run(&config, options.verbose)?
    } else {
        if options.verbose {
            eprintln!("[pipeline] Skipping Stage 2 (probes)");
        }
        ProbeStats::default()
    };

    // Stage 3: Aggregation
    let (bandit, rule_pass) = if should_run_stage(&options.stage_filter, &StageFilter::Aggregate) {
        if options.verbose {
            eprintln!("[pipeline] === Stage 3: Aggregation ===");
        }
        (
            aggregate_bandit::run(&config, options.verbose)?,
            aggregate_probes::run(&config, options.verbose)?,
        )
    } else {
        if options.verbose {
            eprintln!("[pipeline] Skipping Stage 3 (aggregation)");
        }
        (BanditAggregation::default(), ProbeAggregation::default())
    };

    // Build the final report
    let report = json_output::build_report(&config.run_id, scan, probes, bandit, rule_pass);

    // Output
    if options.json_output {
        let json = json_output::to_json(&report)?;
        println!("{}", json);
    } else {
        json_output::print_summary(&report, options.verbose);
    }

    Ok(report)
}

/// Determine if a particular stage should run based on the filter
fn should_run_stage(filter: &StageFilter, stage: &StageFilter) -> bool {
    match filter {
        StageFilter::All => true,
        other => other == stage,
    }
}
