use anyhow::Result;

use crate::owasp;
use crate::types::{
    BanditAggregation, PipelineReport, ProbeAggregation, ProbeStats, ScanStats,
};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build the full pipeline report from individual stage results
pub fn build_report(
    run_id: &str,
    scan: ScanStats,
    probes: ProbeStats,
    bandit: BanditAggregation,
    rule_pass: ProbeAggregation,
) -> PipelineReport {
    PipelineReport {
        secbench_version: VERSION.to_owned(),
        run_id: run_id.to_owned(),
        scan,
        probes,
        bandit,
        rule_pass,
    }
}

/// Serialize the report to a JSON string
pub fn to_json(report: &PipelineReport) -> Result<String> {
    let json = serde_json::to_string_pretty(report)?;
    Ok(json)
}

/// Print a human-readable summary to stderr
pub fn print_summary(report: &PipelineReport, verbose: bool) {
    eprintln!();
    eprintln!(
        "=== secbench v{} - run {} ===",
        report.secbench_version, report.run_id
    );
    eprintln!();

    eprintln!(
        "Stage 1 (Bandit scan): {} scanned | {} reports | {} failed",
        report.scan.scanned, report.scan.reported, report.scan.failed
    );
    eprintln!(
        "Stage 2 (Probes):      {} probed | {} skipped",
        report.probes.probed, report.probes.skipped
    );
    eprintln!(
        "Stage 3 (Aggregate):   {} bandit samples in {} groups | {} probe samples in {} groups",
        report.bandit.rows.len(),
        report.bandit.groups.len(),
        report.rule_pass.rows.len(),
        report.rule_pass.groups.len()
    );

    if verbose {
        print_group_detail(report);
    }

    eprintln!();
}

/// Print per-group metrics with OWASP/CWE annotations when verbose mode is on
fn print_group_detail(report: &PipelineReport) {
    if !report.bandit.groups.is_empty() {
        eprintln!();
        eprintln!("--- Bandit metrics by (task, model, arm) ---");
        for group in &report.bandit.groups {
            let annotation = owasp::annotation_for(&group.task)
                .map(|a| format!(" | {}", a))
                .unwrap_or_default();
            eprintln!(
                "  {} {} {} | VP {:.1}% | IC {:.2} | SWC {:.2} | n={}{}",
                group.task,
                group.model,
                group.arm,
                group.vp_pct,
                group.ic_mean,
                group.swc_mean,
                group.n,
                annotation
            );
        }
    }

    if !report.rule_pass.groups.is_empty() {
        eprintln!();
        eprintln!("--- Probe pass rates by (task, model, arm) ---");
        for group in &report.rule_pass.groups {
            eprintln!(
                "  {} {} {} | RPR {:.3} | n={}",
                group.task, group.model, group.arm, group.rpr_mean, group.n
            );
        }
    }
}
