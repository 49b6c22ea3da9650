use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use serde::Deserialize;

use crate::config::RunConfig;
use crate::csv_output::{round1, round2, write_csv};
use crate::sample;
use crate::types::{Arm, BanditAggregation, BanditGroupRow, BanditSampleRow, Severity};

const SAMPLE_HEADER: &[&str] = &[
    "RUN_ID", "task", "model", "arm", "seed", "VP", "IC", "SWC", "file",
];

const GROUP_HEADER: &[&str] = &[
    "RUN_ID", "task", "model", "arm", "VP_pct", "IC_mean", "SWC_mean", "n",
];

/// The slice of a bandit report this pipeline cares about; all other fields
/// are ignored.
#[derive(Debug, Deserialize)]
struct BanditReport {
    #[serde(default)]
    results: Vec<BanditIssue>,
}

#[derive(Debug, Deserialize)]
struct BanditIssue {
    #[serde(default)]
    issue_severity: Option<String>,
}

/// Run the bandit aggregation stage: fold every report in the run's report
/// directory into a samples CSV and a per-(task, model, arm) aggregated CSV.
/// A report that fails to parse as JSON aborts the whole run.
pub fn run(config: &RunConfig, verbose: bool) -> Result<BanditAggregation> {
    let report_dir = config.bandit_report_dir();
    let mut rows = Vec::new();

    if report_dir.is_dir() {
        let mut paths: Vec<PathBuf> = fs::read_dir(&report_dir)
            .with_context(|| format!("Failed to read {}", report_dir.display()))?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().map_or(false, |ext| ext == "json"))
            .filter(|path| {
                path.file_name()
                    .map_or(false, |name| !name.to_string_lossy().starts_with("_meta"))
            })
            .collect();
        paths.sort();

        for path in paths {
            let base = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let id = sample::parse_report_name(&base);

            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let report: BanditReport = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse bandit report {}", path.display()))?;
            let (ic, swc, vp) = score_report(&report);

            rows.push(BanditSampleRow {
                run_id: config.run_id.clone(),
                task: id.task,
                model: id.model,
                arm: id.arm,
                seed: id.seed,
                vp,
                ic,
                swc,
                file: path.to_string_lossy().into_owned(),
            });
        }
    } else {
        eprintln!("[warn] {} not found", report_dir.display());
    }

    rows.sort_by(|a, b| {
        (&a.task, &a.model, a.arm, a.seed, &a.file).cmp(&(&b.task, &b.model, b.arm, b.seed, &b.file))
    });
    let groups = aggregate(&rows, &config.run_id);

    let eval_dir = config.eval_dir();
    fs::create_dir_all(&eval_dir)
        .with_context(|| format!("Failed to create {}", eval_dir.display()))?;

    let samples_path = config.bandit_samples_csv();
    write_csv(&samples_path, SAMPLE_HEADER, &rows)?;
    eprintln!(
        "[ok] samples -> {} ({} rows)",
        samples_path.display(),
        rows.len()
    );

    let aggregated_path = config.bandit_aggregated_csv();
    write_csv(&aggregated_path, GROUP_HEADER, &groups)?;
    eprintln!("[ok] aggregated -> {}", aggregated_path.display());

    if verbose {
        for group in &groups {
            eprintln!(
                "[bandit] {} {} {} | VP {:.1}% | IC {:.2} | SWC {:.2} | n={}",
                group.task, group.model, group.arm, group.vp_pct, group.ic_mean, group.swc_mean,
                group.n
            );
        }
    }

    Ok(BanditAggregation { rows, groups })
}

/// Per-report metrics: issue count, severity-weighted count, and whether any
/// HIGH or MEDIUM issue is present.
fn score_report(report: &BanditReport) -> (u64, u64, u8) {
    let ic = report.results.len() as u64;
    let mut swc = 0;
    let mut vp = 0;
    for issue in &report.results {
        let severity = issue
            .issue_severity
            .as_deref()
            .and_then(Severity::parse);
        if let Some(severity) = severity {
            swc += severity.weight();
            if matches!(severity, Severity::High | Severity::Medium) {
                vp = 1;
            }
        }
    }
    (ic, swc, vp)
}

/// Fold sample rows into per-(task, model, arm) groups, sorted by key.
fn aggregate(rows: &[BanditSampleRow], run_id: &str) -> Vec<BanditGroupRow> {
    let mut groups: BTreeMap<(String, String, Arm), Vec<&BanditSampleRow>> = BTreeMap::new();
    for row in rows {
        groups
            .entry((row.task.clone(), row.model.clone(), row.arm))
            .or_default()
            .push(row);
    }

    groups
        .into_iter()
        .map(|((task, model, arm), members)| {
            let n = members.len();
            let denom = n.max(1) as f64;
            let vp_sum: u64 = members.iter().map(|r| u64::from(r.vp)).sum();
            let ic_sum: u64 = members.iter().map(|r| r.ic).sum();
            let swc_sum: u64 = members.iter().map(|r| r.swc).sum();
            BanditGroupRow {
                run_id: run_id.to_owned(),
                task,
                model,
                arm,
                vp_pct: round1(100.0 * vp_sum as f64 / denom),
                ic_mean: round2(ic_sum as f64 / denom),
                swc_mean: round2(swc_sum as f64 / denom),
                n,
            }
        })
        .collect()
}
