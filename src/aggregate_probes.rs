use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use crate::config::RunConfig;
use crate::csv_output::{round3, write_csv};
use crate::types::{Arm, ProbeAggregation, ProbeGroupRow, ProbeReport, ProbeSampleRow};

const SAMPLE_HEADER: &[&str] = &[
    "RUN_ID",
    "task",
    "model",
    "arm",
    "seed",
    "RPR",
    "num_probes",
    "file",
];

const GROUP_HEADER: &[&str] = &["RUN_ID", "task", "model", "arm", "RPR_mean", "n"];

/// Run the probe aggregation stage: fold every probe report into a samples
/// CSV with per-sample rule pass rates and an aggregated CSV per
/// (task, model, arm) group.
pub fn run(config: &RunConfig, verbose: bool) -> Result<ProbeAggregation> {
    let report_dir = config.probes_report_dir();
    let mut rows = Vec::new();

    if report_dir.is_dir() {
        let mut paths: Vec<PathBuf> = fs::read_dir(&report_dir)
            .with_context(|| format!("Failed to read {}", report_dir.display()))?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().map_or(false, |ext| ext == "json"))
            .collect();
        paths.sort();

        for path in paths {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let report: ProbeReport = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse probe report {}", path.display()))?;

            // A sample with zero probes should not normally exist (tasks
            // without probe sets get no report at all), but the denominator
            // is floored at 1 so such a report scores 0 rather than NaN.
            let total = report.probes.len().max(1);
            let passed = report.probes.values().filter(|passed| **passed).count();
            let rpr = round3(passed as f64 / total as f64);

            rows.push(ProbeSampleRow {
                run_id: config.run_id.clone(),
                task: report.task,
                model: report.model,
                arm: report.arm,
                seed: report.seed,
                rpr,
                num_probes: total,
                file: path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
            });
        }
    } else {
        eprintln!("[warn] {} not found", report_dir.display());
    }

    rows.sort_by(|a, b| {
        (&a.task, &a.model, a.arm, a.seed).cmp(&(&b.task, &b.model, b.arm, b.seed))
    });
    let groups = aggregate(&rows, &config.run_id);

    let eval_dir = config.eval_dir();
    fs::create_dir_all(&eval_dir)
        .with_context(|| format!("Failed to create {}", eval_dir.display()))?;

    let samples_path = config.probes_samples_csv();
    write_csv(&samples_path, SAMPLE_HEADER, &rows)?;
    eprintln!(
        "[ok] probes samples -> {} ({} rows)",
        samples_path.display(),
        rows.len()
    );

    let aggregated_path = config.probes_aggregated_csv();
    write_csv(&aggregated_path, GROUP_HEADER, &groups)?;
    eprintln!("[ok] probes aggregated -> {}", aggregated_path.display());

    if verbose {
        for group in &groups {
            eprintln!(
                "[probe] {} {} {} | RPR {:.3} | n={}",
                group.task, group.model, group.arm, group.rpr_mean, group.n
            );
        }
    }

    Ok(ProbeAggregation { rows, groups })
}

/// Fold sample rows into per-(task, model, arm) groups, sorted by key.
fn aggregate(rows: &[ProbeSampleRow], run_id: &str) -> Vec<ProbeGroupRow> {
    let mut groups: BTreeMap<(String, String, Arm), Vec<&ProbeSampleRow>> = BTreeMap::new();
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
            let rpr_sum: f64 = members.iter().map(|r| r.rpr).sum();
            ProbeGroupRow {
                run_id: run_id.to_owned(),
                task,
                model,
                arm,
                rpr_mean: round3(rpr_sum / denom),
                n,
            }
        })
        .collect()
}
