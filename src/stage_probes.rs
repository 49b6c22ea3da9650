use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::RunConfig;
use crate::probes::ProbeRegistry;
use crate::sample;
use crate::types::{ProbeReport, ProbeStats};

/// Run the probe stage: apply each task's registered heuristics to the raw
/// source text of every parseable sample and write one JSON report per
/// sample. Samples whose task has no probe set are skipped silently.
pub fn run(config: &RunConfig, verbose: bool) -> Result<ProbeStats> {
    let mut stats = ProbeStats::default();

    let out_root = config.outputs_dir();
    if !out_root.is_dir() {
        eprintln!("[warn] outputs/{} not found", config.run_id);
        return Ok(stats);
    }

    let report_dir = config.probes_report_dir();
    fs::create_dir_all(&report_dir)
        .with_context(|| format!("Failed to create {}", report_dir.display()))?;

    let registry = ProbeRegistry::new();
    if verbose {
        eprintln!(
            "[probe] Registered {} probes across {} tasks",
            registry.probe_count(),
            registry.task_count()
        );
    }

    for arm in ["baseline", "improved"] {
        let arm_dir = out_root.join(arm);
        if !arm_dir.is_dir() {
            continue;
        }
        let mut sources: Vec<PathBuf> = fs::read_dir(&arm_dir)
            .with_context(|| format!("Failed to read {}", arm_dir.display()))?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().map_or(false, |ext| ext == "py"))
            .collect();
        sources.sort();

        for source in sources {
            if probe_file(&registry, config, &source, &report_dir, verbose)? {
                stats.probed += 1;
            } else {
                stats.skipped += 1;
            }
        }
    }

    Ok(stats)
}

/// Probe one source file. Returns true if a report was written, false if the
/// sample was skipped (unparseable name or no probe set for its task).
fn probe_file(
    registry: &ProbeRegistry,
    config: &RunConfig,
    source: &Path,
    report_dir: &Path,
    verbose: bool,
) -> Result<bool> {
    let id = sample::parse_source_path(source);
    if id.is_unknown() {
        if verbose {
            eprintln!("[probe] skipping unparseable name {}", source.display());
        }
        return Ok(false);
    }

    if registry.probes_for(&id.task).is_none() {
        return Ok(false);
    }

    // The generated code is read as text only, never executed.
    let content = fs::read_to_string(source)
        .with_context(|| format!("Failed to read {}", source.display()))?;
    let results = registry.run(&id.task, &content).unwrap_or_default();

    let report = ProbeReport {
        task: id.task.clone(),
        model: id.model.clone(),
        arm: id.arm,
        seed: id.seed,
        probes: results,
    };

    let out_name = format!(
        "{}_{}_s{}_{}.json",
        id.task,
        sample::model_to_slug(&id.model),
        id.seed,
        id.arm
    );
    let out_path = report_dir.join(out_name);
    fs::write(&out_path, serde_json::to_string_pretty(&report)?)
        .with_context(|| format!("Failed to write {}", out_path.display()))?;
    eprintln!("[probe] wrote {}", out_path.display());

    Ok(true)
}
