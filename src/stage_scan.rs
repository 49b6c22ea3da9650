use anyhow::{Context, Result};
use std::fs;
use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use walkdir::WalkDir;

use crate::config::RunConfig;
use crate::types::ScanStats;

/// Outcome of a single analyzer invocation.
/// Exit codes 0 ("no issues") and 1 ("issues found") with JSON on stdout are
/// reports; anything else is a tool failure that must not abort the batch.
#[derive(Debug)]
pub enum ScanOutcome {
    Report { json: String, had_issues: bool },
    ToolError { code: Option<i32>, stderr: String },
    TimedOut,
}

/// Run the bandit scan stage: walk the generated samples and write one JSON
/// report per file under the run-scoped report directory.
pub fn run(config: &RunConfig, verbose: bool) -> Result<ScanStats> {
    let mut stats = ScanStats::default();

    which::which(&config.bandit_path).map_err(|_| {
        anyhow::anyhow!(
            "`{}` is not on PATH. Install with: pip install bandit",
            config.bandit_path
        )
    })?;

    let report_dir = config.bandit_report_dir();
    fs::create_dir_all(&report_dir)
        .with_context(|| format!("Failed to create {}", report_dir.display()))?;

    write_meta(config, &report_dir)?;

    let out_root = config.outputs_dir();
    if !out_root.is_dir() {
        eprintln!("[warn] outputs/{} not found", config.run_id);
        return Ok(stats);
    }

    if verbose {
        eprintln!("[bandit] Scanning {} ...", out_root.display());
    }

    for entry in WalkDir::new(&out_root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().map_or(false, |ext| ext == "py"))
    {
        stats.scanned += 1;
        if scan_file(config, entry.path(), &report_dir)? {
            stats.reported += 1;
        } else {
            stats.failed += 1;
        }
    }

    Ok(stats)
}

/// Scan one source file. Returns true if a report was written; tool failures
/// are logged to stderr and reported as false.
fn scan_file(config: &RunConfig, source: &Path, report_dir: &Path) -> Result<bool> {
    let rel = source.strip_prefix(&config.root).unwrap_or(source);
    let out_path = report_dir.join(report_name(rel));

    let timeout = Duration::from_secs(config.scan_timeout_secs);
    match run_analyzer(&config.bandit_path, source, timeout)? {
        ScanOutcome::Report { json, had_issues } => {
            fs::write(&out_path, json)
                .with_context(|| format!("Failed to write {}", out_path.display()))?;
            let tag = if had_issues { "ISSUES" } else { "OK" };
            eprintln!("[bandit] {} -> {}", tag, out_path.display());
            Ok(true)
        }
        ScanOutcome::ToolError { code, stderr } => {
            eprintln!(
                "[bandit] ERROR {} (exit {})\n{}",
                source.display(),
                code.map_or_else(|| "signal".to_owned(), |c| c.to_string()),
                stderr.trim_end()
            );
            Ok(false)
        }
        ScanOutcome::TimedOut => {
            eprintln!(
                "[bandit] ERROR {} timed out after {}s",
                source.display(),
                config.scan_timeout_secs
            );
            Ok(false)
        }
    }
}

/// Invoke the analyzer on a single file with a hard deadline.
/// The child's pipes are drained on helper threads so a chatty analyzer
/// cannot block on a full pipe while we poll for exit.
pub fn run_analyzer(program: &str, source: &Path, timeout: Duration) -> Result<ScanOutcome> {
    let mut child = Command::new(program)
        .arg("-f")
        .arg("json")
        .arg("-q")
        .arg(source)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .with_context(|| format!("Failed to execute {}", program))?;

    let stdout_pipe = child.stdout.take();
    let stderr_pipe = child.stderr.take();
    let stdout_thread = std::thread::spawn(move || read_pipe(stdout_pipe));
    let stderr_thread = std::thread::spawn(move || read_pipe(stderr_pipe));

    let deadline = Instant::now() + timeout;
    let status = loop {
        match child
            .try_wait()
            .context("Failed to poll analyzer process")?
        {
            Some(status) => break status,
            None if Instant::now() >= deadline => {
                let _ = child.kill();
                let _ = child.wait();
                let _ = stdout_thread.join();
                let _ = stderr_thread.join();
                return Ok(ScanOutcome::TimedOut);
            }
            None => std::thread::sleep(Duration::from_millis(25)),
        }
    };

    let stdout = stdout_thread.join().unwrap_or_default();
    let stderr = stderr_thread.join().unwrap_or_default();

    let code = status.code();
    if matches!(code, Some(0) | Some(1)) && !stdout.trim().is_empty() {
        Ok(ScanOutcome::Report {
            had_issues: code == Some(1),
            json: stdout,
        })
    } else {
        Ok(ScanOutcome::ToolError { code, stderr })
    }
}

fn read_pipe<R: Read>(pipe: Option<R>) -> String {
    let mut buf = String::new();
    if let Some(mut pipe) = pipe {
        let _ = pipe.read_to_string(&mut buf);
    }
    buf
}

/// Report filename: the path relative to the benchmark root with separators
/// replaced by underscores, suffixed `.json`.
fn report_name(rel: &Path) -> String {
    let mut name = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("_");
    name.push_str(".json");
    name
}

/// Record run provenance next to the reports.
fn write_meta(config: &RunConfig, report_dir: &Path) -> Result<()> {
    let meta = serde_json::json!({
        "RUN_ID": config.run_id,
        "bandit_version": analyzer_version(&config.bandit_path),
    });
    let path = report_dir.join("_meta.json");
    fs::write(&path, serde_json::to_string_pretty(&meta)?)
        .with_context(|| format!("Failed to write {}", path.display()))
}

fn analyzer_version(program: &str) -> String {
    Command::new(program)
        .arg("--version")
        .output()
        .ok()
        .filter(|out| out.status.success())
        .map(|out| String::from_utf8_lossy(&out.stdout).trim().to_owned())
        .filter(|version| !version.is_empty())
        .unwrap_or_else(|| "unknown".to_owned())
}
