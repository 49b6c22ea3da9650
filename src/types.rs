use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Issue severity as reported by the external analyzer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    /// Parse an analyzer severity string, case-insensitively.
    /// Unrecognized severities (e.g. bandit's "UNDEFINED") map to `None`.
    pub fn parse(s: &str) -> Option<Severity> {
        match s.to_ascii_uppercase().as_str() {
            "LOW" => Some(Severity::Low),
            "MEDIUM" => Some(Severity::Medium),
            "HIGH" => Some(Severity::High),
            _ => None,
        }
    }

    /// Weight used for the severity-weighted count: LOW=1, MEDIUM=2, HIGH=3.
    pub fn weight(&self) -> u64 {
        match self {
            Severity::Low => 1,
            Severity::Medium => 2,
            Severity::High => 3,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Low => write!(f, "LOW"),
            Severity::Medium => write!(f, "MEDIUM"),
            Severity::High => write!(f, "HIGH"),
        }
    }
}

/// Which prompt variant produced a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Arm {
    Baseline,
    Improved,
    Unknown,
}

impl Arm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Arm::Baseline => "baseline",
            Arm::Improved => "improved",
            Arm::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for Arm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Identity of one generated sample: (task, model, arm, seed).
/// Unparseable filenames map to the sentinel values rather than an error,
/// so a malformed name never aborts a batch run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleId {
    pub task: String,
    pub model: String,
    pub arm: Arm,
    pub seed: i64,
}

impl SampleId {
    /// Sentinel for filenames that match no known convention.
    pub fn unknown(arm: Arm) -> Self {
        SampleId {
            task: "unknown".to_owned(),
            model: "unknown".to_owned(),
            arm,
            seed: -1,
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.task == "unknown"
    }
}

/// Per-sample probe report, one JSON document per probed source file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeReport {
    pub task: String,
    pub model: String,
    pub arm: Arm,
    pub seed: i64,
    pub probes: BTreeMap<String, bool>,
}

/// One samples-CSV row of bandit metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BanditSampleRow {
    #[serde(rename = "RUN_ID")]
    pub run_id: String,
    pub task: String,
    pub model: String,
    pub arm: Arm,
    pub seed: i64,
    #[serde(rename = "VP")]
    pub vp: u8,
    #[serde(rename = "IC")]
    pub ic: u64,
    #[serde(rename = "SWC")]
    pub swc: u64,
    pub file: String,
}

/// One aggregated-CSV row of bandit metrics per (task, model, arm) group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BanditGroupRow {
    #[serde(rename = "RUN_ID")]
    pub run_id: String,
    pub task: String,
    pub model: String,
    pub arm: Arm,
    #[serde(rename = "VP_pct")]
    pub vp_pct: f64,
    #[serde(rename = "IC_mean")]
    pub ic_mean: f64,
    #[serde(rename = "SWC_mean")]
    pub swc_mean: f64,
    pub n: usize,
}

/// One samples-CSV row of probe metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeSampleRow {
    #[serde(rename = "RUN_ID")]
    pub run_id: String,
    pub task: String,
    pub model: String,
    pub arm: Arm,
    pub seed: i64,
    #[serde(rename = "RPR")]
    pub rpr: f64,
    pub num_probes: usize,
    pub file: String,
}

/// One aggregated-CSV row of probe metrics per (task, model, arm) group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeGroupRow {
    #[serde(rename = "RUN_ID")]
    pub run_id: String,
    pub task: String,
    pub model: String,
    pub arm: Arm,
    #[serde(rename = "RPR_mean")]
    pub rpr_mean: f64,
    pub n: usize,
}

/// Tallies from the bandit scan stage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanStats {
    pub scanned: usize,
    pub reported: usize,
    pub failed: usize,
}

/// Tallies from the probe stage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProbeStats {
    pub probed: usize,
    pub skipped: usize,
}

/// Result of the bandit aggregation stage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BanditAggregation {
    pub rows: Vec<BanditSampleRow>,
    pub groups: Vec<BanditGroupRow>,
}

/// Result of the probe aggregation stage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProbeAggregation {
    pub rows: Vec<ProbeSampleRow>,
    pub groups: Vec<ProbeGroupRow>,
}

/// The full pipeline report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineReport {
    pub secbench_version: String,
    pub run_id: String,
    pub scan: ScanStats,
    pub probes: ProbeStats,
    pub bandit: BanditAggregation,
    pub rule_pass: ProbeAggregation,
}

/// Which stage to run (or all).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageFilter {
    All,
    Scan,
    Probes,
    Aggregate,
}

/// CLI options passed through the pipeline.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Benchmark root holding outputs/ and eval/
    pub root: PathBuf,
    /// Optional config file path override
    pub config_path: Option<PathBuf>,
    /// Run identifier override (else RUN_ID env, else timestamped default)
    pub run_id: Option<String>,
    /// Output the pipeline report as JSON to stdout
    pub json_output: bool,
    /// Which stage(s) to run
    pub stage_filter: StageFilter,
    /// Verbose output
    pub verbose: bool,
}
