use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::types::RunOptions;

/// Settings loadable from a TOML config file. Everything has a default,
/// so running without a config file is the normal case.
#[derive(Debug, Clone)]
pub struct SecbenchConfig {
    /// Run identifier override
    pub run_id: Option<String>,
    /// Timeout for a single analyzer invocation, in seconds
    pub scan_timeout_secs: u64,
    /// Name or path of the analyzer executable
    pub bandit_path: String,
}

impl Default for SecbenchConfig {
    fn default() -> Self {
        Self {
            run_id: None,
            scan_timeout_secs: 120,
            bandit_path: "bandit".to_owned(),
        }
    }
}

/// Fully resolved configuration for one pipeline run, built once at startup.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Benchmark root holding outputs/ and eval/
    pub root: PathBuf,
    /// Run identifier used to namespace directories
    pub run_id: String,
    pub scan_timeout_secs: u64,
    pub bandit_path: String,
}

impl RunConfig {
    /// Directory of generated samples: `<root>/outputs/<run_id>`
    pub fn outputs_dir(&self) -> PathBuf {
        self.root.join("outputs").join(&self.run_id)
    }

    /// `<root>/eval`
    pub fn eval_dir(&self) -> PathBuf {
        self.root.join("eval")
    }

    /// `<root>/eval/bandit_reports/<run_id>`
    pub fn bandit_report_dir(&self) -> PathBuf {
        self.eval_dir().join("bandit_reports").join(&self.run_id)
    }

    /// `<root>/eval/probes_reports/<run_id>`
    pub fn probes_report_dir(&self) -> PathBuf {
        self.eval_dir().join("probes_reports").join(&self.run_id)
    }

    pub fn bandit_samples_csv(&self) -> PathBuf {
        self.eval_dir().join(format!("bandit_samples_{}.csv", self.run_id))
    }

    pub fn bandit_aggregated_csv(&self) -> PathBuf {
        self.eval_dir()
            .join(format!("bandit_aggregated_{}.csv", self.run_id))
    }

    pub fn probes_samples_csv(&self) -> PathBuf {
        self.eval_dir().join(format!("probes_samples_{}.csv", self.run_id))
    }

    pub fn probes_aggregated_csv(&self) -> PathBuf {
        self.eval_dir()
            .join(format!("probes_aggregated_{}.csv", self.run_id))
    }
}

/// Resolve the final run configuration from CLI options, the optional config
/// file, the RUN_ID environment variable, and the timestamped default.
pub fn resolve(options: &RunOptions) -> Result<RunConfig> {
    let file = load_config(options.config_path.as_deref())?;

    let run_id = options
        .run_id
        .clone()
        .or(file.run_id)
        .or_else(|| std::env::var("RUN_ID").ok().filter(|s| !s.is_empty()))
        .unwrap_or_else(default_run_id);

    Ok(RunConfig {
        root: options.root.clone(),
        run_id,
        scan_timeout_secs: file.scan_timeout_secs,
        bandit_path: file.bandit_path,
    })
}

/// Default run identifier: `main_<YYYYmmdd_HHMM>` in local time.
pub fn default_run_id() -> String {
    chrono::Local::now().format("main_%Y%m%d_%H%M").to_string()
}

/// Load secbench configuration from a TOML file.
/// Falls back to defaults if no file is given.
pub fn load_config(config_override: Option<&Path>) -> Result<SecbenchConfig> {
    if let Some(config_path) = config_override {
        let content = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;
        let parsed: toml::Value = content
            .parse()
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;
        return config_from_toml_value(&parsed);
    }

    Ok(SecbenchConfig::default())
}

/// Parse a SecbenchConfig from a TOML value
fn config_from_toml_value(value: &toml::Value) -> Result<SecbenchConfig> {
    let mut config = SecbenchConfig::default();

    if let Some(v) = value.get("run-id").and_then(|v| v.as_str()) {
        config.run_id = Some(v.to_owned());
    }
    if let Some(v) = value.get("scan-timeout-secs").and_then(|v| v.as_integer()) {
        config.scan_timeout_secs = v.max(1) as u64;
    }
    if let Some(v) = value.get("bandit-path").and_then(|v| v.as_str()) {
        config.bandit_path = v.to_owned();
    }

    Ok(config)
}
