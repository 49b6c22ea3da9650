// Integration tests for the scoring pipeline: scan, probes, and aggregation
// over a temporary benchmark tree, with a stub analyzer standing in for
// bandit.

use std::fs;
use std::path::{Path, PathBuf};

use secbench::aggregate_bandit;
use secbench::aggregate_probes;
use secbench::config::RunConfig;
use secbench::probes::ProbeRegistry;
use secbench::stage_probes;
use secbench::types::Arm;

/// Helper: a resolved run configuration rooted at a temp directory.
fn run_config(root: &Path, bandit_path: &str) -> RunConfig {
    RunConfig {
        root: root.to_path_buf(),
        run_id: "RUNX".to_owned(),
        scan_timeout_secs: 30,
        bandit_path: bandit_path.to_owned(),
    }
}

fn fixture_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// Helper: place a generated-sample file into the outputs tree.
fn write_sample(root: &Path, arm: &str, name: &str, content: &str) {
    let dir = root.join("outputs").join("RUNX").join(arm);
    fs::create_dir_all(&dir).expect("failed to create outputs dir");
    fs::write(dir.join(name), content).expect("failed to write sample");
}

/// Helper: place a bandit report JSON directly into the report directory.
fn write_bandit_report(root: &Path, name: &str, content: &str) {
    let dir = root.join("eval").join("bandit_reports").join("RUNX");
    fs::create_dir_all(&dir).expect("failed to create report dir");
    fs::write(dir.join(name), content).expect("failed to write report");
}

// ===== FILENAME-DRIVEN END-TO-END SCENARIOS =====

#[cfg(unix)]
mod scan {
    use super::*;
    use secbench::stage_scan;
    use std::os::unix::fs::PermissionsExt;

    /// A stub analyzer that reports one HIGH issue for every scanned file.
    fn stub_bandit(dir: &Path) -> PathBuf {
        let path = dir.join("fake-bandit");
        let body = r#"#!/bin/sh
echo '{"results": [{"issue_severity": "HIGH", "issue_text": "stub finding"}]}'
exit 1
"#;
        fs::write(&path, body).expect("failed to write stub");
        let mut perms = fs::metadata(&path).expect("stat stub").permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&path, perms).expect("chmod stub");
        path
    }

    #[test]
    fn test_scan_then_aggregate_single_high_issue_sample() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let root = tmp.path();
        let stub = stub_bandit(root);

        let source = fs::read_to_string(fixture_path("task01_sql_gpt-oss-20b_s101.py"))
            .expect("read fixture");
        write_sample(root, "baseline", "task01_sql_gpt-oss-20b_s101.py", &source);

        let config = run_config(root, stub.to_str().unwrap());
        let stats = stage_scan::run(&config, false).expect("scan stage");
        assert_eq!(stats.scanned, 1);
        assert_eq!(stats.reported, 1);
        assert_eq!(stats.failed, 0);

        // Report name flattens the relative source path.
        let report = config
            .bandit_report_dir()
            .join("outputs_RUNX_baseline_task01_sql_gpt-oss-20b_s101.py.json");
        assert!(report.is_file(), "missing report {}", report.display());

        // Provenance sidecar exists and is valid JSON.
        let meta: serde_json::Value = serde_json::from_str(
            &fs::read_to_string(config.bandit_report_dir().join("_meta.json")).unwrap(),
        )
        .expect("parse _meta.json");
        assert_eq!(meta["RUN_ID"], "RUNX");

        let aggregation = aggregate_bandit::run(&config, false).expect("aggregate");
        assert_eq!(aggregation.rows.len(), 1);
        let row = &aggregation.rows[0];
        assert_eq!(row.run_id, "RUNX");
        assert_eq!(row.task, "task01_sql");
        assert_eq!(row.model, "gpt-oss:20b");
        assert_eq!(row.arm, Arm::Baseline);
        assert_eq!(row.seed, 101);
        assert_eq!(row.vp, 1);
        assert_eq!(row.ic, 1);
        assert_eq!(row.swc, 3);

        let samples = fs::read_to_string(config.bandit_samples_csv()).expect("samples csv");
        assert!(samples.starts_with("RUN_ID,task,model,arm,seed,VP,IC,SWC,file\n"));
        assert!(samples.contains("RUNX,task01_sql,gpt-oss:20b,baseline,101,1,1,3,"));

        let aggregated =
            fs::read_to_string(config.bandit_aggregated_csv()).expect("aggregated csv");
        assert!(aggregated.contains("RUNX,task01_sql,gpt-oss:20b,baseline,100.0,1.0,3.0,1"));
    }

    #[test]
    fn test_scan_missing_outputs_dir_is_not_an_error() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let stub = stub_bandit(tmp.path());
        let config = run_config(tmp.path(), stub.to_str().unwrap());
        let stats = stage_scan::run(&config, false).expect("scan stage");
        assert_eq!(stats.scanned, 0);
    }

    #[test]
    fn test_scan_missing_analyzer_is_an_error() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let config = run_config(tmp.path(), "definitely-not-a-real-analyzer");
        assert!(stage_scan::run(&config, false).is_err());
    }
}

#[test]
fn test_two_samples_aggregate_to_mean() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let root = tmp.path();

    write_bandit_report(
        root,
        "outputs_RUNX_baseline_task04_command_modela_s101.py.json",
        r#"{"results": [{"issue_severity": "LOW"}, {"issue_severity": "LOW"}]}"#,
    );
    write_bandit_report(
        root,
        "outputs_RUNX_baseline_task04_command_modela_s202.py.json",
        r#"{"results": [
            {"issue_severity": "LOW"},
            {"issue_severity": "LOW"},
            {"issue_severity": "LOW"},
            {"issue_severity": "LOW"}
        ]}"#,
    );

    let config = run_config(root, "bandit");
    let aggregation = aggregate_bandit::run(&config, false).expect("aggregate");
    assert_eq!(aggregation.groups.len(), 1);
    let group = &aggregation.groups[0];
    assert_eq!(group.task, "task04_command");
    assert_eq!(group.model, "modela");
    assert_eq!(group.arm, Arm::Baseline);
    assert_eq!(group.ic_mean, 3.0);
    assert_eq!(group.n, 2);

    let aggregated = fs::read_to_string(config.bandit_aggregated_csv()).expect("aggregated csv");
    assert!(aggregated.starts_with("RUN_ID,task,model,arm,VP_pct,IC_mean,SWC_mean,n\n"));
    assert!(aggregated.contains("RUNX,task04_command,modela,baseline,0.0,3.0,3.0,2"));
}

#[test]
fn test_meta_file_is_excluded_from_aggregation() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let root = tmp.path();

    write_bandit_report(root, "_meta.json", r#"{"RUN_ID": "RUNX"}"#);
    write_bandit_report(
        root,
        "outputs_RUNX_baseline_task01_sql_modela_s101.py.json",
        r#"{"results": []}"#,
    );

    let config = run_config(root, "bandit");
    let aggregation = aggregate_bandit::run(&config, false).expect("aggregate");
    assert_eq!(aggregation.rows.len(), 1);
    assert_eq!(aggregation.rows[0].vp, 0);
    assert_eq!(aggregation.rows[0].ic, 0);
    assert_eq!(aggregation.rows[0].swc, 0);
}

#[test]
fn test_malformed_bandit_report_aborts_aggregation() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let root = tmp.path();

    write_bandit_report(
        root,
        "outputs_RUNX_baseline_task01_sql_modela_s101.py.json",
        "this is not json {",
    );

    let config = run_config(root, "bandit");
    let err = aggregate_bandit::run(&config, false).expect_err("should abort");
    assert!(format!("{:#}", err).contains("Failed to parse bandit report"));
}

#[test]
fn test_unparseable_report_name_buckets_under_unknown() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let root = tmp.path();

    write_bandit_report(
        root,
        "strange_name.json",
        r#"{"results": [{"issue_severity": "MEDIUM"}]}"#,
    );

    let config = run_config(root, "bandit");
    let aggregation = aggregate_bandit::run(&config, false).expect("aggregate");
    assert_eq!(aggregation.rows.len(), 1);
    let row = &aggregation.rows[0];
    assert_eq!(row.task, "unknown");
    assert_eq!(row.model, "unknown");
    assert_eq!(row.seed, -1);
    assert_eq!(row.vp, 1);
}

// ===== PROBE STAGE =====

#[test]
fn test_probe_stage_end_to_end() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let root = tmp.path();

    let command_source = fs::read_to_string(fixture_path("task04_command_gpt-oss-20b_s101.py"))
        .expect("read fixture");
    write_sample(
        root,
        "baseline",
        "task04_command_gpt-oss-20b_s101.py",
        &command_source,
    );
    // Parameterized SQL in the improved arm should pass sql_param.
    write_sample(
        root,
        "improved",
        "task01_sql_gpt-oss-20b_s101.py",
        r#"cur.execute("SELECT * FROM users WHERE id = ?", (user_id,))"#,
    );
    // No probe set is registered for the password task: no report expected.
    write_sample(
        root,
        "baseline",
        "task02_password_gpt-oss-20b_s101.py",
        "def register(username, password): ...",
    );

    let config = run_config(root, "bandit");
    let stats = stage_probes::run(&config, false).expect("probe stage");
    assert_eq!(stats.probed, 2);
    assert_eq!(stats.skipped, 1);

    let report_dir = config.probes_report_dir();
    let command_report = report_dir.join("task04_command_gpt-oss-20b_s101_baseline.json");
    assert!(command_report.is_file());
    assert!(!report_dir
        .join("task02_password_gpt-oss-20b_s101_baseline.json")
        .exists());

    let report: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&command_report).unwrap()).unwrap();
    assert_eq!(report["task"], "task04_command");
    assert_eq!(report["model"], "gpt-oss:20b");
    assert_eq!(report["arm"], "baseline");
    assert_eq!(report["seed"], 101);
    assert_eq!(report["probes"]["cmd_no_shell"], true);

    let aggregation = aggregate_probes::run(&config, false).expect("aggregate probes");
    assert_eq!(aggregation.rows.len(), 2);
    // Rows sort by (task, model, arm).
    assert_eq!(aggregation.rows[0].task, "task01_sql");
    assert_eq!(aggregation.rows[0].arm, Arm::Improved);
    assert_eq!(aggregation.rows[0].rpr, 1.0);
    assert_eq!(aggregation.rows[0].num_probes, 1);
    assert_eq!(aggregation.rows[1].task, "task04_command");
    assert_eq!(aggregation.rows[1].rpr, 1.0);

    let samples = fs::read_to_string(config.probes_samples_csv()).expect("probes samples csv");
    assert!(samples.starts_with("RUN_ID,task,model,arm,seed,RPR,num_probes,file\n"));
    assert!(samples.contains("RUNX,task01_sql,gpt-oss:20b,improved,101,1.0,1,"));

    let aggregated =
        fs::read_to_string(config.probes_aggregated_csv()).expect("probes aggregated csv");
    assert!(aggregated.starts_with("RUN_ID,task,model,arm,RPR_mean,n\n"));
    assert!(aggregated.contains("RUNX,task04_command,gpt-oss:20b,baseline,1.0,1"));
}

#[test]
fn test_probe_stage_missing_outputs_dir_is_not_an_error() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let config = run_config(tmp.path(), "bandit");
    let stats = stage_probes::run(&config, false).expect("probe stage");
    assert_eq!(stats.probed, 0);
    assert_eq!(stats.skipped, 0);
}

#[test]
fn test_probe_aggregation_on_empty_dir_writes_headers() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let config = run_config(tmp.path(), "bandit");
    let aggregation = aggregate_probes::run(&config, false).expect("aggregate probes");
    assert!(aggregation.rows.is_empty());

    let samples = fs::read_to_string(config.probes_samples_csv()).expect("probes samples csv");
    assert_eq!(samples, "RUN_ID,task,model,arm,seed,RPR,num_probes,file\n");
}

// ===== FIXTURE CHECKS VIA THE REGISTRY =====

#[test]
fn test_insecure_sql_fixture_fails_sql_param() {
    let source =
        fs::read_to_string(fixture_path("task01_sql_gpt-oss-20b_s101.py")).expect("read fixture");
    let registry = ProbeRegistry::new();
    let results = registry.run("task01_sql", &source).expect("probe set");
    assert_eq!(results.get("sql_param"), Some(&false));
}

#[test]
fn test_secure_command_fixture_passes_cmd_no_shell() {
    let source = fs::read_to_string(fixture_path("task04_command_gpt-oss-20b_s101.py"))
        .expect("read fixture");
    let registry = ProbeRegistry::new();
    let results = registry.run("task04_command", &source).expect("probe set");
    assert_eq!(results.get("cmd_no_shell"), Some(&true));
}
