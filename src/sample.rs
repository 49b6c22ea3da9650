// Filename conventions for generated samples and their reports.
// Two generations of the naming scheme exist; the richer one (with a model
// slug) is tried first, then the older one without a model.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::types::{Arm, SampleId};

static REPORT_WITH_MODEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(task\d+_[a-z0-9]+)_([a-z0-9\-]+)_s(\d+)\.py\.json").unwrap());

static REPORT_NO_MODEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(task\d+_[a-z0-9]+)_s(\d+)\.py\.json").unwrap());

static SOURCE_WITH_MODEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(task\d+_[a-z0-9]+)_([a-z0-9\-]+)_s(\d+)\.py$").unwrap());

static SOURCE_NO_MODEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(task\d+_[a-z0-9]+)_s(\d+)\.py$").unwrap());

/// Parse the identity tuple out of a report filename such as
/// `outputs_RUNX_baseline_task01_sql_gpt-oss-20b_s101.py.json`.
/// Never fails: unmatched names yield the sentinel id.
pub fn parse_report_name(file_name: &str) -> SampleId {
    let arm = if file_name.contains("baseline") {
        Arm::Baseline
    } else if file_name.contains("improved") {
        Arm::Improved
    } else {
        Arm::Unknown
    };

    if let Some(caps) = REPORT_WITH_MODEL.captures(file_name) {
        return SampleId {
            task: caps[1].to_owned(),
            model: model_from_slug(&caps[2]),
            arm,
            seed: caps[3].parse().unwrap_or(-1),
        };
    }
    if let Some(caps) = REPORT_NO_MODEL.captures(file_name) {
        return SampleId {
            task: caps[1].to_owned(),
            model: "unknown".to_owned(),
            arm,
            seed: caps[2].parse().unwrap_or(-1),
        };
    }
    SampleId::unknown(arm)
}

/// Parse the identity tuple out of a generated source path such as
/// `outputs/<RUN_ID>/baseline/task01_sql_gpt-oss-20b_s101.py`.
/// The arm comes from the path; anything not under a `baseline` segment
/// counts as improved, matching the layout the generator writes.
pub fn parse_source_path(path: &Path) -> SampleId {
    let arm = if path.to_string_lossy().contains("baseline") {
        Arm::Baseline
    } else {
        Arm::Improved
    };

    let base = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    if let Some(caps) = SOURCE_WITH_MODEL.captures(&base) {
        return SampleId {
            task: caps[1].to_owned(),
            model: model_from_slug(&caps[2]),
            arm,
            seed: caps[3].parse().unwrap_or(-1),
        };
    }
    if let Some(caps) = SOURCE_NO_MODEL.captures(&base) {
        return SampleId {
            task: caps[1].to_owned(),
            model: "unknown".to_owned(),
            arm,
            seed: caps[2].parse().unwrap_or(-1),
        };
    }
    SampleId::unknown(arm)
}

/// Restore a model name from its filename slug. Slugs store `:` as `-`,
/// which is lossy; the tag separator is recovered as the first `-` that is
/// immediately followed by a digit (`gpt-oss-20b` -> `gpt-oss:20b`,
/// `gemma3-27b-instruct` -> `gemma3:27b-instruct`). Models without such a
/// dash are returned verbatim.
pub fn model_from_slug(slug: &str) -> String {
    let bytes = slug.as_bytes();
    for i in 0..bytes.len().saturating_sub(1) {
        if bytes[i] == b'-' && bytes[i + 1].is_ascii_digit() {
            let mut restored = String::with_capacity(slug.len());
            restored.push_str(&slug[..i]);
            restored.push(':');
            restored.push_str(&slug[i + 1..]);
            return restored;
        }
    }
    slug.to_owned()
}

/// Sanitize a model name for use in a filename.
pub fn model_to_slug(model: &str) -> String {
    model.replace(':', "-")
}
