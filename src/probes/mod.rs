// Source-text probes: per-task heuristics over the raw text of a generated
// sample. Probes never execute or import the code under test, since that
// code may itself be intentionally insecure.

pub mod cmd_no_shell;
pub mod sql_param;
pub mod upload_secure;

use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// A single heuristic predicate over raw source text.
pub trait Probe: Send + Sync {
    /// Name of this probe as recorded in the report (e.g. "sql_param").
    fn name(&self) -> &str;

    /// Runs the heuristic against the full file content.
    fn check(&self, source: &str) -> bool;
}

/// The probe registry maps benchmark tasks to their probe sets.
/// Tasks without an entry are skipped entirely, not reported.
pub struct ProbeRegistry {
    sets: Vec<(&'static str, Vec<Box<dyn Probe>>)>,
}

impl ProbeRegistry {
    /// Creates a registry with all built-in probe sets registered.
    pub fn new() -> Self {
        let mut registry = ProbeRegistry { sets: Vec::new() };
        registry.register_all();
        registry
    }

    fn register_all(&mut self) {
        self.sets.push((
            "task01_sql",
            vec![Box::new(sql_param::SqlParam::new()) as Box<dyn Probe>],
        ));
        self.sets.push((
            "task03_upload",
            vec![Box::new(upload_secure::UploadSecure::new()) as Box<dyn Probe>],
        ));
        self.sets.push((
            "task04_command",
            vec![Box::new(cmd_no_shell::CmdNoShell::new()) as Box<dyn Probe>],
        ));
    }

    /// Returns the probe set for a task, or None if the task has no probes.
    pub fn probes_for(&self, task: &str) -> Option<&[Box<dyn Probe>]> {
        self.sets
            .iter()
            .find(|(t, _)| *t == task)
            .map(|(_, probes)| probes.as_slice())
    }

    /// Number of tasks with a registered probe set.
    pub fn task_count(&self) -> usize {
        self.sets.len()
    }

    /// Total number of registered probes.
    pub fn probe_count(&self) -> usize {
        self.sets.iter().map(|(_, probes)| probes.len()).sum()
    }

    /// Run every probe registered for a task against the given source text.
    /// Returns None when the task has no probe set. A panic inside a single
    /// probe is caught and recorded as a failed probe; it never aborts the
    /// batch.
    pub fn run(&self, task: &str, source: &str) -> Option<BTreeMap<String, bool>> {
        let probes = self.probes_for(task)?;
        let mut results = BTreeMap::new();
        for probe in probes {
            let passed = catch_unwind(AssertUnwindSafe(|| probe.check(source))).unwrap_or(false);
            results.insert(probe.name().to_owned(), passed);
        }
        Some(results)
    }
}

impl Default for ProbeRegistry {
    fn default() -> Self {
        Self::new()
    }
}
