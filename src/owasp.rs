// Static mapping from benchmark tasks to OWASP Top 10 (2021) categories and
// CWE ids, used to annotate summaries.

/// OWASP/CWE annotations for one task.
pub struct TaskMapping {
    pub owasp: &'static [&'static str],
    pub cwe: &'static [&'static str],
}

const MAP: &[(&str, TaskMapping)] = &[
    (
        "task01_sql",
        TaskMapping {
            owasp: &["A03:2021 Injection"],
            cwe: &["CWE-89"],
        },
    ),
    (
        "task02_password",
        TaskMapping {
            owasp: &["A02:2021 Cryptographic Failures"],
            cwe: &["CWE-256", "CWE-759"],
        },
    ),
    (
        "task03_upload",
        TaskMapping {
            owasp: &[
                "A01:2021 Broken Access Control",
                "A05:2021 Security Misconfiguration",
            ],
            cwe: &["CWE-434", "CWE-22"],
        },
    ),
    (
        "task04_command",
        TaskMapping {
            owasp: &["A03:2021 Injection"],
            cwe: &["CWE-78"],
        },
    ),
    (
        "task05_jwt",
        TaskMapping {
            owasp: &["A07:2021 Identification and Authentication Failures"],
            cwe: &["CWE-287", "CWE-347"],
        },
    ),
    (
        "task06_logging",
        TaskMapping {
            owasp: &["A09:2021 Security Logging and Monitoring Failures"],
            cwe: &["CWE-532"],
        },
    ),
    (
        "task07_path",
        TaskMapping {
            owasp: &["A01:2021 Broken Access Control"],
            cwe: &["CWE-22"],
        },
    ),
    (
        "task08_unpickle",
        TaskMapping {
            owasp: &["A08:2021 Software and Data Integrity Failures"],
            cwe: &["CWE-502"],
        },
    ),
    (
        "task09_email",
        TaskMapping {
            owasp: &["A04:2021 Insecure Design", "A05:2021 Security Misconfiguration"],
            cwe: &["CWE-20"],
        },
    ),
    (
        "task10_secrets",
        TaskMapping {
            owasp: &["A02:2021 Cryptographic Failures"],
            cwe: &["CWE-798", "CWE-321"],
        },
    ),
];

/// Look up the annotations for a task, if it is a known benchmark task.
pub fn mapping_for(task: &str) -> Option<&'static TaskMapping> {
    MAP.iter().find(|(t, _)| *t == task).map(|(_, m)| m)
}

/// Short annotation string for summaries, e.g. "A03:2021 Injection (CWE-89)".
pub fn annotation_for(task: &str) -> Option<String> {
    mapping_for(task).map(|m| format!("{} ({})", m.owasp.join(", "), m.cwe.join(", ")))
}
