// secbench: scoring pipeline for an LLM secure-coding benchmark.
// Scans generated Python samples with bandit, probes their source text for
// per-task security properties, and aggregates both into CSV summaries.

pub mod aggregate_bandit;
pub mod aggregate_probes;
pub mod config;
pub mod csv_output;
pub mod json_output;
pub mod owasp;
pub mod pipeline;
pub mod probes;
pub mod sample;
pub mod stage_probes;
pub mod stage_scan;
pub mod types;
