use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;

/// Write rows to a CSV file under the given header. The header row is
/// written even when there are no rows, so downstream tooling always sees
/// the schema.
pub fn write_csv<T: Serialize>(path: &Path, header: &[&str], rows: &[T]) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    writer
        .write_record(header)
        .with_context(|| format!("Failed to write header to {}", path.display()))?;
    for row in rows {
        writer
            .serialize(row)
            .with_context(|| format!("Failed to write row to {}", path.display()))?;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to flush {}", path.display()))?;
    Ok(())
}

/// Round to 1 decimal place (percentages).
pub fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

/// Round to 2 decimal places (means).
pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Round to 3 decimal places (rates).
pub fn round3(x: f64) -> f64 {
    (x * 1000.0).round() / 1000.0
}
