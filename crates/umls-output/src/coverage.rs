//! Coverage table CSV.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use umls_model::CoverageRow;

/// Column order of the coverage table.
pub const COVERAGE_COLUMNS: [&str; 12] = [
    "mention",
    "canonical",
    "types_seen",
    "is_measurement",
    "excluded_reason",
    "mapped",
    "best_cui",
    "num_candidates",
    "top_sab",
    "top_tty",
    "top_match_type",
    "top_matched_key",
];

/// Serialize rows as CSV with a header line.
///
/// Missing values are written as empty fields; booleans as `true`/`false`.
pub fn write_coverage<W: Write>(writer: W, rows: &[CoverageRow]) -> Result<()> {
    let mut csv = csv::WriterBuilder::new().has_headers(true).from_writer(writer);
    if rows.is_empty() {
        csv.write_record(COVERAGE_COLUMNS)
            .context("write coverage header")?;
    }
    for row in rows {
        csv.serialize(row).context("serialize coverage row")?;
    }
    csv.flush().context("flush coverage table")?;
    Ok(())
}

/// Write the coverage table to `path`.
pub fn write_coverage_csv(path: &Path, rows: &[CoverageRow]) -> Result<()> {
    let file =
        std::fs::File::create(path).with_context(|| format!("create {}", path.display()))?;
    write_coverage(std::io::BufWriter::new(file), rows)
        .with_context(|| format!("write {}", path.display()))
}

/// Render the coverage table as a string.
pub fn coverage_csv_string(rows: &[CoverageRow]) -> Result<String> {
    let mut buffer = Vec::new();
    write_coverage(&mut buffer, rows)?;
    String::from_utf8(buffer).context("coverage table is not UTF-8")
}
