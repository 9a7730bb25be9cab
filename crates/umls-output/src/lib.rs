//! Grounding artifact output.
//!
//! - `mention2cui.json`: normalized mention → result
//! - `entities_with_cui.json`: enriched entities per document
//! - `triples.json`: relation triples with entity texts
//! - `cui_coverage.csv`: one row per unique mention

mod artifacts;
mod common;
mod coverage;

pub use artifacts::{
    ArtifactPaths, COVERAGE_FILE, ENTITIES_FILE, MENTION_MAP_FILE, TRIPLES_FILE, write_artifacts,
};
pub use common::{ensure_output_dir, write_json};
pub use coverage::{COVERAGE_COLUMNS, coverage_csv_string, write_coverage, write_coverage_csv};
