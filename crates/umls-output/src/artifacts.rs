//! Persisted grounding artifacts.

use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::info;
use umls_core::{GroundingBatch, all_triples, coverage_rows};
use umls_model::EnrichedDocument;

use crate::common::{ensure_output_dir, write_json};
use crate::coverage::write_coverage_csv;

/// Normalized mention → grounding result.
pub const MENTION_MAP_FILE: &str = "mention2cui.json";
/// Enriched entities of every document.
pub const ENTITIES_FILE: &str = "entities_with_cui.json";
/// Triples of every document, in document order.
pub const TRIPLES_FILE: &str = "triples.json";
/// One row per unique mention.
pub const COVERAGE_FILE: &str = "cui_coverage.csv";

/// Where each artifact was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub mention_map: PathBuf,
    pub entities: PathBuf,
    pub triples: PathBuf,
    pub coverage: PathBuf,
}

impl ArtifactPaths {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            mention_map: dir.join(MENTION_MAP_FILE),
            entities: dir.join(ENTITIES_FILE),
            triples: dir.join(TRIPLES_FILE),
            coverage: dir.join(COVERAGE_FILE),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        [
            self.mention_map.as_path(),
            self.entities.as_path(),
            self.triples.as_path(),
            self.coverage.as_path(),
        ]
        .into_iter()
    }
}

/// Write every artifact of a grounded batch into `output_dir`.
pub fn write_artifacts(
    output_dir: &Path,
    batch: &GroundingBatch,
    documents: &[EnrichedDocument],
) -> Result<ArtifactPaths> {
    ensure_output_dir(output_dir)?;
    let paths = ArtifactPaths::in_dir(output_dir);

    write_json(&paths.mention_map, &batch.mention_map())?;
    write_json(&paths.entities, documents)?;
    write_json(&paths.triples, &all_triples(documents))?;
    let rows = coverage_rows(batch);
    write_coverage_csv(&paths.coverage, &rows)?;

    info!(
        output_dir = %output_dir.display(),
        mentions = batch.len(),
        documents = documents.len(),
        "artifacts written"
    );
    Ok(paths)
}
