use std::path::PathBuf;
use std::time::Duration;

use umls_core::{BatchStats, EnrichmentStats};
use umls_model::{GroundingResult, MentionKeys};
use umls_output::ArtifactPaths;

#[derive(Debug)]
pub struct GroundOutcome {
    pub documents_path: PathBuf,
    pub reference_path: PathBuf,
    pub output_dir: PathBuf,
    pub batch: BatchStats,
    pub enrichment: EnrichmentStats,
    /// `None` on a dry run.
    pub artifacts: Option<ArtifactPaths>,
    pub elapsed: Duration,
}

#[derive(Debug)]
pub struct ResolvedMention {
    pub text: String,
    pub keys: Option<MentionKeys>,
    pub result: Option<GroundingResult>,
}

#[derive(Debug)]
pub struct ResolveOutcome {
    pub mentions: Vec<ResolvedMention>,
    pub batch: BatchStats,
}
