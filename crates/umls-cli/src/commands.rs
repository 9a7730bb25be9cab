use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use tracing::{debug, info, info_span, trace, warn};

use umls_cli::config::GroundingConfig;
use umls_cli::logging::redact_value;
use umls_core::{GroundingBatch, GroundingEngine, collect_mentions, enrich_documents};
use umls_ingest::{ReferenceScanner, load_documents};
use umls_model::{Mention, MentionKeys};
use umls_normalization::{KeyGenerator, normalize};
use umls_output::write_artifacts;

use crate::cli::{GroundArgs, KeysArgs, ReferenceArgs, ResolveArgs};
use crate::types::{GroundOutcome, ResolveOutcome, ResolvedMention};

/// Directory name used when `--output-dir` is not given.
const DEFAULT_OUTPUT_DIR: &str = "grounding";

pub fn run_ground(args: &GroundArgs) -> Result<GroundOutcome> {
    let started = Instant::now();
    let span = info_span!("ground", documents = %args.documents.display());
    let _guard = span.enter();

    let (config, scanner, engine) = prepare_grounding(&args.reference)?;

    let documents = load_documents(&args.documents)
        .with_context(|| format!("load documents {}", args.documents.display()))?;
    let mentions = collect_mentions(&documents);
    info!(
        documents = documents.len(),
        mentions = mentions.len(),
        "collected mentions"
    );

    let batch = engine
        .ground(mentions, &scanner, &config.scan_options())
        .context("ground mentions")?;
    log_unmapped(&batch);

    let (enriched, enrichment) = enrich_documents(&documents, &batch);
    if enrichment.dropped_relations > 0 {
        warn!(
            dropped = enrichment.dropped_relations,
            "relations reference entity ids missing from their document"
        );
    }

    let output_dir = args
        .output_dir
        .clone()
        .unwrap_or_else(|| default_output_dir(&args.documents));
    let artifacts = if args.dry_run {
        info!("dry run, artifacts not written");
        None
    } else {
        Some(write_artifacts(&output_dir, &batch, &enriched).context("write artifacts")?)
    };

    Ok(GroundOutcome {
        documents_path: args.documents.clone(),
        reference_path: scanner.path().to_path_buf(),
        output_dir,
        batch: batch.stats,
        enrichment,
        artifacts,
        elapsed: started.elapsed(),
    })
}

pub fn run_resolve(args: &ResolveArgs) -> Result<ResolveOutcome> {
    let span = info_span!("resolve", mentions = args.mentions.len());
    let _guard = span.enter();

    let (config, scanner, engine) = prepare_grounding(&args.reference)?;
    let mentions = args
        .mentions
        .iter()
        .map(|text| Mention::new(text.clone(), args.types.iter().cloned()));
    let batch = engine
        .ground(mentions, &scanner, &config.scan_options())
        .context("ground mentions")?;

    let resolved = args
        .mentions
        .iter()
        .map(|text| {
            let grounded = batch.mentions.get(&normalize(text));
            ResolvedMention {
                text: text.clone(),
                keys: grounded.map(|g| g.keys.clone()),
                result: grounded.map(|g| g.result.clone()),
            }
        })
        .collect();
    Ok(ResolveOutcome {
        mentions: resolved,
        batch: batch.stats,
    })
}

pub fn run_keys(args: &KeysArgs) -> Vec<MentionKeys> {
    let keys = KeyGenerator::default();
    args.mentions
        .iter()
        .map(|text| keys.build_keys(&Mention::untyped(text.clone())))
        .collect()
}

/// Config, opened reference file and engine, in that order.
///
/// The reference file is opened before anything else is read so a bad path
/// fails the run up front.
fn prepare_grounding(
    args: &ReferenceArgs,
) -> Result<(GroundingConfig, ReferenceScanner, GroundingEngine)> {
    let config = GroundingConfig::resolve(args.config.as_deref(), &args.overrides())?;
    let reference = config.reference_file()?;
    let scanner = ReferenceScanner::open(reference).context("open reference file")?;
    debug!(
        reference = %scanner.path().display(),
        bytes = scanner.len(),
        "reference file ready"
    );
    let engine = GroundingEngine::new(config.grounding_options()?)
        .context("build grounding engine")?;
    Ok((config, scanner, engine))
}

fn log_unmapped(batch: &GroundingBatch) {
    for (text, grounded) in &batch.mentions {
        if !grounded.result.is_mapped() {
            trace!(
                mention = redact_value(text),
                excluded = grounded.result.is_excluded(),
                "mention not mapped"
            );
        }
    }
}

fn default_output_dir(documents: &Path) -> PathBuf {
    documents
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join(DEFAULT_OUTPUT_DIR)
}
