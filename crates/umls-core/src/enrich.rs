//! Extractor documents in, enriched entities, triples and coverage out.

use std::collections::BTreeMap;

use tracing::debug;
use umls_model::{
    CoverageRow, EnrichedDocument, EnrichedEntity, ExtractedDocument, Mention, Triple,
};
use umls_normalization::{normalize, normalize_relation_type};

use crate::engine::{GroundedMention, GroundingBatch};

/// One mention per distinct normalized entity text, with type hints unioned.
///
/// Blank entity text is skipped, as are blank entity types. The first raw
/// spelling seen is kept; all spellings of a mention normalize identically.
pub fn collect_mentions(documents: &[ExtractedDocument]) -> Vec<Mention> {
    let mut mentions: BTreeMap<String, Mention> = BTreeMap::new();
    for entity in documents.iter().flat_map(|d| d.entities.values()) {
        if entity.text.trim().is_empty() {
            continue;
        }
        let hint = Some(entity.entity_type.trim()).filter(|t| !t.is_empty());
        let occurrence = Mention::new(entity.text.clone(), hint);
        mentions
            .entry(normalize(&entity.text))
            .and_modify(|m| m.merge_hints(&occurrence))
            .or_insert(occurrence);
    }
    mentions.into_values().collect()
}

/// Counts from [`enrich_documents`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnrichmentStats {
    pub documents: usize,
    pub entities: usize,
    pub grounded_entities: usize,
    pub triples: usize,
    /// Relations naming an entity id absent from their document.
    pub dropped_relations: usize,
}

/// Attach grounding results to every entity and resolve relations to triples.
///
/// Entities look up their result by normalized text, so every occurrence of
/// a mention carries the same CUI.
pub fn enrich_documents(
    documents: &[ExtractedDocument],
    batch: &GroundingBatch,
) -> (Vec<EnrichedDocument>, EnrichmentStats) {
    let mut stats = EnrichmentStats::default();
    let enriched = documents
        .iter()
        .map(|document| {
            let entities: BTreeMap<String, EnrichedEntity> = document
                .entities
                .iter()
                .map(|(id, entity)| {
                    let result = batch.lookup(&entity.text);
                    let cui = result.and_then(|r| r.best_cui.clone());
                    stats.entities += 1;
                    if cui.is_some() {
                        stats.grounded_entities += 1;
                    }
                    let enriched = EnrichedEntity {
                        text: entity.text.clone(),
                        entity_type: entity.entity_type.clone(),
                        start: entity.start,
                        end: entity.end,
                        cui,
                        candidates: result.map(|r| r.candidates.clone()).unwrap_or_default(),
                    };
                    (id.clone(), enriched)
                })
                .collect();

            let mut triples = Vec::with_capacity(document.relations.len());
            for relation in &document.relations {
                let (Some(head), Some(tail)) = (
                    document.entities.get(&relation.source),
                    document.entities.get(&relation.target),
                ) else {
                    stats.dropped_relations += 1;
                    continue;
                };
                triples.push(Triple {
                    head: head.text.clone(),
                    relation: normalize_relation_type(&relation.relation),
                    tail: tail.text.clone(),
                });
            }
            stats.triples += triples.len();
            stats.documents += 1;

            EnrichedDocument {
                id: document.id.clone(),
                entities,
                triples,
            }
        })
        .collect();

    debug!(
        documents = stats.documents,
        entities = stats.entities,
        grounded = stats.grounded_entities,
        triples = stats.triples,
        dropped_relations = stats.dropped_relations,
        "enriched documents"
    );
    (enriched, stats)
}

/// One coverage row per unique mention, in normalized-text order.
pub fn coverage_rows(batch: &GroundingBatch) -> Vec<CoverageRow> {
    batch.mentions.values().map(coverage_row).collect()
}

fn coverage_row(grounded: &GroundedMention) -> CoverageRow {
    let GroundedMention { keys, result } = grounded;
    let top = result.top();
    CoverageRow {
        mention: keys.normalized.clone(),
        canonical: keys.canonical.clone(),
        types_seen: result.types_seen.join(","),
        is_measurement: keys.is_measurement,
        excluded_reason: result.excluded_reason.map(|r| r.as_str().to_string()),
        mapped: result.is_mapped(),
        best_cui: result.best_cui.clone(),
        candidate_count: result.candidates.len(),
        top_source: top.map(|c| c.source.clone()),
        top_term_type: top.map(|c| c.term_type.clone()),
        top_match_kind: top.map(|c| c.matched_key_kind.as_str().to_string()),
        top_matched_key: top.map(|c| c.matched_key.clone()),
    }
}

/// All triples of all documents, in document order.
pub fn all_triples(documents: &[EnrichedDocument]) -> Vec<&Triple> {
    documents.iter().flat_map(|d| d.triples.iter()).collect()
}
