//! Batch grounding engine.
//!
//! Grounding runs in three phases, each consuming the previous one so the
//! reference file can only be scanned once per batch:
//!
//! 1. [`GroundingEngine::prepare`] deduplicates mentions by normalized text,
//!    builds their lookup keys and the shared [`KeyMap`].
//! 2. [`PreparedBatch::scan`] makes the single reference pass.
//! 3. [`GatheredBatch::finish`] filters and ranks each mention independently.
//!
//! # Example
//!
//! ```ignore
//! use umls_core::GroundingEngine;
//! use umls_ingest::{ReferenceScanner, ScanOptions};
//! use umls_model::{GroundingOptions, Mention};
//!
//! let engine = GroundingEngine::new(GroundingOptions::default())?;
//! let scanner = ReferenceScanner::open("META/MRCONSO.RRF")?;
//! let batch = engine.ground([Mention::untyped("Pneumonia")], &scanner, &ScanOptions::default())?;
//! assert_eq!(batch.lookup("Pneumonia").and_then(|r| r.best_cui.as_deref()), Some("C0032285"));
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::io::Read;
use std::path::Path;
use std::time::Instant;

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, info_span};
use umls_ingest::{ReferenceScanner, ScanOptions};
use umls_model::{
    Candidate, ExclusionReason, GroundingOptions, GroundingResult, Mention, MentionId,
    MentionKeys,
};
use umls_normalization::{KeyGenerator, normalize};

use crate::error::{GroundingError, Result};
use crate::filter::SemanticTypeFilter;
use crate::index::{IndexStats, ReferenceIndex};
use crate::key_map::KeyMap;
use crate::rank::CandidateRanker;

/// Lifecycle of one unique mention within a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MentionState {
    New,
    Keyed,
    /// Terminal: the mention reads as a measurement.
    ExcludedMeasurement,
    CandidatesGathered,
    Filtered,
    Ranked,
    /// Terminal: a result was recorded.
    Done,
}

impl MentionState {
    /// Whether `self -> next` is a legal transition.
    pub fn can_advance_to(self, next: MentionState) -> bool {
        matches!(
            (self, next),
            (Self::New, Self::Keyed)
                | (Self::Keyed, Self::ExcludedMeasurement | Self::CandidatesGathered)
                | (Self::CandidatesGathered, Self::Filtered)
                | (Self::Filtered, Self::Ranked)
                | (Self::Ranked, Self::Done)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::ExcludedMeasurement | Self::Done)
    }

    fn advance(&mut self, next: MentionState) {
        debug_assert!(
            self.can_advance_to(next),
            "illegal mention transition {self} -> {next}"
        );
        *self = next;
    }
}

impl fmt::Display for MentionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::New => "new",
            Self::Keyed => "keyed",
            Self::ExcludedMeasurement => "excluded_measurement",
            Self::CandidatesGathered => "candidates_gathered",
            Self::Filtered => "filtered",
            Self::Ranked => "ranked",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// Grounds mention batches against a reference file.
#[derive(Debug, Clone)]
pub struct GroundingEngine {
    options: GroundingOptions,
    keys: KeyGenerator,
    filter: SemanticTypeFilter,
    ranker: CandidateRanker,
}

impl GroundingEngine {
    /// Create an engine with the default vocabularies.
    ///
    /// # Errors
    ///
    /// Returns [`GroundingError::Options`] when the options are invalid
    /// (e.g. `top_k == 0`).
    pub fn new(options: GroundingOptions) -> Result<Self> {
        Self::with_key_generator(options, KeyGenerator::default())
    }

    /// Create an engine with a custom key generator.
    ///
    /// # Errors
    ///
    /// Returns [`GroundingError::Options`] when the options are invalid.
    pub fn with_key_generator(options: GroundingOptions, keys: KeyGenerator) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            filter: SemanticTypeFilter::new(options.semantic_types.clone()),
            ranker: CandidateRanker::new(&options),
            options,
            keys,
        })
    }

    pub fn options(&self) -> &GroundingOptions {
        &self.options
    }

    pub fn key_generator(&self) -> &KeyGenerator {
        &self.keys
    }

    /// Deduplicate mentions and build the shared key map.
    ///
    /// Mentions with the same normalized text collapse into one entry whose
    /// type hints are the union of all occurrences. Entries are ordered by
    /// normalized text, so input order never matters.
    ///
    /// # Errors
    ///
    /// Returns [`GroundingError::BatchTooLarge`] if the batch cannot be indexed.
    pub fn prepare<I>(&self, mentions: I) -> Result<PreparedBatch<'_>>
    where
        I: IntoIterator<Item = Mention>,
    {
        let mut unique: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        let mut occurrences = 0usize;
        for mention in mentions {
            occurrences += 1;
            unique
                .entry(normalize(&mention.text))
                .or_default()
                .extend(mention.type_hints);
        }
        if u32::try_from(unique.len()).is_err() {
            return Err(GroundingError::BatchTooLarge {
                count: unique.len(),
            });
        }

        let mut states = vec![MentionState::New; unique.len()];
        let keyed: Vec<MentionKeys> = unique
            .iter()
            .map(|(normalized, hints)| self.keys.build_keys_normalized(normalized, hints))
            .collect();
        for state in &mut states {
            state.advance(MentionState::Keyed);
        }
        let key_map = KeyMap::build(&keyed);
        debug!(
            occurrences,
            unique = keyed.len(),
            keys = key_map.len(),
            requests = key_map.request_count(),
            "prepared mention batch"
        );

        Ok(PreparedBatch {
            engine: self,
            mentions: keyed,
            states,
            key_map,
        })
    }

    /// Ground a batch with one scan of `scanner`'s file.
    ///
    /// # Errors
    ///
    /// Fails on scan errors, cancellation, or deadline expiry; no partial
    /// results are returned.
    pub fn ground<I>(
        &self,
        mentions: I,
        scanner: &ReferenceScanner,
        scan: &ScanOptions,
    ) -> Result<GroundingBatch>
    where
        I: IntoIterator<Item = Mention>,
    {
        let started = Instant::now();
        let span = info_span!("grounding");
        let _guard = span.enter();
        let batch = self.prepare(mentions)?.scan(scanner, scan)?.finish();
        info!(
            mentions = batch.stats.mentions,
            mapped = batch.stats.mapped,
            excluded = batch.stats.excluded,
            unmapped = batch.stats.unmapped,
            duration_ms = started.elapsed().as_millis(),
            "grounding complete"
        );
        Ok(batch)
    }

    fn finish_mention(
        &self,
        keys: &MentionKeys,
        state: &mut MentionState,
        evidence: Vec<Candidate>,
    ) -> GroundingResult {
        if keys.is_measurement {
            state.advance(MentionState::ExcludedMeasurement);
            return GroundingResult::excluded(
                keys.type_hints.clone(),
                ExclusionReason::MeasurementLike,
            );
        }
        state.advance(MentionState::CandidatesGathered);
        let filtered = self.filter.apply(evidence, &keys.type_hints);
        state.advance(MentionState::Filtered);
        let ranked = self.ranker.rank(filtered);
        state.advance(MentionState::Ranked);
        let result = GroundingResult::ranked(keys.type_hints.clone(), ranked);
        state.advance(MentionState::Done);
        result
    }
}

/// Keyed mentions waiting for the reference scan.
#[derive(Debug)]
pub struct PreparedBatch<'e> {
    engine: &'e GroundingEngine,
    mentions: Vec<MentionKeys>,
    states: Vec<MentionState>,
    key_map: KeyMap,
}

impl<'e> PreparedBatch<'e> {
    /// Unique mentions in id order.
    pub fn mentions(&self) -> &[MentionKeys] {
        &self.mentions
    }

    pub fn key_map(&self) -> &KeyMap {
        &self.key_map
    }

    pub fn states(&self) -> &[MentionState] {
        &self.states
    }

    /// Gather evidence with one pass over the reference file.
    ///
    /// # Errors
    ///
    /// Fails on read errors, cancellation, and deadline expiry.
    pub fn scan(
        self,
        scanner: &ReferenceScanner,
        options: &ScanOptions,
    ) -> Result<GatheredBatch<'e>> {
        let index = ReferenceIndex::build(&self.key_map, scanner, options)?;
        Ok(self.gathered(index))
    }

    /// Gather evidence from a reader on the current thread.
    ///
    /// # Errors
    ///
    /// Fails on read errors, cancellation, and deadline expiry.
    pub fn scan_reader<R: Read>(
        self,
        reader: R,
        origin: &Path,
        options: &ScanOptions,
    ) -> Result<GatheredBatch<'e>> {
        let index = ReferenceIndex::build_from_reader(&self.key_map, reader, origin, options)?;
        Ok(self.gathered(index))
    }

    fn gathered(self, index: ReferenceIndex) -> GatheredBatch<'e> {
        GatheredBatch {
            engine: self.engine,
            mentions: self.mentions,
            states: self.states,
            key_count: self.key_map.len(),
            index,
        }
    }
}

/// Mentions whose evidence has been collected.
#[derive(Debug)]
pub struct GatheredBatch<'e> {
    engine: &'e GroundingEngine,
    mentions: Vec<MentionKeys>,
    states: Vec<MentionState>,
    key_count: usize,
    index: ReferenceIndex,
}

impl GatheredBatch<'_> {
    pub fn index(&self) -> &ReferenceIndex {
        &self.index
    }

    /// Filter and rank every mention.
    pub fn finish(self) -> GroundingBatch {
        let index_stats = *self.index.stats();
        let mut buckets = self.index.into_buckets();
        let evidence: Vec<Vec<Candidate>> = (0..self.mentions.len())
            .map(|i| {
                u32::try_from(i)
                    .ok()
                    .and_then(|id| buckets.remove(&MentionId(id)))
                    .unwrap_or_default()
            })
            .collect();

        let engine = self.engine;
        let finished: Vec<(GroundedMention, MentionState)> = self
            .mentions
            .into_par_iter()
            .zip(self.states)
            .zip(evidence)
            .map(|((keys, mut state), evidence)| {
                let result = engine.finish_mention(&keys, &mut state, evidence);
                (GroundedMention { keys, result }, state)
            })
            .collect();

        let mut stats = BatchStats {
            keys: self.key_count,
            index: index_stats,
            ..BatchStats::default()
        };
        let mut mentions = BTreeMap::new();
        for (grounded, state) in finished {
            debug_assert!(state.is_terminal());
            stats.record(&grounded.result);
            mentions.insert(grounded.keys.normalized.clone(), grounded);
        }
        GroundingBatch { mentions, stats }
    }
}

/// A unique mention and its final result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroundedMention {
    pub keys: MentionKeys,
    pub result: GroundingResult,
}

/// Counts reported for a grounding batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchStats {
    pub mentions: usize,
    pub mapped: usize,
    pub excluded: usize,
    pub unmapped: usize,
    /// Distinct lookup keys registered for the scan.
    pub keys: usize,
    pub index: IndexStats,
}

impl BatchStats {
    fn record(&mut self, result: &GroundingResult) {
        self.mentions += 1;
        if result.is_excluded() {
            self.excluded += 1;
        } else if result.is_mapped() {
            self.mapped += 1;
        } else {
            self.unmapped += 1;
        }
    }
}

/// Results of one grounding batch, keyed by normalized mention text.
#[derive(Debug, Clone, Default)]
pub struct GroundingBatch {
    pub mentions: BTreeMap<String, GroundedMention>,
    pub stats: BatchStats,
}

impl GroundingBatch {
    /// Result for an already normalized mention.
    pub fn result(&self, normalized: &str) -> Option<&GroundingResult> {
        self.mentions.get(normalized).map(|m| &m.result)
    }

    /// Result for raw mention text.
    pub fn lookup(&self, text: &str) -> Option<&GroundingResult> {
        self.result(&normalize(text))
    }

    /// Normalized mention to result, as persisted in `mention2cui.json`.
    pub fn mention_map(&self) -> BTreeMap<&str, &GroundingResult> {
        self.mentions
            .iter()
            .map(|(text, m)| (text.as_str(), &m.result))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.mentions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mentions.is_empty()
    }
}
