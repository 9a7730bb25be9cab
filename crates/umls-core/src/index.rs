//! Per-mention candidate evidence gathered in one reference scan.
//!
//! Each scan shard fills a [`ShardIndex`]; shards are merged into a read-only
//! [`ReferenceIndex`]. Evidence is deduplicated per (mention, CUI, source,
//! term type). When two rows produce the same evidence the one with the
//! lowest (key-kind priority, preferred rank, surface string, matched key)
//! is kept, both inside a shard and at merge, so the index does not depend
//! on row order or shard count.

use std::cmp::Ordering;
use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::io::Read;
use std::path::Path;

use serde::Serialize;
use tracing::{debug, info, info_span};
use umls_ingest::{ReferenceRow, ReferenceScanner, ScanOptions, ScanStats, scan_reader};
use umls_model::{Candidate, EvidenceKey, MentionId};
use umls_normalization::canonicalize_into;

use crate::error::Result;
use crate::key_map::KeyMap;

type Bucket = HashMap<EvidenceKey, Candidate>;

/// Order in which duplicate evidence competes; the smaller value is kept.
fn evidence_order(a: &Candidate, b: &Candidate) -> Ordering {
    fn rank(c: &Candidate) -> (u8, u8, &str, &str) {
        (
            c.matched_key_kind.priority(),
            u8::from(!c.preferred),
            c.surface.as_str(),
            c.matched_key.as_str(),
        )
    }
    rank(a).cmp(&rank(b))
}

fn offer(bucket: &mut Bucket, candidate: Candidate) {
    match bucket.entry(candidate.evidence_key()) {
        Entry::Vacant(slot) => {
            slot.insert(candidate);
        }
        Entry::Occupied(mut slot) => {
            if evidence_order(&candidate, slot.get()) == Ordering::Less {
                slot.insert(candidate);
            }
        }
    }
}

/// Evidence collected by one scan shard.
#[derive(Debug)]
pub struct ShardIndex<'m> {
    key_map: &'m KeyMap,
    scratch: String,
    buckets: HashMap<MentionId, Bucket>,
}

impl<'m> ShardIndex<'m> {
    pub fn new(key_map: &'m KeyMap) -> Self {
        Self {
            key_map,
            scratch: String::new(),
            buckets: HashMap::new(),
        }
    }

    /// Match one admissible reference row against the key map.
    ///
    /// Rows whose canonical surface string no mention asked for are dropped
    /// without allocating.
    pub fn observe(&mut self, row: &ReferenceRow<'_>) {
        canonicalize_into(&row.surface, &mut self.scratch);
        if self.scratch.is_empty() {
            return;
        }
        let Some(requests) = self.key_map.get(&self.scratch) else {
            return;
        };
        for request in requests {
            let candidate = Candidate {
                cui: row.cui.to_string(),
                source: row.source.to_string(),
                term_type: row.term_type.to_string(),
                preferred: row.preferred,
                surface: row.surface.to_string(),
                matched_key: self.scratch.clone(),
                matched_key_kind: request.kind,
            };
            offer(self.buckets.entry(request.mention).or_default(), candidate);
        }
    }

    /// Distinct evidence entries held by this shard.
    pub fn evidence_count(&self) -> usize {
        self.buckets.values().map(HashMap::len).sum()
    }
}

/// Counts describing how an index was built.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    pub scan: ScanStats,
    pub shards: usize,
    /// Distinct (mention, CUI, source, term type) entries after merge.
    pub candidates: usize,
}

/// Merged, read-only candidate evidence for a mention batch.
#[derive(Debug, Clone, Default)]
pub struct ReferenceIndex {
    buckets: BTreeMap<MentionId, Vec<Candidate>>,
    stats: IndexStats,
}

impl ReferenceIndex {
    /// Build the index with one (possibly sharded) scan of `scanner`'s file.
    ///
    /// # Errors
    ///
    /// Fails on read errors, cancellation, and deadline expiry. No partial
    /// index is returned.
    pub fn build(
        key_map: &KeyMap,
        scanner: &ReferenceScanner,
        options: &ScanOptions,
    ) -> Result<Self> {
        let span = info_span!(
            "scan",
            path = %scanner.path().display(),
            bytes = scanner.len()
        );
        let _guard = span.enter();

        let shards = scanner.scan(
            options,
            || ShardIndex::new(key_map),
            ShardIndex::observe,
        )?;
        let shard_count = shards.len();
        let index = Self::merge(shards.into_iter().map(|output| {
            debug!(
                shard = output.index,
                evidence = output.state.evidence_count(),
                "shard evidence"
            );
            (output.state, output.stats)
        }));
        info!(
            rows = index.stats.scan.lines,
            admissible = index.stats.scan.admissible,
            malformed = index.stats.scan.malformed,
            non_english = index.stats.scan.non_english,
            candidates = index.stats.candidates,
            shards = shard_count,
            "reference scan complete"
        );
        Ok(index)
    }

    /// Build the index from a reader on the current thread.
    ///
    /// # Errors
    ///
    /// Fails on read errors, cancellation, and deadline expiry.
    pub fn build_from_reader<R: Read>(
        key_map: &KeyMap,
        reader: R,
        origin: &Path,
        options: &ScanOptions,
    ) -> Result<Self> {
        let mut shard = ShardIndex::new(key_map);
        let stats = scan_reader(reader, origin, options, &mut shard, ShardIndex::observe)?;
        Ok(Self::merge([(shard, stats)]))
    }

    /// Key-wise union of shard evidence. Order of shards does not matter.
    pub fn merge<'m, I>(shards: I) -> Self
    where
        I: IntoIterator<Item = (ShardIndex<'m>, ScanStats)>,
    {
        let mut merged: HashMap<MentionId, Bucket> = HashMap::new();
        let mut scan = ScanStats::default();
        let mut shard_count = 0;
        for (shard, stats) in shards {
            shard_count += 1;
            scan.merge(&stats);
            for (mention, bucket) in shard.buckets {
                match merged.entry(mention) {
                    Entry::Vacant(slot) => {
                        slot.insert(bucket);
                    }
                    Entry::Occupied(mut slot) => {
                        let target = slot.get_mut();
                        for candidate in bucket.into_values() {
                            offer(target, candidate);
                        }
                    }
                }
            }
        }

        let mut candidates = 0;
        let buckets = merged
            .into_iter()
            .map(|(mention, bucket)| {
                let mut list: Vec<(EvidenceKey, Candidate)> = bucket.into_iter().collect();
                list.sort_by(|a, b| a.0.cmp(&b.0));
                candidates += list.len();
                (mention, list.into_iter().map(|(_, c)| c).collect())
            })
            .collect();

        Self {
            buckets,
            stats: IndexStats {
                scan,
                shards: shard_count,
                candidates,
            },
        }
    }

    /// Evidence for a mention, ordered by (CUI, source, term type).
    pub fn candidates(&self, mention: MentionId) -> &[Candidate] {
        self.buckets
            .get(&mention)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn stats(&self) -> &IndexStats {
        &self.stats
    }

    /// Mentions with at least one piece of evidence.
    pub fn mention_count(&self) -> usize {
        self.buckets.len()
    }

    /// Take ownership of every bucket.
    pub fn into_buckets(self) -> BTreeMap<MentionId, Vec<Candidate>> {
        self.buckets
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::borrow::Cow;
    use umls_model::{KeyKind, LookupKey, MentionKeys};

    fn key_map(keys: &[(KeyKind, &str)]) -> KeyMap {
        KeyMap::build(&[MentionKeys {
            normalized: "m".to_string(),
            canonical: "m".to_string(),
            is_measurement: false,
            keys: keys.iter().map(|(kind, key)| LookupKey::new(*kind, *key)).collect(),
            type_hints: Vec::new(),
        }])
    }

    fn row<'a>(
        cui: &'a str,
        sab: &'a str,
        tty: &'a str,
        preferred: bool,
        surface: &'a str,
    ) -> ReferenceRow<'a> {
        ReferenceRow {
            cui: Cow::Borrowed(cui),
            preferred,
            source: Cow::Borrowed(sab),
            term_type: Cow::Borrowed(tty),
            surface: Cow::Borrowed(surface),
        }
    }

    #[test]
    fn unrequested_rows_are_ignored() {
        let map = key_map(&[(KeyKind::FullNorm, "pneumonia")]);
        let mut shard = ShardIndex::new(&map);
        shard.observe(&row("C1", "MSH", "MH", true, "Pleural effusion"));
        shard.observe(&row("C2", "MSH", "MH", true, "---"));
        assert_eq!(shard.evidence_count(), 0);
        shard.observe(&row("C0032285", "MSH", "MH", true, "PNEUMONIA"));
        assert_eq!(shard.evidence_count(), 1);
    }

    #[test]
    fn evidence_order_compares_kind_then_preference_then_strings() {
        let base = Candidate {
            cui: "C1".to_string(),
            source: "MSH".to_string(),
            term_type: "ET".to_string(),
            preferred: false,
            surface: "b".to_string(),
            matched_key: "b".to_string(),
            matched_key_kind: KeyKind::Head,
        };
        let stronger = Candidate {
            matched_key_kind: KeyKind::FullNorm,
            surface: "z".to_string(),
            ..base.clone()
        };
        let preferred = Candidate {
            preferred: true,
            surface: "z".to_string(),
            ..base.clone()
        };
        let smaller_surface = Candidate {
            surface: "a".to_string(),
            ..base.clone()
        };
        assert_eq!(evidence_order(&stronger, &base), Ordering::Less);
        assert_eq!(evidence_order(&preferred, &base), Ordering::Less);
        assert_eq!(evidence_order(&smaller_surface, &base), Ordering::Less);
        assert_eq!(evidence_order(&base, &base.clone()), Ordering::Equal);
    }

    #[test]
    fn duplicate_evidence_keeps_smallest_surface() {
        let map = key_map(&[(KeyKind::FullNorm, "pneumonia")]);
        let mut first = ShardIndex::new(&map);
        first.observe(&row("C1", "MSH", "ET", false, "pneumonia"));
        first.observe(&row("C1", "MSH", "ET", false, "Pneumonia"));

        let mut reversed = ShardIndex::new(&map);
        reversed.observe(&row("C1", "MSH", "ET", false, "Pneumonia"));
        reversed.observe(&row("C1", "MSH", "ET", false, "pneumonia"));

        for shard in [first, reversed] {
            let index = ReferenceIndex::merge([(shard, ScanStats::default())]);
            let candidates = index.candidates(MentionId(0));
            assert_eq!(candidates.len(), 1);
            assert_eq!(candidates[0].surface, "Pneumonia");
        }
    }

    #[test]
    fn merge_prefers_stronger_key_kind_across_shards() {
        let map = key_map(&[
            (KeyKind::FullNorm, "right sided effusion"),
            (KeyKind::Head, "effusion"),
        ]);
        let mut weak = ShardIndex::new(&map);
        weak.observe(&row("C2", "SNOMEDCT_US", "PT", true, "Effusion"));
        let mut strong = ShardIndex::new(&map);
        strong.observe(&row("C1", "SNOMEDCT_US", "PT", true, "Right-sided effusion"));
        strong.observe(&row("C2", "SNOMEDCT_US", "PT", true, "Right sided effusion"));

        let stats = ScanStats {
            lines: 1,
            admissible: 1,
            ..ScanStats::default()
        };
        let index = ReferenceIndex::merge([(weak, stats), (strong, stats)]);
        let candidates = index.candidates(MentionId(0));
        assert_eq!(candidates.len(), 2);
        let c2 = candidates.iter().find(|c| c.cui == "C2").expect("C2 evidence");
        assert_eq!(c2.matched_key_kind, KeyKind::FullNorm);
        assert_eq!(index.stats().scan.lines, 2);
        assert_eq!(index.stats().candidates, 2);
        assert_eq!(index.stats().shards, 2);
    }
}
