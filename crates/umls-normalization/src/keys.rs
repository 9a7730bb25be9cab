//! Lookup-key generation for mentions.

use std::cmp::Reverse;
use std::collections::BTreeSet;

use umls_model::{KeyKind, LookupKey, Mention, MentionKeys};

use crate::text::{canonicalize, is_measurement_like, normalize};
use crate::vocabulary::Vocabulary;

/// Longest trailing token window used as a head candidate.
const MAX_HEAD_TOKENS: usize = 3;

/// Builds ordered, deduplicated lookup keys for mentions.
#[derive(Debug, Clone, Default)]
pub struct KeyGenerator {
    vocabulary: Vocabulary,
}

impl KeyGenerator {
    pub fn new(vocabulary: Vocabulary) -> Self {
        Self { vocabulary }
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    /// Trailing 1-, 2- and 3-token windows of the canonical text once
    /// stopwords, laterality and severity terms are removed.
    ///
    /// Longer windows come first; windows of equal length sort
    /// lexicographically.
    pub fn head_candidates(&self, canonical: &str) -> Vec<String> {
        let tokens: Vec<&str> = canonical
            .split_whitespace()
            .filter(|token| !self.vocabulary.is_modifier(token))
            .collect();

        let windows: BTreeSet<String> = (1..=MAX_HEAD_TOKENS.min(tokens.len()))
            .map(|size| tokens[tokens.len() - size..].join(" "))
            .collect();

        let mut candidates: Vec<String> = windows.into_iter().collect();
        candidates.sort_by_key(|c| Reverse(c.split_whitespace().count()));
        candidates
    }

    /// Build keys for a raw mention.
    pub fn build_keys(&self, mention: &Mention) -> MentionKeys {
        self.build_keys_normalized(&normalize(&mention.text), &mention.type_hints)
    }

    /// Build keys for text that is already in normalized form.
    ///
    /// Keys are emitted as the normalized text, then the canonical text when
    /// it differs, then head candidates. Empty keys are skipped and a key
    /// string appearing twice keeps the kind of its first occurrence.
    pub fn build_keys_normalized(
        &self,
        normalized: &str,
        type_hints: &BTreeSet<String>,
    ) -> MentionKeys {
        let canonical = canonicalize(normalized);
        let is_measurement = is_measurement_like(&canonical);

        let mut raw_keys = vec![LookupKey::new(KeyKind::FullNorm, normalized)];
        if !canonical.is_empty() && canonical != normalized {
            raw_keys.push(LookupKey::new(KeyKind::FullCan, canonical.clone()));
        }
        for head in self.head_candidates(&canonical) {
            raw_keys.push(LookupKey::new(KeyKind::Head, head));
        }

        let mut seen = BTreeSet::new();
        let keys = raw_keys
            .into_iter()
            .filter(|k| !k.key.is_empty() && seen.insert(k.key.clone()))
            .collect();

        MentionKeys {
            normalized: normalized.to_string(),
            canonical,
            is_measurement,
            keys,
            type_hints: type_hints.iter().cloned().collect(),
        }
    }
}
