//! Mentions and the lookup keys generated for them.
//!
//! A mention is the free-text span an extractor produced, plus the entity
//! types it was tagged with. Mentions are deduplicated across a batch by their
//! normalized form; type hints of duplicates are merged.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A raw entity mention with the type hints observed for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mention {
    /// Mention text as produced by the extractor.
    pub text: String,
    /// Entity types seen for this text (e.g. "ANATOMY", "OBS-DP").
    pub type_hints: BTreeSet<String>,
}

impl Mention {
    /// Create a mention with the given type hints.
    pub fn new<I, S>(text: impl Into<String>, type_hints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            text: text.into(),
            type_hints: type_hints.into_iter().map(Into::into).collect(),
        }
    }

    /// Create a mention without type hints.
    pub fn untyped(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            type_hints: BTreeSet::new(),
        }
    }

    /// Merge the type hints of another occurrence of the same mention.
    pub fn merge_hints(&mut self, other: &Mention) {
        self.type_hints.extend(other.type_hints.iter().cloned());
    }
}

/// Dense index of a unique mention within one grounding batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MentionId(pub u32);

impl MentionId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for MentionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "m{}", self.0)
    }
}

/// Which form of the mention a lookup key was derived from.
///
/// Variants are declared in priority order: a match through the full
/// normalized text beats one through the canonical form, which beats a
/// head-noun fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyKind {
    /// The normalized mention text.
    FullNorm,
    /// The canonicalized mention text.
    FullCan,
    /// A trailing token window after stopword/modifier removal.
    Head,
}

impl KeyKind {
    /// Ranking priority of this key kind (lower is better).
    pub fn priority(self) -> u8 {
        match self {
            Self::FullNorm => 0,
            Self::FullCan => 1,
            Self::Head => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::FullNorm => "full_norm",
            Self::FullCan => "full_can",
            Self::Head => "head",
        }
    }
}

impl fmt::Display for KeyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single lookup key for a mention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupKey {
    pub kind: KeyKind,
    pub key: String,
}

impl LookupKey {
    pub fn new(kind: KeyKind, key: impl Into<String>) -> Self {
        Self {
            kind,
            key: key.into(),
        }
    }
}

/// Everything derived from a mention before the reference scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MentionKeys {
    /// Normalized mention text (the batch-wide identity of the mention).
    pub normalized: String,
    /// Canonical form used for reference lookups.
    pub canonical: String,
    /// Whether the mention looks like a measurement ("3.5 cm").
    pub is_measurement: bool,
    /// Ordered lookup keys, unique by key string.
    pub keys: Vec<LookupKey>,
    /// Sorted, deduplicated type hints.
    pub type_hints: Vec<String>,
}

impl MentionKeys {
    /// Key strings in priority order.
    pub fn key_strings(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(|k| k.key.as_str())
    }
}
