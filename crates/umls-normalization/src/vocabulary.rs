//! Word lists stripped from mentions before head candidates are formed.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Function words that never carry the concept.
pub const STOPWORDS: &[&str] = &[
    "no", "not", "without", "with", "of", "in", "on", "at", "the", "a", "an", "and", "or", "to",
    "for",
];

/// Side markers, including the single-letter abbreviations used in reports.
pub const LATERALITY_TERMS: &[&str] = &["left", "right", "bilateral", "bl", "b", "l", "r"];

/// Severity and certainty modifiers.
pub const SEVERITY_TERMS: &[&str] = &[
    "mild",
    "mildly",
    "moderate",
    "moderately",
    "severe",
    "marked",
    "slight",
    "small",
    "tiny",
    "minimal",
    "possible",
    "likely",
];

/// Immutable set of tokens removed during head-candidate extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vocabulary {
    stopwords: BTreeSet<String>,
    laterality: BTreeSet<String>,
    severity: BTreeSet<String>,
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self::new(
            STOPWORDS.iter().copied(),
            LATERALITY_TERMS.iter().copied(),
            SEVERITY_TERMS.iter().copied(),
        )
    }
}

impl Vocabulary {
    pub fn new<A, B, C>(stopwords: A, laterality: B, severity: C) -> Self
    where
        A: IntoIterator,
        A::Item: Into<String>,
        B: IntoIterator,
        B::Item: Into<String>,
        C: IntoIterator,
        C::Item: Into<String>,
    {
        Self {
            stopwords: stopwords.into_iter().map(Into::into).collect(),
            laterality: laterality.into_iter().map(Into::into).collect(),
            severity: severity.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_stopword(&self, token: &str) -> bool {
        self.stopwords.contains(token)
    }

    pub fn is_laterality(&self, token: &str) -> bool {
        self.laterality.contains(token)
    }

    pub fn is_severity(&self, token: &str) -> bool {
        self.severity.contains(token)
    }

    /// True if the token is dropped before head candidates are built.
    pub fn is_modifier(&self, token: &str) -> bool {
        self.is_stopword(token) || self.is_laterality(token) || self.is_severity(token)
    }
}
