//! Candidate concepts gathered from the reference table.

use serde::{Deserialize, Serialize};

use crate::mention::KeyKind;

/// A reference row matched to a mention through one of its lookup keys.
///
/// Field names serialize to the MRCONSO column names so persisted artifacts
/// read naturally next to the source table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    /// Concept unique identifier.
    pub cui: String,
    /// Source vocabulary abbreviation (SAB).
    #[serde(rename = "sab")]
    pub source: String,
    /// Term type within the source (TTY).
    #[serde(rename = "tty")]
    pub term_type: String,
    /// Whether the row is the preferred string of its concept (ISPREF = Y).
    #[serde(rename = "ispref")]
    pub preferred: bool,
    /// Surface string as written in the reference table.
    #[serde(rename = "str")]
    pub surface: String,
    /// The canonical key both sides agreed on.
    pub matched_key: String,
    /// Which mention form produced the matched key.
    #[serde(rename = "matched_key_type")]
    pub matched_key_kind: KeyKind,
}

impl Candidate {
    /// Identity used to deduplicate evidence for one mention.
    pub fn evidence_key(&self) -> EvidenceKey {
        EvidenceKey {
            cui: self.cui.clone(),
            source: self.source.clone(),
            term_type: self.term_type.clone(),
        }
    }
}

/// Deduplication key for candidate evidence within a mention bucket.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EvidenceKey {
    pub cui: String,
    pub source: String,
    pub term_type: String,
}
