//! Documents as produced by the entity/relation extractor, and the enriched
//! form handed to graph consumers after grounding.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::candidate::Candidate;

/// Entity label used when the extractor gives none.
pub const UNKNOWN_ENTITY_TYPE: &str = "UNKNOWN";

/// One extracted entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedEntity {
    pub text: String,
    #[serde(rename = "type", default)]
    pub entity_type: String,
    #[serde(default)]
    pub start: Option<usize>,
    #[serde(default)]
    pub end: Option<usize>,
}

/// A directed relation between two entity ids of the same document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationRef {
    pub source: String,
    pub relation: String,
    pub target: String,
}

/// Extractor output for a single report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedDocument {
    pub id: String,
    #[serde(default)]
    pub entities: BTreeMap<String, ExtractedEntity>,
    #[serde(default)]
    pub relations: Vec<RelationRef>,
}

/// A relation resolved to entity texts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Triple {
    pub head: String,
    pub relation: String,
    pub tail: String,
}

/// An entity carrying its grounding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichedEntity {
    pub text: String,
    #[serde(rename = "type")]
    pub entity_type: String,
    pub start: Option<usize>,
    pub end: Option<usize>,
    pub cui: Option<String>,
    #[serde(rename = "cui_candidates")]
    pub candidates: Vec<Candidate>,
}

/// All enriched entities and triples of one document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichedDocument {
    pub id: String,
    pub entities: BTreeMap<String, EnrichedEntity>,
    pub triples: Vec<Triple>,
}
