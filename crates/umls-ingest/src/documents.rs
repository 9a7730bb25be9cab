//! Loading entity/relation extractor output.
//!
//! Accepted shapes:
//! - a JSON array of documents,
//! - an object `{"documents": [...]}`,
//! - RadGraph predictions, an object keyed by report id whose entities carry
//!   `tokens`, `label`, `start_ix`, `end_ix` and `[relation, target]` pairs,
//! - JSON Lines (`.jsonl` / `.ndjson`), one document per non-blank line.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::debug;
use umls_model::{ExtractedDocument, ExtractedEntity, RelationRef, UNKNOWN_ENTITY_TYPE};

use crate::error::{IngestError, Result};

#[derive(Deserialize)]
#[serde(untagged)]
enum DocumentsFile {
    List(Vec<ExtractedDocument>),
    Wrapped { documents: Vec<ExtractedDocument> },
    RadGraph(RadGraphBatch),
}

/// RadGraph output in report order.
struct RadGraphBatch(Vec<(String, RadGraphPrediction)>);

impl<'de> Deserialize<'de> for RadGraphBatch {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct BatchVisitor;

        impl<'de> Visitor<'de> for BatchVisitor {
            type Value = RadGraphBatch;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of report id to RadGraph prediction")
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut map: A,
            ) -> std::result::Result<Self::Value, A::Error> {
                let mut reports = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some(entry) = map.next_entry()? {
                    reports.push(entry);
                }
                Ok(RadGraphBatch(reports))
            }
        }

        deserializer.deserialize_map(BatchVisitor)
    }
}

#[derive(Deserialize)]
struct RadGraphPrediction {
    entities: BTreeMap<String, RadGraphEntity>,
}

#[derive(Deserialize)]
struct RadGraphEntity {
    #[serde(default)]
    tokens: Tokens,
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    start_ix: Option<usize>,
    #[serde(default)]
    end_ix: Option<usize>,
    #[serde(default)]
    relations: Vec<Value>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Tokens {
    Words(Vec<String>),
    Text(String),
}

impl Default for Tokens {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl Tokens {
    fn into_text(self) -> String {
        match self {
            Self::Words(words) => words.join(" "),
            Self::Text(text) => text,
        }
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

impl RadGraphPrediction {
    /// Convert to a document. Relation items that are not `[type, target]`
    /// pairs are skipped.
    fn into_document(self, id: String) -> ExtractedDocument {
        let mut relations = Vec::new();
        let entities = self
            .entities
            .into_iter()
            .map(|(key, entity)| {
                for item in &entity.relations {
                    if let Some([relation, target]) = item.as_array().map(Vec::as_slice) {
                        relations.push(RelationRef {
                            source: key.clone(),
                            relation: value_text(relation),
                            target: value_text(target),
                        });
                    }
                }
                let converted = ExtractedEntity {
                    text: entity.tokens.into_text(),
                    entity_type: entity.label.unwrap_or_default(),
                    start: entity.start_ix,
                    end: entity.end_ix,
                };
                (key, converted)
            })
            .collect();
        ExtractedDocument {
            id,
            entities,
            relations,
        }
    }
}

/// Load extractor documents from `path`.
///
/// Entity text is trimmed, entity types are uppercased, and a blank type
/// becomes [`UNKNOWN_ENTITY_TYPE`].
///
/// # Errors
///
/// Returns an error when the file is missing, unreadable, or not valid JSON
/// of the expected shape.
pub fn load_documents(path: &Path) -> Result<Vec<ExtractedDocument>> {
    let content = fs::read_to_string(path).map_err(|e| IngestError::open(path, e))?;
    let mut documents = if is_json_lines(path) {
        parse_json_lines(path, &content)?
    } else {
        parse_json(path, &content)?
    };
    for document in &mut documents {
        tidy_document(document);
    }
    debug!(
        path = %path.display(),
        documents = documents.len(),
        "loaded extractor documents"
    );
    Ok(documents)
}

fn is_json_lines(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("jsonl") || ext.eq_ignore_ascii_case("ndjson"))
}

fn parse_json(path: &Path, content: &str) -> Result<Vec<ExtractedDocument>> {
    let parsed: DocumentsFile =
        serde_json::from_str(content).map_err(|source| IngestError::Documents {
            path: path.to_path_buf(),
            line: source.line(),
            source,
        })?;
    Ok(match parsed {
        DocumentsFile::List(documents) | DocumentsFile::Wrapped { documents } => documents,
        DocumentsFile::RadGraph(RadGraphBatch(reports)) => reports
            .into_iter()
            .map(|(id, prediction)| prediction.into_document(id))
            .collect(),
    })
}

fn parse_json_lines(path: &Path, content: &str) -> Result<Vec<ExtractedDocument>> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            serde_json::from_str(line).map_err(|source| IngestError::Documents {
                path: path.to_path_buf(),
                line: index + 1,
                source,
            })
        })
        .collect()
}

fn tidy_document(document: &mut ExtractedDocument) {
    for entity in document.entities.values_mut() {
        let text = entity.text.trim();
        if text.len() != entity.text.len() {
            entity.text = text.to_string();
        }
        let entity_type = entity.entity_type.trim();
        entity.entity_type = if entity_type.is_empty() {
            UNKNOWN_ENTITY_TYPE.to_string()
        } else {
            entity_type.to_uppercase()
        };
    }
}
