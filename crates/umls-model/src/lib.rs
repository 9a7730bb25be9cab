pub mod candidate;
pub mod coverage;
pub mod error;
pub mod extraction;
pub mod grounding;
pub mod mention;
pub mod options;

pub use candidate::{Candidate, EvidenceKey};
pub use coverage::CoverageRow;
pub use error::{ModelError, Result};
pub use extraction::{
    EnrichedDocument, EnrichedEntity, ExtractedDocument, ExtractedEntity, RelationRef, Triple,
    UNKNOWN_ENTITY_TYPE,
};
pub use grounding::{ExclusionReason, GroundingResult};
pub use mention::{KeyKind, LookupKey, Mention, MentionId, MentionKeys};
pub use options::{
    DEFAULT_PREFERRED_TERM_TYPES, DEFAULT_SOURCE_PREFERENCE, DEFAULT_TOP_K, GroundingOptions,
    SemanticTypeOptions,
};

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(cui: &str) -> Candidate {
        Candidate {
            cui: cui.to_string(),
            source: "SNOMEDCT_US".to_string(),
            term_type: "PT".to_string(),
            preferred: true,
            surface: "Pneumonia".to_string(),
            matched_key: "pneumonia".to_string(),
            matched_key_kind: KeyKind::FullNorm,
        }
    }

    #[test]
    fn ranked_result_takes_first_cui() {
        let result = GroundingResult::ranked(
            vec!["OBS-DP".to_string()],
            vec![candidate("C0032285"), candidate("C0032286")],
        );
        assert_eq!(result.best_cui.as_deref(), Some("C0032285"));
        assert!(result.is_mapped());
        assert!(!result.is_excluded());
    }

    #[test]
    fn candidate_serializes_with_umls_column_names() {
        let json = serde_json::to_value(candidate("C0032285")).expect("serialize candidate");
        assert_eq!(json["sab"], "SNOMEDCT_US");
        assert_eq!(json["tty"], "PT");
        assert_eq!(json["ispref"], true);
        assert_eq!(json["matched_key_type"], "full_norm");
    }
}
