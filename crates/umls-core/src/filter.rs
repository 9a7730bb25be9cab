//! Optional semantic-type restriction of candidates.

use std::collections::BTreeSet;

use umls_model::{Candidate, SemanticTypeOptions};

/// Filter category a type hint belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    /// Exactly `ANATOMY`.
    Anatomy,
    /// Exactly `OBSERVATION`.
    Observation,
    /// Any other hint, including extractor labels such as `ANAT-DP` or
    /// `OBS-U`; never restricts candidates.
    Unrestricted,
}

impl TypeCategory {
    /// Case-sensitive match on the whole hint.
    pub fn of_hint(hint: &str) -> Self {
        match hint {
            "ANATOMY" => Self::Anatomy,
            "OBSERVATION" => Self::Observation,
            _ => Self::Unrestricted,
        }
    }
}

/// Keeps candidates whose concept carries a semantic type allowed for at
/// least one of the mention's type hints.
///
/// Disabled filters, and mentions without type hints, pass everything.
#[derive(Debug, Clone, Default)]
pub struct SemanticTypeFilter {
    options: SemanticTypeOptions,
}

impl SemanticTypeFilter {
    pub fn new(options: SemanticTypeOptions) -> Self {
        Self { options }
    }

    pub fn is_enabled(&self) -> bool {
        self.options.enabled
    }

    fn allowed_codes(&self, category: TypeCategory) -> Option<&BTreeSet<String>> {
        match category {
            TypeCategory::Anatomy => Some(&self.options.anatomy_type_codes),
            TypeCategory::Observation => Some(&self.options.observation_type_codes),
            TypeCategory::Unrestricted => None,
        }
    }

    /// Whether a concept survives for the given hints.
    pub fn allows(&self, cui: &str, type_hints: &[String]) -> bool {
        if !self.options.enabled || type_hints.is_empty() {
            return true;
        }
        let concept_types = self.options.cui_to_semantic_types.get(cui);
        type_hints.iter().any(|hint| {
            match self.allowed_codes(TypeCategory::of_hint(hint)) {
                None => true,
                Some(allowed) => {
                    concept_types.is_some_and(|types| !types.is_disjoint(allowed))
                }
            }
        })
    }

    /// Drop candidates the hints do not allow. Order is preserved.
    pub fn apply(&self, mut candidates: Vec<Candidate>, type_hints: &[String]) -> Vec<Candidate> {
        if self.options.enabled && !type_hints.is_empty() {
            candidates.retain(|c| self.allows(&c.cui, type_hints));
        }
        candidates
    }
}
