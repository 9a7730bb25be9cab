//! Configuration options for grounding.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};

/// Default source vocabulary preference, best first.
pub const DEFAULT_SOURCE_PREFERENCE: &[&str] = &["SNOMEDCT_US", "RXNORM", "MSH"];

/// Default number of candidates kept per mention.
pub const DEFAULT_TOP_K: usize = 5;

/// Term types that rank as preferred names within their source.
pub const DEFAULT_PREFERRED_TERM_TYPES: &[&str] = &["PT", "PN", "HT", "MH"];

/// Options for the optional semantic-type candidate filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SemanticTypeOptions {
    /// Disabled by default; when off every candidate passes.
    pub enabled: bool,
    /// CUI -> semantic type codes (TUIs).
    pub cui_to_semantic_types: BTreeMap<String, BTreeSet<String>>,
    /// Type codes accepted for anatomy-typed mentions.
    pub anatomy_type_codes: BTreeSet<String>,
    /// Type codes accepted for observation-typed mentions.
    pub observation_type_codes: BTreeSet<String>,
}

impl SemanticTypeOptions {
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_mapping(mut self, mapping: BTreeMap<String, BTreeSet<String>>) -> Self {
        self.cui_to_semantic_types = mapping;
        self
    }

    pub fn with_anatomy_codes<I, S>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.anatomy_type_codes = codes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_observation_codes<I, S>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.observation_type_codes = codes.into_iter().map(Into::into).collect();
        self
    }
}

/// Options controlling candidate ranking and filtering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroundingOptions {
    /// Ordered source preference. `None` ranks every source equally;
    /// sources missing from the list rank after all listed ones.
    pub source_preference: Option<Vec<String>>,

    /// Maximum number of candidates kept per mention.
    pub top_k: usize,

    /// Term types ranked ahead of all others.
    pub preferred_term_types: BTreeSet<String>,

    /// Semantic-type filter settings.
    pub semantic_types: SemanticTypeOptions,
}

impl Default for GroundingOptions {
    fn default() -> Self {
        Self {
            source_preference: Some(
                DEFAULT_SOURCE_PREFERENCE
                    .iter()
                    .map(|s| (*s).to_string())
                    .collect(),
            ),
            top_k: DEFAULT_TOP_K,
            preferred_term_types: DEFAULT_PREFERRED_TERM_TYPES
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            semantic_types: SemanticTypeOptions::default(),
        }
    }
}

impl GroundingOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_source_preference<I, S>(mut self, sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.source_preference = Some(sources.into_iter().map(Into::into).collect());
        self
    }

    /// Rank all sources equally.
    pub fn without_source_preference(mut self) -> Self {
        self.source_preference = None;
        self
    }

    pub fn with_semantic_types(mut self, semantic_types: SemanticTypeOptions) -> Self {
        self.semantic_types = semantic_types;
        self
    }

    /// Check option values that would make grounding meaningless.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidOption`] when `top_k` is zero.
    pub fn validate(&self) -> Result<()> {
        if self.top_k == 0 {
            return Err(ModelError::InvalidOption {
                field: "top_k",
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}
