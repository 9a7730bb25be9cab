use std::fmt;

use serde::{Deserialize, Serialize};

use crate::candidate::Candidate;

/// Why a mention was excluded from grounding altogether.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExclusionReason {
    /// The mention reads as a size/measurement ("3.5 cm", "10mm").
    MeasurementLike,
}

impl ExclusionReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MeasurementLike => "measurement_like",
        }
    }
}

impl fmt::Display for ExclusionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final grounding outcome for one unique mention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundingResult {
    /// CUI of the top-ranked candidate, if any survived.
    pub best_cui: Option<String>,
    /// Ranked candidates, at most `top_k`.
    pub candidates: Vec<Candidate>,
    /// Sorted type hints observed for the mention.
    pub types_seen: Vec<String>,
    /// Set only when the mention was excluded before matching.
    pub excluded_reason: Option<ExclusionReason>,
}

impl GroundingResult {
    /// Result for a mention excluded as measurement-like.
    pub fn excluded(types_seen: Vec<String>, reason: ExclusionReason) -> Self {
        Self {
            best_cui: None,
            candidates: Vec::new(),
            types_seen,
            excluded_reason: Some(reason),
        }
    }

    /// Result built from an already ranked and truncated candidate list.
    pub fn ranked(types_seen: Vec<String>, candidates: Vec<Candidate>) -> Self {
        Self {
            best_cui: candidates.first().map(|c| c.cui.clone()),
            candidates,
            types_seen,
            excluded_reason: None,
        }
    }

    pub fn is_mapped(&self) -> bool {
        self.best_cui.is_some()
    }

    pub fn is_excluded(&self) -> bool {
        self.excluded_reason.is_some()
    }

    pub fn top(&self) -> Option<&Candidate> {
        self.candidates.first()
    }
}
