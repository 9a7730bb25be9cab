use serde::{Deserialize, Serialize};

/// One row of the coverage table: how a unique mention was grounded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageRow {
    pub mention: String,
    pub canonical: String,
    /// Comma-joined sorted type hints.
    pub types_seen: String,
    pub is_measurement: bool,
    pub excluded_reason: Option<String>,
    pub mapped: bool,
    pub best_cui: Option<String>,
    #[serde(rename = "num_candidates")]
    pub candidate_count: usize,
    #[serde(rename = "top_sab")]
    pub top_source: Option<String>,
    #[serde(rename = "top_tty")]
    pub top_term_type: Option<String>,
    #[serde(rename = "top_match_type")]
    pub top_match_kind: Option<String>,
    pub top_matched_key: Option<String>,
}
