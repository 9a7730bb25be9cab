//! Deterministic candidate ranking.
//!
//! Candidates sort ascending on:
//! 1. key-kind priority (full_norm, full_can, head),
//! 2. preferred flag (preferred first),
//! 3. position of the source in the preference list (unlisted sources after
//!    all listed ones; all sources equal when no list is configured),
//! 4. whether the term type is a preferred-name type (PT, PN, HT, MH),
//! 5. source, term type and CUI, lexicographically.
//!
//! The last step makes the order total, so ranking never depends on the
//! order evidence was collected in.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

use umls_model::{Candidate, GroundingOptions};

type RankKey<'a> = (u8, u8, usize, u8, &'a str, &'a str, &'a str);

/// Sorts and truncates candidate lists.
#[derive(Debug, Clone)]
pub struct CandidateRanker {
    source_ranks: Option<HashMap<String, usize>>,
    unlisted_source_rank: usize,
    preferred_term_types: BTreeSet<String>,
    top_k: usize,
}

impl CandidateRanker {
    pub fn new(options: &GroundingOptions) -> Self {
        let source_ranks = options.source_preference.as_ref().map(|sources| {
            let mut ranks = HashMap::with_capacity(sources.len());
            for (rank, source) in sources.iter().enumerate() {
                ranks.entry(source.clone()).or_insert(rank);
            }
            ranks
        });
        Self {
            unlisted_source_rank: options.source_preference.as_ref().map_or(0, Vec::len),
            source_ranks,
            preferred_term_types: options.preferred_term_types.clone(),
            top_k: options.top_k,
        }
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    fn source_rank(&self, source: &str) -> usize {
        match &self.source_ranks {
            Some(ranks) => ranks
                .get(source)
                .copied()
                .unwrap_or(self.unlisted_source_rank),
            None => 0,
        }
    }

    fn rank_key<'a>(&self, candidate: &'a Candidate) -> RankKey<'a> {
        (
            candidate.matched_key_kind.priority(),
            u8::from(!candidate.preferred),
            self.source_rank(&candidate.source),
            u8::from(!self.preferred_term_types.contains(&candidate.term_type)),
            candidate.source.as_str(),
            candidate.term_type.as_str(),
            candidate.cui.as_str(),
        )
    }

    /// Compare two candidates; `Less` ranks first.
    pub fn compare(&self, a: &Candidate, b: &Candidate) -> Ordering {
        self.rank_key(a).cmp(&self.rank_key(b))
    }

    /// Sort candidates best first and keep at most `top_k`.
    pub fn rank(&self, mut candidates: Vec<Candidate>) -> Vec<Candidate> {
        candidates.sort_by(|a, b| self.compare(a, b));
        candidates.truncate(self.top_k);
        candidates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use umls_model::KeyKind;

    fn candidate(cui: &str, sab: &str, tty: &str, preferred: bool, kind: KeyKind) -> Candidate {
        Candidate {
            cui: cui.to_string(),
            source: sab.to_string(),
            term_type: tty.to_string(),
            preferred,
            surface: "effusion".to_string(),
            matched_key: "effusion".to_string(),
            matched_key_kind: kind,
        }
    }

    fn cuis(ranked: &[Candidate]) -> Vec<&str> {
        ranked.iter().map(|c| c.cui.as_str()).collect()
    }

    #[test]
    fn key_kind_dominates_preferred_flag() {
        let ranker = CandidateRanker::new(&GroundingOptions::default());
        let ranked = ranker.rank(vec![
            candidate("C1", "SNOMEDCT_US", "PT", true, KeyKind::Head),
            candidate("C2", "MSH", "ET", false, KeyKind::FullCan),
            candidate("C3", "MSH", "ET", false, KeyKind::FullNorm),
        ]);
        assert_eq!(cuis(&ranked), vec!["C3", "C2", "C1"]);
    }

    #[test]
    fn earlier_preferred_source_wins() {
        let ranker = CandidateRanker::new(&GroundingOptions::default());
        let ranked = ranker.rank(vec![
            candidate("C1", "MSH", "PT", true, KeyKind::FullNorm),
            candidate("C2", "NCI", "PT", true, KeyKind::FullNorm),
            candidate("C3", "SNOMEDCT_US", "PT", true, KeyKind::FullNorm),
        ]);
        assert_eq!(cuis(&ranked), vec!["C3", "C1", "C2"]);
    }

    #[test]
    fn without_preference_sources_sort_lexicographically() {
        let ranker = CandidateRanker::new(&GroundingOptions::default().without_source_preference());
        let ranked = ranker.rank(vec![
            candidate("C1", "SNOMEDCT_US", "PT", true, KeyKind::FullNorm),
            candidate("C2", "MSH", "ET", true, KeyKind::FullNorm),
            candidate("C3", "MSH", "MH", true, KeyKind::FullNorm),
        ]);
        // MH is a preferred term type; ET is not.
        assert_eq!(cuis(&ranked), vec!["C3", "C1", "C2"]);
    }

    #[test]
    fn truncates_to_top_k() {
        let ranker = CandidateRanker::new(&GroundingOptions::default().with_top_k(2));
        let ranked = ranker.rank(vec![
            candidate("C3", "MSH", "MH", true, KeyKind::FullNorm),
            candidate("C1", "MSH", "MH", true, KeyKind::FullNorm),
            candidate("C2", "MSH", "MH", true, KeyKind::FullNorm),
        ]);
        assert_eq!(cuis(&ranked), vec!["C1", "C2"]);
        assert_eq!(ranker.top_k(), 2);
    }
}
