//! Grounding of free-text mentions to UMLS concepts.
//!
//! A batch of mentions is keyed, the reference file is scanned exactly once
//! for every key in the batch, and each mention's evidence is then filtered
//! and ranked on its own. See [`GroundingEngine`].

pub mod engine;
pub mod enrich;
pub mod error;
pub mod filter;
pub mod index;
pub mod key_map;
pub mod rank;

pub use engine::{
    BatchStats, GatheredBatch, GroundedMention, GroundingBatch, GroundingEngine, MentionState,
    PreparedBatch,
};
pub use enrich::{EnrichmentStats, all_triples, collect_mentions, coverage_rows, enrich_documents};
pub use error::{GroundingError, Result};
pub use filter::{SemanticTypeFilter, TypeCategory};
pub use index::{IndexStats, ReferenceIndex, ShardIndex};
pub use key_map::{KeyMap, KeyRequest};
pub use rank::CandidateRanker;
