//! Mention normalization and lookup-key generation.
//!
//! Everything here is pure: no I/O, no shared state. The reference scanner
//! and the grounding engine both depend on these functions agreeing exactly,
//! since a mention key only matches a reference row when both sides produce
//! the same canonical string.

pub mod keys;
pub mod text;
pub mod vocabulary;

pub use keys::KeyGenerator;
pub use text::{
    canonicalize, canonicalize_into, is_measurement_like, normalize, normalize_relation_type,
};
pub use vocabulary::{LATERALITY_TERMS, SEVERITY_TERMS, STOPWORDS, Vocabulary};
