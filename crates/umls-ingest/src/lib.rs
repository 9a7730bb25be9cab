//! Reading UMLS reference tables and extractor output.
//!
//! - [`ReferenceScanner`] streams an MRCONSO-style file once, optionally
//!   split into line-aligned shards scanned in parallel.
//! - [`load_semantic_types`] reads an MRSTY-style CUI → type code mapping.
//! - [`load_documents`] reads entity/relation extractor documents.

pub mod documents;
pub mod error;
pub mod reference;
pub mod scan;
pub mod semantic_types;

pub use documents::load_documents;
pub use error::{IngestError, Result};
pub use reference::{ENGLISH, FIELD_DELIMITER, MIN_FIELDS, ReferenceRow, RowClass};
pub use scan::{
    ByteRange, DEFAULT_CHECK_INTERVAL, ReferenceScanner, ScanControl, ScanOptions, ScanStats,
    ShardOutput, scan_reader,
};
pub use semantic_types::{SemanticTypeMap, load_semantic_types};
