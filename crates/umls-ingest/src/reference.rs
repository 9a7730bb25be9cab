//! MRCONSO-style reference rows.
//!
//! The reference table is pipe-delimited text with at least 15 fields per
//! line. Only six fields matter for grounding:
//!
//! | Index | Column | Meaning                         |
//! |-------|--------|---------------------------------|
//! | 0     | CUI    | Concept identifier              |
//! | 1     | LAT    | Language (`ENG` rows are kept)  |
//! | 6     | ISPREF | `Y` when preferred for the CUI  |
//! | 11    | SAB    | Source vocabulary               |
//! | 12    | TTY    | Term type                       |
//! | 14    | STR    | Surface string                  |

use std::borrow::Cow;

use csv::{ByteRecord, ReaderBuilder};

/// Field separator of RRF files.
pub const FIELD_DELIMITER: u8 = b'|';

/// Minimum number of fields for a row to be considered.
pub const MIN_FIELDS: usize = 15;

/// Language code of admissible rows.
pub const ENGLISH: &[u8] = b"ENG";

const CUI: usize = 0;
const LANGUAGE: usize = 1;
const PREFERRED: usize = 6;
const SOURCE: usize = 11;
const TERM_TYPE: usize = 12;
const SURFACE: usize = 14;

/// One admissible (English, well-formed) reference row.
///
/// Fields borrow from the reader's record buffer; invalid UTF-8 is replaced
/// rather than rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceRow<'a> {
    pub cui: Cow<'a, str>,
    pub preferred: bool,
    pub source: Cow<'a, str>,
    pub term_type: Cow<'a, str>,
    pub surface: Cow<'a, str>,
}

/// How a raw record was classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowClass<'a> {
    Admissible(ReferenceRow<'a>),
    Malformed,
    NonEnglish,
}

impl<'a> ReferenceRow<'a> {
    /// Classify a raw record.
    pub fn classify(record: &'a ByteRecord) -> RowClass<'a> {
        if record.len() < MIN_FIELDS {
            return RowClass::Malformed;
        }
        if record.get(LANGUAGE) != Some(ENGLISH) {
            return RowClass::NonEnglish;
        }
        let field = |index: usize| String::from_utf8_lossy(record.get(index).unwrap_or_default());
        RowClass::Admissible(ReferenceRow {
            cui: field(CUI),
            preferred: record.get(PREFERRED) == Some(b"Y".as_slice()),
            source: field(SOURCE),
            term_type: field(TERM_TYPE),
            surface: field(SURFACE),
        })
    }
}

/// Reader settings for RRF files: no headers, no quoting, ragged rows.
pub(crate) fn rrf_reader_builder() -> ReaderBuilder {
    let mut builder = ReaderBuilder::new();
    builder
        .delimiter(FIELD_DELIMITER)
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .buffer_capacity(1 << 20);
    builder
}
