//! MRSTY semantic-type assignments.
//!
//! Each line is `CUI|TUI|STN|STY|ATUI|CVF|`; only the first two fields are
//! read. Lines with fewer than two fields are skipped.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::path::Path;

use csv::ByteRecord;
use tracing::debug;

use crate::error::{IngestError, Result};
use crate::reference::rrf_reader_builder;

/// CUI to the set of its semantic type codes.
pub type SemanticTypeMap = BTreeMap<String, BTreeSet<String>>;

/// Load a CUI → semantic type mapping from an MRSTY-style file.
///
/// # Errors
///
/// Returns an error when the file is missing or cannot be read.
pub fn load_semantic_types(path: &Path) -> Result<SemanticTypeMap> {
    let file = File::open(path).map_err(|e| IngestError::open(path, e))?;
    let mut reader = rrf_reader_builder().from_reader(file);
    let mut record = ByteRecord::new();
    let mut mapping = SemanticTypeMap::new();
    let mut skipped = 0usize;
    while reader
        .read_byte_record(&mut record)
        .map_err(|source| IngestError::Delimited {
            path: path.to_path_buf(),
            source,
        })?
    {
        let (Some(cui), Some(tui)) = (record.get(0), record.get(1)) else {
            skipped += 1;
            continue;
        };
        let cui = String::from_utf8_lossy(cui).trim().to_string();
        let tui = String::from_utf8_lossy(tui).trim().to_string();
        if cui.is_empty() || tui.is_empty() {
            skipped += 1;
            continue;
        }
        mapping.entry(cui).or_default().insert(tui);
    }
    debug!(
        path = %path.display(),
        cuis = mapping.len(),
        skipped,
        "loaded semantic types"
    );
    Ok(mapping)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn groups_types_by_cui() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(
            file,
            "C0032285|T047|B2.2.1.2.1|Disease or Syndrome|AT1|256|\n\
             C0032285|T046|B2.2.1.2|Pathologic Function|AT2|256|\n\
             C0024109|T023|A1.2.3.1|Body Part, Organ, or Organ Component|AT3|256|\n\
             C9999999\n"
        )
        .expect("write");

        let mapping = load_semantic_types(file.path()).expect("load");
        assert_eq!(mapping.len(), 2);
        let pneumonia: Vec<&str> = mapping["C0032285"].iter().map(String::as_str).collect();
        assert_eq!(pneumonia, vec!["T046", "T047"]);
        assert!(mapping["C0024109"].contains("T023"));
    }

    #[test]
    fn missing_file_is_reported() {
        let dir = tempfile::tempdir().expect("temp dir");
        let err = load_semantic_types(&dir.path().join("MRSTY.RRF")).unwrap_err();
        assert!(matches!(err, IngestError::FileNotFound { .. }));
    }
}
