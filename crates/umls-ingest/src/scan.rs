//! Streaming, optionally sharded scans over a reference file.
//!
//! A scan reads the file exactly once. With more than one shard the file is
//! split into contiguous byte ranges aligned to line starts and the ranges
//! are read in parallel; each shard folds rows into its own state, and the
//! caller merges the shard states afterwards.
//!
//! # Usage
//!
//! ```ignore
//! use umls_ingest::{ReferenceScanner, ScanOptions};
//!
//! let scanner = ReferenceScanner::open("META/MRCONSO.RRF")?;
//! let shards = scanner.scan(&ScanOptions::default(), Vec::new, |rows, row| {
//!     rows.push(row.cui.to_string());
//! })?;
//! ```

use std::fs::File;
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use csv::ByteRecord;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, debug_span};

use crate::error::{IngestError, Result};
use crate::reference::{ReferenceRow, RowClass, rrf_reader_builder};

/// Lines between cancellation and deadline checks.
pub const DEFAULT_CHECK_INTERVAL: u64 = 64 * 1024;

/// Cooperative cancellation and deadline for a scan.
///
/// Clones share the same cancellation flag, so a handle kept by the caller
/// can stop a scan running on other threads.
#[derive(Debug, Clone, Default)]
pub struct ScanControl {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl ScanControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop the scan at the next check.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Set a deadline relative to now.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Request cancellation. Safe to call from any thread.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Fail if cancellation was requested or the deadline passed.
    ///
    /// # Errors
    ///
    /// [`IngestError::Cancelled`] or [`IngestError::DeadlineExceeded`].
    pub fn check(&self, started: Instant) -> Result<()> {
        if self.is_cancelled() {
            return Err(IngestError::Cancelled);
        }
        if let Some(deadline) = self.deadline
            && Instant::now() >= deadline
        {
            return Err(IngestError::DeadlineExceeded {
                elapsed_ms: started.elapsed().as_millis(),
            });
        }
        Ok(())
    }
}

/// Options for a reference scan.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Number of shards. 0 picks one per worker thread.
    pub shards: usize,
    /// Lines between cancellation/deadline checks (0 checks only at shard start).
    pub check_interval: u64,
    /// Cancellation and deadline.
    pub control: ScanControl,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            shards: 0,
            check_interval: DEFAULT_CHECK_INTERVAL,
            control: ScanControl::default(),
        }
    }
}

impl ScanOptions {
    pub fn with_shards(mut self, shards: usize) -> Self {
        self.shards = shards;
        self
    }

    pub fn with_check_interval(mut self, lines: u64) -> Self {
        self.check_interval = lines;
        self
    }

    pub fn with_control(mut self, control: ScanControl) -> Self {
        self.control = control;
        self
    }

    fn effective_shards(&self) -> usize {
        if self.shards == 0 {
            rayon::current_num_threads().max(1)
        } else {
            self.shards
        }
    }
}

/// Row counts gathered during a scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanStats {
    /// Records read (empty lines are not counted).
    pub lines: u64,
    /// Records with fewer than the required number of fields.
    pub malformed: u64,
    /// Well-formed records in a language other than English.
    pub non_english: u64,
    /// Records handed to the visitor.
    pub admissible: u64,
}

impl ScanStats {
    /// Add another shard's counts.
    pub fn merge(&mut self, other: &ScanStats) {
        self.lines += other.lines;
        self.malformed += other.malformed;
        self.non_english += other.non_english;
        self.admissible += other.admissible;
    }
}

/// Half-open byte range `[start, end)` of whole lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Output of one shard.
#[derive(Debug)]
pub struct ShardOutput<S> {
    pub index: usize,
    pub range: ByteRange,
    pub state: S,
    pub stats: ScanStats,
}

/// Handle to a readable reference file.
#[derive(Debug, Clone)]
pub struct ReferenceScanner {
    path: PathBuf,
    len: u64,
}

impl ReferenceScanner {
    /// Validate that the reference file exists and can be read.
    ///
    /// # Errors
    ///
    /// Returns an error when the path is missing, not a regular file, or
    /// cannot be opened.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| IngestError::open(path, e))?;
        let metadata = file
            .metadata()
            .map_err(|e| IngestError::file_read(path, e))?;
        if !metadata.is_file() {
            return Err(IngestError::NotAFile {
                path: path.to_path_buf(),
            });
        }
        Ok(Self {
            path: path.to_path_buf(),
            len: metadata.len(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File size in bytes at open time.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Split the file into at most `count` non-empty ranges of whole lines.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read while aligning boundaries.
    pub fn plan_shards(&self, count: usize) -> Result<Vec<ByteRange>> {
        if self.len == 0 {
            return Ok(Vec::new());
        }
        let count = count.max(1) as u64;
        let file = File::open(&self.path).map_err(|e| IngestError::open(&self.path, e))?;
        let mut reader = BufReader::new(file);

        let mut bounds = vec![0u64];
        for i in 1..count {
            let approx = self.len * i / count;
            let aligned = self.next_line_start(&mut reader, approx)?;
            let last = bounds.last().copied().unwrap_or(0);
            if aligned > last && aligned < self.len {
                bounds.push(aligned);
            }
        }
        bounds.push(self.len);

        Ok(bounds
            .windows(2)
            .map(|pair| ByteRange {
                start: pair[0],
                end: pair[1],
            })
            .collect())
    }

    /// Offset of the first line starting at or after `offset`.
    fn next_line_start(&self, reader: &mut BufReader<File>, offset: u64) -> Result<u64> {
        if offset == 0 {
            return Ok(0);
        }
        reader
            .seek(SeekFrom::Start(offset - 1))
            .map_err(|e| IngestError::file_read(&self.path, e))?;
        let skipped = reader
            .skip_until(b'\n')
            .map_err(|e| IngestError::file_read(&self.path, e))?;
        Ok((offset - 1 + skipped as u64).min(self.len))
    }

    /// Scan the whole file, folding admissible rows into per-shard state.
    ///
    /// `init` creates one state per shard; `visit` is called once per
    /// admissible row of that shard. Shard outputs are returned in file
    /// order. If any shard fails, no output is returned.
    ///
    /// # Errors
    ///
    /// I/O failures, cancellation, and deadline expiry abort the whole scan.
    pub fn scan<S, I, V>(
        &self,
        options: &ScanOptions,
        init: I,
        visit: V,
    ) -> Result<Vec<ShardOutput<S>>>
    where
        S: Send,
        I: Fn() -> S + Sync,
        V: Fn(&mut S, &ReferenceRow<'_>) + Sync,
    {
        let started = Instant::now();
        options.control.check(started)?;
        let ranges = self.plan_shards(options.effective_shards())?;
        debug!(
            path = %self.path.display(),
            bytes = self.len,
            shards = ranges.len(),
            "planned reference scan"
        );

        // Set when a sibling shard fails so the others stop early.
        let aborted = AtomicBool::new(false);
        let results: Vec<Result<ShardOutput<S>>> = ranges
            .par_iter()
            .enumerate()
            .map(|(index, range)| {
                let span = debug_span!("shard", index, start = range.start, end = range.end);
                let _guard = span.enter();
                let check = || {
                    if aborted.load(Ordering::Acquire) {
                        return Err(IngestError::Cancelled);
                    }
                    options.control.check(started)
                };
                let result =
                    self.scan_range(*range, options.check_interval, &check, &init, &visit);
                match result {
                    Ok((state, stats)) => {
                        debug!(
                            index,
                            lines = stats.lines,
                            admissible = stats.admissible,
                            "shard complete"
                        );
                        Ok(ShardOutput {
                            index,
                            range: *range,
                            state,
                            stats,
                        })
                    }
                    Err(error) => {
                        aborted.store(true, Ordering::Release);
                        Err(error)
                    }
                }
            })
            .collect();

        let mut outputs = Vec::with_capacity(results.len());
        let mut failure: Option<IngestError> = None;
        for result in results {
            match result {
                Ok(output) => outputs.push(output),
                Err(error) => {
                    // Report the root cause rather than a sibling's abort.
                    if failure
                        .as_ref()
                        .is_none_or(|f| f.is_cancellation() && !error.is_cancellation())
                    {
                        failure = Some(error);
                    }
                }
            }
        }
        match failure {
            Some(error) => Err(error),
            None => Ok(outputs),
        }
    }

    fn scan_range<S, I, V, C>(
        &self,
        range: ByteRange,
        check_interval: u64,
        check: &C,
        init: &I,
        visit: &V,
    ) -> Result<(S, ScanStats)>
    where
        I: Fn() -> S,
        V: Fn(&mut S, &ReferenceRow<'_>),
        C: Fn() -> Result<()>,
    {
        let mut file = File::open(&self.path).map_err(|e| IngestError::open(&self.path, e))?;
        file.seek(SeekFrom::Start(range.start))
            .map_err(|e| IngestError::file_read(&self.path, e))?;
        let mut state = init();
        let stats = fold_rows(
            file.take(range.len()),
            &self.path,
            check_interval,
            check,
            &mut state,
            visit,
        )?;
        Ok((state, stats))
    }
}

/// Scan an in-memory or already positioned reader on the current thread.
///
/// `origin` is only used in error messages.
///
/// # Errors
///
/// Read failures, cancellation, and deadline expiry.
pub fn scan_reader<R, S, V>(
    reader: R,
    origin: &Path,
    options: &ScanOptions,
    state: &mut S,
    visit: V,
) -> Result<ScanStats>
where
    R: Read,
    V: Fn(&mut S, &ReferenceRow<'_>),
{
    let started = Instant::now();
    let check = || options.control.check(started);
    fold_rows(reader, origin, options.check_interval, &check, state, &visit)
}

fn fold_rows<R, S, V, C>(
    reader: R,
    origin: &Path,
    check_interval: u64,
    check: &C,
    state: &mut S,
    visit: &V,
) -> Result<ScanStats>
where
    R: Read,
    V: Fn(&mut S, &ReferenceRow<'_>),
    C: Fn() -> Result<()>,
{
    check()?;
    let mut reader = rrf_reader_builder().from_reader(reader);
    let mut record = ByteRecord::new();
    let mut stats = ScanStats::default();
    loop {
        let more = reader
            .read_byte_record(&mut record)
            .map_err(|source| IngestError::Delimited {
                path: origin.to_path_buf(),
                source,
            })?;
        if !more {
            break;
        }
        stats.lines += 1;
        if check_interval > 0 && stats.lines % check_interval == 0 {
            check()?;
        }
        match ReferenceRow::classify(&record) {
            RowClass::Admissible(row) => {
                stats.admissible += 1;
                visit(state, &row);
            }
            RowClass::Malformed => stats.malformed += 1,
            RowClass::NonEnglish => stats.non_english += 1,
        }
    }
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn line(cui: &str, lat: &str, surface: &str) -> String {
        format!("{cui}|{lat}|P|L|PF|S|Y|A||||MSH|MH|D1|{surface}|0|N||\n")
    }

    #[test]
    fn scan_reader_counts_row_classes() {
        let mut data = String::new();
        data.push_str(&line("C1", "ENG", "Pneumonia"));
        data.push_str(&line("C2", "GER", "Lungenentzuendung"));
        data.push_str("C3|ENG|short\n");
        data.push_str(&line("C4", "ENG", "Effusion"));

        let mut seen = Vec::new();
        let stats = scan_reader(
            Cursor::new(data),
            Path::new("memory"),
            &ScanOptions::default(),
            &mut seen,
            |seen, row| seen.push(row.cui.to_string()),
        )
        .expect("scan");

        assert_eq!(seen, vec!["C1", "C4"]);
        assert_eq!(
            stats,
            ScanStats {
                lines: 4,
                malformed: 1,
                non_english: 1,
                admissible: 2,
            }
        );
    }

    #[test]
    fn cancelled_control_stops_scan() {
        let control = ScanControl::new();
        control.cancel();
        let options = ScanOptions::default().with_control(control);
        let mut count = 0usize;
        let result = scan_reader(
            Cursor::new(line("C1", "ENG", "Pneumonia")),
            Path::new("memory"),
            &options,
            &mut count,
            |count, _| *count += 1,
        );
        assert!(matches!(result, Err(IngestError::Cancelled)));
        assert_eq!(count, 0);
    }

    #[test]
    fn expired_deadline_is_reported() {
        let control = ScanControl::new().with_deadline(Instant::now());
        let options = ScanOptions::default().with_control(control);
        let result = scan_reader(
            Cursor::new(line("C1", "ENG", "Pneumonia")),
            Path::new("memory"),
            &options,
            &mut (),
            |_, _| {},
        );
        assert!(matches!(result, Err(IngestError::DeadlineExceeded { .. })));
    }
}
