//! Streaming flattener for the outer car-flow CSV.
//!
//! # CSV format
//!
//! ```csv
//! time,data
//! 2025-08-20T10:00:00+02:00,"id,traffic_level
//! 101,0.62
//! 102,0.15"
//! 2025-08-20T10:03:00+02:00,101;0.58
//! ```
//!
//! The header must contain `time` and `data` (trimmed, case-insensitive, any
//! order, other columns ignored).  Each `data` cell is resolved through
//! [`shape::resolve`](crate::shape::resolve).
//!
//! # Batching
//!
//! Raw pairs accumulate until `batch_rows` are buffered; the iterator then
//! packs and yields exactly `batch_rows` rows.  The remainder is flushed at
//! end of input.  Calling [`flatten_path`] again re-reads from the start.

use std::fs::File;
use std::io::Read;
use std::mem;
use std::path::Path;
use std::sync::Arc;

use csv::StringRecord;
use log::{debug, info, warn};

use crate::limit::FieldSizeLimit;
use crate::record::{FlatBatch, RawRow, pack};
use crate::shape;
use crate::{CarflowError, CarflowResult};

/// Default number of raw rows per emitted batch.
pub const DEFAULT_BATCH_ROWS: usize = 250_000;

const UTF8_BOM: &str = "\u{feff}";

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FlattenOptions {
    pub batch_rows:  usize,
    pub field_limit: FieldSizeLimit,
}

impl Default for FlattenOptions {
    fn default() -> Self {
        Self {
            batch_rows:  DEFAULT_BATCH_ROWS,
            field_limit: FieldSizeLimit::relaxed(),
        }
    }
}

impl FlattenOptions {
    pub fn with_batch_rows(batch_rows: usize) -> Self {
        Self { batch_rows, ..Self::default() }
    }
}

/// Counters over everything read so far.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct FlattenStats {
    /// Outer data rows read (excluding the header).
    pub outer_rows:    usize,
    /// Outer rows skipped: empty, too short, empty `data`, or unreadable.
    pub skipped_rows:  usize,
    /// Outer rows skipped because `data` exceeded the field ceiling.
    pub oversized:     usize,
    /// Raw pairs extracted before coercion.
    pub raw_pairs:     usize,
    /// Pairs dropped during coercion.
    pub dropped_pairs: usize,
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Open `path` and return a lazy iterator over flattened batches.
///
/// # Errors
///
/// [`CarflowError::Io`] if the file cannot be opened,
/// [`CarflowError::MissingColumns`] if the header lacks `time` or `data`.
pub fn flatten_path(path: &Path, options: &FlattenOptions) -> CarflowResult<FlatBatches<File>> {
    let file = File::open(path)?;
    flatten_reader(file, options)
}

/// Like [`flatten_path`] but accepts any `Read` source.
pub fn flatten_reader<R: Read>(reader: R, options: &FlattenOptions) -> CarflowResult<FlatBatches<R>> {
    FlatBatches::new(reader, options)
}

/// Flatten the whole of `path` into one batch.
pub fn flatten_all(path: &Path, options: &FlattenOptions) -> CarflowResult<FlatBatch> {
    let mut all = FlatBatch::default();
    for batch in flatten_path(path, options)? {
        all.extend(batch?);
    }
    Ok(all)
}

// ── Iterator ──────────────────────────────────────────────────────────────────

/// Lazy, finite iterator of [`FlatBatch`]es over one outer CSV.
pub struct FlatBatches<R: Read> {
    outer:       csv::Reader<R>,
    record:      StringRecord,
    time_idx:    usize,
    data_idx:    usize,
    batch_rows:  usize,
    field_limit: FieldSizeLimit,
    pending:     Vec<RawRow>,
    stats:       FlattenStats,
    exhausted:   bool,
}

impl<R: Read> FlatBatches<R> {
    fn new(reader: R, options: &FlattenOptions) -> CarflowResult<Self> {
        let mut outer = csv::ReaderBuilder::new()
            .delimiter(b',')
            .quote(b'"')
            .flexible(true)
            .from_reader(reader);

        let header: Vec<String> = outer.headers()?.iter().map(str::to_owned).collect();
        let lookup = |want: &str| {
            header
                .iter()
                .rposition(|h| h.trim_start_matches(UTF8_BOM).trim().eq_ignore_ascii_case(want))
        };
        let (Some(time_idx), Some(data_idx)) = (lookup("time"), lookup("data")) else {
            return Err(CarflowError::MissingColumns { header });
        };
        debug!("car-flow header: time at {time_idx}, data at {data_idx}");

        Ok(Self {
            outer,
            record: StringRecord::new(),
            time_idx,
            data_idx,
            batch_rows: options.batch_rows.max(1),
            field_limit: options.field_limit,
            pending: Vec::new(),
            stats: FlattenStats::default(),
            exhausted: false,
        })
    }

    /// Counters over everything read so far.
    pub fn stats(&self) -> FlattenStats {
        self.stats
    }

    /// Split off and pack the first `batch_rows` pending rows.
    fn emit_full(&mut self) -> FlatBatch {
        let rest = self.pending.split_off(self.batch_rows);
        let full = mem::replace(&mut self.pending, rest);
        self.pack(full)
    }

    fn pack(&mut self, rows: Vec<RawRow>) -> FlatBatch {
        let batch = pack(rows);
        self.stats.dropped_pairs += batch.dropped;
        debug!("car-flow batch: {} rows, {} dropped", batch.len(), batch.dropped);
        batch
    }

    fn log_totals(&self) {
        let s = self.stats;
        info!(
            "car-flow source exhausted: {} outer rows, {} skipped, {} pairs, {} dropped",
            s.outer_rows, s.skipped_rows, s.raw_pairs, s.dropped_pairs
        );
    }

    /// Append the pairs of the current outer record to `pending`.
    fn absorb_record(&mut self) {
        self.stats.outer_rows += 1;
        let need = self.time_idx.max(self.data_idx);
        if self.record.len() <= need {
            self.stats.skipped_rows += 1;
            return;
        }
        let inner = &self.record[self.data_idx];
        if inner.is_empty() {
            self.stats.skipped_rows += 1;
            return;
        }
        if !self.field_limit.admits(inner.len()) {
            warn!(
                "skipping outer row {}: data field of {} bytes exceeds ceiling of {}",
                self.stats.outer_rows,
                inner.len(),
                self.field_limit.bytes()
            );
            self.stats.oversized += 1;
            self.stats.skipped_rows += 1;
            return;
        }

        let time: Arc<str> = Arc::from(&self.record[self.time_idx]);
        let (_, pairs) = shape::resolve(inner);
        self.stats.raw_pairs += pairs.len();
        self.pending.extend(pairs.into_iter().map(|(id, level)| RawRow {
            time: Arc::clone(&time),
            id,
            level,
        }));
    }
}

impl<R: Read> Iterator for FlatBatches<R> {
    type Item = CarflowResult<FlatBatch>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.pending.len() >= self.batch_rows {
                return Some(Ok(self.emit_full()));
            }
            if self.exhausted {
                if self.pending.is_empty() {
                    return None;
                }
                let rest = mem::take(&mut self.pending);
                let last = self.pack(rest);
                self.log_totals();
                return Some(Ok(last));
            }

            match self.outer.read_record(&mut self.record) {
                Ok(true) => self.absorb_record(),
                Ok(false) => {
                    self.exhausted = true;
                    // Otherwise the remainder batch logs once it is packed.
                    if self.pending.is_empty() {
                        self.log_totals();
                    }
                }
                Err(e) if e.is_io_error() => {
                    self.exhausted = true;
                    self.pending.clear();
                    return Some(Err(e.into()));
                }
                Err(e) => {
                    warn!("skipping unreadable outer row: {e}");
                    self.stats.outer_rows += 1;
                    self.stats.skipped_rows += 1;
                }
            }
        }
    }
}
