//! The `FlatWriter` trait implemented by both backends.

use cm_carflow::FlatRecord;

use crate::OutputResult;

/// Trait implemented by the CSV.GZ and Parquet writers.
pub trait FlatWriter {
    /// Append one batch of tidy rows.
    fn write_batch(&mut self, rows: &[FlatRecord]) -> OutputResult<()>;

    /// Flush and close the underlying file.
    ///
    /// Idempotent; safe to call more than once.  Rows written after
    /// `finish` are ignored.
    fn finish(&mut self) -> OutputResult<()>;
}
