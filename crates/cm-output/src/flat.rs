//! Source-to-file pipelines and the extension-dispatching loader.

use std::fs;
use std::path::Path;

use cm_carflow::{FlatBatch, FlattenOptions, flatten_all, flatten_path};
use log::{info, warn};

use crate::csv_gz::{CsvGzWriter, read_flat_csv_gz};
use crate::writer::FlatWriter;
use crate::OutputResult;

#[cfg(feature = "parquet")]
use crate::columnar::{ParquetWriter, read_flat_parquet};

/// Totals from one streaming write.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct WriteSummary {
    pub rows:    usize,
    pub dropped: usize,
    pub batches: usize,
}

/// Outcome of [`write_flat_both`].
#[derive(Debug)]
pub struct BothSummary {
    /// `Err` when the Parquet write failed; the CSV.GZ write still ran.
    pub parquet: OutputResult<WriteSummary>,
    pub csv_gz:  WriteSummary,
}

/// Stream-flatten `src` through `writer`, one batch at a time.
pub fn write_flat<W: FlatWriter>(
    src: &Path,
    options: &FlattenOptions,
    writer: &mut W,
    label: &str,
) -> OutputResult<WriteSummary> {
    let mut summary = WriteSummary::default();
    for batch in flatten_path(src, options)? {
        let batch = batch?;
        writer.write_batch(&batch.records)?;
        summary.rows += batch.len();
        summary.dropped += batch.dropped;
        summary.batches += 1;
        info!("[{label}] rows written: {}", summary.rows);
    }
    writer.finish()?;
    if summary.dropped > 0 {
        warn!("[{label}] {} raw rows dropped during coercion", summary.dropped);
    }
    Ok(summary)
}

fn ensure_parent(path: &Path) -> OutputResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Stream-flatten `src` into a Snappy Parquet file at `dst`, creating parent
/// directories as needed.  An empty source still yields a valid file.
#[cfg(feature = "parquet")]
pub fn write_flat_parquet(src: &Path, dst: &Path, options: &FlattenOptions) -> OutputResult<WriteSummary> {
    ensure_parent(dst)?;
    let mut writer = ParquetWriter::create(dst)?;
    let summary = write_flat(src, options, &mut writer, "parquet")?;
    info!("[parquet] done: {} ({} rows)", dst.display(), summary.rows);
    Ok(summary)
}

/// Stream-flatten `src` into a gzip CSV at `dst`.
pub fn write_flat_csv_gz(src: &Path, dst: &Path, options: &FlattenOptions) -> OutputResult<WriteSummary> {
    ensure_parent(dst)?;
    let mut writer = CsvGzWriter::create(dst)?;
    let summary = write_flat(src, options, &mut writer, "csv.gz")?;
    info!("[csv.gz] done: {} ({} rows)", dst.display(), summary.rows);
    Ok(summary)
}

/// Write Parquet, then CSV.GZ.  A Parquet failure is logged and reported in
/// the summary; only a CSV.GZ failure is returned as an error.
pub fn write_flat_both(
    src: &Path,
    parquet_dst: &Path,
    csv_gz_dst: &Path,
    options: &FlattenOptions,
) -> OutputResult<BothSummary> {
    let parquet = write_parquet_or_skip(src, parquet_dst, options);
    if let Err(e) = &parquet {
        warn!("[parquet] skipped ({e}); continuing with CSV.GZ");
    }
    let csv_gz = write_flat_csv_gz(src, csv_gz_dst, options)?;
    Ok(BothSummary { parquet, csv_gz })
}

#[cfg(feature = "parquet")]
fn write_parquet_or_skip(src: &Path, dst: &Path, options: &FlattenOptions) -> OutputResult<WriteSummary> {
    write_flat_parquet(src, dst, options)
}

#[cfg(not(feature = "parquet"))]
fn write_parquet_or_skip(_src: &Path, dst: &Path, _options: &FlattenOptions) -> OutputResult<WriteSummary> {
    Err(crate::OutputError::format(dst, "built without the `parquet` feature"))
}

/// The kind of file [`load_flat`] will read, by extension.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FlatSource {
    Parquet,
    CsvGz,
    RawNested,
}

impl FlatSource {
    /// `.parquet`/`.pq` → Parquet, `.gz` → CSV.GZ, anything else is a raw
    /// nested car-flow CSV.  Case-insensitive.
    pub fn of(path: &Path) -> FlatSource {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "parquet" | "pq" => FlatSource::Parquet,
            "gz" => FlatSource::CsvGz,
            _ => FlatSource::RawNested,
        }
    }
}

/// Load a flat table from any of the supported sources.
///
/// Raw nested sources are flattened in full with default options; the
/// returned batch then carries the dropped-row count.
pub fn load_flat(path: &Path) -> OutputResult<FlatBatch> {
    let source = FlatSource::of(path);
    info!("loading flat car-flow table from {} as {source:?}", path.display());
    match source {
        FlatSource::Parquet => read_parquet_or_fail(path).map(|records| FlatBatch { records, dropped: 0 }),
        FlatSource::CsvGz => Ok(FlatBatch { records: read_flat_csv_gz(path)?, dropped: 0 }),
        FlatSource::RawNested => Ok(flatten_all(path, &FlattenOptions::default())?),
    }
}

#[cfg(feature = "parquet")]
fn read_parquet_or_fail(path: &Path) -> OutputResult<Vec<cm_carflow::FlatRecord>> {
    read_flat_parquet(path)
}

#[cfg(not(feature = "parquet"))]
fn read_parquet_or_fail(path: &Path) -> OutputResult<Vec<cm_carflow::FlatRecord>> {
    Err(crate::OutputError::format(path, "built without the `parquet` feature"))
}
