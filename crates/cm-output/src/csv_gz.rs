//! CSV.GZ backend.
//!
//! One gzip-compressed CSV with the header `time_utc,id,traffic_level`.
//! Times are RFC 3339 in UTC with microseconds (`2025-08-20T08:00:00.000000Z`).

use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;

use cm_carflow::FlatRecord;
use cm_core::normalize;
use csv::Writer;
use flate2::Compression;
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use serde::Deserialize;

use crate::writer::FlatWriter;
use crate::{OutputError, OutputResult};

/// Writes the flat table to one gzip-compressed CSV file.
pub struct CsvGzWriter {
    inner: Option<Writer<GzEncoder<File>>>,
}

impl CsvGzWriter {
    /// Create (truncate) `path` and write the header row.
    pub fn create(path: &Path) -> OutputResult<Self> {
        let file = File::create(path)?;
        let mut inner = Writer::from_writer(GzEncoder::new(file, Compression::default()));
        inner.write_record(FlatRecord::COLUMNS)?;
        Ok(Self { inner: Some(inner) })
    }
}

impl FlatWriter for CsvGzWriter {
    fn write_batch(&mut self, rows: &[FlatRecord]) -> OutputResult<()> {
        let Some(w) = self.inner.as_mut() else {
            return Ok(());
        };
        for row in rows {
            w.write_record(&[
                row.time.to_rfc3339(),
                row.id.to_string(),
                row.traffic_level.to_string(),
            ])?;
        }
        Ok(())
    }

    fn finish(&mut self) -> OutputResult<()> {
        let Some(mut w) = self.inner.take() else {
            return Ok(());
        };
        w.flush()?;
        let gz = w.into_inner().map_err(|e| io::Error::other(e.to_string()))?;
        gz.finish()?;
        Ok(())
    }
}

// ── CSV record ────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct FlatCsvRecord {
    time_utc:      String,
    id:            f64,
    traffic_level: f64,
}

/// Read a CSV.GZ flat table written by [`CsvGzWriter`] (or any gzip CSV with
/// the same three columns, in any order).
pub fn read_flat_csv_gz(path: &Path) -> OutputResult<Vec<FlatRecord>> {
    let file = File::open(path)?;
    let mut rdr = csv::Reader::from_reader(MultiGzDecoder::new(BufReader::new(file)));

    let headers = rdr.headers()?.clone();
    if let Some(missing) = FlatRecord::COLUMNS.iter().find(|c| !headers.iter().any(|h| h == **c)) {
        return Err(OutputError::format(path, format!("missing column '{missing}'")));
    }

    let mut out = Vec::new();
    for (line, result) in rdr.deserialize::<FlatCsvRecord>().enumerate() {
        let row = result.map_err(|e| OutputError::format(path, format!("row {}: {e}", line + 1)))?;
        let time = normalize(&row.time_utc)
            .ok_or_else(|| OutputError::format(path, format!("row {}: bad time_utc '{}'", line + 1, row.time_utc)))?;
        out.push(FlatRecord { time, id: row.id, traffic_level: row.traffic_level });
    }
    Ok(out)
}
