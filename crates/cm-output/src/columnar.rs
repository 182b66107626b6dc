//! Parquet backend (feature `parquet`).
//!
//! Schema:
//!
//! | Column          | Arrow type                        |
//! |-----------------|-----------------------------------|
//! | `time_utc`      | `Timestamp(Microsecond, "UTC")`   |
//! | `id`            | `Float64`                         |
//! | `traffic_level` | `Float64`                         |
//!
//! Pages are Snappy-compressed.  Each [`FlatWriter::write_batch`] call
//! becomes one Arrow record batch.

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{Array, Float64Array, Float64Builder};
use arrow::array::{TimestampMicrosecondArray, TimestampMicrosecondBuilder};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use cm_carflow::FlatRecord;
use cm_core::Timestamp;
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;

use crate::writer::FlatWriter;
use crate::{OutputError, OutputResult};

const UTC: &str = "UTC";

fn flat_schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("time_utc",      DataType::Timestamp(TimeUnit::Microsecond, Some(UTC.into())), false),
        Field::new("id",            DataType::Float64, false),
        Field::new("traffic_level", DataType::Float64, false),
    ]))
}

fn snappy_props() -> WriterProperties {
    WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build()
}

/// Writes the flat table to one Parquet file.
///
/// `finish()` **must** be called to write the footer; a file closed without
/// it cannot be opened by Parquet readers.
pub struct ParquetWriter {
    inner:  Option<ArrowWriter<File>>,
    schema: Arc<Schema>,
}

impl ParquetWriter {
    /// Create (truncate) `path`.
    pub fn create(path: &Path) -> OutputResult<Self> {
        let schema = flat_schema();
        let file = File::create(path)?;
        let inner = ArrowWriter::try_new(file, Arc::clone(&schema), Some(snappy_props()))?;
        Ok(Self { inner: Some(inner), schema })
    }
}

impl FlatWriter for ParquetWriter {
    fn write_batch(&mut self, rows: &[FlatRecord]) -> OutputResult<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let Some(writer) = self.inner.as_mut() else {
            return Ok(());
        };

        let mut times  = TimestampMicrosecondBuilder::with_capacity(rows.len()).with_timezone(UTC);
        let mut ids    = Float64Builder::with_capacity(rows.len());
        let mut levels = Float64Builder::with_capacity(rows.len());

        for row in rows {
            times.append_value(row.time.unix_micros());
            ids.append_value(row.id);
            levels.append_value(row.traffic_level);
        }

        let batch = RecordBatch::try_new(
            Arc::clone(&self.schema),
            vec![
                Arc::new(times.finish()),
                Arc::new(ids.finish()),
                Arc::new(levels.finish()),
            ],
        )?;
        writer.write(&batch)?;
        Ok(())
    }

    fn finish(&mut self) -> OutputResult<()> {
        if let Some(w) = self.inner.take() {
            w.close()?;
        }
        Ok(())
    }
}

/// Read a Parquet flat table.  Null cells are an error; the writer never
/// produces them.
pub fn read_flat_parquet(path: &Path) -> OutputResult<Vec<FlatRecord>> {
    let file = File::open(path)?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;

    let mut out = Vec::new();
    for batch in reader {
        let batch = batch?;
        let times: &TimestampMicrosecondArray = column(path, &batch, "time_utc")?;
        let ids: &Float64Array = column(path, &batch, "id")?;
        let levels: &Float64Array = column(path, &batch, "traffic_level")?;
        if times.null_count() + ids.null_count() + levels.null_count() > 0 {
            return Err(OutputError::format(path, "null cells in flat table"));
        }

        out.reserve(batch.num_rows());
        for i in 0..batch.num_rows() {
            let time = Timestamp::from_unix_micros(times.value(i))
                .ok_or_else(|| OutputError::format(path, format!("time_utc out of range at row {i}")))?;
            out.push(FlatRecord { time, id: ids.value(i), traffic_level: levels.value(i) });
        }
    }
    Ok(out)
}

fn column<'b, A: Array + 'static>(path: &Path, batch: &'b RecordBatch, name: &str) -> OutputResult<&'b A> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<A>())
        .ok_or_else(|| OutputError::format(path, format!("missing or mistyped column '{name}'")))
}
