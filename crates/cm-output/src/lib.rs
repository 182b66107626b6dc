//! `cm-output`: persisted forms of the flattened car-flow table.
//!
//! | Feature             | Backend  | Writer            | Reader              |
//! |---------------------|----------|-------------------|---------------------|
//! | *(always)*          | CSV.GZ   | [`CsvGzWriter`]   | `read_flat_csv_gz`  |
//! | `parquet` (default) | Parquet  | `ParquetWriter`   | `read_flat_parquet` |
//!
//! Both writers implement [`FlatWriter`].  The pipelines in [`flat`] stream a
//! raw car-flow source through `cm_carflow::flatten_path` so memory stays
//! bounded by one batch.
//!
//! # Usage
//!
//! ```rust,ignore
//! use cm_output::{load_flat, write_flat_both};
//!
//! let opts = FlattenOptions::default();
//! write_flat_both(src, Path::new("out/carflow.parquet"), Path::new("out/carflow.csv.gz"), &opts)?;
//! let table = load_flat(Path::new("out/carflow.parquet"))?;
//! ```

pub mod csv_gz;
pub mod error;
pub mod flat;
pub mod writer;

#[cfg(feature = "parquet")]
pub mod columnar;


pub use csv_gz::{CsvGzWriter, read_flat_csv_gz};
pub use error::{OutputError, OutputResult};
pub use flat::{BothSummary, FlatSource, WriteSummary, load_flat, write_flat, write_flat_both, write_flat_csv_gz};
pub use writer::FlatWriter;

#[cfg(feature = "parquet")]
pub use columnar::{ParquetWriter, read_flat_parquet};
#[cfg(feature = "parquet")]
pub use flat::write_flat_parquet;
