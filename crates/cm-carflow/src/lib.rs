//! `cm-carflow`: flattening of car-flow exports with a nested CSV column.
//!
//! Traffic providers export one outer row per timestamp whose `data` cell
//! holds a whole second CSV of `(segment id, traffic level)` pairs, in one of
//! several layouts.  This crate streams such a file and yields a tidy
//! `(time_utc, id, traffic_level)` table in bounded-size batches.
//!
//! # Crate layout
//!
//! | Module       | Contents                                                    |
//! |--------------|-------------------------------------------------------------|
//! | [`flatten`]  | `flatten_path`, `flatten_reader`, `FlatBatches`, options    |
//! | [`shape`]    | `InnerShape` detectors, `InnerTable`, `resolve`             |
//! | [`record`]   | `FlatRecord`, `FlatBatch`, id/level coercion                |
//! | [`limit`]    | `FieldSizeLimit` (inner field ceiling)                      |
//! | [`error`]    | `CarflowError`, `CarflowResult<T>`                          |
//!
//! # Usage
//!
//! ```rust,ignore
//! use cm_carflow::{FlattenOptions, flatten_path};
//!
//! for batch in flatten_path(Path::new("data/TomTom.csv"), &FlattenOptions::default())? {
//!     let batch = batch?;
//!     println!("{} rows ({} dropped)", batch.len(), batch.dropped);
//! }
//! ```

pub mod error;
pub mod flatten;
pub mod limit;
pub mod record;
pub mod shape;

#[cfg(test)]
mod tests;

pub use error::{CarflowError, CarflowResult};
pub use flatten::{
    DEFAULT_BATCH_ROWS, FlatBatches, FlattenOptions, FlattenStats, flatten_all, flatten_path,
    flatten_reader,
};
pub use limit::FieldSizeLimit;
pub use record::{FlatBatch, FlatRecord, coerce_id, coerce_level};
pub use shape::{InnerShape, InnerTable, RawPair};
