//! Error types for cm-vessels.

use thiserror::Error;

/// Whole-load failures.  Rows that fail coercion are counted, not raised.
#[derive(Debug, Error)]
pub enum VesselError {
    /// The source lacks a required role; it cannot be windowed.
    #[error("vessel source is unusable: {0}")]
    Schema(#[from] cm_schema::SchemaError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Alias for `Result<T, VesselError>`.
pub type VesselResult<T> = Result<T, VesselError>;
