//! Error types for cm-output.

use thiserror::Error;

/// Errors that can occur when writing or reading the flat table.
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[cfg(feature = "parquet")]
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[cfg(feature = "parquet")]
    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("car-flow source error: {0}")]
    Carflow(#[from] cm_carflow::CarflowError),

    /// A flat file whose contents do not match the tidy table layout.
    #[error("{path}: {reason}")]
    Format { path: String, reason: String },
}

impl OutputError {
    pub(crate) fn format(path: &std::path::Path, reason: impl Into<String>) -> Self {
        OutputError::Format { path: path.display().to_string(), reason: reason.into() }
    }
}

/// Alias for `Result<T, OutputError>`.
pub type OutputResult<T> = Result<T, OutputError>;
