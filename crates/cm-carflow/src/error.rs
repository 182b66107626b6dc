//! Car-flow flattening error type.
//!
//! Only whole-stream failures live here.  A bad inner value or timestamp
//! drops that one row and is counted in [`FlatBatch::dropped`].
//!
//! [`FlatBatch::dropped`]: crate::FlatBatch::dropped

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CarflowError {
    #[error("expected 'time' and 'data' columns in header, got: {header:?}")]
    MissingColumns { header: Vec<String> },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type CarflowResult<T> = Result<T, CarflowError>;
