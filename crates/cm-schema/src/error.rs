//! Schema-sniffing error type.

use thiserror::Error;

use crate::Role;

#[derive(Debug, Error)]
pub enum SchemaError {
    /// One or more required roles had no matching column.  The source is
    /// unusable for windowed loading; callers must not guess.
    #[error("no column found for {missing:?} (columns: {columns:?})")]
    MissingRoles {
        missing: Vec<Role>,
        columns: Vec<String>,
    },

    #[error("source has no header row")]
    Empty,

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type SchemaResult<T> = Result<T, SchemaError>;
