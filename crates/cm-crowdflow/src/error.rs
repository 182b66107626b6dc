//! Error types for cm-crowdflow.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FlowError {
    /// A sensor table lacks a column it cannot be read without.
    #[error("missing column '{column}' in header: {header:?}")]
    MissingColumn { column: String, header: Vec<String> },

    /// The count table's sensors no longer match the flow table's columns.
    #[error("sensor columns changed since the flow table was built: added {added:?}, removed {removed:?}")]
    SchemaDrift { added: Vec<String>, removed: Vec<String> },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Alias for `Result<T, FlowError>`.
pub type FlowResult<T> = Result<T, FlowError>;
