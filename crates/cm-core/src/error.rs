//! Core error type.
//!
//! Sub-crates define their own error enums for their own failure modes; this
//! one only covers configuration, which every crate and the demo share.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("configuration error: {key}={value:?}: {reason}")]
    Config {
        key:    &'static str,
        value:  String,
        reason: String,
    },
}

pub type CoreResult<T> = Result<T, CoreError>;
