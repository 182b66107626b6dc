//! `cm-schema`: schema sniffing for unfamiliar position CSVs.
//!
//! # Crate layout
//!
//! | Module      | Contents                                                  |
//! |-------------|-----------------------------------------------------------|
//! | [`roles`]   | `Role`, `ColumnRef`, `ColumnRoles`, `pick`, `resolve_roles` |
//! | [`sniff`]   | `SchemaSample`, `sniff_path`, `sniff_reader`              |
//! | [`error`]   | `SchemaError`, `SchemaResult<T>`                          |
//!
//! Role resolution is a pure function of the header so it can be tested
//! against literal column lists; sniffing only decides the delimiter and
//! hands the header over.

pub mod error;
pub mod roles;
pub mod sniff;


pub use error::{SchemaError, SchemaResult};
pub use roles::{ColumnRef, ColumnRoles, Role, pick, resolve_roles};
pub use sniff::{DEFAULT_SAMPLE_ROWS, SchemaSample, sniff_path, sniff_reader};
