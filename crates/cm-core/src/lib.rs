//! `cm-core`: foundational types for the crowd-monitoring ingestion core.
//!
//! This crate is a dependency of every other `cm-*` crate.  It has no `cm-*`
//! dependencies and minimal external ones (`chrono` and `thiserror`, plus
//! optional `serde`).
//!
//! # What lives here
//!
//! | Module          | Contents                                                     |
//! |-----------------|--------------------------------------------------------------|
//! | [`timestamp`]   | `Timestamp`, `ParseStage`, `normalize`, `normalize_all`      |
//! | [`geo`]         | `GeoPoint`, `CoordinateSystem`, `rd_to_wgs84`, `parse_decimal` |
//! | [`config`]      | `FeedConfig` (environment-driven paths and sizes)            |
//! | [`error`]       | `CoreError`, `CoreResult`                                    |

pub mod config;
pub mod error;
pub mod geo;
pub mod timestamp;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use config::FeedConfig;
pub use error::{CoreError, CoreResult};
pub use geo::{CoordinateSystem, GeoPoint, parse_decimal, rd_to_wgs84};
pub use timestamp::{ParseStage, Timestamp, normalize, normalize_all, parse_staged};
