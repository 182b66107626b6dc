//! `cm-vessels`: current vessel positions from a large append-only CSV.
//!
//! # Crate layout
//!
//! | Module       | Contents                                                        |
//! |--------------|-----------------------------------------------------------------|
//! | [`loader`]   | `load_latest_positions`, `cross_check`                          |
//! | [`snapshot`] | `PositionSnapshot`, `WindowedSnapshot`, `ScanPath`              |
//! | [`options`]  | `WindowOptions`, `ScanStrategy`, defaults                       |
//! | [`error`]    | `VesselError`, `VesselResult<T>`                                |
//!
//! # Semantics
//!
//! `max_time` is the newest valid timestamp anywhere in the source; every
//! returned row lies in `[max_time - window, max_time]` and each entity
//! appears once, with its newest report (the later row in file order on a
//! tie).  Coordinates are WGS-84; RD New sources are converted on load.
//! Decimal commas and stray spaces in numeric cells are tolerated.
//!
//! # Usage
//!
//! ```rust,ignore
//! use cm_vessels::{WindowOptions, load_latest_positions};
//!
//! let snap = load_latest_positions(Path::new("data/vessels.csv"), &WindowOptions::default())?;
//! for row in &snap.rows {
//!     println!("{} at {} ({:?})", row.entity_id, row.position, snap.scan);
//! }
//! ```

pub mod error;
pub mod loader;
pub mod options;
pub mod snapshot;

#[cfg(test)]
mod tests;

pub use error::{VesselError, VesselResult};
pub use loader::{cross_check, load_latest_positions};
pub use options::{DEFAULT_CHUNK_ROWS, DEFAULT_TAIL_BYTES, DEFAULT_WINDOW_MINUTES, ScanStrategy, WindowOptions};
pub use snapshot::{PositionSnapshot, ScanPath, WindowedSnapshot};
