//! `cm-crowdflow`: crowd flow from raw sensor counts.
//!
//! # Crate layout
//!
//! | Module        | Contents                                                       |
//! |---------------|----------------------------------------------------------------|
//! | [`counts`]    | `SensorCountTable`, `CountSnapshot`                            |
//! | [`locations`] | `SensorLocationTable`, `SensorSite`, `LocationColumns`         |
//! | [`flow`]      | `CrowdFlowTable`, `FlowRow`, `FlowValue`, `FlowInterval`       |
//! | [`error`]     | `FlowError`, `FlowResult<T>`                                   |
//!
//! # Usage
//!
//! ```rust,ignore
//! use cm_crowdflow::{CrowdFlowTable, LocationColumns, SensorCountTable, SensorLocationTable};
//!
//! let counts = SensorCountTable::from_path(Path::new("data/sensor_data.csv"))?;
//! let sites = SensorLocationTable::from_path(Path::new("data/sensor_location.csv"), &LocationColumns::default())?;
//! let mut table = CrowdFlowTable::for_counts(&counts);
//! if let Some(ts) = counts.latest() {
//!     table.compute(ts, &counts, &sites)?;
//!     let legacy = table.projection(ts);
//! }
//! ```

pub mod counts;
pub mod error;
pub mod flow;
pub mod locations;

mod source;


pub use counts::{CountSnapshot, SensorCountTable, TIME_COLUMN, TIME_PART_COLUMNS, is_sensor_column};
pub use error::{FlowError, FlowResult};
pub use flow::{CrowdFlowTable, DEFAULT_INTERVAL_MINUTES, FlowInterval, FlowRow, FlowValue, flow_value};
pub use locations::{LocationColumns, SensorLocationTable, SensorSite};
