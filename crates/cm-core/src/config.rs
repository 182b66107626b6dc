//! Feed configuration.
//!
//! Source paths and window/batch sizes are externally configurable through
//! environment variables.  Every key has a default matching the layout of the
//! dashboard's `data/` directory:
//!
//! | Variable                | Field                   | Default                                        |
//! |-------------------------|-------------------------|------------------------------------------------|
//! | `CARFLOW_SRC`           | `carflow_src`           | `data/TomTom_data_20-24Aug2025.csv`            |
//! | `CARFLOW_FLAT`          | `carflow_flat_parquet`  | `data/carflow_flat.parquet`                    |
//! | `CARFLOW_FLAT_CSVGZ`    | `carflow_flat_csv_gz`   | `data/carflow_flat.csv.gz`                     |
//! | `CARFLOW_BATCH_ROWS`    | `carflow_batch_rows`    | `250000`                                       |
//! | `VESSELS_SRC`           | `vessels_src`           | `data/Vesselposition_data_20-24Aug2025.csv`    |
//! | `VESSEL_WINDOW_MINUTES` | `vessel_window_minutes` | `15`                                           |
//! | `VESSEL_TAIL_MB`        | `vessel_tail_mb`        | `25`                                           |
//! | `SENSOR_DATA`           | `sensor_data`           | `data/sensor_data.csv`                         |
//! | `SENSOR_LOCATIONS`      | `sensor_locations`      | `data/sensor_location_cleaned.csv`             |
//! | `FLOW_INTERVAL_MINUTES` | `flow_interval_minutes` | `3`                                            |

use std::path::PathBuf;
use std::str::FromStr;

use chrono::Duration;

use crate::{CoreError, CoreResult};

const BYTES_PER_MB: u64 = 1_000_000;

#[derive(Clone, Debug, PartialEq)]
pub struct FeedConfig {
    pub carflow_src:           PathBuf,
    pub carflow_flat_parquet:  PathBuf,
    pub carflow_flat_csv_gz:   PathBuf,
    pub carflow_batch_rows:    usize,
    pub vessels_src:           PathBuf,
    pub vessel_window_minutes: i64,
    pub vessel_tail_mb:        u64,
    pub sensor_data:           PathBuf,
    pub sensor_locations:      PathBuf,
    pub flow_interval_minutes: f64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            carflow_src:           PathBuf::from("data/TomTom_data_20-24Aug2025.csv"),
            carflow_flat_parquet:  PathBuf::from("data/carflow_flat.parquet"),
            carflow_flat_csv_gz:   PathBuf::from("data/carflow_flat.csv.gz"),
            carflow_batch_rows:    250_000,
            vessels_src:           PathBuf::from("data/Vesselposition_data_20-24Aug2025.csv"),
            vessel_window_minutes: 15,
            vessel_tail_mb:        25,
            sensor_data:           PathBuf::from("data/sensor_data.csv"),
            sensor_locations:      PathBuf::from("data/sensor_location_cleaned.csv"),
            flow_interval_minutes: 3.0,
        }
    }
}

impl FeedConfig {
    /// Read the configuration from the process environment.
    pub fn from_env() -> CoreResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key → value source; unset keys keep their default.
    pub fn from_lookup<F>(lookup: F) -> CoreResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        let path = |key: &str, slot: &mut PathBuf| {
            if let Some(v) = lookup(key).filter(|v| !v.trim().is_empty()) {
                *slot = PathBuf::from(v.trim());
            }
        };
        path("CARFLOW_SRC", &mut cfg.carflow_src);
        path("CARFLOW_FLAT", &mut cfg.carflow_flat_parquet);
        path("CARFLOW_FLAT_CSVGZ", &mut cfg.carflow_flat_csv_gz);
        path("VESSELS_SRC", &mut cfg.vessels_src);
        path("SENSOR_DATA", &mut cfg.sensor_data);
        path("SENSOR_LOCATIONS", &mut cfg.sensor_locations);

        number(&lookup, "CARFLOW_BATCH_ROWS", &mut cfg.carflow_batch_rows)?;
        number(&lookup, "VESSEL_WINDOW_MINUTES", &mut cfg.vessel_window_minutes)?;
        number(&lookup, "VESSEL_TAIL_MB", &mut cfg.vessel_tail_mb)?;
        number(&lookup, "FLOW_INTERVAL_MINUTES", &mut cfg.flow_interval_minutes)?;

        if cfg.carflow_batch_rows == 0 {
            return Err(invalid("CARFLOW_BATCH_ROWS", "0", "must be at least 1"));
        }
        if cfg.vessel_window_minutes <= 0 {
            let value = cfg.vessel_window_minutes.to_string();
            return Err(invalid("VESSEL_WINDOW_MINUTES", &value, "must be positive"));
        }
        if Duration::try_minutes(cfg.vessel_window_minutes).is_none() {
            let value = cfg.vessel_window_minutes.to_string();
            return Err(invalid("VESSEL_WINDOW_MINUTES", &value, "window out of range"));
        }
        if cfg.vessel_tail_mb.checked_mul(BYTES_PER_MB).is_none() {
            let value = cfg.vessel_tail_mb.to_string();
            return Err(invalid("VESSEL_TAIL_MB", &value, "tail size overflows a byte count"));
        }
        if !(cfg.flow_interval_minutes > 0.0) {
            let value = cfg.flow_interval_minutes.to_string();
            return Err(invalid("FLOW_INTERVAL_MINUTES", &value, "must be positive"));
        }
        Ok(cfg)
    }

    /// Tail-read size in bytes (decimal megabytes, as the dashboard counts them).
    #[inline]
    pub fn vessel_tail_bytes(&self) -> u64 {
        self.vessel_tail_mb.saturating_mul(BYTES_PER_MB)
    }

    /// The vessel window as a duration; values too large to represent clamp
    /// to the longest one.
    pub fn vessel_window(&self) -> Duration {
        Duration::try_minutes(self.vessel_window_minutes).unwrap_or(Duration::MAX)
    }
}

fn number<F, T>(lookup: &F, key: &'static str, slot: &mut T) -> CoreResult<()>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let Some(raw) = lookup(key) else {
        return Ok(());
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(());
    }
    *slot = trimmed
        .parse()
        .map_err(|e: T::Err| invalid(key, trimmed, &e.to_string()))?;
    Ok(())
}

fn invalid(key: &'static str, value: &str, reason: &str) -> CoreError {
    CoreError::Config {
        key,
        value: value.to_owned(),
        reason: reason.to_owned(),
    }
}
