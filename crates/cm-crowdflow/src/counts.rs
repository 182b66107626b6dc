//! Raw sensor counts: one row per timestamp, one column per sensor.
//!
//! ```csv
//! timestamp,CMSA-GAKH-01_0,CMSA-GAWW-11_1,hour,minute,day,month,weekday,is_weekend
//! 2025-08-20 10:00:00+02:00,42,17,10,0,20,8,2,0
//! ```
//!
//! Every column other than `timestamp` and the time-part columns is a sensor.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use cm_core::{Timestamp, normalize, parse_decimal};
use csv::StringRecord;
use log::{debug, info, warn};

use crate::FlowResult;
use crate::source::{clean_headers, csv_reader, read_all, read_next, require};

/// The time column of the count export.
pub const TIME_COLUMN: &str = "timestamp";

/// Derived calendar columns that are not sensors.
pub const TIME_PART_COLUMNS: [&str; 6] = ["hour", "minute", "day", "month", "weekday", "is_weekend"];

/// Whether a count-table column holds sensor counts.
pub fn is_sensor_column(name: &str) -> bool {
    !name.eq_ignore_ascii_case(TIME_COLUMN) && !TIME_PART_COLUMNS.iter().any(|c| name.eq_ignore_ascii_case(c))
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SensorCountTable {
    sensors: Vec<String>,
    rows:    BTreeMap<Timestamp, Vec<Option<f64>>>,
}

/// One timestamp's counts, borrowed from a [`SensorCountTable`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CountSnapshot<'a> {
    pub time: Timestamp,
    sensors:  &'a [String],
    counts:   &'a [Option<f64>],
}

impl<'a> CountSnapshot<'a> {
    /// Count for `sensor`; `None` when the sensor is unknown or its cell was
    /// empty or unreadable.
    pub fn get(&self, sensor: &str) -> Option<f64> {
        let i = self.sensors.iter().position(|s| s == sensor)?;
        self.counts[i]
    }

    /// Like [`get`](Self::get) with a positional hint, for callers walking
    /// the same column order.
    pub(crate) fn get_at(&self, hint: usize, sensor: &str) -> Option<f64> {
        match self.sensors.get(hint) {
            Some(s) if s == sensor => self.counts[hint],
            _ => self.get(sensor),
        }
    }

    pub fn sensors(&self) -> &'a [String] {
        self.sensors
    }
}

impl SensorCountTable {
    pub fn from_path(path: &Path) -> FlowResult<Self> {
        let table = Self::from_reader(File::open(path)?)?;
        info!(
            "loaded {} count rows for {} sensors from {}",
            table.len(),
            table.sensors.len(),
            path.display()
        );
        Ok(table)
    }

    /// Parse a count export.  Malformed rows and rows with an unreadable
    /// timestamp are skipped; when a timestamp repeats, the first row wins.
    pub fn from_reader<R: Read>(reader: R) -> FlowResult<Self> {
        let bytes = read_all(reader)?;
        let mut rdr = csv_reader(&bytes)?;
        let header = clean_headers(&mut rdr)?;
        let time_idx = require(&header, TIME_COLUMN)?;

        let sensor_idx: Vec<usize> = (0..header.len())
            .filter(|&i| i != time_idx && is_sensor_column(&header[i]))
            .collect();
        let sensors: Vec<String> = sensor_idx.iter().map(|&i| header[i].clone()).collect();

        let mut rows: BTreeMap<Timestamp, Vec<Option<f64>>> = BTreeMap::new();
        let (mut skipped, mut repeated, mut malformed) = (0usize, 0usize, 0usize);
        let mut record = StringRecord::new();
        while read_next(&mut rdr, &mut record, &mut malformed)? {
            let Some(time) = record.get(time_idx).and_then(normalize) else {
                skipped += 1;
                continue;
            };
            if rows.contains_key(&time) {
                repeated += 1;
                continue;
            }
            let counts = sensor_idx
                .iter()
                .map(|&i| record.get(i).and_then(parse_decimal))
                .collect();
            rows.insert(time, counts);
        }
        if malformed > 0 {
            warn!("{malformed} malformed count rows skipped");
        }
        if skipped > 0 {
            warn!("{skipped} count rows skipped for an unreadable timestamp");
        }
        if repeated > 0 {
            debug!("{repeated} count rows repeat an earlier timestamp; first kept");
        }
        Ok(Self { sensors, rows })
    }

    /// Sensor columns in header order.
    pub fn sensors(&self) -> &[String] {
        &self.sensors
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// All timestamps, ascending.
    pub fn timestamps(&self) -> impl Iterator<Item = Timestamp> + '_ {
        self.rows.keys().copied()
    }

    pub fn latest(&self) -> Option<Timestamp> {
        self.rows.keys().next_back().copied()
    }

    pub fn snapshot_at(&self, time: Timestamp) -> Option<CountSnapshot<'_>> {
        self.rows.get(&time).map(|counts| CountSnapshot { time, sensors: &self.sensors, counts })
    }
}
