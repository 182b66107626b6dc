//! Sensor sites: effective width and position per sensor.
//!
//! The location export is Dutch-formatted: widths may use a decimal comma
//! and the position is one `"lat, lon"` cell.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use cm_core::{GeoPoint, parse_decimal};
use csv::StringRecord;
use log::{info, warn};
use rustc_hash::FxHashMap;

use crate::FlowResult;
use crate::source::{clean_headers, csv_reader, find, read_all, read_next, require};

/// Column names of the location export.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocationColumns {
    pub id:      String,
    /// Effective walkable width in metres.
    pub width:   String,
    /// Optional combined `"lat, lon"` column.
    pub lat_lon: String,
}

impl Default for LocationColumns {
    fn default() -> Self {
        Self {
            id:      "sensor_id_full".to_owned(),
            // Two spaces, as exported.
            width:   "Effectieve  breedte".to_owned(),
            lat_lon: "Lat/Long".to_owned(),
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct SensorSite {
    pub width_m:  Option<f64>,
    pub position: Option<GeoPoint>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SensorLocationTable {
    sites: FxHashMap<String, SensorSite>,
}

impl SensorLocationTable {
    pub fn from_path(path: &Path, columns: &LocationColumns) -> FlowResult<Self> {
        let table = Self::from_reader(File::open(path)?, columns)?;
        info!("loaded {} sensor sites from {}", table.len(), path.display());
        Ok(table)
    }

    /// Parse a location export.  Malformed rows are skipped; when a sensor id
    /// repeats, the first row wins.  A missing or unreadable width leaves `width_m` empty.
    pub fn from_reader<R: Read>(reader: R, columns: &LocationColumns) -> FlowResult<Self> {
        let bytes = read_all(reader)?;
        let mut rdr = csv_reader(&bytes)?;
        let header = clean_headers(&mut rdr)?;
        let id_idx = require(&header, &columns.id)?;
        let width_idx = require(&header, &columns.width)?;
        let pos_idx = find(&header, &columns.lat_lon);

        let mut sites: FxHashMap<String, SensorSite> = FxHashMap::default();
        let (mut no_width, mut malformed) = (0usize, 0usize);
        let mut record = StringRecord::new();
        while read_next(&mut rdr, &mut record, &mut malformed)? {
            let Some(id) = record.get(id_idx).map(str::trim).filter(|s| !s.is_empty()) else {
                continue;
            };
            let width_m = record.get(width_idx).and_then(parse_decimal);
            if width_m.is_none() {
                no_width += 1;
            }
            let position = pos_idx
                .and_then(|i| record.get(i))
                .and_then(GeoPoint::from_lat_lon_cell);
            sites.entry(id.to_owned()).or_insert(SensorSite { width_m, position });
        }
        if malformed > 0 {
            warn!("{malformed} malformed sensor site rows skipped");
        }
        if no_width > 0 {
            warn!("{no_width} sensor sites have no usable width");
        }
        Ok(Self { sites })
    }

    pub fn from_sites<I>(sites: I) -> Self
    where
        I: IntoIterator<Item = (String, SensorSite)>,
    {
        Self { sites: sites.into_iter().collect() }
    }

    pub fn get(&self, sensor: &str) -> Option<&SensorSite> {
        self.sites.get(sensor)
    }

    /// Width in metres, if the sensor is known and has one.
    pub fn width(&self, sensor: &str) -> Option<f64> {
        self.sites.get(sensor)?.width_m
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }
}
