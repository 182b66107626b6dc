//! Column-role resolution.
//!
//! A pure function from a header (list of column names) to a role
//! assignment.  For every role the candidate list is walked in order, first
//! with an exact match and then case-insensitively; the first hit wins.
//!
//! | Role        | Candidates (in priority order)                                   |
//! |-------------|------------------------------------------------------------------|
//! | `Longitude` | `lon`, `longitude`, `x`, `long`, `lng`, `lon_dd`                 |
//! | `Latitude`  | `lat`, `latitude`, `y`, `lat_dd`                                 |
//! | `Time`      | `upload-timestamp`, `time`, `timestamp`, `datetime`              |
//! | `Id`        | `id`, `identifier-sensor`, `identifier`, `mmsi`, `vessel_id`     |
//! | `Speed`     | `speed-in-centimeters-per-second`, `speed_cm_s`, `speed`         |
//!
//! Speed is optional.  When neither longitude nor latitude resolves but the
//! header carries `position-x` / `position-y`, those are taken as RD New
//! easting / northing.

use std::fmt;

use cm_core::CoordinateSystem;

use crate::{SchemaError, SchemaResult};

/// A semantic column role.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    Longitude,
    Latitude,
    Time,
    Id,
    Speed,
}

impl Role {
    /// Candidate column names, highest priority first.
    pub fn candidates(self) -> &'static [&'static str] {
        match self {
            Role::Longitude => &["lon", "longitude", "x", "long", "lng", "lon_dd"],
            Role::Latitude => &["lat", "latitude", "y", "lat_dd"],
            Role::Time => &["upload-timestamp", "time", "timestamp", "datetime"],
            Role::Id => &["id", "identifier-sensor", "identifier", "mmsi", "vessel_id"],
            Role::Speed => &["speed-in-centimeters-per-second", "speed_cm_s", "speed"],
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Longitude => "longitude",
            Role::Latitude => "latitude",
            Role::Time => "time",
            Role::Id => "id",
            Role::Speed => "speed",
        };
        f.write_str(name)
    }
}

/// A resolved column: its position in the header and its original name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnRef {
    pub index: usize,
    pub name:  String,
}

/// The outcome of a successful resolution.
#[derive(Clone, Debug, PartialEq)]
pub struct ColumnRoles {
    /// Longitude, or RD easting when `coords` is `RdNew`.
    pub lon:    ColumnRef,
    /// Latitude, or RD northing when `coords` is `RdNew`.
    pub lat:    ColumnRef,
    pub time:   ColumnRef,
    pub id:     ColumnRef,
    pub speed:  Option<ColumnRef>,
    pub coords: CoordinateSystem,
}

impl ColumnRoles {
    /// Minimum record length that covers every required column.
    pub fn required_width(&self) -> usize {
        [self.lon.index, self.lat.index, self.time.index, self.id.index]
            .into_iter()
            .max()
            .unwrap_or(0)
            + 1
    }
}

const RD_EASTING: &str = "position-x";
const RD_NORTHING: &str = "position-y";

/// Find the first candidate present in `columns`.
///
/// Exact matches across the whole candidate list take precedence over
/// case-insensitive ones.
pub fn pick<S: AsRef<str>>(columns: &[S], candidates: &[&str]) -> Option<ColumnRef> {
    let names: Vec<&str> = columns.iter().map(|c| c.as_ref().trim()).collect();
    let found = |pred: &dyn Fn(&str, &str) -> bool| {
        candidates.iter().find_map(|cand| {
            names
                .iter()
                .position(|n| pred(*n, *cand))
                .map(|index| ColumnRef { index, name: columns[index].as_ref().to_owned() })
        })
    };
    found(&|n: &str, c: &str| n == c).or_else(|| found(&|n: &str, c: &str| n.eq_ignore_ascii_case(c)))
}

/// Assign roles to `columns`, or report every required role left unmatched.
pub fn resolve_roles<S: AsRef<str>>(columns: &[S]) -> SchemaResult<ColumnRoles> {
    let mut lon = pick(columns, Role::Longitude.candidates());
    let mut lat = pick(columns, Role::Latitude.candidates());
    let time = pick(columns, Role::Time.candidates());
    let id = pick(columns, Role::Id.candidates());
    let speed = pick(columns, Role::Speed.candidates());

    let mut coords = CoordinateSystem::Wgs84;
    if lon.is_none() && lat.is_none() {
        if let (Some(x), Some(y)) = (pick(columns, &[RD_EASTING]), pick(columns, &[RD_NORTHING])) {
            lon = Some(x);
            lat = Some(y);
            coords = CoordinateSystem::RdNew;
        }
    }

    match (lon, lat, time, id) {
        (Some(lon), Some(lat), Some(time), Some(id)) => Ok(ColumnRoles { lon, lat, time, id, speed, coords }),
        (lon, lat, time, id) => {
            let missing = [
                (Role::Longitude, lon.is_none()),
                (Role::Latitude, lat.is_none()),
                (Role::Time, time.is_none()),
                (Role::Id, id.is_none()),
            ]
            .into_iter()
            .filter_map(|(role, absent)| absent.then_some(role))
            .collect();
            Err(SchemaError::MissingRoles {
                missing,
                columns: columns.iter().map(|c| c.as_ref().to_owned()).collect(),
            })
        }
    }
}
