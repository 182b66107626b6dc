//! Snapshot rows and the latest-per-entity reduction.

use cm_core::{GeoPoint, Timestamp};
use rustc_hash::FxHashMap;

/// One entity's most recent report within the window.
#[derive(Clone, Debug, PartialEq)]
pub struct PositionSnapshot {
    pub entity_id: String,
    pub time:      Timestamp,
    pub position:  GeoPoint,
    /// Centimetres per second when the source has a speed column.
    pub speed:     Option<f64>,
}

impl PositionSnapshot {
    /// Column names of the tabular projection, in order.
    pub const COLUMNS: [&'static str; 5] = ["id", "time_utc", "lon", "lat", "speed"];

    /// The row as text in [`COLUMNS`](Self::COLUMNS) order; a missing speed
    /// is an empty cell.
    pub fn fields(&self) -> [String; 5] {
        [
            self.entity_id.clone(),
            self.time.to_rfc3339(),
            self.position.lon.to_string(),
            self.position.lat.to_string(),
            self.speed.map(|s| s.to_string()).unwrap_or_default(),
        ]
    }
}

/// Which read path produced a snapshot.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ScanPath {
    /// Only the last `tail_bytes` were read.
    Tail,
    /// Two passes over the whole file.
    FullScan,
}

/// Result of one windowed load.
#[derive(Clone, Debug, PartialEq)]
pub struct WindowedSnapshot {
    /// At most one row per entity, sorted by entity id.
    pub rows:     Vec<PositionSnapshot>,
    /// Newest valid timestamp in the source; `None` when it has none.
    pub max_time: Option<Timestamp>,
    /// `max_time - window`.
    pub cutoff:   Option<Timestamp>,
    pub scan:     ScanPath,
    /// Rows inside the window dropped for a bad id or coordinate.
    pub dropped:  usize,
}

impl WindowedSnapshot {
    pub(crate) fn empty(scan: ScanPath) -> Self {
        Self { rows: Vec::new(), max_time: None, cutoff: None, scan, dropped: 0 }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, entity_id: &str) -> Option<&PositionSnapshot> {
        self.rows
            .binary_search_by(|r| r.entity_id.as_str().cmp(entity_id))
            .ok()
            .map(|i| &self.rows[i])
    }
}

/// Keeps the newest row per entity.  Rows must be offered in file order:
/// on equal times the later offer replaces the earlier one.
#[derive(Default)]
pub(crate) struct LatestPerEntity {
    latest:  FxHashMap<String, PositionSnapshot>,
    dropped: usize,
}

impl LatestPerEntity {
    pub fn offer(&mut self, row: PositionSnapshot) {
        match self.latest.get_mut(&row.entity_id) {
            Some(held) if held.time > row.time => {}
            Some(held) => *held = row,
            None => {
                self.latest.insert(row.entity_id.clone(), row);
            }
        }
    }

    pub fn reject(&mut self) {
        self.dropped += 1;
    }

    pub fn finish(self, max_time: Timestamp, cutoff: Timestamp, scan: ScanPath) -> WindowedSnapshot {
        let mut rows: Vec<PositionSnapshot> = self.latest.into_values().collect();
        rows.sort_unstable_by(|a, b| a.entity_id.cmp(&b.entity_id));
        WindowedSnapshot {
            rows,
            max_time: Some(max_time),
            cutoff: Some(cutoff),
            scan,
            dropped: self.dropped,
        }
    }
}
