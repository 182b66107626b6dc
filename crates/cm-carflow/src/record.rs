//! Flattened car-flow rows and batch packing.

use std::sync::Arc;

use cm_core::{Timestamp, normalize_all, parse_decimal};

/// One tidy observation: a road segment's traffic level at a point in time.
///
/// Segment ids are numeric but not always integral, so they are kept as
/// `f64`; integral ids print without a fraction (`101`, not `101.0`).
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct FlatRecord {
    pub time:          Timestamp,
    pub id:            f64,
    pub traffic_level: f64,
}

impl FlatRecord {
    /// Column names of the tidy table, in order.
    pub const COLUMNS: [&'static str; 3] = ["time_utc", "id", "traffic_level"];
}

/// A batch of flattened rows plus the number of raw rows that failed
/// coercion while packing it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FlatBatch {
    pub records: Vec<FlatRecord>,
    pub dropped: usize,
}

impl FlatBatch {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Append `other`'s rows and drop count to `self`.
    pub fn extend(&mut self, other: FlatBatch) {
        self.records.extend(other.records);
        self.dropped += other.dropped;
    }
}

/// A pair as read from the file, before any coercion.  The outer time string
/// is shared by every pair of the same outer row.
#[derive(Clone, Debug)]
pub(crate) struct RawRow {
    pub time:  Arc<str>,
    pub id:    String,
    pub level: String,
}

/// Segment ids are any finite number: `101`, `101.0` and `101.5` all coerce.
pub fn coerce_id(raw: &str) -> Option<f64> {
    let v: f64 = raw.trim().parse().ok()?;
    v.is_finite().then_some(v)
}

/// Traffic levels are decimals; a decimal comma is tolerated.
pub fn coerce_level(raw: &str) -> Option<f64> {
    parse_decimal(raw)
}

/// Normalize and coerce a run of raw rows, dropping any row with a missing
/// field.
pub(crate) fn pack(rows: Vec<RawRow>) -> FlatBatch {
    // Pairs from one outer row are adjacent and share their time string, so
    // only distinct consecutive strings are parsed.
    let mut distinct: Vec<&str> = Vec::new();
    let mut slot: Vec<usize> = Vec::with_capacity(rows.len());
    let mut prev: Option<&Arc<str>> = None;
    for row in &rows {
        if !prev.is_some_and(|p| Arc::ptr_eq(p, &row.time) || **p == *row.time) {
            distinct.push(&row.time);
        }
        slot.push(distinct.len() - 1);
        prev = Some(&row.time);
    }
    let times = normalize_all(&distinct);

    let total = rows.len();
    let records: Vec<FlatRecord> = rows
        .iter()
        .zip(slot)
        .filter_map(|(row, t)| {
            Some(FlatRecord {
                time:          times[t]?,
                id:            coerce_id(&row.id)?,
                traffic_level: coerce_level(&row.level)?,
            })
        })
        .collect();
    let dropped = total - records.len();
    FlatBatch { records, dropped }
}
