//! The crowd-flow accumulator.
//!
//! # Model
//!
//! `flow = count / width_m / interval_minutes`, in people per metre per
//! minute.  A [`CrowdFlowTable`] holds one row per timestamp and one column
//! per sensor; the columns are fixed when the table is built and the table
//! is owned by the caller, who decides when to [`reset`](CrowdFlowTable::reset)
//! it.
//!
//! Any missing input (no count row, empty count cell, unknown sensor, no
//! width, width ≤ 0) yields [`FlowValue::NoData`].  Consumers that expect
//! the legacy table read it through [`FlowValue::or_zero`].

use std::collections::BTreeMap;

use cm_core::{FeedConfig, Timestamp};
use log::{debug, warn};

use crate::counts::{CountSnapshot, SensorCountTable};
use crate::locations::SensorLocationTable;
use crate::{FlowError, FlowResult};

/// Default count interval of the sensor export.
pub const DEFAULT_INTERVAL_MINUTES: f64 = 3.0;

/// Length of one count interval, in minutes.  Always positive.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct FlowInterval(f64);

impl FlowInterval {
    /// `None` unless `minutes` is finite and positive.
    pub fn minutes(minutes: f64) -> Option<Self> {
        (minutes.is_finite() && minutes > 0.0).then_some(Self(minutes))
    }

    pub fn from_feed(config: &FeedConfig) -> Self {
        Self::minutes(config.flow_interval_minutes).unwrap_or_default()
    }

    #[inline]
    pub fn as_minutes(self) -> f64 {
        self.0
    }
}

impl Default for FlowInterval {
    fn default() -> Self {
        Self(DEFAULT_INTERVAL_MINUTES)
    }
}

/// One cell of the flow table.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum FlowValue {
    Computed(f64),
    NoData,
}

impl FlowValue {
    /// The legacy rendering: no data reads as zero flow.
    #[inline]
    pub fn or_zero(self) -> f64 {
        match self {
            FlowValue::Computed(v) => v,
            FlowValue::NoData => 0.0,
        }
    }

    pub fn value(self) -> Option<f64> {
        match self {
            FlowValue::Computed(v) => Some(v),
            FlowValue::NoData => None,
        }
    }

    pub fn is_computed(self) -> bool {
        matches!(self, FlowValue::Computed(_))
    }
}

/// Flow of one sensor over one interval.
pub fn flow_value(count: Option<f64>, width_m: Option<f64>, interval: FlowInterval) -> FlowValue {
    match (count, width_m) {
        (Some(count), Some(width)) if width > 0.0 => FlowValue::Computed(count / width / interval.as_minutes()),
        _ => FlowValue::NoData,
    }
}

/// One timestamp's values, in the table's column order.
#[derive(Clone, Debug, PartialEq)]
pub struct FlowRow {
    pub values: Vec<FlowValue>,
}

impl FlowRow {
    pub fn computed(&self) -> usize {
        self.values.iter().filter(|v| v.is_computed()).count()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct CrowdFlowTable {
    columns:  Vec<String>,
    interval: FlowInterval,
    rows:     BTreeMap<Timestamp, FlowRow>,
}

impl CrowdFlowTable {
    /// An empty table over `columns`.
    pub fn new(columns: Vec<String>, interval: FlowInterval) -> Self {
        Self { columns, interval, rows: BTreeMap::new() }
    }

    /// An empty table whose columns are the count table's sensors.
    pub fn for_counts(counts: &SensorCountTable) -> Self {
        Self::new(counts.sensors().to_vec(), FlowInterval::default())
    }

    pub fn with_interval(self, interval: FlowInterval) -> Self {
        Self { interval, ..self }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn interval(&self) -> FlowInterval {
        self.interval
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, time: Timestamp) -> Option<&FlowRow> {
        self.rows.get(&time)
    }

    pub fn value(&self, time: Timestamp, sensor: &str) -> Option<FlowValue> {
        let col = self.columns.iter().position(|c| c == sensor)?;
        self.rows.get(&time).map(|row| row.values[col])
    }

    /// Timestamps with a row, ascending.
    pub fn timestamps(&self) -> impl Iterator<Item = Timestamp> + '_ {
        self.rows.keys().copied()
    }

    /// Compute and store the row for `time`, replacing any earlier row for
    /// the same timestamp.  `counts` is `None` when the count table has no
    /// row at `time`.
    pub fn record(
        &mut self,
        time: Timestamp,
        counts: Option<&CountSnapshot<'_>>,
        sites: &SensorLocationTable,
    ) -> &FlowRow {
        let values = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, sensor)| {
                let count = counts.and_then(|c| c.get_at(i, sensor));
                flow_value(count, sites.width(sensor), self.interval)
            })
            .collect();
        let row = FlowRow { values };
        debug!("flow row {time}: {}/{} sensors computed", row.computed(), self.columns.len());
        self.rows.insert(time, row);
        &self.rows[&time]
    }

    /// Look up `time` in `counts` and [`record`](Self::record) it.
    ///
    /// # Errors
    ///
    /// [`FlowError::SchemaDrift`] when `counts` gained or lost sensor columns
    /// since this table was built; nothing is recorded.  Rebuild the table with
    /// [`for_counts`](Self::for_counts) to accept the new schema.
    pub fn compute(
        &mut self,
        time: Timestamp,
        counts: &SensorCountTable,
        sites: &SensorLocationTable,
    ) -> FlowResult<&FlowRow> {
        self.check_drift(counts)?;
        let snapshot = counts.snapshot_at(time);
        if snapshot.is_none() {
            debug!("no count row at {time}; recording no-data row");
        }
        Ok(self.record(time, snapshot.as_ref(), sites))
    }

    fn check_drift(&self, counts: &SensorCountTable) -> FlowResult<()> {
        if counts.sensors() == self.columns.as_slice() {
            return Ok(());
        }
        // Same sensors in another order is not drift; cells are matched by name.
        let added: Vec<String> = counts
            .sensors()
            .iter()
            .filter(|s| !self.columns.contains(s))
            .cloned()
            .collect();
        let removed: Vec<String> = self
            .columns
            .iter()
            .filter(|c| !counts.sensors().contains(c))
            .cloned()
            .collect();
        if added.is_empty() && removed.is_empty() {
            return Ok(());
        }
        warn!("sensor schema drift: added {added:?}, removed {removed:?}");
        Err(FlowError::SchemaDrift { added, removed })
    }

    /// Drop every row; the columns stay.
    pub fn reset(&mut self) {
        self.rows.clear();
    }

    /// The legacy `{sensor: [flow]}` view of one row, no-data as zero.
    pub fn projection(&self, time: Timestamp) -> Option<BTreeMap<String, Vec<f64>>> {
        let row = self.rows.get(&time)?;
        Some(
            self.columns
                .iter()
                .zip(&row.values)
                .map(|(sensor, v)| (sensor.clone(), vec![v.or_zero()]))
                .collect(),
        )
    }
}
