//! Windowed loading.
//!
//! # Read paths
//!
//! **Tail**: read the last `tail_bytes` of the file, drop the partial first
//! line, and parse what remains with the column indices sniffed from the
//! head.  The tail is trusted only when it starts at byte 0 or its earliest
//! valid timestamp is strictly before the cutoff, i.e. it provably reaches
//! back past the whole window in an append-only, time-ordered file.
//!
//! **Full scan**: pass 1 streams the file in `chunk_rows` chunks for the
//! global newest timestamp; pass 2 streams it again, filters rows into
//! `[max - window, max]`, and keeps one row per entity.
//!
//! Gzip sources (`.gz`) cannot be tail-read and always take the full scan.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::mem;
use std::path::Path;

use cm_core::{Timestamp, normalize, parse_decimal};
use cm_schema::{ColumnRoles, sniff_reader};
use csv::StringRecord;
use flate2::read::MultiGzDecoder;
use log::{debug, info, warn};

use crate::options::{ScanStrategy, WindowOptions};
use crate::snapshot::{LatestPerEntity, PositionSnapshot, ScanPath, WindowedSnapshot};
use crate::VesselResult;

// ── Public API ────────────────────────────────────────────────────────────────

/// Load the newest position of every entity active within the trailing
/// window of the source at `path`.
///
/// # Errors
///
/// [`VesselError::Schema`](crate::VesselError::Schema) when a required role
/// (id, time, longitude, latitude) cannot be resolved from the header; I/O
/// failures.  Malformed rows are skipped.
pub fn load_latest_positions(path: &Path, options: &WindowOptions) -> VesselResult<WindowedSnapshot> {
    let compressed = is_gzip(path);
    let sample = sniff_reader(open(path, compressed)?, options.sample_rows)?;
    let layout = RowLayout { roles: sample.roles()?, delimiter: sample.delimiter };
    debug!("vessel roles for {}: {:?}", path.display(), layout.roles);

    match options.strategy {
        ScanStrategy::Auto if compressed => {
            info!("{} is gzip-compressed; scanning in full", path.display());
        }
        ScanStrategy::Auto => {
            if let Some(snapshot) = tail_snapshot(path, &layout, options)? {
                return Ok(snapshot);
            }
        }
        ScanStrategy::FullScanOnly => {}
    }
    full_scan(path, compressed, &layout, options)
}

/// Compare the tail path against a forced full scan.  `true` when both
/// report the same window and rows.
pub fn cross_check(path: &Path, options: &WindowOptions) -> VesselResult<bool> {
    let fast = load_latest_positions(path, &options.with_strategy(ScanStrategy::Auto))?;
    let full = load_latest_positions(path, &options.with_strategy(ScanStrategy::FullScanOnly))?;
    let consistent = fast.max_time == full.max_time && fast.rows == full.rows;
    if !consistent {
        warn!(
            "tail snapshot of {} disagrees with full scan: max {:?} vs {:?}, {} vs {} rows",
            path.display(),
            fast.max_time,
            full.max_time,
            fast.len(),
            full.len()
        );
    }
    Ok(consistent)
}

// ── Row parsing ───────────────────────────────────────────────────────────────

struct RowLayout {
    roles:     ColumnRoles,
    delimiter: u8,
}

impl RowLayout {
    fn reader<R: Read>(&self, src: R, has_headers: bool) -> csv::Reader<R> {
        csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(has_headers)
            .flexible(true)
            .from_reader(src)
    }

    fn time(&self, record: &StringRecord) -> Option<Timestamp> {
        normalize(record.get(self.roles.time.index)?)
    }

    fn row(&self, record: &StringRecord, time: Timestamp) -> Option<PositionSnapshot> {
        let id = record.get(self.roles.id.index)?.trim();
        if id.is_empty() {
            return None;
        }
        let first = parse_decimal(record.get(self.roles.lon.index)?)?;
        let second = parse_decimal(record.get(self.roles.lat.index)?)?;
        let speed = self
            .roles
            .speed
            .as_ref()
            .and_then(|c| record.get(c.index))
            .and_then(parse_decimal);
        Some(PositionSnapshot {
            entity_id: id.to_owned(),
            time,
            position: self.roles.coords.to_wgs84(first, second),
            speed,
        })
    }

    fn offer(&self, record: &StringRecord, max_time: Timestamp, cutoff: Timestamp, latest: &mut LatestPerEntity) {
        let Some(time) = self.time(record) else {
            return;
        };
        if time < cutoff || time > max_time {
            return;
        }
        match self.row(record, time) {
            Some(row) => latest.offer(row),
            None => latest.reject(),
        }
    }
}

/// Read the next well-formed record.  Malformed records are skipped; I/O
/// errors end the load.
fn read_next<R: Read>(rdr: &mut csv::Reader<R>, record: &mut StringRecord) -> VesselResult<bool> {
    loop {
        match rdr.read_record(record) {
            Ok(more) => return Ok(more),
            Err(e) if e.is_io_error() => return Err(e.into()),
            Err(e) => debug!("skipping malformed vessel record: {e}"),
        }
    }
}

// ── Tail path ─────────────────────────────────────────────────────────────────

/// The last `tail_bytes` of the file, starting on a line boundary, and
/// whether the read began at byte 0.
fn read_tail(path: &Path, tail_bytes: u64) -> VesselResult<(bool, String)> {
    let mut file = File::open(path)?;
    let len = file.metadata()?.len();
    let start = len.saturating_sub(tail_bytes);
    if start == 0 {
        let mut buf = Vec::new();
        file.read_to_end(&mut buf)?;
        return Ok((true, String::from_utf8_lossy(&buf).into_owned()));
    }

    // Read one byte early: if it is a newline the tail starts on a whole line.
    file.seek(SeekFrom::Start(start - 1))?;
    let mut buf = Vec::new();
    file.read_to_end(&mut buf)?;
    match buf.iter().position(|&b| b == b'\n') {
        Some(i) => drop(buf.drain(..=i)),
        None => buf.clear(),
    }
    Ok((false, String::from_utf8_lossy(&buf).into_owned()))
}

fn tail_snapshot(path: &Path, layout: &RowLayout, options: &WindowOptions) -> VesselResult<Option<WindowedSnapshot>> {
    let (from_start, text) = read_tail(path, options.tail_bytes)?;

    let mut bounds: Option<(Timestamp, Timestamp)> = None;
    let mut rdr = layout.reader(text.as_bytes(), from_start);
    let mut record = StringRecord::new();
    while read_next(&mut rdr, &mut record)? {
        if let Some(t) = layout.time(&record) {
            bounds = Some(bounds.map_or((t, t), |(lo, hi)| (lo.min(t), hi.max(t))));
        }
    }

    let Some((earliest, max_time)) = bounds else {
        info!("tail of {} has no valid timestamp; falling back to full scan", path.display());
        return Ok(None);
    };
    let cutoff = max_time.saturating_sub(options.window);
    // Rows at exactly the cutoff may continue before the tail start.
    if !from_start && earliest >= cutoff {
        info!(
            "tail of {} starts at {earliest}, not before cutoff {cutoff}; falling back to full scan",
            path.display()
        );
        return Ok(None);
    }

    let mut latest = LatestPerEntity::default();
    let mut rdr = layout.reader(text.as_bytes(), from_start);
    while read_next(&mut rdr, &mut record)? {
        layout.offer(&record, max_time, cutoff, &mut latest);
    }
    let snapshot = latest.finish(max_time, cutoff, ScanPath::Tail);
    info!(
        "vessel snapshot from tail of {}: {} entities in [{cutoff}, {max_time}], {} dropped",
        path.display(),
        snapshot.len(),
        snapshot.dropped
    );
    Ok(Some(snapshot))
}

// ── Full scan ─────────────────────────────────────────────────────────────────

fn is_gzip(path: &Path) -> bool {
    path.extension().is_some_and(|e| e.eq_ignore_ascii_case("gz"))
}

fn open(path: &Path, compressed: bool) -> VesselResult<Box<dyn Read>> {
    let file = File::open(path)?;
    Ok(if compressed {
        Box::new(MultiGzDecoder::new(BufReader::new(file)))
    } else {
        Box::new(file)
    })
}

/// Stream `src` in chunks of at most `chunk_rows` records.
fn for_each_chunk<R, F>(src: R, layout: &RowLayout, chunk_rows: usize, mut visit: F) -> VesselResult<usize>
where
    R: Read,
    F: FnMut(&[StringRecord]),
{
    let chunk_rows = chunk_rows.max(1);
    let mut rdr = layout.reader(src, true);
    let mut chunk: Vec<StringRecord> = Vec::with_capacity(chunk_rows.min(1 << 16));
    let mut record = StringRecord::new();
    let mut total = 0;
    loop {
        let more = read_next(&mut rdr, &mut record)?;
        if more {
            chunk.push(mem::take(&mut record));
        }
        if chunk.len() >= chunk_rows || (!more && !chunk.is_empty()) {
            visit(&chunk);
            total += chunk.len();
            chunk.clear();
        }
        if !more {
            return Ok(total);
        }
    }
}

fn full_scan(path: &Path, compressed: bool, layout: &RowLayout, options: &WindowOptions) -> VesselResult<WindowedSnapshot> {
    let mut max_time: Option<Timestamp> = None;
    let rows = for_each_chunk(open(path, compressed)?, layout, options.chunk_rows, |chunk| {
        if let Some(m) = chunk.iter().filter_map(|r| layout.time(r)).max() {
            max_time = Some(max_time.map_or(m, |cur| cur.max(m)));
        }
    })?;
    let Some(max_time) = max_time else {
        warn!("no valid timestamp in {} ({rows} rows)", path.display());
        return Ok(WindowedSnapshot::empty(ScanPath::FullScan));
    };
    let cutoff = max_time.saturating_sub(options.window);

    let mut latest = LatestPerEntity::default();
    for_each_chunk(open(path, compressed)?, layout, options.chunk_rows, |chunk| {
        for record in chunk {
            layout.offer(record, max_time, cutoff, &mut latest);
        }
    })?;
    let snapshot = latest.finish(max_time, cutoff, ScanPath::FullScan);
    info!(
        "vessel snapshot from full scan of {} ({rows} rows): {} entities in [{cutoff}, {max_time}], {} dropped",
        path.display(),
        snapshot.len(),
        snapshot.dropped
    );
    Ok(snapshot)
}
