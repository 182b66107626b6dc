//! Unit tests for cm-vessels.

#[cfg(test)]
mod fixtures {
    use std::fmt::Write as _;
    use std::path::{Path, PathBuf};

    use chrono::{DateTime, Duration, Utc};
    use cm_core::Timestamp;
    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};

    pub const HEADER: &str = "upload-timestamp,identifier-sensor,lat,lon,speed-in-centimeters-per-second";

    pub fn base() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-08-20T10:00:00Z").unwrap().with_timezone(&Utc)
    }

    pub fn at(secs: i64) -> Timestamp {
        Timestamp(base() + Duration::seconds(secs))
    }

    /// One report per second from 40 vessels in random order, time-ordered.
    /// Returns the CSV text and `(seconds, id)` per row in file order.
    pub fn synthetic(rows: usize, seed: u64) -> (String, Vec<(i64, String)>) {
        let mut rng = SmallRng::seed_from_u64(seed);
        let mut text = format!("{HEADER}\n");
        let mut truth = Vec::with_capacity(rows);
        for i in 0..rows as i64 {
            let id = format!("V{:03}", rng.gen_range(0..40));
            let lat = 52.35 + rng.gen_range(0.0..0.05);
            let lon = 4.88 + rng.gen_range(0.0..0.05);
            let speed = rng.gen_range(0..500);
            let time = (base() + Duration::seconds(i)).format("%Y-%m-%dT%H:%M:%S%.3f+00:00");
            writeln!(text, "{time},{id},{lat:.6},{lon:.6},{speed}").unwrap();
            truth.push((i, id));
        }
        (text, truth)
    }

    pub fn write(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, body).unwrap();
        path
    }
}

#[cfg(test)]
mod window {
    use std::collections::{BTreeMap, HashSet};

    use chrono::Duration;
    use tempfile::TempDir;

    use super::fixtures::{HEADER, at, synthetic, write};
    use crate::{ScanPath, ScanStrategy, WindowOptions, WindowedSnapshot, load_latest_positions};

    fn tmp() -> TempDir {
        tempfile::tempdir().expect("create temp dir")
    }

    fn same_window(a: &WindowedSnapshot, b: &WindowedSnapshot) {
        assert_eq!(a.max_time, b.max_time);
        assert_eq!(a.cutoff, b.cutoff);
        assert_eq!(a.dropped, b.dropped);
        assert_eq!(a.rows, b.rows);
    }

    #[test]
    fn rows_lie_in_window_once_per_entity() {
        let dir = tmp();
        let (text, truth) = synthetic(3_600, 7);
        let path = write(dir.path(), "vessels.csv", &text);

        let snap = load_latest_positions(&path, &WindowOptions::default()).unwrap();
        let max = snap.max_time.unwrap();
        let cutoff = snap.cutoff.unwrap();
        assert_eq!(max, at(3_599));
        assert_eq!(cutoff, at(3_599 - 900));

        let mut seen = HashSet::new();
        for row in &snap.rows {
            assert!(cutoff <= row.time && row.time <= max);
            assert!(seen.insert(row.entity_id.clone()), "{} twice", row.entity_id);
        }
        assert!(snap.rows.windows(2).all(|w| w[0].entity_id < w[1].entity_id));

        // Brute force: newest second per id within the window.
        let mut expected: BTreeMap<String, i64> = BTreeMap::new();
        for (secs, id) in truth.iter().filter(|(s, _)| *s >= 3_599 - 900) {
            expected.insert(id.clone(), *secs);
        }
        let got: BTreeMap<String, i64> = snap
            .rows
            .iter()
            .map(|r| (r.entity_id.clone(), (r.time.0 - at(0).0).num_seconds()))
            .collect();
        assert_eq!(got, expected);
    }

    #[test]
    fn tail_and_full_scan_agree_on_small_source() {
        let dir = tmp();
        let (text, _) = synthetic(1_000, 11);
        let path = write(dir.path(), "vessels.csv", &text);

        let opts = WindowOptions::default();
        let fast = load_latest_positions(&path, &opts).unwrap();
        let full = load_latest_positions(&path, &opts.with_strategy(ScanStrategy::FullScanOnly)).unwrap();
        assert_eq!(fast.scan, ScanPath::Tail);
        assert_eq!(full.scan, ScanPath::FullScan);
        same_window(&fast, &full);
    }

    #[test]
    fn mid_file_tail_that_covers_window_is_trusted() {
        let dir = tmp();
        let (text, _) = synthetic(3_600, 3);
        let path = write(dir.path(), "vessels.csv", &text);

        // Half the file spans 30 minutes, twice the window.
        let opts = WindowOptions { tail_bytes: text.len() as u64 / 2, chunk_rows: 500, ..WindowOptions::default() };
        let fast = load_latest_positions(&path, &opts).unwrap();
        let full = load_latest_positions(&path, &opts.with_strategy(ScanStrategy::FullScanOnly)).unwrap();
        assert_eq!(fast.scan, ScanPath::Tail);
        same_window(&fast, &full);
    }

    #[test]
    fn short_tail_falls_back() {
        let dir = tmp();
        let (text, _) = synthetic(3_600, 5);
        let path = write(dir.path(), "vessels.csv", &text);

        // A tenth of the file spans 6 minutes, less than the window.
        let opts = WindowOptions { tail_bytes: text.len() as u64 / 10, ..WindowOptions::default() };
        let snap = load_latest_positions(&path, &opts).unwrap();
        assert_eq!(snap.scan, ScanPath::FullScan);
        let reference = load_latest_positions(&path, &opts.with_strategy(ScanStrategy::FullScanOnly)).unwrap();
        same_window(&snap, &reference);
    }

    #[test]
    fn tail_starting_at_cutoff_falls_back() {
        let dir = tmp();
        let a = "2025-08-20T10:00:00+00:00,A,52.0,4.0,1\n";
        let c = "2025-08-20T10:00:00+00:00,C,52.0,4.0,1\n";
        let b = "2025-08-20T10:15:00+00:00,B,52.0,4.0,1\n";
        let path = write(dir.path(), "v.csv", &format!("{HEADER}\n{a}{c}{b}"));

        // The tail holds C and B only; A shares the cutoff timestamp with C.
        let opts = WindowOptions { tail_bytes: (c.len() + b.len()) as u64, ..WindowOptions::default() };
        let fast = load_latest_positions(&path, &opts).unwrap();
        let full = load_latest_positions(&path, &opts.with_strategy(ScanStrategy::FullScanOnly)).unwrap();
        assert_eq!(fast.scan, ScanPath::FullScan);
        assert_eq!(fast.cutoff, Some(at(0)));
        let ids: Vec<&str> = fast.rows.iter().map(|r| r.entity_id.as_str()).collect();
        assert_eq!(ids, ["A", "B", "C"]);
        same_window(&fast, &full);
    }

    #[test]
    fn custom_window() {
        let dir = tmp();
        let (text, _) = synthetic(600, 9);
        let path = write(dir.path(), "vessels.csv", &text);

        let opts = WindowOptions { window: Duration::seconds(10), ..WindowOptions::default() };
        let snap = load_latest_positions(&path, &opts).unwrap();
        assert_eq!(snap.cutoff, Some(at(589)));
        assert!(snap.len() <= 11);
        assert!(snap.rows.iter().all(|r| r.time >= at(589)));
    }
}

#[cfg(test)]
mod rows {
    use std::io::Write;

    use tempfile::TempDir;

    use super::fixtures::{HEADER, at, write};
    use crate::{ScanPath, ScanStrategy, VesselError, WindowOptions, cross_check, load_latest_positions};

    fn tmp() -> TempDir {
        tempfile::tempdir().expect("create temp dir")
    }

    #[test]
    fn later_row_wins_tie() {
        let dir = tmp();
        let body = format!(
            "{HEADER}\n\
2025-08-20T10:00:00+00:00,A,52.0,4.0,10\n\
2025-08-20T10:05:00+00:00,A,52.1,4.1,20\n\
2025-08-20T10:05:00+00:00,A,52.2,4.2,30\n\
2025-08-20T10:04:00+00:00,A,52.3,4.3,40\n"
        );
        let path = write(dir.path(), "v.csv", &body);
        for strategy in [ScanStrategy::Auto, ScanStrategy::FullScanOnly] {
            let snap = load_latest_positions(&path, &WindowOptions::default().with_strategy(strategy)).unwrap();
            assert_eq!(snap.len(), 1);
            let a = snap.get("A").unwrap();
            assert_eq!(a.time, at(300));
            assert_eq!(a.position.lat, 52.2);
            assert_eq!(a.speed, Some(30.0));
        }
    }

    #[test]
    fn stale_entities_excluded() {
        let dir = tmp();
        let body = format!(
            "{HEADER}\n\
2025-08-20T09:00:00+00:00,OLD,52.0,4.0,1\n\
2025-08-20T09:50:00+00:00,B,52.0,4.0,1\n\
2025-08-20T10:00:00+00:00,C,52.0,4.0,1\n"
        );
        let path = write(dir.path(), "v.csv", &body);
        let snap = load_latest_positions(&path, &WindowOptions::default()).unwrap();
        let ids: Vec<&str> = snap.rows.iter().map(|r| r.entity_id.as_str()).collect();
        assert_eq!(ids, ["B", "C"]);
        assert!(snap.get("OLD").is_none());
    }

    #[test]
    fn semicolon_source_with_decimal_commas() {
        let dir = tmp();
        let body = "time;mmsi;latitude;longitude;speed\n\
2025-08-20T12:00:00+02:00;244000001;52,3729; 4,8937;1 250\n\
2025-08-20T12:01:00+02:00;244000002;52,38;4,90;\n";
        let path = write(dir.path(), "v.csv", body);
        let snap = load_latest_positions(&path, &WindowOptions::default()).unwrap();
        assert_eq!(snap.max_time, Some(at(60)));
        let first = snap.get("244000001").unwrap();
        assert_eq!(first.position.lat, 52.3729);
        assert_eq!(first.position.lon, 4.8937);
        assert_eq!(first.speed, Some(1250.0));
        assert_eq!(snap.get("244000002").unwrap().speed, None);
    }

    #[test]
    fn rd_new_positions_converted() {
        let dir = tmp();
        let body = "time,id,position-x,position-y\n2025-08-20T10:00:00Z,V1,121394,487342\n";
        let path = write(dir.path(), "v.csv", body);
        let snap = load_latest_positions(&path, &WindowOptions::default()).unwrap();
        let p = snap.get("V1").unwrap().position;
        assert!((p.lon - 4.8937).abs() < 1e-3, "lon {}", p.lon);
        assert!((p.lat - 52.3729).abs() < 1e-3, "lat {}", p.lat);
    }

    #[test]
    fn bad_rows_in_window_are_dropped_and_counted() {
        let dir = tmp();
        let body = format!(
            "{HEADER}\n\
2025-08-20T10:00:00+00:00,A,52.0,4.0,1\n\
2025-08-20T10:01:00+00:00,B,north,4.0,1\n\
2025-08-20T10:02:00+00:00,,52.0,4.0,1\n\
not-a-time,C,52.0,4.0,1\n\
2025-08-20T10:03:00+00:00,D,52.0,4.0,fast\n"
        );
        let path = write(dir.path(), "v.csv", &body);
        let snap = load_latest_positions(&path, &WindowOptions::default()).unwrap();
        let ids: Vec<&str> = snap.rows.iter().map(|r| r.entity_id.as_str()).collect();
        assert_eq!(ids, ["A", "D"]);
        assert_eq!(snap.dropped, 2);
        assert_eq!(snap.get("D").unwrap().speed, None);
    }

    #[test]
    fn truncated_final_line_tolerated() {
        let dir = tmp();
        let body = format!("{HEADER}\n2025-08-20T10:00:00+00:00,A,52.0,4.0,1\n2025-08-20T10:01:00+00:00,B,52.");
        let path = write(dir.path(), "v.csv", &body);
        let snap = load_latest_positions(&path, &WindowOptions::default()).unwrap();
        assert_eq!(snap.len(), 1);
        assert_eq!(snap.max_time, Some(at(60)));
    }

    #[test]
    fn missing_role_is_schema_error() {
        let dir = tmp();
        let path = write(dir.path(), "v.csv", "when,id,lat,lon\n2025-08-20T10:00:00Z,A,52,4\n");
        let err = load_latest_positions(&path, &WindowOptions::default()).unwrap_err();
        assert!(matches!(err, VesselError::Schema(_)), "{err}");
    }

    #[test]
    fn no_valid_time_is_empty() {
        let dir = tmp();
        let path = write(dir.path(), "v.csv", &format!("{HEADER}\nyesterday,A,52.0,4.0,1\n"));
        let snap = load_latest_positions(&path, &WindowOptions::default()).unwrap();
        assert!(snap.is_empty());
        assert_eq!(snap.max_time, None);
        assert_eq!(snap.scan, ScanPath::FullScan);
    }

    #[test]
    fn gzip_source_is_scanned_in_full() {
        let dir = tmp();
        let path = dir.path().join("v.csv.gz");
        {
            let file = std::fs::File::create(&path).unwrap();
            let mut gz = flate2::write::GzEncoder::new(file, flate2::Compression::fast());
            write!(gz, "{HEADER}\n2025-08-20T10:00:00+00:00,A,52.0,4.0,1\n").unwrap();
            gz.finish().unwrap();
        }
        let snap = load_latest_positions(&path, &WindowOptions::default()).unwrap();
        assert_eq!(snap.scan, ScanPath::FullScan);
        assert_eq!(snap.len(), 1);
    }

    #[test]
    fn cross_check_flags_out_of_order_source() {
        let dir = tmp();
        let mut body = format!("{HEADER}\n2025-08-20T11:00:00+00:00,EARLY,52.0,4.0,1\n");
        for m in 0..30 {
            body.push_str(&format!("2025-08-20T10:{m:02}:00+00:00,V{m},52.0,4.0,1\n"));
        }
        let path = write(dir.path(), "v.csv", &body);
        let opts = WindowOptions { tail_bytes: 1_000, ..WindowOptions::default() };

        let fast = load_latest_positions(&path, &opts).unwrap();
        assert_eq!(fast.scan, ScanPath::Tail);
        assert!(!cross_check(&path, &opts).unwrap());

        let ordered = write(dir.path(), "ordered.csv", &format!("{HEADER}\n2025-08-20T10:00:00+00:00,A,52.0,4.0,1\n"));
        assert!(cross_check(&ordered, &opts).unwrap());
    }
}

#[cfg(test)]
mod options {
    use chrono::Duration;
    use cm_core::FeedConfig;

    use crate::{DEFAULT_TAIL_BYTES, ScanStrategy, WindowOptions};

    #[test]
    fn defaults() {
        let o = WindowOptions::default();
        assert_eq!(o.window, Duration::minutes(15));
        assert_eq!(o.tail_bytes, DEFAULT_TAIL_BYTES);
        assert_eq!(o.chunk_rows, 300_000);
        assert_eq!(o.sample_rows, 2_000);
        assert_eq!(o.strategy, ScanStrategy::Auto);
    }

    #[test]
    fn from_feed_config() {
        let cfg = FeedConfig { vessel_window_minutes: 30, vessel_tail_mb: 50, ..FeedConfig::default() };
        let o = WindowOptions::from_feed(&cfg);
        assert_eq!(o.window, Duration::minutes(30));
        assert_eq!(o.tail_bytes, 50_000_000);
    }

    #[test]
    fn from_feed_clamps_extremes() {
        let cfg = FeedConfig { vessel_window_minutes: i64::MAX, vessel_tail_mb: u64::MAX, ..FeedConfig::default() };
        let o = WindowOptions::from_feed(&cfg);
        assert_eq!(o.window, Duration::MAX);
        assert_eq!(o.tail_bytes, u64::MAX);
    }
}
