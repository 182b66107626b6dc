//! Unit tests for cm-carflow.

use std::io::Cursor;

use cm_core::{Timestamp, normalize};

use crate::{FlatBatch, FlatRecord, FlattenOptions, FlattenStats, flatten_reader};

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Build an outer `time,data` CSV with correct quoting of the inner cells.
fn outer(rows: &[(&str, &str)]) -> String {
    let mut w = csv::Writer::from_writer(Vec::new());
    w.write_record(["time", "data"]).unwrap();
    for (time, data) in rows {
        w.write_record([*time, *data]).unwrap();
    }
    String::from_utf8(w.into_inner().unwrap()).unwrap()
}

fn run(src: &str, batch_rows: usize) -> (Vec<FlatBatch>, FlattenStats) {
    let mut it = flatten_reader(Cursor::new(src.to_owned()), &FlattenOptions::with_batch_rows(batch_rows)).unwrap();
    let batches: Vec<FlatBatch> = (&mut it).map(|b| b.unwrap()).collect();
    (batches, it.stats())
}

fn records(src: &str) -> Vec<FlatRecord> {
    run(src, 1_000).0.into_iter().flat_map(|b| b.records).collect()
}

fn ts(s: &str) -> Timestamp {
    normalize(s).unwrap()
}

const T0: &str = "2025-08-20T10:00:00+02:00";

// ── Inner shapes ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod shapes {
    use super::*;
    use crate::InnerShape;
    use crate::shape::{InnerTable, resolve};

    #[test]
    fn labeled_cell() {
        let recs = records(&outer(&[(T0, "id,traffic_level\n101,0.62")]));
        assert_eq!(recs, vec![FlatRecord { time: ts("2025-08-20T08:00:00Z"), id: 101.0, traffic_level: 0.62 }]);
    }

    #[test]
    fn bare_semicolon_pair() {
        let (shape, pairs) = resolve("101;0.62");
        assert_eq!(shape, InnerShape::Positional);
        assert_eq!(pairs, vec![("101".to_string(), "0.62".to_string())]);

        let recs = records(&outer(&[(T0, "101;0.62")]));
        assert_eq!(recs, vec![FlatRecord { time: ts("2025-08-20T08:00:00Z"), id: 101.0, traffic_level: 0.62 }]);
    }

    #[test]
    fn empty_cell_yields_nothing() {
        let (batches, stats) = run(&outer(&[(T0, "")]), 10);
        assert!(batches.is_empty());
        assert_eq!(stats.skipped_rows, 1);
    }

    #[test]
    fn blank_cell_is_bare_pair_shape() {
        let table = InnerTable::parse("\n");
        assert!(table.header().is_none());
        assert_eq!(InnerShape::BarePair.extract(&table), Some(Vec::new()));
        assert_eq!(InnerShape::Labeled.extract(&table), None);
        assert_eq!(InnerShape::Positional.extract(&table), None);
        assert_eq!(resolve("\n"), (InnerShape::BarePair, Vec::new()));
    }

    #[test]
    fn unlabeled_two_wide_header_is_data() {
        let (shape, pairs) = resolve("a,b\n101,0.5\n102,0.7");
        assert_eq!(shape, InnerShape::Positional);
        assert_eq!(pairs.len(), 3);
        assert_eq!(pairs[0], ("a".to_string(), "b".to_string()));
        assert_eq!(pairs[2], ("102".to_string(), "0.7".to_string()));

        // `a,b` cannot be coerced and is dropped; the rest survive.
        let (batches, _) = run(&outer(&[(T0, "a,b\n101,0.5\n102,0.7")]), 10);
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].dropped, 1);
        let ids: Vec<f64> = batches[0].records.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![101.0, 102.0]);
    }

    #[test]
    fn headerless_pairs_keep_first_row() {
        let recs = records(&outer(&[(T0, "101,0.5\n102,0.7")]));
        let ids: Vec<f64> = recs.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![101.0, 102.0]);
    }

    #[test]
    fn wide_unlabeled_header_is_not_data() {
        let (_, pairs) = resolve("a,b,c\n101,0.5,x");
        assert_eq!(pairs, vec![("101".to_string(), "0.5".to_string())]);
    }

    #[test]
    fn labeled_columns_any_order() {
        let recs = records(&outer(&[(T0, " Traffic_Level , ID \n0.5,7\n0.25,8")]));
        assert_eq!(recs.len(), 2);
        assert_eq!((recs[0].id, recs[0].traffic_level), (7.0, 0.5));
        assert_eq!((recs[1].id, recs[1].traffic_level), (8.0, 0.25));
    }

    #[test]
    fn non_integral_ids_are_kept() {
        let (batches, _) = run(&outer(&[(T0, "id,traffic_level\n101.5,0.4\n102,0.3")]), 10);
        assert_eq!(batches[0].dropped, 0);
        let ids: Vec<f64> = batches[0].records.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![101.5, 102.0]);
    }

    #[test]
    fn labeled_short_rows_skipped() {
        let (shape, pairs) = resolve("id,x,traffic_level\n1,a,0.5\n2,b");
        assert_eq!(shape, InnerShape::Labeled);
        assert_eq!(pairs, vec![("1".to_string(), "0.5".to_string())]);
    }

    #[test]
    fn semicolon_labeled_with_decimal_comma() {
        let table = InnerTable::parse("id;traffic_level\n101;0,62");
        assert_eq!(table.delimiter(), b';');
        let recs = records(&outer(&[(T0, "id;traffic_level\n101;0,62")]));
        assert_eq!(recs[0].traffic_level, 0.62);
    }

    #[test]
    fn rows_do_not_share_shape() {
        let recs = records(&outer(&[
            (T0, "id,traffic_level\n1,0.1"),
            ("2025-08-20T10:03:00+02:00", "2;0.2"),
            ("2025-08-20T10:06:00+02:00", "3,0.3\n4,0.4"),
        ]));
        let ids: Vec<f64> = recs.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(recs[1].time, ts("2025-08-20T08:03:00Z"));
    }
}

// ── Stream behaviour ──────────────────────────────────────────────────────────

#[cfg(test)]
mod stream {
    use std::io::Write;

    use super::*;
    use crate::{CarflowError, FieldSizeLimit, flatten_all, flatten_path};

    fn five_rows_of_three() -> String {
        let cells: Vec<(String, String)> = (0..5)
            .map(|i| {
                let time = format!("2025-08-20T10:{:02}:00+02:00", i * 3);
                let data = format!("id,traffic_level\n{},0.1\n{},0.2\n{},0.3", i * 10, i * 10 + 1, i * 10 + 2);
                (time, data)
            })
            .collect();
        let refs: Vec<(&str, &str)> = cells.iter().map(|(t, d)| (t.as_str(), d.as_str())).collect();
        outer(&refs)
    }

    #[test]
    fn batches_are_exact_with_remainder() {
        let (batches, stats) = run(&five_rows_of_three(), 4);
        let sizes: Vec<usize> = batches.iter().map(FlatBatch::len).collect();
        assert_eq!(sizes, vec![4, 4, 4, 3]);
        assert_eq!(stats.outer_rows, 5);
        assert_eq!(stats.raw_pairs, 15);
    }

    #[test]
    fn single_batch_when_threshold_not_reached() {
        let (batches, _) = run(&five_rows_of_three(), 250_000);
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), 15);
    }

    #[test]
    fn batch_order_preserved() {
        let (batches, _) = run(&five_rows_of_three(), 2);
        let ids: Vec<f64> = batches.iter().flat_map(|b| b.records.iter().map(|r| r.id)).collect();
        assert_eq!(ids, vec![0.0, 1.0, 2.0, 10.0, 11.0, 12.0, 20.0, 21.0, 22.0, 30.0, 31.0, 32.0, 40.0, 41.0, 42.0]);
    }

    #[test]
    fn missing_columns_is_schema_error() {
        let src = "timestamp,payload\nx,y\n";
        let err = flatten_reader(Cursor::new(src), &FlattenOptions::default()).err().unwrap();
        match err {
            CarflowError::MissingColumns { header } => assert_eq!(header, vec!["timestamp", "payload"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn header_is_case_insensitive_bom_tolerant_any_order() {
        let src = "\u{feff}DATA, Time ,extra\n\"101,0.5\",2025-08-20T10:00:00+02:00,z\n";
        let recs = records(src);
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].id, 101.0);
        assert_eq!(recs[0].time, ts("2025-08-20T08:00:00Z"));
    }

    #[test]
    fn short_and_empty_outer_rows_skipped() {
        let src = format!("time,extra,data\n{T0}\n{T0},x\n{T0},x,\"7,0.7\"\n");
        let (batches, stats) = run(&src, 10);
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].records[0].id, 7.0);
        assert_eq!(stats.skipped_rows, 2);
    }

    #[test]
    fn coercion_failures_drop_rows_not_batches() {
        let (batches, stats) = run(
            &outer(&[
                (T0, "id,traffic_level\nabc,0.5\n5,xyz\n6,0.1"),
                ("not-a-date", "id,traffic_level\n9,0.9"),
            ]),
            100,
        );
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].records.len(), 1);
        assert_eq!(batches[0].records[0].id, 6.0);
        assert_eq!(batches[0].dropped, 3);
        assert_eq!(stats.dropped_pairs, 3);
    }

    #[test]
    fn totals_include_remainder_batch() {
        let src = outer(&[
            (T0, "id,traffic_level\n1,0.1\n2,0.2"),
            (T0, "id,traffic_level\nx,0.3\ny,0.4\n3,0.5"),
        ]);
        let mut it = flatten_reader(Cursor::new(src), &FlattenOptions::with_batch_rows(4)).unwrap();
        let first = it.next().unwrap().unwrap();
        assert_eq!((first.len(), first.dropped), (2, 2));
        let last = it.next().unwrap().unwrap();
        assert_eq!((last.len(), last.dropped), (1, 0));
        assert_eq!(it.stats().dropped_pairs, 2);
        assert!(it.next().is_none());

        // Drops that land in the remainder are counted by the time it is yielded.
        let src = outer(&[(T0, "id,traffic_level\n1,0.1\nx,0.2")]);
        let mut it = flatten_reader(Cursor::new(src), &FlattenOptions::with_batch_rows(10)).unwrap();
        let only = it.next().unwrap().unwrap();
        assert_eq!(only.dropped, 1);
        assert_eq!(it.stats().dropped_pairs, 1);
        assert_eq!(it.stats().raw_pairs, 2);
        assert!(it.next().is_none());
    }

    #[test]
    fn oversized_field_skips_row() {
        let big = format!("id,traffic_level\n{}", (0..50).map(|i| format!("{i},0.5")).collect::<Vec<_>>().join("\n"));
        let src = outer(&[(T0, big.as_str()), (T0, "1,0.1")]);
        let options = FlattenOptions { batch_rows: 100, field_limit: FieldSizeLimit::new(64) };
        let mut it = flatten_reader(Cursor::new(src), &options).unwrap();
        let recs: Vec<FlatRecord> = (&mut it).flat_map(|b| b.unwrap().records).collect();
        assert_eq!(recs.len(), 1);
        assert_eq!(it.stats().oversized, 1);
    }

    #[test]
    fn field_limit_steps_down() {
        assert_eq!(FieldSizeLimit::negotiate(usize::MAX, 1_000).bytes(), 184);
        assert_eq!(FieldSizeLimit::negotiate(500, 1_000).bytes(), 500);
        let relaxed = FieldSizeLimit::relaxed();
        assert!(relaxed.bytes() <= crate::limit::PLATFORM_CEILING);
        assert!(relaxed.bytes() > crate::limit::PLATFORM_CEILING / 10);
    }

    #[test]
    fn flattening_twice_is_identical() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(five_rows_of_three().as_bytes()).unwrap();
        f.flush().unwrap();

        let options = FlattenOptions::with_batch_rows(4);
        let first: Vec<FlatBatch> = flatten_path(f.path(), &options).unwrap().map(|b| b.unwrap()).collect();
        let second: Vec<FlatBatch> = flatten_path(f.path(), &options).unwrap().map(|b| b.unwrap()).collect();
        assert_eq!(first, second);

        let all = flatten_all(f.path(), &options).unwrap();
        assert_eq!(all.len(), 15);
        assert_eq!(all.dropped, 0);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = flatten_path(std::path::Path::new("/nonexistent/carflow.csv"), &FlattenOptions::default())
            .err()
            .unwrap();
        assert!(matches!(err, CarflowError::Io(_)));
    }
}

// ── Coercion ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod coercion {
    use crate::{coerce_id, coerce_level};

    #[test]
    fn ids() {
        assert_eq!(coerce_id("101"), Some(101.0));
        assert_eq!(coerce_id(" 101 "), Some(101.0));
        assert_eq!(coerce_id("101.0"), Some(101.0));
        assert_eq!(coerce_id("-4"), Some(-4.0));
        assert_eq!(coerce_id("101.5"), Some(101.5));
        assert_eq!(coerce_id(""), None);
        assert_eq!(coerce_id("seg-9"), None);
        assert_eq!(coerce_id("inf"), None);
        assert_eq!(coerce_id("NaN"), None);
    }

    #[test]
    fn levels() {
        assert_eq!(coerce_level("0.62"), Some(0.62));
        assert_eq!(coerce_level("0,62"), Some(0.62));
        assert_eq!(coerce_level("nan"), None);
        assert_eq!(coerce_level("high"), None);
    }
}
