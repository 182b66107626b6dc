//! sail-feed: one refresh of every ingestion feed.
//!
//! Reads paths and sizes from the environment (a `.env` file is honoured),
//! then runs each feed once:
//!
//! 1. flatten the raw car-flow export to Parquet and CSV.GZ and reload it;
//! 2. load the current vessel snapshot;
//! 3. compute crowd flow for the newest count timestamp.
//!
//! A feed whose source file is absent is skipped with a warning.  Set
//! `RUST_LOG=debug` for per-batch detail.

use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use log::{info, warn};

use cm_carflow::FlattenOptions;
use cm_core::FeedConfig;
use cm_crowdflow::{CrowdFlowTable, FlowInterval, LocationColumns, SensorCountTable, SensorLocationTable};
use cm_output::{load_flat, write_flat_both};
use cm_vessels::{PositionSnapshot, WindowOptions, load_latest_positions};

// ── Constants ─────────────────────────────────────────────────────────────────

const PREVIEW_ROWS: usize = 10;

fn main() -> Result<()> {
    if Path::new(".env").exists() {
        if let Err(e) = dotenv::dotenv() {
            eprintln!("Warning: failed to load .env file: {e}");
        }
    }
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = FeedConfig::from_env().context("reading feed configuration")?;
    println!("=== sail-feed ===");
    println!();

    run_carflow(&config)?;
    run_vessels(&config)?;
    run_crowdflow(&config)?;
    Ok(())
}

fn present(path: &Path, feed: &str) -> bool {
    let exists = path.exists();
    if !exists {
        warn!("{feed}: source {} not found, skipping", path.display());
    }
    exists
}

// ── Car flow ──────────────────────────────────────────────────────────────────

fn run_carflow(config: &FeedConfig) -> Result<()> {
    if !present(&config.carflow_src, "car flow") {
        return Ok(());
    }
    let t0 = Instant::now();
    let options = FlattenOptions::with_batch_rows(config.carflow_batch_rows);
    let both = write_flat_both(
        &config.carflow_src,
        &config.carflow_flat_parquet,
        &config.carflow_flat_csv_gz,
        &options,
    )
    .with_context(|| format!("flattening {}", config.carflow_src.display()))?;

    println!("Car flow ({:.1?})", t0.elapsed());
    match &both.parquet {
        Ok(s) => println!("  parquet: {} rows in {} batches", s.rows, s.batches),
        Err(e) => println!("  parquet: skipped ({e})"),
    }
    println!(
        "  csv.gz:  {} rows, {} raw rows dropped",
        both.csv_gz.rows, both.csv_gz.dropped
    );

    let reload_from = if both.parquet.is_ok() { &config.carflow_flat_parquet } else { &config.carflow_flat_csv_gz };
    let table = load_flat(reload_from).with_context(|| format!("reloading {}", reload_from.display()))?;
    let segments: std::collections::BTreeSet<u64> = table.records.iter().map(|r| r.id.to_bits()).collect();
    println!("  reloaded {} rows over {} segments", table.len(), segments.len());
    println!();
    Ok(())
}

// ── Vessels ───────────────────────────────────────────────────────────────────

fn run_vessels(config: &FeedConfig) -> Result<()> {
    if !present(&config.vessels_src, "vessels") {
        return Ok(());
    }
    let t0 = Instant::now();
    let snapshot = load_latest_positions(&config.vessels_src, &WindowOptions::from_feed(config))
        .with_context(|| format!("loading vessel positions from {}", config.vessels_src.display()))?;

    println!("Vessels ({:.1?}, {:?} read)", t0.elapsed(), snapshot.scan);
    match (snapshot.cutoff, snapshot.max_time) {
        (Some(from), Some(to)) => println!("  window [{from}, {to}]: {} vessels", snapshot.len()),
        _ => println!("  no valid timestamps"),
    }
    if snapshot.dropped > 0 {
        info!("{} windowed rows dropped for bad id or coordinates", snapshot.dropped);
    }
    println!("  {}", PositionSnapshot::COLUMNS.join(","));
    for row in snapshot.rows.iter().take(PREVIEW_ROWS) {
        println!("  {}", row.fields().join(","));
    }
    println!();
    Ok(())
}

// ── Crowd flow ────────────────────────────────────────────────────────────────

fn run_crowdflow(config: &FeedConfig) -> Result<()> {
    if !present(&config.sensor_data, "crowd flow") || !present(&config.sensor_locations, "crowd flow") {
        return Ok(());
    }
    let counts = SensorCountTable::from_path(&config.sensor_data)
        .with_context(|| format!("reading {}", config.sensor_data.display()))?;
    let sites = SensorLocationTable::from_path(&config.sensor_locations, &LocationColumns::default())
        .with_context(|| format!("reading {}", config.sensor_locations.display()))?;

    let Some(latest) = counts.latest() else {
        warn!("crowd flow: {} has no readable rows", config.sensor_data.display());
        return Ok(());
    };
    let mut table = CrowdFlowTable::for_counts(&counts).with_interval(FlowInterval::from_feed(config));
    table.compute(latest, &counts, &sites)?;
    let Some(row) = table.get(latest) else {
        return Ok(());
    };

    println!("Crowd flow at {latest}");
    println!("  {}/{} sensors with data", row.computed(), table.columns().len());
    let mut busiest: Vec<(&String, f64)> = table
        .columns()
        .iter()
        .zip(&row.values)
        .filter_map(|(sensor, v)| v.value().map(|f| (sensor, f)))
        .collect();
    busiest.sort_by(|a, b| b.1.total_cmp(&a.1));
    for (sensor, f) in busiest.iter().take(PREVIEW_ROWS) {
        println!("  {sensor:<24} {f:>8.2} p/m/min");
    }
    Ok(())
}
