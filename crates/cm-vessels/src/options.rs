//! Loader options.

use chrono::Duration;
use cm_core::FeedConfig;
use cm_schema::DEFAULT_SAMPLE_ROWS;

/// Default trailing window.
pub const DEFAULT_WINDOW_MINUTES: i64 = 15;
/// Default tail size: 25 MB (decimal).
pub const DEFAULT_TAIL_BYTES: u64 = 25 * 1_000_000;
/// Default records per full-scan chunk.
pub const DEFAULT_CHUNK_ROWS: usize = 300_000;

/// Which read paths the loader may take.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum ScanStrategy {
    /// Try the tail first and fall back to a full scan when it does not
    /// cover the window.
    #[default]
    Auto,
    /// Always scan the whole file.  Slow; meant for periodic verification of
    /// the tail path.
    FullScanOnly,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct WindowOptions {
    pub window:      Duration,
    pub tail_bytes:  u64,
    pub chunk_rows:  usize,
    pub sample_rows: usize,
    pub strategy:    ScanStrategy,
}

impl Default for WindowOptions {
    fn default() -> Self {
        Self {
            window:      Duration::minutes(DEFAULT_WINDOW_MINUTES),
            tail_bytes:  DEFAULT_TAIL_BYTES,
            chunk_rows:  DEFAULT_CHUNK_ROWS,
            sample_rows: DEFAULT_SAMPLE_ROWS,
            strategy:    ScanStrategy::Auto,
        }
    }
}

impl WindowOptions {
    /// Window and tail size from the feed configuration, defaults elsewhere.
    pub fn from_feed(config: &FeedConfig) -> Self {
        Self {
            window: config.vessel_window(),
            tail_bytes: config.vessel_tail_bytes(),
            ..Self::default()
        }
    }

    pub fn with_strategy(self, strategy: ScanStrategy) -> Self {
        Self { strategy, ..self }
    }
}
