//! Timestamp normalization.
//!
//! # Design
//!
//! Every feed carries its own flavour of ISO-8601: with or without a
//! fractional second, with an offset or without one.  All of them are reduced
//! to a single [`Timestamp`] (UTC, nanosecond resolution in memory) so that
//! comparisons and sorting are total.
//!
//! Parsing is staged, strict to loose:
//!
//! | Stage          | Accepts                                   |
//! |----------------|-------------------------------------------|
//! | `Fractional`   | `YYYY-MM-DDTHH:MM:SS.ffffff±HH:MM`        |
//! | `Whole`        | `YYYY-MM-DDTHH:MM:SS±HH:MM`               |
//! | `Generic`      | RFC 3339, RFC 2822, common naive layouts  |
//!
//! [`normalize_all`] runs each stage only over the entries the previous stage
//! left unparsed, so a permissive `Generic` match can never shadow a strict
//! one.  Naive inputs (no offset) are taken as UTC.  Anything unparseable
//! becomes `None`; nothing here returns an error.

use std::fmt;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};

// ── Timestamp ─────────────────────────────────────────────────────────────────

/// A point in time, always UTC.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Timestamp(pub DateTime<Utc>);

impl Timestamp {
    pub const MIN: Timestamp = Timestamp(DateTime::<Utc>::MIN_UTC);

    /// Build from microseconds since the Unix epoch.  `None` when out of range.
    pub fn from_unix_micros(micros: i64) -> Option<Timestamp> {
        DateTime::from_timestamp_micros(micros).map(Timestamp)
    }

    #[inline]
    pub fn unix_micros(self) -> i64 {
        self.0.timestamp_micros()
    }

    #[inline]
    pub fn as_datetime(self) -> DateTime<Utc> {
        self.0
    }

    /// `self - span`, clamped to [`Timestamp::MIN`] instead of overflowing.
    pub fn saturating_sub(self, span: Duration) -> Timestamp {
        self.0.checked_sub_signed(span).map_or(Timestamp::MIN, Timestamp)
    }

    /// RFC 3339 with microseconds and a `Z` suffix, the on-disk text form.
    pub fn to_rfc3339(self) -> String {
        self.0.to_rfc3339_opts(SecondsFormat::Micros, true)
    }
}

impl<Tz: TimeZone> From<DateTime<Tz>> for Timestamp {
    /// Already-parsed values pass through with UTC coercion.
    fn from(dt: DateTime<Tz>) -> Self {
        Timestamp(dt.with_timezone(&Utc))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_rfc3339())
    }
}

// ── Parse stages ──────────────────────────────────────────────────────────────

/// Which parser accepted a string.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum ParseStage {
    Fractional,
    Whole,
    Generic,
}

const FRACTIONAL_LAYOUT: &str = "%Y-%m-%dT%H:%M:%S%.f%:z";
const WHOLE_LAYOUT: &str = "%Y-%m-%dT%H:%M:%S%:z";

/// Offset-bearing layouts tried by the generic stage after RFC 3339/2822.
const OFFSET_LAYOUTS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f %z",
];

/// Naive layouts, interpreted as UTC.
const NAIVE_LAYOUTS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%d-%m-%Y %H:%M:%S",
    "%d-%m-%Y %H:%M",
];

const DATE_LAYOUTS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d-%m-%Y"];

impl ParseStage {
    /// Stages in the order [`normalize_all`] applies them.
    pub const ORDER: [ParseStage; 3] = [ParseStage::Fractional, ParseStage::Whole, ParseStage::Generic];

    /// Parse an already-trimmed, non-empty string with this stage only.
    pub fn parse(self, s: &str) -> Option<Timestamp> {
        match self {
            ParseStage::Fractional => {
                if !has_fraction(s) {
                    return None;
                }
                DateTime::parse_from_str(s, FRACTIONAL_LAYOUT).ok().map(Timestamp::from)
            }
            ParseStage::Whole => {
                if has_fraction(s) {
                    return None;
                }
                DateTime::parse_from_str(s, WHOLE_LAYOUT).ok().map(Timestamp::from)
            }
            ParseStage::Generic => parse_generic(s),
        }
    }
}

/// `true` when a `.` directly follows the `YYYY-MM-DDTHH:MM:SS` prefix.
#[inline]
fn has_fraction(s: &str) -> bool {
    s.as_bytes().get(19) == Some(&b'.')
}

fn parse_generic(s: &str) -> Option<Timestamp> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.into());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.into());
    }
    for layout in OFFSET_LAYOUTS {
        if let Ok(dt) = DateTime::parse_from_str(s, layout) {
            return Some(dt.into());
        }
    }
    for layout in NAIVE_LAYOUTS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, layout) {
            return Some(Timestamp(Utc.from_utc_datetime(&naive)));
        }
    }
    for layout in DATE_LAYOUTS {
        if let Ok(date) = NaiveDate::parse_from_str(s, layout) {
            let midnight = date.and_hms_opt(0, 0, 0)?;
            return Some(Timestamp(Utc.from_utc_datetime(&midnight)));
        }
    }
    None
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Parse one string, reporting which stage accepted it.
pub fn parse_staged(raw: &str) -> Option<(Timestamp, ParseStage)> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    ParseStage::ORDER
        .into_iter()
        .find_map(|stage| stage.parse(s).map(|ts| (ts, stage)))
}

/// Parse one string; `None` if no stage accepts it.
#[inline]
pub fn normalize(raw: &str) -> Option<Timestamp> {
    parse_staged(raw).map(|(ts, _)| ts)
}

/// Normalize a column of raw strings.
///
/// Output has the same length as `raw`.  Each stage only sees the entries
/// still missing after the previous stage.
pub fn normalize_all<S: AsRef<str>>(raw: &[S]) -> Vec<Option<Timestamp>> {
    let trimmed: Vec<&str> = raw.iter().map(|s| s.as_ref().trim()).collect();
    let mut out: Vec<Option<Timestamp>> = vec![None; raw.len()];
    let mut pending: Vec<usize> = (0..trimmed.len()).filter(|&i| !trimmed[i].is_empty()).collect();

    for stage in ParseStage::ORDER {
        if pending.is_empty() {
            break;
        }
        pending.retain(|&i| match stage.parse(trimmed[i]) {
            Some(ts) => {
                out[i] = Some(ts);
                false
            }
            None => true,
        });
    }
    out
}
