//! Geographic coordinates, coordinate-system conversion, and locale-tolerant
//! decimal parsing.
//!
//! Vessel and sensor feeds mix WGS-84 degrees with Dutch RD New (EPSG:28992)
//! metres, and Dutch exports write `4,90012` where `4.90012` is meant.
//! Everything downstream of the loaders works in WGS-84 `f64` degrees.

/// A WGS-84 coordinate in decimal degrees.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GeoPoint {
    pub lon: f64,
    pub lat: f64,
}

impl GeoPoint {
    #[inline]
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// Parse a combined `"lat, lon"` cell (the sensor-location export layout).
    pub fn from_lat_lon_cell(cell: &str) -> Option<GeoPoint> {
        let (lat, lon) = cell.split_once(',')?;
        Some(GeoPoint::new(lon.trim().parse().ok()?, lat.trim().parse().ok()?))
    }
}

impl std::fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.5}, {:.5})", self.lon, self.lat)
    }
}

// ── Coordinate systems ────────────────────────────────────────────────────────

/// The reference system a pair of source columns is expressed in.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum CoordinateSystem {
    /// Longitude / latitude in degrees.
    #[default]
    Wgs84,
    /// Rijksdriehoeksstelsel (EPSG:28992), easting / northing in metres.
    RdNew,
}

impl CoordinateSystem {
    /// Convert a source `(first, second)` pair, either `(lon, lat)` or `(x, y)`,
    /// to WGS-84.
    pub fn to_wgs84(self, first: f64, second: f64) -> GeoPoint {
        match self {
            CoordinateSystem::Wgs84 => GeoPoint::new(first, second),
            CoordinateSystem::RdNew => rd_to_wgs84(first, second),
        }
    }
}

// RD New reference point (Amersfoort) in both systems.
const RD_X0: f64 = 155_000.0;
const RD_Y0: f64 = 463_000.0;
const WGS_LAT0: f64 = 52.155_174_40;
const WGS_LON0: f64 = 5.387_206_21;

// (p, q, coefficient) for Σ K·dx^p·dy^q, in arc-seconds.
const RD_LAT_TERMS: [(i32, i32, f64); 11] = [
    (0, 1, 3235.653_89),
    (2, 0, -32.582_97),
    (0, 2, -0.247_50),
    (2, 1, -0.849_78),
    (0, 3, -0.065_50),
    (2, 2, -0.017_09),
    (1, 0, -0.007_38),
    (4, 0, 0.005_30),
    (2, 3, -0.000_39),
    (4, 1, 0.000_33),
    (1, 1, -0.000_12),
];

const RD_LON_TERMS: [(i32, i32, f64); 12] = [
    (1, 0, 5260.529_16),
    (1, 1, 105.946_84),
    (1, 2, 2.456_56),
    (3, 0, -0.818_85),
    (1, 3, 0.055_94),
    (3, 1, -0.056_07),
    (0, 1, 0.011_99),
    (3, 2, -0.002_56),
    (1, 4, 0.001_28),
    (0, 2, 0.000_22),
    (2, 0, -0.000_22),
    (5, 0, 0.000_26),
];

/// Convert RD New easting/northing (metres) to WGS-84 degrees.
///
/// Polynomial approximation; sub-metre within the Netherlands, which is all
/// the vessel feed covers.
pub fn rd_to_wgs84(x: f64, y: f64) -> GeoPoint {
    let dx = (x - RD_X0) * 1e-5;
    let dy = (y - RD_Y0) * 1e-5;
    let series = |terms: &[(i32, i32, f64)]| -> f64 {
        terms.iter().map(|&(p, q, k)| k * dx.powi(p) * dy.powi(q)).sum()
    };
    GeoPoint::new(
        WGS_LON0 + series(&RD_LON_TERMS) / 3600.0,
        WGS_LAT0 + series(&RD_LAT_TERMS) / 3600.0,
    )
}

// ── Decimal parsing ───────────────────────────────────────────────────────────

/// Parse a decimal that may use `,` as separator or carry stray whitespace.
///
/// `NaN` is rejected so a parsed value is always usable.
pub fn parse_decimal(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == ',' { '.' } else { c })
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| !v.is_nan())
}
