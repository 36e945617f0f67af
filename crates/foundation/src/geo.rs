use serde::{Deserialize, Serialize};

pub const MAX_LATITUDE: f64 = 90.0;
pub const MAX_LONGITUDE: f64 = 180.0;

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum GeoError {
    NonFinite,
    LatitudeOutOfRange(f64),
    LongitudeOutOfRange(f64),
}

impl std::fmt::Display for GeoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GeoError::NonFinite => write!(f, "coordinate is not a finite number"),
            GeoError::LatitudeOutOfRange(lat) => {
                write!(f, "latitude {lat} outside [-{MAX_LATITUDE}, {MAX_LATITUDE}]")
            }
            GeoError::LongitudeOutOfRange(lng) => {
                write!(f, "longitude {lng} outside [-{MAX_LONGITUDE}, {MAX_LONGITUDE}]")
            }
        }
    }
}

impl std::error::Error for GeoError {}

/// WGS84 position in degrees.
///
/// Serialized as a `[lng, lat]` pair, matching GeoJSON coordinate order.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct LngLat {
    pub lng: f64,
    pub lat: f64,
}

impl LngLat {
    pub const fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }

    /// Validating constructor: both components finite and inside WGS84 ranges.
    pub fn try_new(lng: f64, lat: f64) -> Result<Self, GeoError> {
        if !lng.is_finite() || !lat.is_finite() {
            return Err(GeoError::NonFinite);
        }
        if lat.abs() > MAX_LATITUDE {
            return Err(GeoError::LatitudeOutOfRange(lat));
        }
        if lng.abs() > MAX_LONGITUDE {
            return Err(GeoError::LongitudeOutOfRange(lng));
        }
        Ok(Self { lng, lat })
    }

    pub fn is_valid(&self) -> bool {
        Self::try_new(self.lng, self.lat).is_ok()
    }
}

impl From<[f64; 2]> for LngLat {
    fn from(v: [f64; 2]) -> Self {
        Self::new(v[0], v[1])
    }
}

impl From<LngLat> for [f64; 2] {
    fn from(p: LngLat) -> Self {
        [p.lng, p.lat]
    }
}

/// Viewport position in CSS pixels, origin top-left.
#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

impl ScreenPoint {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}
