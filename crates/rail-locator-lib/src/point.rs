//! Validated WGS84 coordinates

use crate::{LocatorError, Result};

/// A WGS84 position in decimal degrees
///
/// Both bounds are enforced at construction: longitude in `[-180, 180]`, latitude in
/// `[-90, 90]`. Out-of-range or non-finite values are rejected, never clamped.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "RawGeoPoint")
)]
pub struct GeoPoint {
    longitude: f64,
    latitude: f64,
}

#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct RawGeoPoint {
    longitude: f64,
    latitude: f64,
}

#[cfg(feature = "serde")]
impl TryFrom<RawGeoPoint> for GeoPoint {
    type Error = LocatorError;

    fn try_from(raw: RawGeoPoint) -> Result<Self> {
        GeoPoint::new(raw.longitude, raw.latitude)
    }
}

impl GeoPoint {
    /// Create a new point, validating both bounds
    pub fn new(longitude: f64, latitude: f64) -> Result<Self> {
        let valid = longitude.is_finite()
            && latitude.is_finite()
            && (-180.0..=180.0).contains(&longitude)
            && (-90.0..=90.0).contains(&latitude);

        if !valid {
            return Err(LocatorError::InvalidCoordinate {
                longitude,
                latitude,
            });
        }

        Ok(Self {
            longitude,
            latitude,
        })
    }

    /// Create a point from a `(latitude, longitude)` pair, the order most GPS feeds use
    pub fn from_lat_lon(latitude: f64, longitude: f64) -> Result<Self> {
        Self::new(longitude, latitude)
    }

    #[inline]
    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    #[inline]
    pub fn latitude(&self) -> f64 {
        self.latitude
    }
}

impl From<GeoPoint> for geo::Point<f64> {
    fn from(point: GeoPoint) -> Self {
        geo::Point::new(point.longitude, point.latitude)
    }
}

impl From<GeoPoint> for geo::Coord<f64> {
    fn from(point: GeoPoint) -> Self {
        geo::Coord {
            x: point.longitude,
            y: point.latitude,
        }
    }
}

impl TryFrom<geo::Point<f64>> for GeoPoint {
    type Error = LocatorError;

    fn try_from(point: geo::Point<f64>) -> Result<Self> {
        GeoPoint::new(point.x(), point.y())
    }
}

impl std::fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.6}, {:.6})", self.longitude, self.latitude)
    }
}
