//! Geographic primitives: great-circle distance and segment projection
//!
//! Segment projection works in a local tangent plane anchored at the segment start. The
//! approximation is valid for segments that are short relative to the Earth's radius (a
//! few kilometres); beyond that the perpendicular distance error grows with the square
//! of the segment length.

use crate::GeoPoint;

/// Mean Earth radius in meters
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Precomputed constant: meters per degree of latitude
const METERS_PER_DEGREE: f64 = EARTH_RADIUS_M * std::f64::consts::PI / 180.0;

/// Position of a point relative to a segment
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SegmentProjection {
    /// Distance from the point to its projection on the segment, in meters
    pub perpendicular_distance_meters: f64,
    /// Fractional position of the projection along the segment, in `[0, 1]`
    pub t: f64,
}

/// Calculate the haversine distance between two points in meters
///
/// Symmetric, zero iff the points coincide, and respects the triangle inequality.
#[inline]
pub fn great_circle_distance(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat1 = a.latitude().to_radians();
    let lat2 = b.latitude().to_radians();
    let delta_lat = (b.latitude() - a.latitude()).to_radians();
    let delta_lon = wrap_longitude_delta(b.longitude() - a.longitude()).to_radians();

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (delta_lon / 2.0).sin().powi(2);
    // Rounding can push h slightly above 1 for antipodal points
    let h = h.clamp(0.0, 1.0);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_M * c
}

/// Project `point` onto the segment `start -> end`
///
/// # Arguments
/// * `point` - The point to project
/// * `start` - First vertex of the segment
/// * `end` - Second vertex of the segment
///
/// # Returns
/// The clamped parametric position `t` and the perpendicular distance in meters, both
/// derived from the same tangent-plane coordinates. A projection falling before the
/// start (or past the end) snaps to that endpoint. A degenerate segment yields `t = 0`.
#[inline]
pub fn project_onto_segment(point: GeoPoint, start: GeoPoint, end: GeoPoint) -> SegmentProjection {
    let (kx, ky) = plane_scale(start, end);

    let bx = wrap_longitude_delta(end.longitude() - start.longitude()) * kx;
    let by = (end.latitude() - start.latitude()) * ky;
    let px = wrap_longitude_delta(point.longitude() - start.longitude()) * kx;
    let py = (point.latitude() - start.latitude()) * ky;

    let length_sq = bx * bx + by * by;
    let t = if length_sq > 0.0 {
        ((px * bx + py * by) / length_sq).clamp(0.0, 1.0)
    } else {
        0.0
    };

    let dx = px - t * bx;
    let dy = py - t * by;

    SegmentProjection {
        perpendicular_distance_meters: dx.hypot(dy),
        t,
    }
}

/// Linearly interpolate between two points in degree space
///
/// Interpolation follows the shorter way around the antimeridian. Because the tangent
/// plane used by [`project_onto_segment`] is a linear map of degree offsets, projecting the
/// returned point onto the same segment recovers `t`.
#[inline]
pub fn interpolate(start: GeoPoint, end: GeoPoint, t: f64) -> GeoPoint {
    let t = t.clamp(0.0, 1.0);
    let delta_lon = wrap_longitude_delta(end.longitude() - start.longitude());
    let longitude = normalize_longitude(start.longitude() + delta_lon * t);
    let latitude = start.latitude() + (end.latitude() - start.latitude()) * t;

    // Both components stay inside their ranges: latitude is a convex combination of two
    // valid latitudes and longitude was normalized above
    GeoPoint::new(longitude, latitude).unwrap_or(if t < 0.5 { start } else { end })
}

/// Wrap a longitude difference into `[-180, 180)`
///
/// Differences already in range are returned untouched so small offsets keep full
/// precision.
#[inline(always)]
pub fn wrap_longitude_delta(delta: f64) -> f64 {
    if (-180.0..180.0).contains(&delta) {
        delta
    } else {
        (delta + 180.0).rem_euclid(360.0) - 180.0
    }
}

/// Bring a longitude back into `[-180, 180]`
#[inline(always)]
fn normalize_longitude(longitude: f64) -> f64 {
    if (-180.0..=180.0).contains(&longitude) {
        longitude
    } else {
        wrap_longitude_delta(longitude)
    }
}

/// Meters per degree of longitude and latitude around the segment's mean latitude
#[inline(always)]
fn plane_scale(start: GeoPoint, end: GeoPoint) -> (f64, f64) {
    let mean_lat = ((start.latitude() + end.latitude()) / 2.0).to_radians();
    (METERS_PER_DEGREE * mean_lat.cos(), METERS_PER_DEGREE)
}
