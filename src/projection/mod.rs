//! Geodetic to local-frame projection
//!
//! Converts WGS84 coordinates into offsets inside the tracking session's
//! gravity-aligned local frame (x east, y up, z south) using a radius-of-
//! curvature flat-earth projection. The approximation is intended for short
//! ranges (tens of meters to a few kilometers); accuracy degrades beyond
//! that and no curvature correction is attempted.

use nalgebra::Vector3;

use crate::core::{GeoCoordinate, EARTH_RADIUS_WGS84, ECCENTRICITY_SQUARED_WGS84};

/// Radii of curvature at a given latitude (radians): prime vertical and
/// meridian, in that order.
fn curvature_radii(lat_rad: f64) -> (f64, f64) {
    let sin_sq = lat_rad.sin().powi(2);
    let n = EARTH_RADIUS_WGS84 / (1.0 - ECCENTRICITY_SQUARED_WGS84 * sin_sq).sqrt();
    let m = EARTH_RADIUS_WGS84 * (1.0 - ECCENTRICITY_SQUARED_WGS84)
        / (1.0 - ECCENTRICITY_SQUARED_WGS84 * sin_sq).powf(1.5);
    (n, m)
}

/// Offset of `target` relative to `reference` in the local frame, such that
/// adding the result to the reference's local position yields the target's
/// local position.
///
/// The curvature radii are evaluated at the midpoint latitude, which makes
/// the projection exactly antisymmetric: `local_offset(a, b) == -local_offset(b, a)`.
/// If either coordinate lacks an altitude the vertical component is zero.
pub fn local_offset(target: &GeoCoordinate, reference: &GeoCoordinate) -> Vector3<f64> {
    let mid_lat_rad = ((target.latitude + reference.latitude) / 2.0).to_radians();
    let (n, m) = curvature_radii(mid_lat_rad);

    let lat_diff = (target.latitude - reference.latitude).to_radians();
    let lon_diff = (target.longitude - reference.longitude).to_radians();

    let east = n * mid_lat_rad.cos() * lon_diff;
    let north = m * lat_diff;
    let up = match (target.altitude, reference.altitude) {
        (Some(t), Some(r)) => t - r,
        _ => 0.0,
    };

    Vector3::new(east, up, -north)
}

/// Coordinate reached by applying a local-frame offset to `reference`.
///
/// Inverse of [`local_offset`], used to derive a geo-coordinate for a
/// placement expressed in the local frame (e.g. a screen tap combined with
/// the current camera pose). The result carries an altitude only when the
/// reference does.
pub fn coordinate_at_offset(reference: &GeoCoordinate, offset: &Vector3<f64>) -> GeoCoordinate {
    let ref_lat_rad = reference.latitude.to_radians();
    let (n, m) = curvature_radii(ref_lat_rad);

    let east = offset.x;
    let north = -offset.z;

    let lat_diff = north / m;
    let lon_diff = east / (n * ref_lat_rad.cos());

    GeoCoordinate {
        latitude: reference.latitude + lat_diff.to_degrees(),
        longitude: reference.longitude + lon_diff.to_degrees(),
        altitude: reference.altitude.map(|a| a + offset.y),
    }
}

/// Horizontal distance between two coordinates (meters), ignoring altitude
pub fn ground_distance(a: &GeoCoordinate, b: &GeoCoordinate) -> f64 {
    let offset = local_offset(a, b);
    (offset.x * offset.x + offset.z * offset.z).sqrt()
}
