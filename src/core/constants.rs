//! Earth model constants and reconciliation thresholds

/// Semi-major axis of the WGS84 ellipsoid (meters)
pub const EARTH_RADIUS_WGS84: f64 = 6378137.0;

/// Earth flattening factor (WGS84)
pub const EARTH_FLATTENING_WGS84: f64 = 1.0 / 298.257223563;

/// Eccentricity squared (WGS84)
pub const ECCENTRICITY_SQUARED_WGS84: f64 =
    2.0 * EARTH_FLATTENING_WGS84 - EARTH_FLATTENING_WGS84 * EARTH_FLATTENING_WGS84;

/// Distance beyond which an unconfirmed placement locks in (meters).
///
/// Closer than this, GPS noise moves the apparent screen position too much
/// to trust a freshly derived coordinate.
pub const CONFIRMATION_DISTANCE_M: f64 = 100.0;

/// Range within which a node's local position keeps being re-derived from
/// its geo-coordinate on every cycle (meters)
pub const ADJUSTMENT_RANGE_M: f64 = 100.0;

/// Floor applied to the camera-to-node distance before computing the
/// inverse-distance billboard scale (meters)
pub const MIN_SCALE_DISTANCE_M: f64 = 1.0;

/// Camera distance at which a constant-apparent-size annotation has
/// scale 1.0 (meters)
pub const BILLBOARD_REFERENCE_DISTANCE_M: f64 = 100.0;
