//! Core data types for the geo-anchored overlay

use nalgebra::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

/// Geodetic coordinate in WGS84 degrees with an optional altitude.
///
/// Altitude is optional because many location sources (and screen-derived
/// placements) carry no usable vertical component.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoCoordinate {
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
    /// Altitude above the reference ellipsoid (meters)
    pub altitude: Option<f64>,
}

impl GeoCoordinate {
    /// Coordinate without an altitude component
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            altitude: None,
        }
    }

    /// Coordinate with a known altitude (meters)
    pub fn with_altitude(latitude: f64, longitude: f64, altitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            altitude: Some(altitude),
        }
    }
}

/// One sample from the location-estimation collaborator
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocationFix {
    /// Sample timestamp (milliseconds since epoch)
    pub timestamp_ms: u64,
    /// Estimated user coordinate
    pub coordinate: GeoCoordinate,
    /// Reported horizontal accuracy radius (meters)
    pub horizontal_accuracy_m: f64,
}

impl LocationFix {
    pub fn new(timestamp_ms: u64, coordinate: GeoCoordinate, horizontal_accuracy_m: f64) -> Self {
        Self {
            timestamp_ms,
            coordinate,
            horizontal_accuracy_m,
        }
    }
}

/// Camera-to-local-frame transform supplied once per rendered frame.
///
/// The local frame is gravity aligned: x east, y up, z south.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraPose {
    /// Camera position in the local frame (meters)
    pub position: Vector3<f64>,
    /// Camera orientation in the local frame
    pub orientation: UnitQuaternion<f64>,
}

impl CameraPose {
    pub fn new(position: Vector3<f64>, orientation: UnitQuaternion<f64>) -> Self {
        Self {
            position,
            orientation,
        }
    }

    /// Pose at the local-frame origin with no rotation
    pub fn identity() -> Self {
        Self {
            position: Vector3::zeros(),
            orientation: UnitQuaternion::identity(),
        }
    }
}

/// How the location collaborator produces its reference coordinate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EstimationMode {
    /// Raw fixes are trusted as delivered; placements confirm as soon as a
    /// coordinate exists
    RawFix,
    /// Fixes are averaged/filtered over time; nearby placements stay
    /// unconfirmed until the user has moved far enough away
    Filtered,
}
