//! Error taxonomy and coordinate validation

use std::fmt;

use crate::core::GeoCoordinate;

/// Errors raised by node construction and location assignment.
///
/// Per-node runtime conditions (a node with no coordinate yet, a degenerate
/// camera distance) are handled inside the reconciliation cycle and never
/// surface as errors; this enum covers programming-level misuse of the API.
#[derive(Debug, Clone, PartialEq)]
pub enum AnchorError {
    /// A coordinate component is outside its valid range
    InvalidCoordinate {
        field: &'static str,
        value: f64,
        reason: &'static str,
    },
    /// A node was constructed through a disallowed path (empty content,
    /// malformed restore data)
    InvalidConstruction { reason: String },
    /// A coordinate was assigned to a node whose placement is already
    /// confirmed
    LocationAlreadyConfirmed,
    /// A node handle does not belong to the registry it was used with
    UnknownNode { id: u64 },
}

impl fmt::Display for AnchorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnchorError::InvalidCoordinate {
                field,
                value,
                reason,
            } => {
                write!(f, "Invalid coordinate '{}' = {}: {}", field, value, reason)
            }
            AnchorError::InvalidConstruction { reason } => {
                write!(f, "Invalid node construction: {}", reason)
            }
            AnchorError::LocationAlreadyConfirmed => {
                write!(f, "Location is already confirmed and cannot be reassigned")
            }
            AnchorError::UnknownNode { id } => {
                write!(f, "No managed node with id {}", id)
            }
        }
    }
}

impl std::error::Error for AnchorError {}

/// Validate a WGS84 coordinate before it is bound to a node
pub fn validate_coordinate(coordinate: &GeoCoordinate) -> Result<(), AnchorError> {
    if !(-90.0..=90.0).contains(&coordinate.latitude) {
        return Err(AnchorError::InvalidCoordinate {
            field: "latitude",
            value: coordinate.latitude,
            reason: "must be between -90 and 90 degrees",
        });
    }

    if !(-180.0..=180.0).contains(&coordinate.longitude) {
        return Err(AnchorError::InvalidCoordinate {
            field: "longitude",
            value: coordinate.longitude,
            reason: "must be between -180 and 180 degrees",
        });
    }

    if let Some(altitude) = coordinate.altitude {
        if !altitude.is_finite() {
            return Err(AnchorError::InvalidCoordinate {
                field: "altitude",
                value: altitude,
                reason: "must be finite",
            });
        }
    }

    Ok(())
}
