//! Reconciler configuration with JSON persistence

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::core::{
    ADJUSTMENT_RANGE_M, BILLBOARD_REFERENCE_DISTANCE_M, CONFIRMATION_DISTANCE_M,
    MIN_SCALE_DISTANCE_M,
};

/// Tunable thresholds for the reconciliation policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconcilerConfig {
    /// Distance beyond which an unconfirmed placement locks in (meters)
    pub confirmation_distance_m: f64,
    /// Range within which node positions keep being re-derived (meters)
    pub adjustment_range_m: f64,
    /// Floor applied to the camera distance before computing inverse scale
    /// (meters)
    pub min_scale_distance_m: f64,
    /// Camera distance at which a constant-apparent-size annotation has
    /// scale 1.0 (meters)
    pub billboard_reference_distance_m: f64,
    /// Rotate annotation content to face the camera around the vertical axis
    pub billboard_annotations: bool,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            confirmation_distance_m: CONFIRMATION_DISTANCE_M,
            adjustment_range_m: ADJUSTMENT_RANGE_M,
            min_scale_distance_m: MIN_SCALE_DISTANCE_M,
            billboard_reference_distance_m: BILLBOARD_REFERENCE_DISTANCE_M,
            billboard_annotations: true,
        }
    }
}

impl ReconcilerConfig {
    /// Load and validate a configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy().to_string();

        let content = fs::read_to_string(&path).map_err(|e| ConfigError::Io {
            message: format!("Failed to read config file '{}': {}", path_str, e),
        })?;

        let config: Self = serde_json::from_str(&content).map_err(|e| ConfigError::Serialization {
            message: format!("Failed to parse config file '{}': {}", path_str, e),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Save the configuration to a JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path_str = path.as_ref().to_string_lossy().to_string();

        let content = serde_json::to_string_pretty(self).map_err(|e| ConfigError::Serialization {
            message: format!("Failed to serialize config: {}", e),
        })?;

        fs::write(&path, content).map_err(|e| ConfigError::Io {
            message: format!("Failed to write config file '{}': {}", path_str, e),
        })?;

        Ok(())
    }

    /// Check every threshold for a usable value
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.confirmation_distance_m <= 0.0 || !self.confirmation_distance_m.is_finite() {
            return Err(ConfigError::InvalidParameter {
                parameter: "confirmation_distance_m".to_string(),
                value: self.confirmation_distance_m.to_string(),
                reason: "Confirmation distance must be positive".to_string(),
            });
        }

        if self.adjustment_range_m <= 0.0 || !self.adjustment_range_m.is_finite() {
            return Err(ConfigError::InvalidParameter {
                parameter: "adjustment_range_m".to_string(),
                value: self.adjustment_range_m.to_string(),
                reason: "Adjustment range must be positive".to_string(),
            });
        }

        if self.min_scale_distance_m <= 0.0 || !self.min_scale_distance_m.is_finite() {
            return Err(ConfigError::InvalidParameter {
                parameter: "min_scale_distance_m".to_string(),
                value: self.min_scale_distance_m.to_string(),
                reason: "Minimum scale distance must be positive to avoid divide-by-zero"
                    .to_string(),
            });
        }

        if self.billboard_reference_distance_m <= 0.0
            || !self.billboard_reference_distance_m.is_finite()
        {
            return Err(ConfigError::InvalidParameter {
                parameter: "billboard_reference_distance_m".to_string(),
                value: self.billboard_reference_distance_m.to_string(),
                reason: "Billboard reference distance must be positive".to_string(),
            });
        }

        if self.min_scale_distance_m >= self.billboard_reference_distance_m {
            return Err(ConfigError::InvalidParameter {
                parameter: "min_scale_distance_m".to_string(),
                value: self.min_scale_distance_m.to_string(),
                reason: "Scale floor must lie below the billboard reference distance".to_string(),
            });
        }

        Ok(())
    }
}

/// Configuration validation and persistence errors
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Parameter outside its valid range
    InvalidParameter {
        parameter: String,
        value: String,
        reason: String,
    },
    /// Configuration file I/O error
    Io { message: String },
    /// JSON serialization/deserialization error
    Serialization { message: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidParameter {
                parameter,
                value,
                reason,
            } => {
                write!(f, "Invalid parameter '{}' = '{}': {}", parameter, value, reason)
            }
            ConfigError::Io { message } => write!(f, "I/O error: {}", message),
            ConfigError::Serialization { message } => {
                write!(f, "Serialization error: {}", message)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
