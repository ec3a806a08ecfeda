//! Utility modules for configuration

pub mod config;

pub use config::{ConfigError, ReconcilerConfig};
