//! Core types and constants for the geo-anchored overlay

pub mod types;
pub mod constants;

pub use types::*;
pub use constants::*;
