//! Geo-anchored AR annotations
//!
//! Core of an augmented-reality overlay that pins text and image
//! annotations to real-world GPS coordinates inside a camera-tracked local
//! frame. The crate converts geodetic coordinates into local-frame offsets,
//! decides when a placement is trustworthy enough to lock in, and keeps
//! annotation transforms positioned, frozen or rescaled as the user moves.
//!
//! The render loop drives [`Reconciler::update`] once per frame with the
//! current camera pose and the newest location fix; asynchronous fix
//! delivery goes through [`FixChannel`].

pub mod core;
pub mod node;
pub mod projection;
pub mod reconcile;
pub mod scene;
pub mod utils;
pub mod validation;

// Re-export commonly used types
pub use crate::core::{CameraPose, EstimationMode, GeoCoordinate, LocationFix};
pub use node::{AnnotationBuilder, AnnotationNode, GeoAnchoredNode};
pub use reconcile::{CycleReport, FixChannel, NodeId, Reconciler};
pub use scene::{AnnotationContent, ContentNode, SceneTransform};
pub use utils::config::{ConfigError, ReconcilerConfig};
pub use validation::AnchorError;
