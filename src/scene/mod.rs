//! Scene-graph primitives owned by the overlay
//!
//! A managed annotation is split in two: the parent transform, reserved for
//! the reconciler's layout math, and a child content node carrying the
//! renderable plane. Callers adjust visuals (offsets, billboard orientation)
//! on the child only; the parent transform is read-only outside this crate.

use nalgebra::{UnitQuaternion, Vector3};

/// Local-frame placement of a managed node: position, orientation and a
/// uniform scale. Written only by the reconciler.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneTransform {
    /// Position in the local frame (meters)
    pub position: Vector3<f64>,
    /// Orientation in the local frame
    pub orientation: UnitQuaternion<f64>,
    /// Uniform scale factor
    pub scale: f64,
}

impl SceneTransform {
    /// Unset transform: origin, no rotation, unit scale
    pub fn identity() -> Self {
        Self {
            position: Vector3::zeros(),
            orientation: UnitQuaternion::identity(),
            scale: 1.0,
        }
    }
}

impl Default for SceneTransform {
    fn default() -> Self {
        Self::identity()
    }
}

/// Display content rendered onto the annotation plane.
///
/// Rasterization happens outside this crate; the content here is the
/// descriptor handed to the renderer when the plane texture is generated.
#[derive(Debug, Clone, PartialEq)]
pub enum AnnotationContent {
    /// Text label
    Text(String),
    /// Pre-rendered image with pixel dimensions
    Image { width_px: u32, height_px: u32 },
}

impl AnnotationContent {
    pub fn is_empty(&self) -> bool {
        match self {
            AnnotationContent::Text(text) => text.trim().is_empty(),
            AnnotationContent::Image {
                width_px,
                height_px,
            } => *width_px == 0 || *height_px == 0,
        }
    }
}

/// Child renderable subnode: a flat textured plane plus the adjustments
/// callers are allowed to make.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentNode {
    /// Plane width in meters
    pub plane_width_m: f64,
    /// Plane height in meters
    pub plane_height_m: f64,
    /// Content to rasterize onto the plane
    pub content: AnnotationContent,
    /// Caller-adjustable offset relative to the parent (meters)
    pub offset: Vector3<f64>,
    /// Plane orientation relative to the parent. The reconciler overwrites
    /// the yaw component when billboarding is enabled.
    pub orientation: UnitQuaternion<f64>,
}

impl ContentNode {
    /// Plane sized to fit the given content at the default annotation scale
    pub fn new(content: AnnotationContent) -> Self {
        let (width, height) = match &content {
            // A rough per-glyph footprint so short labels get narrow planes
            AnnotationContent::Text(text) => {
                let glyphs = text.chars().count().max(1) as f64;
                (0.6 * glyphs, 1.2)
            }
            AnnotationContent::Image {
                width_px,
                height_px,
            } => {
                let aspect = *width_px as f64 / (*height_px).max(1) as f64;
                (2.0 * aspect, 2.0)
            }
        };

        Self {
            plane_width_m: width,
            plane_height_m: height,
            content,
            offset: Vector3::zeros(),
            orientation: UnitQuaternion::identity(),
        }
    }
}
