//! Geo-anchored scene nodes
//!
//! [`GeoAnchoredNode`] pairs a geographic coordinate with a scene transform
//! and the flags driving the reconciliation policy. [`AnnotationNode`] is
//! the managed specialization carrying a renderable content child.
//!
//! Ownership rule: the parent transform is written exclusively by the
//! reconciler. External code reads it through [`GeoAnchoredNode::transform`]
//! and applies visual adjustments to the content child instead. Node types
//! deliberately implement no `Deserialize`; the builder is the only
//! construction path and malformed input surfaces as a typed error.

use nalgebra::Vector3;

use crate::core::{EstimationMode, GeoCoordinate};
use crate::scene::{AnnotationContent, ContentNode, SceneTransform};
use crate::validation::{validate_coordinate, AnchorError};

/// A node in the scene graph anchored to a geographic coordinate
#[derive(Debug, Clone, PartialEq)]
pub struct GeoAnchoredNode {
    location: Option<GeoCoordinate>,
    location_confirmed: bool,
    /// Keep re-deriving the local position from the geo-coordinate while the
    /// user is within the adjustment range
    pub continually_adjust_when_within_range: bool,
    /// Whether the reconciler touches this node at all on each cycle
    pub continually_update_position_and_scale: bool,
    transform: SceneTransform,
    positioned: bool,
}

impl GeoAnchoredNode {
    /// Node bound to a known coordinate; the placement is confirmed
    /// immediately.
    pub fn anchored(location: GeoCoordinate) -> Result<Self, AnchorError> {
        validate_coordinate(&location)?;
        Ok(Self {
            location: Some(location),
            location_confirmed: true,
            continually_adjust_when_within_range: true,
            continually_update_position_and_scale: true,
            transform: SceneTransform::identity(),
            positioned: false,
        })
    }

    /// Node whose coordinate is still pending external resolution (e.g. a
    /// screen tap awaiting GPS correlation)
    pub fn pending() -> Self {
        Self {
            location: None,
            location_confirmed: false,
            continually_adjust_when_within_range: true,
            continually_update_position_and_scale: true,
            transform: SceneTransform::identity(),
            positioned: false,
        }
    }

    pub fn location(&self) -> Option<&GeoCoordinate> {
        self.location.as_ref()
    }

    /// Whether the placement has been locked in. Transitions false to true
    /// exactly once and never reverts.
    pub fn is_location_confirmed(&self) -> bool {
        self.location_confirmed
    }

    /// Assign or re-estimate the coordinate of an unconfirmed node.
    ///
    /// Under [`EstimationMode::RawFix`] the placement confirms immediately;
    /// under [`EstimationMode::Filtered`] confirmation waits for the
    /// reconciler's distance rule. Once confirmed the location is immutable
    /// and reassignment is an error.
    pub fn assign_location(
        &mut self,
        location: GeoCoordinate,
        mode: EstimationMode,
    ) -> Result<(), AnchorError> {
        if self.location_confirmed {
            return Err(AnchorError::LocationAlreadyConfirmed);
        }
        validate_coordinate(&location)?;
        self.location = Some(location);
        if mode == EstimationMode::RawFix {
            self.location_confirmed = true;
        }
        Ok(())
    }

    /// Current local-frame placement, read-only outside the crate
    pub fn transform(&self) -> &SceneTransform {
        &self.transform
    }

    /// Whether the reconciler has positioned this node at least once
    pub fn is_positioned(&self) -> bool {
        self.positioned
    }

    pub(crate) fn confirm(&mut self) {
        self.location_confirmed = true;
    }

    pub(crate) fn set_position(&mut self, position: Vector3<f64>) {
        self.transform.position = position;
        self.positioned = true;
    }

    pub(crate) fn set_scale(&mut self, scale: f64) {
        self.transform.scale = scale;
    }
}

/// Managed annotation: an anchored node plus a renderable content child
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationNode {
    anchor: GeoAnchoredNode,
    content: ContentNode,
    /// false (the default) keeps a constant apparent screen size by
    /// rescaling every cycle; true lets perspective shrink the plane
    /// naturally with distance
    pub scale_relative_to_distance: bool,
}

impl AnnotationNode {
    pub fn anchor(&self) -> &GeoAnchoredNode {
        &self.anchor
    }

    pub(crate) fn anchor_mut(&mut self) -> &mut GeoAnchoredNode {
        &mut self.anchor
    }

    /// Renderable child carrying the annotation plane
    pub fn content(&self) -> &ContentNode {
        &self.content
    }

    /// Mutable access for caller-side visual adjustments; the parent
    /// transform stays untouchable
    pub fn content_mut(&mut self) -> &mut ContentNode {
        &mut self.content
    }

    /// Delegate to the anchor's read-only transform
    pub fn transform(&self) -> &SceneTransform {
        self.anchor.transform()
    }

    /// See [`GeoAnchoredNode::assign_location`]
    pub fn assign_location(
        &mut self,
        location: GeoCoordinate,
        mode: EstimationMode,
    ) -> Result<(), AnchorError> {
        self.anchor.assign_location(location, mode)
    }

    /// Toggle in-range re-derivation of the local position
    pub fn set_continually_adjust_when_within_range(&mut self, enabled: bool) {
        self.anchor.continually_adjust_when_within_range = enabled;
    }

    /// Toggle whether the reconciler touches this node at all
    pub fn set_continually_update_position_and_scale(&mut self, enabled: bool) {
        self.anchor.continually_update_position_and_scale = enabled;
    }
}

/// Single construction path for annotations: optional coordinate plus
/// display content.
///
/// ```
/// use geoanchor::core::GeoCoordinate;
/// use geoanchor::node::AnnotationBuilder;
///
/// let node = AnnotationBuilder::text("Big Ben")
///     .location(GeoCoordinate::new(51.5007, -0.1246))
///     .build()
///     .unwrap();
/// assert!(node.anchor().is_location_confirmed());
/// ```
#[derive(Debug, Clone)]
pub struct AnnotationBuilder {
    content: AnnotationContent,
    location: Option<GeoCoordinate>,
    scale_relative_to_distance: bool,
    continually_adjust_when_within_range: bool,
    continually_update_position_and_scale: bool,
    plane_size_m: Option<(f64, f64)>,
}

impl AnnotationBuilder {
    pub fn new(content: AnnotationContent) -> Self {
        Self {
            content,
            location: None,
            scale_relative_to_distance: false,
            continually_adjust_when_within_range: true,
            continually_update_position_and_scale: true,
            plane_size_m: None,
        }
    }

    /// Text label annotation
    pub fn text(text: impl Into<String>) -> Self {
        Self::new(AnnotationContent::Text(text.into()))
    }

    /// Image annotation with pixel dimensions
    pub fn image(width_px: u32, height_px: u32) -> Self {
        Self::new(AnnotationContent::Image {
            width_px,
            height_px,
        })
    }

    /// Anchor the annotation to a known coordinate; it will be confirmed
    /// immediately on build
    pub fn location(mut self, location: GeoCoordinate) -> Self {
        self.location = Some(location);
        self
    }

    /// Let the plane scale naturally with distance instead of holding a
    /// constant apparent size
    pub fn scale_relative_to_distance(mut self, enabled: bool) -> Self {
        self.scale_relative_to_distance = enabled;
        self
    }

    /// Override the derived plane dimensions (meters)
    pub fn plane_size(mut self, width_m: f64, height_m: f64) -> Self {
        self.plane_size_m = Some((width_m, height_m));
        self
    }

    /// Freeze the local position once computed, even while in range
    pub fn frozen_when_within_range(mut self) -> Self {
        self.continually_adjust_when_within_range = false;
        self
    }

    /// Leave this node to manual external updates; the reconciler will not
    /// touch it
    pub fn manually_updated(mut self) -> Self {
        self.continually_update_position_and_scale = false;
        self
    }

    /// Validate and construct the annotation. The parent transform is left
    /// at identity until the first reconciliation cycle.
    pub fn build(self) -> Result<AnnotationNode, AnchorError> {
        if self.content.is_empty() {
            return Err(AnchorError::InvalidConstruction {
                reason: "annotation content is empty".to_string(),
            });
        }

        if let Some((width, height)) = self.plane_size_m {
            if width <= 0.0 || height <= 0.0 || !width.is_finite() || !height.is_finite() {
                return Err(AnchorError::InvalidConstruction {
                    reason: format!("plane size {}x{} is not positive", width, height),
                });
            }
        }

        let mut anchor = match self.location {
            Some(location) => GeoAnchoredNode::anchored(location)?,
            None => GeoAnchoredNode::pending(),
        };
        anchor.continually_adjust_when_within_range = self.continually_adjust_when_within_range;
        anchor.continually_update_position_and_scale = self.continually_update_position_and_scale;

        let mut content = ContentNode::new(self.content);
        if let Some((width, height)) = self.plane_size_m {
            content.plane_width_m = width;
            content.plane_height_m = height;
        }

        Ok(AnnotationNode {
            anchor,
            content,
            scale_relative_to_distance: self.scale_relative_to_distance,
        })
    }
}
