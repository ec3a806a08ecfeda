//! Per-frame position reconciliation
//!
//! The [`Reconciler`] owns the set of managed annotations and runs one
//! reconciliation cycle per external tick: it recomputes each node's
//! distance to the user's estimated coordinate, applies the confirmation
//! rule, re-derives or freezes the local position, rescales billboard
//! annotations for constant apparent size, and yaw-rotates content toward
//! the camera. The cycle is synchronous, allocation-light and never blocks;
//! per-node problems (no coordinate yet, degenerate distance) are isolated
//! and never abort the cycle for the other nodes.

use std::collections::HashMap;
use std::sync::Mutex;

use log::{debug, trace};
use nalgebra::{UnitQuaternion, Vector3};

use crate::core::{CameraPose, EstimationMode, GeoCoordinate, LocationFix};
use crate::node::AnnotationNode;
use crate::projection;
use crate::scene::ContentNode;
use crate::utils::config::{ConfigError, ReconcilerConfig};
use crate::validation::AnchorError;

/// Opaque handle to a managed annotation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u64);

impl NodeId {
    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Latest-fix cell shared with the location collaborator.
///
/// Fixes arrive asynchronously at their own irregular rate; the update loop
/// snapshots the newest one at the start of each cycle so a publication in
/// between cycles can never tear a read.
#[derive(Debug, Default)]
pub struct FixChannel {
    latest: Mutex<Option<LocationFix>>,
}

impl FixChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the latest fix. Called from the location collaborator's
    /// notification context.
    pub fn publish(&self, fix: LocationFix) {
        let mut latest = self.latest.lock().unwrap_or_else(|e| e.into_inner());
        *latest = Some(fix);
    }

    /// Copy of the newest fix, if any has arrived yet
    pub fn snapshot(&self) -> Option<LocationFix> {
        let latest = self.latest.lock().unwrap_or_else(|e| e.into_inner());
        *latest
    }
}

/// Outcome counters for one reconciliation cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Nodes the cycle actually reconciled
    pub examined: usize,
    /// Nodes whose local position was recomputed this cycle
    pub repositioned: usize,
    /// Nodes whose placement confirmed this cycle
    pub confirmed: usize,
    /// Nodes skipped because they opted out of management
    pub skipped_unmanaged: usize,
    /// Nodes skipped because no coordinate is assigned yet
    pub skipped_missing_location: usize,
}

/// Single-owner registry of geo-anchored annotations plus the update policy.
///
/// All transform writes happen inside [`Reconciler::update`], which the
/// external render loop drives once per frame from a single thread.
#[derive(Debug)]
pub struct Reconciler {
    nodes: HashMap<NodeId, AnnotationNode>,
    next_id: u64,
    config: ReconcilerConfig,
    mode: EstimationMode,
}

impl Reconciler {
    /// Registry with default thresholds
    pub fn new(mode: EstimationMode) -> Self {
        Self {
            nodes: HashMap::new(),
            next_id: 0,
            config: ReconcilerConfig::default(),
            mode,
        }
    }

    /// Registry with custom, validated thresholds
    pub fn with_config(config: ReconcilerConfig, mode: EstimationMode) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            nodes: HashMap::new(),
            next_id: 0,
            config,
            mode,
        })
    }

    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    pub fn mode(&self) -> EstimationMode {
        self.mode
    }

    /// Add an annotation to the managed set
    pub fn insert(&mut self, node: AnnotationNode) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(id, node);
        id
    }

    /// Remove an annotation; it will never be mutated again
    pub fn remove(&mut self, id: NodeId) -> Option<AnnotationNode> {
        self.nodes.remove(&id)
    }

    pub fn node(&self, id: NodeId) -> Option<&AnnotationNode> {
        self.nodes.get(&id)
    }

    /// Mutable node access for content adjustments and policy flags. The
    /// parent transform stays read-only through this path.
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut AnnotationNode> {
        self.nodes.get_mut(&id)
    }

    /// Shortcut to the renderable child of a managed annotation
    pub fn content_mut(&mut self, id: NodeId) -> Option<&mut ContentNode> {
        self.nodes.get_mut(&id).map(|node| node.content_mut())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    /// Assign a coordinate to a pending annotation using the registry's
    /// estimation mode
    pub fn assign_location(
        &mut self,
        id: NodeId,
        location: GeoCoordinate,
    ) -> Result<(), AnchorError> {
        let node = self
            .nodes
            .get_mut(&id)
            .ok_or(AnchorError::UnknownNode { id: id.id() })?;
        node.assign_location(location, self.mode)
    }

    /// Derive and assign a coordinate for a screen-placed annotation.
    ///
    /// `local_position` is where the placement landed in the local frame
    /// (e.g. a tap ray hit); the coordinate is back-projected from the
    /// current reference fix and the node is shown at that spot until the
    /// next cycle refines it.
    pub fn derive_location(
        &mut self,
        id: NodeId,
        local_position: Vector3<f64>,
        pose: &CameraPose,
        fix: &LocationFix,
    ) -> Result<(), AnchorError> {
        let mode = self.mode;
        let node = self
            .nodes
            .get_mut(&id)
            .ok_or(AnchorError::UnknownNode { id: id.id() })?;

        let offset = local_position - pose.position;
        let coordinate = projection::coordinate_at_offset(&fix.coordinate, &offset);
        node.assign_location(coordinate, mode)?;
        node.anchor_mut().set_position(local_position);
        Ok(())
    }

    /// Run one reconciliation cycle against the latest pose and fix.
    ///
    /// Mutates managed nodes' transforms (and content yaw) in place; never
    /// touches locations except through the confirmation rule.
    pub fn update(&mut self, pose: &CameraPose, fix: &LocationFix) -> CycleReport {
        let mut report = CycleReport::default();

        for (id, node) in self.nodes.iter_mut() {
            if !node.anchor().continually_update_position_and_scale {
                report.skipped_unmanaged += 1;
                continue;
            }

            let location = match node.anchor().location() {
                Some(location) => *location,
                None => {
                    trace!("node {} has no location yet, skipping", id.id());
                    report.skipped_missing_location += 1;
                    continue;
                }
            };
            report.examined += 1;

            let distance = projection::ground_distance(&location, &fix.coordinate);

            // Confirmation: far enough away that GPS noise no longer moves
            // the apparent position, or raw fixes are trusted outright.
            let mut just_confirmed = false;
            if !node.anchor().is_location_confirmed()
                && (self.mode == EstimationMode::RawFix
                    || distance > self.config.confirmation_distance_m)
            {
                node.anchor_mut().confirm();
                just_confirmed = true;
                report.confirmed += 1;
                debug!("node {} confirmed at {:.1} m", id.id(), distance);
            }

            // Reposition on the first cycle, on the confirmation snap, and
            // continuously while in range with the adjust flag set.
            let reposition = !node.anchor().is_positioned()
                || just_confirmed
                || (distance <= self.config.adjustment_range_m
                    && node.anchor().continually_adjust_when_within_range);
            if reposition {
                let offset = projection::local_offset(&location, &fix.coordinate);
                node.anchor_mut().set_position(pose.position + offset);
                report.repositioned += 1;
            }

            // Scale for constant apparent size, clamped so a camera sitting
            // on the node cannot divide by zero.
            let camera_distance = (node.transform().position - pose.position).norm();
            let scale = if node.scale_relative_to_distance {
                1.0
            } else {
                let clamped = camera_distance.max(self.config.min_scale_distance_m);
                self.config.billboard_reference_distance_m / clamped
            };
            node.anchor_mut().set_scale(scale);

            if self.config.billboard_annotations {
                Self::face_camera(node, pose);
            }
        }

        report
    }

    /// Yaw-only billboard: rotate the content child so the plane faces the
    /// camera around the vertical axis, leaving pitch and roll upright. The
    /// parent orientation is never touched.
    fn face_camera(node: &mut AnnotationNode, pose: &CameraPose) {
        let to_camera = pose.position - node.transform().position;
        let flat = Vector3::new(to_camera.x, 0.0, to_camera.z);
        if flat.norm_squared() < 1e-12 {
            // Camera directly above or on the node, yaw is undefined
            return;
        }
        let yaw = flat.x.atan2(flat.z);
        node.content_mut().orientation =
            UnitQuaternion::from_axis_angle(&Vector3::y_axis(), yaw);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::AnnotationBuilder;
    use approx::assert_relative_eq;

    const BIG_BEN_LAT: f64 = 51.5007;
    const BIG_BEN_LON: f64 = -0.1246;

    fn big_ben() -> GeoCoordinate {
        GeoCoordinate::new(BIG_BEN_LAT, BIG_BEN_LON)
    }

    fn fix_at(coordinate: GeoCoordinate) -> LocationFix {
        LocationFix::new(0, coordinate, 5.0)
    }

    fn annotation_at(coordinate: GeoCoordinate) -> AnnotationNode {
        AnnotationBuilder::text("label").location(coordinate).build().unwrap()
    }

    /// A coordinate roughly `meters` north of the given one
    fn north_of(coordinate: GeoCoordinate, meters: f64) -> GeoCoordinate {
        GeoCoordinate::new(coordinate.latitude + meters / 111_320.0, coordinate.longitude)
    }

    #[test]
    fn first_cycle_positions_an_anchored_node() {
        let mut reconciler = Reconciler::new(EstimationMode::Filtered);
        let id = reconciler.insert(annotation_at(north_of(big_ben(), 50.0)));

        let report = reconciler.update(&CameraPose::identity(), &fix_at(big_ben()));
        assert_eq!(report.examined, 1);
        assert_eq!(report.repositioned, 1);

        let node = reconciler.node(id).unwrap();
        assert!(node.anchor().is_positioned());
        // 50 m north maps to -z in the local frame
        assert_relative_eq!(node.transform().position.z, -50.0, max_relative = 0.01);
        assert_relative_eq!(node.transform().position.x, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn walk_away_confirms_and_snaps_a_pending_placement() {
        // Spec example: annotation placed at Big Ben while standing there,
        // continuous estimation. Confirmation waits until the user is over
        // 100 m away, then the position snaps to the trusted offset.
        let mut reconciler = Reconciler::new(EstimationMode::Filtered);
        let id = reconciler
            .insert(AnnotationBuilder::text("Big Ben").build().unwrap());
        reconciler.assign_location(id, big_ben()).unwrap();

        let pose = CameraPose::identity();
        reconciler.update(&pose, &fix_at(big_ben()));
        assert!(!reconciler.node(id).unwrap().anchor().is_location_confirmed());

        let report = reconciler.update(&pose, &fix_at(north_of(big_ben(), 150.0)));
        assert_eq!(report.confirmed, 1);

        let node = reconciler.node(id).unwrap();
        assert!(node.anchor().is_location_confirmed());
        // User moved 150 m north, so the node now sits 150 m south (+z)
        assert_relative_eq!(node.transform().position.z, 150.0, max_relative = 0.01);
    }

    #[test]
    fn confirmation_happens_exactly_once() {
        let mut reconciler = Reconciler::new(EstimationMode::Filtered);
        let id = reconciler
            .insert(AnnotationBuilder::text("once").build().unwrap());
        reconciler.assign_location(id, big_ben()).unwrap();

        let pose = CameraPose::identity();
        let far = fix_at(north_of(big_ben(), 150.0));
        let first = reconciler.update(&pose, &far);
        let second = reconciler.update(&pose, &far);
        assert_eq!(first.confirmed, 1);
        assert_eq!(second.confirmed, 0);

        // Moving back inside the threshold never reverts confirmation
        reconciler.update(&pose, &fix_at(big_ben()));
        assert!(reconciler.node(id).unwrap().anchor().is_location_confirmed());
    }

    #[test]
    fn raw_fix_mode_confirms_at_distance_zero() {
        let mut reconciler = Reconciler::new(EstimationMode::RawFix);
        let id = reconciler
            .insert(AnnotationBuilder::text("raw").build().unwrap());
        reconciler.assign_location(id, big_ben()).unwrap();
        assert!(reconciler.node(id).unwrap().anchor().is_location_confirmed());
    }

    #[test]
    fn frozen_node_keeps_its_position_as_the_reference_drifts() {
        let mut reconciler = Reconciler::new(EstimationMode::Filtered);
        let node = AnnotationBuilder::text("frozen")
            .location(north_of(big_ben(), 20.0))
            .frozen_when_within_range()
            .build()
            .unwrap();
        let id = reconciler.insert(node);

        let pose = CameraPose::identity();
        reconciler.update(&pose, &fix_at(big_ben()));
        let placed = reconciler.node(id).unwrap().transform().position;

        // Jittered references within range must not move the node
        reconciler.update(&pose, &fix_at(north_of(big_ben(), 5.0)));
        reconciler.update(&pose, &fix_at(north_of(big_ben(), -8.0)));
        assert_eq!(reconciler.node(id).unwrap().transform().position, placed);
    }

    #[test]
    fn in_range_node_tracks_the_reference() {
        let mut reconciler = Reconciler::new(EstimationMode::Filtered);
        let id = reconciler.insert(annotation_at(north_of(big_ben(), 20.0)));

        let pose = CameraPose::identity();
        reconciler.update(&pose, &fix_at(big_ben()));
        let before = reconciler.node(id).unwrap().transform().position;

        reconciler.update(&pose, &fix_at(north_of(big_ben(), 10.0)));
        let after = reconciler.node(id).unwrap().transform().position;
        assert_ne!(before, after);
        assert_relative_eq!(after.z, -10.0, max_relative = 0.05);
    }

    #[test]
    fn out_of_range_node_is_frozen_after_first_placement() {
        let mut reconciler = Reconciler::new(EstimationMode::Filtered);
        let id = reconciler.insert(annotation_at(north_of(big_ben(), 500.0)));

        let pose = CameraPose::identity();
        reconciler.update(&pose, &fix_at(big_ben()));
        let placed = reconciler.node(id).unwrap().transform().position;

        let report = reconciler.update(&pose, &fix_at(north_of(big_ben(), 30.0)));
        assert_eq!(report.repositioned, 0);
        assert_eq!(reconciler.node(id).unwrap().transform().position, placed);
    }

    #[test]
    fn billboard_scale_is_inverse_in_distance() {
        let pose = CameraPose::identity();
        let mut reconciler = Reconciler::new(EstimationMode::Filtered);
        let near = reconciler.insert(annotation_at(north_of(big_ben(), 10.0)));
        let far = reconciler.insert(annotation_at(north_of(big_ben(), 90.0)));

        reconciler.update(&pose, &fix_at(big_ben()));

        let near_scale = reconciler.node(near).unwrap().transform().scale;
        let far_scale = reconciler.node(far).unwrap().transform().scale;
        assert!(near_scale > far_scale);
        assert!(near_scale.is_finite() && far_scale.is_finite());
    }

    #[test]
    fn scale_is_clamped_at_the_distance_floor() {
        let mut reconciler = Reconciler::new(EstimationMode::Filtered);
        let id = reconciler.insert(annotation_at(big_ben()));

        // Camera exactly on the node: no divide-by-zero, scale capped at
        // reference / floor
        reconciler.update(&CameraPose::identity(), &fix_at(big_ben()));
        let scale = reconciler.node(id).unwrap().transform().scale;
        let config = reconciler.config();
        let cap = config.billboard_reference_distance_m / config.min_scale_distance_m;
        assert!(scale.is_finite());
        assert_relative_eq!(scale, cap);
    }

    #[test]
    fn natural_scale_annotations_are_left_at_unit_scale() {
        let mut reconciler = Reconciler::new(EstimationMode::Filtered);
        let node = AnnotationBuilder::text("statue")
            .location(north_of(big_ben(), 40.0))
            .scale_relative_to_distance(true)
            .build()
            .unwrap();
        let id = reconciler.insert(node);

        reconciler.update(&CameraPose::identity(), &fix_at(big_ben()));
        assert_eq!(reconciler.node(id).unwrap().transform().scale, 1.0);
    }

    #[test]
    fn missing_location_is_isolated_from_other_nodes() {
        let mut reconciler = Reconciler::new(EstimationMode::Filtered);
        let pending = reconciler
            .insert(AnnotationBuilder::text("pending").build().unwrap());
        let anchored = reconciler.insert(annotation_at(north_of(big_ben(), 30.0)));

        let report = reconciler.update(&CameraPose::identity(), &fix_at(big_ben()));
        assert_eq!(report.skipped_missing_location, 1);
        assert_eq!(report.examined, 1);
        assert!(!reconciler.node(pending).unwrap().anchor().is_positioned());
        assert!(reconciler.node(anchored).unwrap().anchor().is_positioned());
    }

    #[test]
    fn unmanaged_node_is_never_touched() {
        let mut reconciler = Reconciler::new(EstimationMode::Filtered);
        let node = AnnotationBuilder::text("manual")
            .location(north_of(big_ben(), 30.0))
            .manually_updated()
            .build()
            .unwrap();
        let id = reconciler.insert(node);

        let report = reconciler.update(&CameraPose::identity(), &fix_at(big_ben()));
        assert_eq!(report.skipped_unmanaged, 1);
        assert!(!reconciler.node(id).unwrap().anchor().is_positioned());
    }

    #[test]
    fn removed_node_is_not_mutated_again() {
        let mut reconciler = Reconciler::new(EstimationMode::Filtered);
        let id = reconciler.insert(annotation_at(north_of(big_ben(), 30.0)));

        let pose = CameraPose::identity();
        reconciler.update(&pose, &fix_at(big_ben()));
        let removed = reconciler.remove(id).unwrap();
        let frozen = removed.transform().clone();

        let report = reconciler.update(&pose, &fix_at(north_of(big_ben(), 60.0)));
        assert_eq!(report.examined, 0);
        assert!(reconciler.is_empty());
        assert_eq!(removed.transform(), &frozen);
    }

    #[test]
    fn billboard_yaw_faces_the_camera() {
        let mut reconciler = Reconciler::new(EstimationMode::Filtered);
        let id = reconciler.insert(annotation_at(north_of(big_ben(), 50.0)));

        let pose = CameraPose::identity();
        reconciler.update(&pose, &fix_at(big_ben()));

        let node = reconciler.node(id).unwrap();
        // Node is north of the camera (-z); the plane's +z normal must turn
        // around to face back south toward the viewer.
        let facing = node.content().orientation * Vector3::z();
        assert_relative_eq!(facing.z, 1.0, epsilon = 1e-6);
        // Parent orientation is reserved for layout math and stays put
        assert_eq!(node.transform().orientation, UnitQuaternion::identity());
    }

    #[test]
    fn derive_location_back_projects_a_screen_placement() {
        let mut reconciler = Reconciler::new(EstimationMode::RawFix);
        let id = reconciler
            .insert(AnnotationBuilder::text("tapped").build().unwrap());

        let pose = CameraPose::identity();
        let fix = fix_at(big_ben());
        let spot = Vector3::new(12.0, 0.0, -34.0);
        reconciler.derive_location(id, spot, &pose, &fix).unwrap();

        let node = reconciler.node(id).unwrap();
        assert!(node.anchor().is_location_confirmed());
        assert_eq!(node.transform().position, spot);

        let derived = *node.anchor().location().unwrap();
        let offset = projection::local_offset(&derived, &fix.coordinate);
        assert_relative_eq!(offset.x, 12.0, epsilon = 1e-3);
        assert_relative_eq!(offset.z, -34.0, epsilon = 1e-3);
    }

    #[test]
    fn fix_channel_returns_the_newest_fix() {
        let channel = FixChannel::new();
        assert!(channel.snapshot().is_none());

        channel.publish(fix_at(big_ben()));
        channel.publish(LocationFix::new(10, north_of(big_ben(), 20.0), 3.0));

        let snapshot = channel.snapshot().unwrap();
        assert_eq!(snapshot.timestamp_ms, 10);
        assert_eq!(snapshot.horizontal_accuracy_m, 3.0);
    }
}
