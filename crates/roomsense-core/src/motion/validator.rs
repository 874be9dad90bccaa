//! Motion validation
//!
//! Every check runs against the scene as it is now and returns an
//! [`ActionResult`]. Only [`MotionValidator::can_teleport`] touches agent
//! state, and it restores it exactly when the teleport is rejected.

use glam::Vec3;
use rapier3d::prelude::ColliderHandle;

use super::action::{ActionPayload, ActionResult, FailureReason};
use super::rotation_checks::RotationChecks;
use crate::config::EngineConfig;
use crate::entity::{HeldObject, Pose};
use crate::math::Transform;
use crate::perception::{Camera, VisibilityOracle};
use crate::world::{ColliderCategory, CollisionOracle, QueryMask, Scene, Shape};

pub struct MotionValidator {
    config: EngineConfig,
    visibility: VisibilityOracle,
    rotation_checks: Option<RotationChecks>,
}

impl MotionValidator {
    pub fn new(config: EngineConfig) -> Self {
        let visibility = VisibilityOracle::new(config.visibility.clone());
        Self {
            config,
            visibility,
            rotation_checks: None,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn visibility(&self) -> &VisibilityOracle {
        &self.visibility
    }

    pub fn camera_for(&self, pose: &Pose) -> Camera {
        Camera::from_pose(pose, &self.config.agent, &self.config.camera)
    }

    pub fn rotation_checks(&self) -> Option<&RotationChecks> {
        self.rotation_checks.as_ref()
    }

    /// Translate the agent by `direction * magnitude` from its current pose
    pub fn can_translate(&self, scene: &Scene, direction: Vec3, magnitude: f32) -> ActionResult {
        let pose = *scene.agent_pose();
        self.can_translate_from(scene, &pose, direction, magnitude, &[])
    }

    /// Translation check for a hypothetical agent pose. Colliders in `ignore`
    /// never block (used for geometry the agent already touches).
    pub fn can_translate_from(
        &self,
        scene: &Scene,
        from: &Pose,
        direction: Vec3,
        magnitude: f32,
        ignore: &[ColliderHandle],
    ) -> ActionResult {
        let Some(dir) = direction.try_normalize() else {
            return ActionResult::fail(FailureReason::invalid("translation direction is zero"));
        };
        if !(magnitude.is_finite() && magnitude > 0.0) {
            return ActionResult::fail(FailureReason::invalid(format!(
                "translation magnitude must be positive, got {magnitude}"
            )));
        }

        let target = from.position + dir * magnitude;
        if !scene.bounds().contains(target) {
            return ActionResult::fail(FailureReason::OutOfBounds { position: target });
        }

        match self.translation_obstruction(scene, from, dir, magnitude, ignore) {
            Some(reason) => ActionResult::fail(reason),
            None => ActionResult::ok_with(ActionPayload::Pose(from.with_position(target))),
        }
    }

    /// Sweep part of a translation check, without the bounds test
    pub fn translation_obstruction(
        &self,
        scene: &Scene,
        from: &Pose,
        direction: Vec3,
        magnitude: f32,
        ignore: &[ColliderHandle],
    ) -> Option<FailureReason> {
        let held = scene.held().copied();

        let mut agent_mask = QueryMask::solids()
            .exclude_category(ColliderCategory::FLOOR)
            .ignoring_colliders(ignore.iter().copied());
        if let Some(held) = &held {
            agent_mask = agent_mask.ignoring_object(held.object);
        }

        let capsule = scene.agent().capsule;
        let hits = CollisionOracle::sweep(
            scene,
            &capsule,
            &Transform::from_translation(from.position),
            direction,
            magnitude + self.config.agent.skin_width,
            &agent_mask,
        );
        if let Some(hit) = hits.first() {
            log::trace!(
                "MotionValidator: agent sweep blocked by {:?} at {:.3}",
                hit.collider.object,
                hit.distance
            );
            return Some(FailureReason::obstruction(&hit.collider));
        }

        let held = held?;
        let held_mask = QueryMask::solids()
            .ignoring_object(held.object)
            .ignoring_colliders(ignore.iter().copied());
        for (shape, pose) in self.held_geometry(scene, &held, &from.frame()) {
            let hits = CollisionOracle::sweep(scene, &shape, &pose, direction, magnitude, &held_mask);
            if let Some(hit) = hits.first() {
                log::trace!(
                    "MotionValidator: held sweep blocked by {:?} at {:.3}",
                    hit.collider.object,
                    hit.distance
                );
                return Some(FailureReason::obstruction(&hit.collider));
            }
        }
        None
    }

    /// Turn by `delta_yaw` degrees using the precomputed rotation volumes
    pub fn can_rotate(&self, scene: &Scene, delta_yaw: f32) -> ActionResult {
        if !delta_yaw.is_finite() {
            return ActionResult::fail(FailureReason::invalid("rotation delta is not finite"));
        }
        let pose = *scene.agent_pose();
        let rotated = pose.with_yaw(pose.yaw + delta_yaw);

        let Some(held) = scene.held().copied() else {
            return ActionResult::ok_with(ActionPayload::Pose(rotated));
        };
        let Some(checks) = self.rotation_checks.as_ref().filter(|c| c.matches(&held)) else {
            log::warn!(
                "MotionValidator: rotation checks are stale for {}; call refresh_rotation_checks",
                held.object
            );
            return ActionResult::fail(FailureReason::invalid(
                "rotation checks are stale or missing",
            ));
        };

        let frame = pose.frame();
        let shape = checks.shape();
        let mask = QueryMask::solids().ignoring_object(held.object);
        for volume in checks.volumes_for(delta_yaw) {
            let world = frame.mul_transform(&volume.local);
            if let Some(hit) = CollisionOracle::overlap(scene, &shape, &world, &mask).first() {
                log::trace!(
                    "MotionValidator: rotation blocked at {:+.0} degrees by {:?}",
                    volume.angle,
                    hit.object
                );
                return ActionResult::fail(FailureReason::obstruction(hit));
            }
        }
        ActionResult::ok_with(ActionPayload::Pose(rotated))
    }

    /// Recompute rotation volumes for the current held object (or clear them)
    pub fn refresh_rotation_checks(&mut self, scene: &Scene) {
        let increment = self.config.interaction.rotation_check_increment;
        self.rotation_checks = scene.held().and_then(|held| {
            match RotationChecks::compute(scene, held, increment) {
                Ok(checks) => Some(checks),
                Err(e) => {
                    log::warn!("MotionValidator: cannot compute rotation checks: {}", e);
                    None
                }
            }
        });
    }

    /// Move the agent to `target`. With `force` the pose is committed
    /// unchecked; otherwise it is applied provisionally and rolled back on
    /// overlap.
    pub fn can_teleport(&self, scene: &mut Scene, target: Pose, force: bool) -> ActionResult {
        if force {
            scene.set_agent_pose(target);
            log::debug!("MotionValidator: forced teleport to {:?}", target.position);
            return ActionResult::ok_with(ActionPayload::Pose(target));
        }

        if !target.position.is_finite() || !scene.bounds().contains(target.position) {
            return ActionResult::fail(FailureReason::OutOfBounds {
                position: target.position,
            });
        }

        let snapshot = scene.snapshot_agent();
        scene.set_agent_pose(target);

        if let Some(reason) = self.placement_obstruction(scene) {
            scene.restore_agent(&snapshot);
            log::debug!("MotionValidator: teleport to {:?} rolled back", target.position);
            return ActionResult::fail(reason);
        }

        log::debug!("MotionValidator: teleported to {:?}", target.position);
        ActionResult::ok_with(ActionPayload::Pose(target))
    }

    /// Overlap of the agent capsule or held object at their current poses
    fn placement_obstruction(&self, scene: &Scene) -> Option<FailureReason> {
        let pose = *scene.agent_pose();
        let held = scene.held().copied();

        let mut agent_mask = QueryMask::solids();
        if let Some(held) = &held {
            agent_mask = agent_mask.ignoring_object(held.object);
        }
        let capsule = scene.agent().capsule;
        if let Some(hit) = CollisionOracle::overlap(
            scene,
            &capsule,
            &Transform::from_translation(pose.position),
            &agent_mask,
        )
        .first()
        {
            return Some(FailureReason::obstruction(hit));
        }

        let held = held?;
        let held_mask = QueryMask::solids().ignoring_object(held.object);
        self.held_geometry(scene, &held, &pose.frame())
            .into_iter()
            .find_map(|(shape, world)| {
                CollisionOracle::overlap(scene, &shape, &world, &held_mask)
                    .first()
                    .map(FailureReason::obstruction)
            })
    }

    /// Move the held object to `target` (world position of its origin)
    pub fn can_move_hand(&self, scene: &Scene, target: Vec3) -> ActionResult {
        let Some(held) = scene.held().copied() else {
            return ActionResult::fail(FailureReason::invalid("no object is held"));
        };
        if !target.is_finite() {
            return ActionResult::fail(FailureReason::invalid("hand target is not finite"));
        }

        let pose = *scene.agent_pose();
        let camera = self.camera_for(&pose);
        if !(target.distance(camera.eye) < self.config.interaction.reach_distance) {
            return ActionResult::fail(FailureReason::OutOfReach);
        }
        if !camera.in_viewport(target) {
            return ActionResult::fail(FailureReason::OutOfReach);
        }

        let frame = pose.frame();
        let current = held.world_transform(&frame);
        let shift = target - current.translation;

        let sight_mask = QueryMask::solids().ignoring_object(held.object);
        let points = match scene.visibility_points(held.object) {
            Ok(points) => points,
            Err(e) => return ActionResult::fail(FailureReason::invalid(e.to_string())),
        };
        let still_visible = points.iter().map(|p| *p + shift).any(|p| {
            camera.in_viewport(p) && self.visibility.line_of_sight(scene, camera.eye, p, &sight_mask)
        });
        if !still_visible {
            return ActionResult::fail(FailureReason::NotInteractable);
        }

        let distance = shift.length();
        if distance > f32::EPSILON {
            let mask = QueryMask::solids().ignoring_object(held.object);
            for (shape, pose) in self.held_geometry(scene, &held, &frame) {
                let hits = CollisionOracle::sweep(scene, &shape, &pose, shift, distance, &mask);
                if let Some(hit) = hits.first() {
                    return ActionResult::fail(FailureReason::obstruction(&hit.collider));
                }
            }
        }

        let moved = Transform::new(target, current.rotation);
        let local = frame.inverse().mul_transform(&moved);
        ActionResult::ok_with(ActionPayload::HeldLocal(local))
    }

    /// Whether the held object would fit with the agent at `position` facing
    /// `yaw`. Trivially true with an empty hand.
    pub fn can_fit_held_object(&self, scene: &Scene, position: Vec3, yaw: f32) -> bool {
        let Some(held) = scene.held().copied() else {
            return true;
        };
        let frame = Transform::from_yaw(position, yaw);
        let mask = QueryMask::solids().ignoring_object(held.object);
        self.held_geometry(scene, &held, &frame)
            .iter()
            .all(|(shape, world)| CollisionOracle::overlap(scene, shape, world, &mask).is_empty())
    }

    /// World poses of the held object's solid colliders for an agent frame
    fn held_geometry(&self, scene: &Scene, held: &HeldObject, frame: &Transform) -> Vec<(Shape, Transform)> {
        let object = held.world_transform(frame);
        match scene.object_colliders(held.object) {
            Ok(colliders) => colliders
                .into_iter()
                .filter(|(_, _, category)| !category.contains(ColliderCategory::TRIGGER))
                .map(|(shape, local, _)| (shape, object.mul_transform(&local)))
                .collect(),
            Err(_) => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::{ObjectSpec, SceneBounds};

    fn room() -> Scene {
        let config = EngineConfig::default();
        let bounds = SceneBounds::new(Vec3::new(-3.0, -1.0, -3.0), Vec3::new(3.0, 3.0, 3.0));
        let pose = Pose::new(Vec3::new(0.0, 0.46, 0.0), 0.0);
        let mut scene = Scene::new(bounds, pose, &config.agent, config.settle.timestep);
        scene
            .add_floor(
                Shape::cuboid(Vec3::new(3.0, 0.1, 3.0)),
                Transform::from_translation(Vec3::new(0.0, -0.1, 0.0)),
            )
            .unwrap();
        scene
    }

    #[test]
    fn test_translate_free_space() {
        let scene = room();
        let validator = MotionValidator::new(EngineConfig::default());
        let result = validator.can_translate(&scene, Vec3::Z, 0.25);
        assert!(result.success);
        match result.payload {
            Some(ActionPayload::Pose(pose)) => assert!((pose.position.z - 0.25).abs() < 1e-6),
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn test_translate_out_of_bounds() {
        let scene = room();
        let validator = MotionValidator::new(EngineConfig::default());
        let result = validator.can_translate(&scene, Vec3::X, 10.0);
        assert!(matches!(result.failure, Some(FailureReason::OutOfBounds { .. })));
    }

    #[test]
    fn test_translate_blocked_by_box() {
        let mut scene = room();
        let id = scene
            .add_object(ObjectSpec::boxed("Crate", Vec3::new(0.0, 0.3, 0.6), Vec3::splat(0.2)))
            .unwrap();
        let validator = MotionValidator::new(EngineConfig::default());

        assert!(validator.can_translate(&scene, Vec3::Z, 0.1).success);
        let result = validator.can_translate(&scene, Vec3::Z, 0.25);
        assert_eq!(
            result.failure,
            Some(FailureReason::Obstruction {
                object: Some(id),
                category: ColliderCategory::OBJECT
            })
        );
    }

    #[test]
    fn test_skin_width_counts() {
        let mut scene = room();
        // Gap between capsule and crate is 0.255: a 0.25 move plus skin 0.01 touches
        scene
            .add_object(ObjectSpec::boxed("Crate", Vec3::new(0.0, 0.3, 0.655), Vec3::splat(0.2)))
            .unwrap();
        let validator = MotionValidator::new(EngineConfig::default());
        assert!(!validator.can_translate(&scene, Vec3::Z, 0.25).success);
        assert!(validator.can_translate(&scene, Vec3::Z, 0.2).success);
    }

    #[test]
    fn test_rotate_without_held_object() {
        let scene = room();
        let validator = MotionValidator::new(EngineConfig::default());
        let result = validator.can_rotate(&scene, 90.0);
        assert!(result.success);
    }

    #[test]
    fn test_rotate_requires_fresh_checks() {
        let mut scene = room();
        let id = scene
            .add_object(ObjectSpec::boxed("Cup", Vec3::new(0.0, 0.6, 0.5), Vec3::splat(0.05)))
            .unwrap();
        scene
            .attach_held(id, Transform::from_translation(Vec3::new(0.0, 0.1, 0.4)))
            .unwrap();

        let mut validator = MotionValidator::new(EngineConfig::default());
        assert!(matches!(
            validator.can_rotate(&scene, 90.0).failure,
            Some(FailureReason::InvalidState(_))
        ));

        validator.refresh_rotation_checks(&scene);
        assert!(validator.can_rotate(&scene, 90.0).success);
    }

    #[test]
    fn test_rotate_blocked_by_obstacle_at_side() {
        let mut scene = room();
        let cup = scene
            .add_object(ObjectSpec::boxed("Cup", Vec3::new(0.0, 0.6, 0.5), Vec3::splat(0.05)))
            .unwrap();
        let pillar = scene
            .add_object(ObjectSpec::boxed("Pillar", Vec3::new(0.4, 0.5, 0.0), Vec3::new(0.1, 0.5, 0.1)))
            .unwrap();
        scene
            .attach_held(cup, Transform::from_translation(Vec3::new(0.0, 0.1, 0.4)))
            .unwrap();

        let mut validator = MotionValidator::new(EngineConfig::default());
        validator.refresh_rotation_checks(&scene);

        // the cup orbits to +X when turning by +90 and sweeps into the pillar
        let result = validator.can_rotate(&scene, 90.0);
        assert_eq!(
            result.failure,
            Some(FailureReason::Obstruction {
                object: Some(pillar),
                category: ColliderCategory::OBJECT
            })
        );
        assert!(validator.can_rotate(&scene, -90.0).success);
    }

    #[test]
    fn test_forced_teleport_ignores_geometry() {
        let mut scene = room();
        scene
            .add_object(ObjectSpec::boxed("Crate", Vec3::new(1.0, 0.3, 1.0), Vec3::splat(0.3)))
            .unwrap();
        let validator = MotionValidator::new(EngineConfig::default());
        let target = Pose::new(Vec3::new(1.0, 0.46, 1.0), 0.0);

        assert!(!validator.can_teleport(&mut scene, target, false).success);
        assert!(validator.can_teleport(&mut scene, target, true).success);
        assert_eq!(scene.agent_pose().position, target.position);
    }

    #[test]
    fn test_move_hand_requires_held_object() {
        let scene = room();
        let validator = MotionValidator::new(EngineConfig::default());
        let result = validator.can_move_hand(&scene, Vec3::new(0.0, 0.6, 0.5));
        assert!(matches!(result.failure, Some(FailureReason::InvalidState(_))));
    }

    #[test]
    fn test_move_hand_reach_and_obstruction() {
        let mut scene = room();
        let cup = scene
            .add_object(ObjectSpec::boxed("Cup", Vec3::new(0.0, 0.6, 0.5), Vec3::splat(0.05)))
            .unwrap();
        scene
            .add_object(ObjectSpec::boxed("Shelf", Vec3::new(0.3, 0.6, 0.5), Vec3::new(0.05, 0.2, 0.1)))
            .unwrap();
        scene
            .attach_held(cup, Transform::from_translation(Vec3::new(0.0, 0.14, 0.5)))
            .unwrap();
        let validator = MotionValidator::new(EngineConfig::default());

        let far = validator.can_move_hand(&scene, Vec3::new(0.0, 0.6, 2.0));
        assert_eq!(far.failure, Some(FailureReason::OutOfReach));

        let behind = validator.can_move_hand(&scene, Vec3::new(0.0, 0.6, -0.5));
        assert_eq!(behind.failure, Some(FailureReason::OutOfReach));

        let blocked = validator.can_move_hand(&scene, Vec3::new(0.45, 0.6, 0.5));
        assert!(matches!(blocked.failure, Some(FailureReason::Obstruction { .. })));

        let ok = validator.can_move_hand(&scene, Vec3::new(-0.2, 0.6, 0.5));
        assert!(ok.success);
        assert!(matches!(ok.payload, Some(ActionPayload::HeldLocal(_))));
    }

    #[test]
    fn test_fit_held_object() {
        let mut scene = room();
        let cup = scene
            .add_object(ObjectSpec::boxed("Cup", Vec3::new(0.0, 0.6, 0.5), Vec3::splat(0.05)))
            .unwrap();
        scene
            .add_object(ObjectSpec::boxed("Wall", Vec3::new(2.0, 0.5, 1.5), Vec3::new(0.5, 0.5, 0.05)))
            .unwrap();
        let validator = MotionValidator::new(EngineConfig::default());
        assert!(validator.can_fit_held_object(&scene, Vec3::new(2.0, 0.46, 1.0), 0.0));

        scene
            .attach_held(cup, Transform::from_translation(Vec3::new(0.0, 0.14, 0.5)))
            .unwrap();
        assert!(!validator.can_fit_held_object(&scene, Vec3::new(2.0, 0.46, 1.0), 0.0));
        assert!(validator.can_fit_held_object(&scene, Vec3::new(2.0, 0.46, 1.0), 180.0));
    }
}
