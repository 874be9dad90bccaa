//! Precomputed sweep volumes for rotating while holding an object
//!
//! The held object's bounding box (in the agent frame) is copied at fixed
//! angular increments around the agent's vertical axis. Rotating by a delta
//! is legal when every copy between the current and target yaw is free.

use glam::Vec3;

use crate::entity::HeldObject;
use crate::error::{Result, SceneError};
use crate::math::Transform;
use crate::world::{ColliderCategory, ObjectId, Scene, Shape};

#[derive(Debug, Clone, PartialEq)]
pub struct RotationVolume {
    /// Signed yaw offset from the current heading, degrees
    pub angle: f32,
    /// Box pose relative to the agent frame
    pub local: Transform,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RotationChecks {
    object: ObjectId,
    held_local: Transform,
    increment: f32,
    half_extents: Vec3,
    /// Volumes at +increment, +2*increment, ... (a full turn)
    positive: Vec<RotationVolume>,
    /// Volumes at -increment, -2*increment, ...
    negative: Vec<RotationVolume>,
}

impl RotationChecks {
    pub fn compute(scene: &Scene, held: &HeldObject, increment: f32) -> Result<Self> {
        if !(increment.is_finite() && increment > 0.0) {
            return Err(SceneError::Description(format!(
                "rotation check increment must be positive, got {increment}"
            )));
        }

        let (min, max) = held_bounds(scene, held)?;
        let center = (min + max) * 0.5;
        let half_extents = ((max - min) * 0.5).max(Vec3::splat(1e-3));
        let count = (360.0 / increment).ceil() as usize;

        let volume = |angle: f32| RotationVolume {
            angle,
            local: Transform::from_yaw(Vec3::ZERO, angle)
                .mul_transform(&Transform::from_translation(center)),
        };
        let positive = (1..=count).map(|k| volume(k as f32 * increment)).collect();
        let negative = (1..=count).map(|k| volume(-(k as f32) * increment)).collect();

        log::debug!(
            "RotationChecks: {} volumes per side for {} (half extents {:?})",
            count,
            held.object,
            half_extents
        );

        Ok(Self {
            object: held.object,
            held_local: held.local,
            increment,
            half_extents,
            positive,
            negative,
        })
    }

    /// Whether these checks were computed for exactly this held state
    pub fn matches(&self, held: &HeldObject) -> bool {
        self.object == held.object && self.held_local == held.local
    }

    pub fn object(&self) -> ObjectId {
        self.object
    }

    pub fn shape(&self) -> Shape {
        Shape::cuboid(self.half_extents)
    }

    /// Volumes crossed when turning by `delta_yaw`, nearest first
    pub fn volumes_for(&self, delta_yaw: f32) -> &[RotationVolume] {
        let volumes = if delta_yaw >= 0.0 {
            &self.positive
        } else {
            &self.negative
        };
        let needed = (delta_yaw.abs() / self.increment).ceil() as usize;
        &volumes[..needed.min(volumes.len())]
    }
}

/// Bounding box of the held object's solid colliders, agent frame
fn held_bounds(scene: &Scene, held: &HeldObject) -> Result<(Vec3, Vec3)> {
    let mut min = Vec3::splat(f32::INFINITY);
    let mut max = Vec3::splat(f32::NEG_INFINITY);

    for (shape, local, category) in scene.object_colliders(held.object)? {
        if category.contains(ColliderCategory::TRIGGER) {
            continue;
        }
        let (lo, hi) = shape.bounds(&held.local.mul_transform(&local));
        min = min.min(lo);
        max = max.max(hi);
    }

    if min.is_finite() && max.is_finite() {
        Ok((min, max))
    } else {
        Err(SceneError::Description(format!(
            "held object {} has no solid colliders",
            held.object
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AgentConfig;
    use crate::entity::Pose;
    use crate::world::{ObjectSpec, SceneBounds};

    fn holding_scene() -> (Scene, HeldObject) {
        let bounds = SceneBounds::new(Vec3::new(-5.0, -1.0, -5.0), Vec3::new(5.0, 3.0, 5.0));
        let pose = Pose::new(Vec3::new(0.0, 0.46, 0.0), 0.0);
        let mut scene = Scene::new(bounds, pose, &AgentConfig::default(), 1.0 / 60.0);
        let id = scene
            .add_object(ObjectSpec::boxed("Tray", Vec3::new(0.0, 0.5, 0.5), Vec3::new(0.2, 0.02, 0.1)))
            .unwrap();
        let local = Transform::from_translation(Vec3::new(0.0, 0.1, 0.5));
        scene.attach_held(id, local).unwrap();
        let held = *scene.held().unwrap();
        (scene, held)
    }

    #[test]
    fn test_volume_count_matches_delta() {
        let (scene, held) = holding_scene();
        let checks = RotationChecks::compute(&scene, &held, 15.0).unwrap();
        assert_eq!(checks.volumes_for(90.0).len(), 6);
        assert_eq!(checks.volumes_for(-20.0).len(), 2);
        assert!(checks.volumes_for(-20.0)[1].angle < 0.0);
        assert!(checks.volumes_for(0.0).is_empty());
    }

    #[test]
    fn test_volumes_orbit_agent() {
        let (scene, held) = holding_scene();
        let checks = RotationChecks::compute(&scene, &held, 15.0).unwrap();
        let quarter = &checks.volumes_for(90.0)[5];
        assert!((quarter.angle - 90.0).abs() < 1e-5);
        // held box centre (0, 0.1, 0.5) turned a quarter to +X
        assert!((quarter.local.translation - Vec3::new(0.5, 0.1, 0.0)).length() < 1e-4);
        assert!(checks.shape().is_valid());
    }

    #[test]
    fn test_staleness_detection() {
        let (scene, mut held) = holding_scene();
        let checks = RotationChecks::compute(&scene, &held, 15.0).unwrap();
        assert!(checks.matches(&held));
        held.local = Transform::from_translation(Vec3::new(0.0, 0.2, 0.5));
        assert!(!checks.matches(&held));
    }

    #[test]
    fn test_invalid_increment() {
        let (scene, held) = holding_scene();
        assert!(RotationChecks::compute(&scene, &held, 0.0).is_err());
    }
}
