//! Collision oracle: overlap, sweep and ray queries against the scene
//!
//! All queries are pure. Exclusions are expressed through a [`QueryMask`]
//! evaluated as a rapier query predicate; collider state is never toggled.

use std::cmp::Ordering;

use glam::Vec3;
use rapier3d::parry::bounding_volume::BoundingVolume;
use rapier3d::parry::query::time_of_impact;
use rapier3d::prelude::{Collider, ColliderHandle, QueryFilter, Ray, Vector};
use smallvec::SmallVec;

use super::object::{ColliderCategory, ColliderEntry, ObjectId};
use super::scene::Scene;
use super::shape::Shape;
use crate::math::{Transform, from_vector, to_point, to_vector};

/// Explicit filter passed to every query
#[derive(Debug, Clone, Default)]
pub struct QueryMask {
    /// Categories that never produce hits
    pub exclude: ColliderCategory,
    pub ignore_objects: SmallVec<[ObjectId; 4]>,
    pub ignore_colliders: SmallVec<[ColliderHandle; 8]>,
}

impl QueryMask {
    /// Every registered collider
    pub fn all() -> Self {
        Self::default()
    }

    /// Solid geometry other than the agent
    pub fn solids() -> Self {
        Self::default().exclude_category(ColliderCategory::AGENT | ColliderCategory::TRIGGER)
    }

    /// Only colliders of the given categories
    pub fn only(categories: ColliderCategory) -> Self {
        Self::default().exclude_category(ColliderCategory::all().difference(categories))
    }

    pub fn exclude_category(mut self, category: ColliderCategory) -> Self {
        self.exclude |= category;
        self
    }

    pub fn include_category(mut self, category: ColliderCategory) -> Self {
        self.exclude.remove(category);
        self
    }

    pub fn ignoring_object(mut self, object: ObjectId) -> Self {
        if !self.ignore_objects.contains(&object) {
            self.ignore_objects.push(object);
        }
        self
    }

    pub fn ignoring_objects(mut self, objects: impl IntoIterator<Item = ObjectId>) -> Self {
        for object in objects {
            self = self.ignoring_object(object);
        }
        self
    }

    pub fn ignoring_colliders(mut self, colliders: impl IntoIterator<Item = ColliderHandle>) -> Self {
        for collider in colliders {
            if !self.ignore_colliders.contains(&collider) {
                self.ignore_colliders.push(collider);
            }
        }
        self
    }

    /// Whether a registered collider may produce a hit
    pub fn accepts(&self, handle: ColliderHandle, entry: &ColliderEntry) -> bool {
        if self.exclude.intersects(entry.category) {
            return false;
        }
        if self.ignore_colliders.contains(&handle) {
            return false;
        }
        match entry.owner {
            Some(owner) => !self.ignore_objects.contains(&owner),
            None => true,
        }
    }
}

/// A collider touched by a query, resolved through the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColliderRef {
    pub handle: ColliderHandle,
    pub object: Option<ObjectId>,
    pub category: ColliderCategory,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepHit {
    pub collider: ColliderRef,
    /// Distance travelled before first contact (0 when already overlapping)
    pub distance: f32,
    /// Surface normal of the obstacle at the contact, world space
    pub normal: Vec3,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub collider: ColliderRef,
    pub distance: f32,
    pub point: Vec3,
}

pub struct CollisionOracle;

impl CollisionOracle {
    /// Colliders overlapping `shape` placed at `pose`, ordered by handle
    pub fn overlap(scene: &Scene, shape: &Shape, pose: &Transform, mask: &QueryMask) -> Vec<ColliderRef> {
        if !shape.is_valid() {
            return Vec::new();
        }

        let physics = scene.physics();
        let shared = shape.to_shared();
        let predicate = |handle: ColliderHandle, _: &Collider| Self::accepts(scene, mask, handle);
        let filter = QueryFilter::new().predicate(&predicate);

        let mut hits = Vec::new();
        physics.query_pipeline().intersections_with_shape(
            physics.bodies(),
            physics.colliders(),
            &pose.to_isometry(),
            &*shared,
            filter,
            |handle| {
                if let Some(hit) = Self::resolve(scene, handle) {
                    hits.push(hit);
                }
                true
            },
        );
        hits.sort_by_key(|hit| hit.handle.into_raw_parts());
        hits
    }

    /// Every collider `shape` touches while moving from `pose` along
    /// `direction` for `max_distance`, sorted by ascending distance
    pub fn sweep(
        scene: &Scene,
        shape: &Shape,
        pose: &Transform,
        direction: Vec3,
        max_distance: f32,
        mask: &QueryMask,
    ) -> Vec<SweepHit> {
        let Some(dir) = unit_direction(direction) else {
            return Vec::new();
        };
        if !shape.is_valid() || !max_distance.is_finite() || max_distance <= 0.0 {
            return Vec::new();
        }

        let physics = scene.physics();
        let shared = shape.to_shared();
        let start = pose.to_isometry();
        let end = Transform::new(pose.translation + dir * max_distance, pose.rotation).to_isometry();
        let swept = shared.compute_aabb(&start).merged(&shared.compute_aabb(&end));

        let mut candidates: Vec<ColliderHandle> = Vec::new();
        physics
            .query_pipeline()
            .colliders_with_aabb_intersecting_aabb(&swept, |handle| {
                candidates.push(*handle);
                true
            });

        let velocity = to_vector(dir);
        let mut hits = Vec::new();
        for handle in candidates {
            if !Self::accepts(scene, mask, handle) {
                continue;
            }
            let (Some(collider), Some(hit)) = (physics.collider(handle), Self::resolve(scene, handle))
            else {
                continue;
            };

            match time_of_impact(
                &start,
                &velocity,
                &*shared,
                collider.position(),
                &Vector::zeros(),
                collider.shape(),
                max_distance,
                true,
            ) {
                Ok(Some(toi)) if toi.toi <= max_distance => {
                    let normal = collider.position().rotation * toi.normal2.into_inner();
                    hits.push(SweepHit {
                        collider: hit,
                        distance: toi.toi,
                        normal: from_vector(&normal),
                    });
                }
                Ok(_) => {}
                Err(_) => {
                    log::trace!("Collision: unsupported sweep pair against {:?}", handle);
                }
            }
        }

        hits.sort_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then_with(|| cmp_handles(a.collider.handle, b.collider.handle))
        });
        hits
    }

    /// All ray hits up to `max_distance`, sorted by ascending distance
    pub fn raycast_all(
        scene: &Scene,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        mask: &QueryMask,
    ) -> Vec<RayHit> {
        let Some(dir) = unit_direction(direction) else {
            return Vec::new();
        };
        if !max_distance.is_finite() || max_distance <= 0.0 {
            return Vec::new();
        }

        let physics = scene.physics();
        let ray = Ray::new(to_point(origin), to_vector(dir));
        let predicate = |handle: ColliderHandle, _: &Collider| Self::accepts(scene, mask, handle);
        let filter = QueryFilter::new().predicate(&predicate);

        let mut hits = Vec::new();
        physics.query_pipeline().intersections_with_ray(
            physics.bodies(),
            physics.colliders(),
            &ray,
            max_distance,
            true,
            filter,
            |handle, intersection| {
                if let Some(collider) = Self::resolve(scene, handle) {
                    hits.push(RayHit {
                        collider,
                        distance: intersection.toi,
                        point: origin + dir * intersection.toi,
                    });
                }
                true
            },
        );

        hits.sort_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then_with(|| cmp_handles(a.collider.handle, b.collider.handle))
        });
        hits
    }

    /// Nearest ray hit, if any
    pub fn raycast(
        scene: &Scene,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        mask: &QueryMask,
    ) -> Option<RayHit> {
        let dir = unit_direction(direction)?;
        if !max_distance.is_finite() || max_distance <= 0.0 {
            return None;
        }

        let physics = scene.physics();
        let ray = Ray::new(to_point(origin), to_vector(dir));
        let predicate = |handle: ColliderHandle, _: &Collider| Self::accepts(scene, mask, handle);
        let filter = QueryFilter::new().predicate(&predicate);

        let (handle, toi) = physics.query_pipeline().cast_ray(
            physics.bodies(),
            physics.colliders(),
            &ray,
            max_distance,
            true,
            filter,
        )?;
        Some(RayHit {
            collider: Self::resolve(scene, handle)?,
            distance: toi,
            point: origin + dir * toi,
        })
    }

    /// Whether a floor collider lies within `probe_distance` below `point`
    pub fn has_floor_below(scene: &Scene, point: Vec3, probe_distance: f32) -> bool {
        Self::raycast(
            scene,
            point,
            Vec3::NEG_Y,
            probe_distance,
            &QueryMask::only(ColliderCategory::FLOOR),
        )
        .is_some()
    }

    fn accepts(scene: &Scene, mask: &QueryMask, handle: ColliderHandle) -> bool {
        scene
            .entry(handle)
            .is_some_and(|entry| mask.accepts(handle, entry))
    }

    fn resolve(scene: &Scene, handle: ColliderHandle) -> Option<ColliderRef> {
        let entry = scene.entry(handle)?;
        Some(ColliderRef {
            handle,
            object: entry.owner,
            category: entry.category,
        })
    }
}

fn unit_direction(direction: Vec3) -> Option<Vec3> {
    let length = direction.length();
    if length.is_finite() && length > f32::EPSILON {
        Some(direction / length)
    } else {
        None
    }
}

fn cmp_handles(a: ColliderHandle, b: ColliderHandle) -> Ordering {
    a.into_raw_parts().cmp(&b.into_raw_parts())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AgentConfig;
    use crate::entity::Pose;
    use crate::world::{ObjectSpec, SceneBounds};

    fn scene_with_floor() -> Scene {
        let bounds = SceneBounds::new(Vec3::new(-5.0, -1.0, -5.0), Vec3::new(5.0, 3.0, 5.0));
        let pose = Pose::new(Vec3::new(0.0, 0.46, 0.0), 0.0);
        let mut scene = Scene::new(bounds, pose, &AgentConfig::default(), 1.0 / 60.0);
        scene
            .add_floor(
                Shape::cuboid(Vec3::new(5.0, 0.1, 5.0)),
                Transform::from_translation(Vec3::new(0.0, -0.1, 0.0)),
            )
            .unwrap();
        scene
    }

    #[test]
    fn test_overlap_respects_category_mask() {
        let scene = scene_with_floor();
        let probe = Shape::sphere(0.3);
        let at_agent = Transform::from_translation(Vec3::new(0.0, 0.46, 0.0));

        let all = CollisionOracle::overlap(&scene, &probe, &at_agent, &QueryMask::all());
        assert!(all.iter().any(|hit| hit.category == ColliderCategory::AGENT));

        let solids = CollisionOracle::overlap(&scene, &probe, &at_agent, &QueryMask::solids());
        assert!(solids.is_empty());
    }

    #[test]
    fn test_sweep_hits_sorted_by_distance() {
        let mut scene = scene_with_floor();
        let near = scene
            .add_object(ObjectSpec::boxed("Near", Vec3::new(0.0, 0.5, 1.0), Vec3::splat(0.1)))
            .unwrap();
        let far = scene
            .add_object(ObjectSpec::boxed("Far", Vec3::new(0.0, 0.5, 2.0), Vec3::splat(0.1)))
            .unwrap();

        let hits = CollisionOracle::sweep(
            &scene,
            &Shape::sphere(0.1),
            &Transform::from_translation(Vec3::new(0.0, 0.5, 0.0)),
            Vec3::Z,
            3.0,
            &QueryMask::solids().exclude_category(ColliderCategory::FLOOR),
        );

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].collider.object, Some(near));
        assert_eq!(hits[1].collider.object, Some(far));
        assert!((hits[0].distance - 0.8).abs() < 1e-3);
        assert!(hits[0].normal.z < -0.9);
    }

    #[test]
    fn test_sweep_ignores_masked_object() {
        let mut scene = scene_with_floor();
        let id = scene
            .add_object(ObjectSpec::boxed("Box", Vec3::new(0.0, 0.5, 1.0), Vec3::splat(0.1)))
            .unwrap();

        let mask = QueryMask::solids()
            .exclude_category(ColliderCategory::FLOOR)
            .ignoring_object(id);
        let hits = CollisionOracle::sweep(
            &scene,
            &Shape::sphere(0.1),
            &Transform::from_translation(Vec3::new(0.0, 0.5, 0.0)),
            Vec3::Z,
            3.0,
            &mask,
        );
        assert!(hits.is_empty());
    }

    #[test]
    fn test_degenerate_queries_return_empty() {
        let scene = scene_with_floor();
        let pose = Transform::from_translation(Vec3::new(0.0, 0.5, 0.0));
        let mask = QueryMask::all();

        assert!(CollisionOracle::sweep(&scene, &Shape::sphere(0.1), &pose, Vec3::ZERO, 1.0, &mask).is_empty());
        assert!(CollisionOracle::sweep(&scene, &Shape::sphere(0.1), &pose, Vec3::Z, 0.0, &mask).is_empty());
        assert!(CollisionOracle::sweep(&scene, &Shape::sphere(-0.1), &pose, Vec3::Z, 1.0, &mask).is_empty());
        assert!(CollisionOracle::overlap(&scene, &Shape::sphere(0.0), &pose, &mask).is_empty());
    }

    #[test]
    fn test_raycast_all_orders_hits() {
        let mut scene = scene_with_floor();
        scene
            .add_object(ObjectSpec::boxed("A", Vec3::new(0.0, 0.5, 2.0), Vec3::splat(0.1)))
            .unwrap();
        scene
            .add_object(ObjectSpec::boxed("B", Vec3::new(0.0, 0.5, 1.0), Vec3::splat(0.1)))
            .unwrap();

        let hits = CollisionOracle::raycast_all(
            &scene,
            Vec3::new(0.0, 0.5, 0.0),
            Vec3::Z,
            5.0,
            &QueryMask::solids(),
        );
        assert_eq!(hits.len(), 2);
        assert!(hits[0].distance < hits[1].distance);
        assert!((hits[0].distance - 0.9).abs() < 1e-4);
    }

    #[test]
    fn test_floor_probe() {
        let scene = scene_with_floor();
        assert!(CollisionOracle::has_floor_below(&scene, Vec3::new(1.0, 0.46, 1.0), 2.0));
        assert!(!CollisionOracle::has_floor_below(&scene, Vec3::new(6.0, 0.46, 1.0), 2.0));
    }
}
