//! Occlusion-aware visibility of objects from the agent camera
//!
//! An object is visible when at least one of its visibility points projects
//! inside the viewport, lies strictly closer than the view distance (XZ
//! plane) and can be reached by a ray from the eye. See-through objects along
//! the ray are skipped; reaching the object through one makes it visible but
//! not interactable.

use glam::Vec3;

use super::camera::Camera;
use crate::config::VisibilityConfig;
use crate::error::{Result, SceneError};
use crate::math::Transform;
use crate::world::{ColliderCategory, CollisionOracle, ObjectId, QueryMask, RayHit, Scene, Shape};

/// Outcome for a single object
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Visibility {
    pub visible: bool,
    /// Reached without passing through a see-through object
    pub interactable: bool,
    /// Indices of the visibility points that resolved visible
    pub visible_points: Vec<usize>,
}

impl Visibility {
    pub fn hidden() -> Self {
        Self::default()
    }
}

/// Result of walking a ray's hits towards a candidate object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RayWalk {
    Reached { through_see_through: bool },
    Blocked,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VisibleObject {
    pub object: ObjectId,
    /// Eye to object origin
    pub distance: f32,
    pub visibility: Visibility,
}

/// Scene-wide visibility result, built fresh per query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VisibleSet {
    /// Visible objects by ascending distance from the eye
    pub objects: Vec<VisibleObject>,
    /// Objects skipped because they have no visibility points
    pub misconfigured: Vec<ObjectId>,
}

impl VisibleSet {
    pub fn contains(&self, object: ObjectId) -> bool {
        self.objects.iter().any(|entry| entry.object == object)
    }

    pub fn ids(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.objects.iter().map(|entry| entry.object)
    }

    pub fn interactable(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.objects
            .iter()
            .filter(|entry| entry.visibility.interactable)
            .map(|entry| entry.object)
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct VisibilityOracle {
    config: VisibilityConfig,
}

impl VisibilityOracle {
    pub fn new(config: VisibilityConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &VisibilityConfig {
        &self.config
    }

    /// Visibility of one object from `camera`.
    ///
    /// Fails only for objects that cannot be evaluated (unknown id, no
    /// visibility points).
    pub fn is_visible(
        &self,
        scene: &Scene,
        object: ObjectId,
        camera: &Camera,
        max_distance: f32,
    ) -> Result<Visibility> {
        let spatial = scene.object(object)?;
        if spatial.visibility_points.is_empty() {
            return Err(SceneError::NoVisibilityPoints {
                id: object,
                name: spatial.name.clone(),
            });
        }

        let points = scene.visibility_points(object)?;
        let mut result = Visibility::hidden();

        for (index, point) in points.iter().enumerate() {
            let Some(interactable) = self.point_visibility(scene, object, *point, camera, max_distance)
            else {
                continue;
            };

            result.visible = true;
            result.interactable |= interactable;
            result.visible_points.push(index);

            if result.interactable && !self.config.enumerate_all_points {
                break;
            }
        }

        log::trace!(
            "Visibility: {} visible={} interactable={} points={:?}",
            object,
            result.visible,
            result.interactable,
            result.visible_points
        );
        Ok(result)
    }

    /// `Some(interactable)` when `point` resolves visible for `object`
    pub fn point_visibility(
        &self,
        scene: &Scene,
        object: ObjectId,
        point: Vec3,
        camera: &Camera,
        max_distance: f32,
    ) -> Option<bool> {
        if !camera.in_viewport(point) {
            return None;
        }
        if !(camera.planar_distance(point) < max_distance) {
            return None;
        }

        let to_point = point - camera.eye;
        let ray_length = to_point.length() + self.config.ray_slack;

        let mask = self.occluder_mask(scene, object);
        match self.walk(scene, object, camera.eye, to_point, ray_length, &mask, false) {
            RayWalk::Reached {
                through_see_through,
            } => return Some(!through_see_through),
            RayWalk::Blocked => {}
        }

        if self.config.trigger_pass {
            let mask = mask.include_category(ColliderCategory::TRIGGER);
            if let RayWalk::Reached {
                through_see_through,
            } = self.walk(scene, object, camera.eye, to_point, ray_length, &mask, true)
            {
                return Some(!through_see_through);
            }
        }
        None
    }

    /// Whether the straight segment `from -> to` is free of opaque geometry
    pub fn line_of_sight(&self, scene: &Scene, from: Vec3, to: Vec3, mask: &QueryMask) -> bool {
        let delta = to - from;
        let length = delta.length();
        if length <= f32::EPSILON {
            return true;
        }
        CollisionOracle::raycast_all(scene, from, delta, length, mask)
            .iter()
            .all(|hit| Self::is_see_through(scene, hit))
    }

    /// Every object within `max_distance` of `center`, evaluated and sorted
    /// by distance from the eye
    pub fn visible_objects(
        &self,
        scene: &Scene,
        camera: &Camera,
        center: Vec3,
        max_distance: f32,
    ) -> VisibleSet {
        let mut set = VisibleSet::default();

        for object in self.candidates(scene, center, max_distance) {
            match self.is_visible(scene, object, camera, max_distance) {
                Ok(visibility) if visibility.visible => {
                    let distance = scene
                        .object_transform(object)
                        .map(|t| t.translation.distance(camera.eye))
                        .unwrap_or(f32::INFINITY);
                    set.objects.push(VisibleObject {
                        object,
                        distance,
                        visibility,
                    });
                }
                Ok(_) => {}
                Err(SceneError::NoVisibilityPoints { id, name }) => {
                    log::error!(
                        "Visibility: {} ({}) has no visibility points and can never be seen",
                        id,
                        name
                    );
                    set.misconfigured.push(id);
                }
                Err(e) => {
                    log::warn!("Visibility: skipping {}: {}", object, e);
                }
            }
        }

        set.objects.sort_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then_with(|| a.object.cmp(&b.object))
        });
        set
    }

    /// Objects with any collider inside a vertical capsule of radius
    /// `max_distance` spanning the scene height, in id order
    fn candidates(&self, scene: &Scene, center: Vec3, max_distance: f32) -> Vec<ObjectId> {
        let bounds = scene.bounds();
        let half_height = bounds.size().y * 0.5;
        let volume = Shape::capsule(half_height, max_distance);
        let pose = Transform::from_translation(Vec3::new(center.x, bounds.center().y, center.z));
        let mask = QueryMask::all().exclude_category(ColliderCategory::AGENT);

        let mut objects: Vec<ObjectId> = CollisionOracle::overlap(scene, &volume, &pose, &mask)
            .into_iter()
            .filter_map(|hit| hit.object)
            .collect();
        objects.sort();
        objects.dedup();
        objects
    }

    /// Agent always ignored, held object ignored unless it is the candidate
    fn occluder_mask(&self, scene: &Scene, candidate: ObjectId) -> QueryMask {
        let mut mask = QueryMask::solids();
        if let Some(held) = scene.held() {
            if held.object != candidate {
                mask = mask.ignoring_object(held.object);
            }
        }
        mask
    }

    #[allow(clippy::too_many_arguments)]
    fn walk(
        &self,
        scene: &Scene,
        candidate: ObjectId,
        origin: Vec3,
        direction: Vec3,
        length: f32,
        mask: &QueryMask,
        triggers: bool,
    ) -> RayWalk {
        let mut through_see_through = false;

        for hit in CollisionOracle::raycast_all(scene, origin, direction, length, mask) {
            if hit.collider.object == Some(candidate) {
                return RayWalk::Reached {
                    through_see_through,
                };
            }
            if triggers && hit.collider.category == ColliderCategory::TRIGGER {
                continue;
            }
            if Self::is_see_through(scene, &hit) {
                through_see_through = true;
                continue;
            }
            return RayWalk::Blocked;
        }
        RayWalk::Blocked
    }

    fn is_see_through(scene: &Scene, hit: &RayHit) -> bool {
        hit.collider
            .object
            .and_then(|id| scene.object(id).ok())
            .is_some_and(|object| object.is_see_through())
    }
}
