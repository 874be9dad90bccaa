//! Scene objects and collider registry entries

use bitflags::bitflags;
use glam::Vec3;
use rapier3d::prelude::{ColliderHandle, RigidBodyHandle};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::shape::Shape;
use crate::math::Transform;

/// Scene-assigned identifier of a spatial object
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectId(u32);

impl ObjectId {
    pub fn from_raw(id: u32) -> Self {
        ObjectId(id)
    }

    pub fn raw(&self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Object({})", self.0)
    }
}

bitflags! {
    /// Secondary object properties
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct ObjectFlags: u8 {
        /// Occlusion rays pass through this object
        const SEE_THROUGH = 1 << 0;
        const OPENABLE = 1 << 1;
        const PICKUPABLE = 1 << 2;
        const RECEPTACLE = 1 << 3;
    }
}

bitflags! {
    /// What a collider represents, used by query masks
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct ColliderCategory: u8 {
        const FLOOR = 1 << 0;
        const STRUCTURE = 1 << 1;
        const OBJECT = 1 << 2;
        const AGENT = 1 << 3;
        /// Invisible volumes (receptacle interiors); never block movement
        const TRIGGER = 1 << 4;
    }
}

/// Registry entry for one collider, looked up by handle in O(1)
#[derive(Debug, Clone)]
pub struct ColliderEntry {
    pub owner: Option<ObjectId>,
    pub category: ColliderCategory,
    pub shape: Shape,
    /// Pose relative to the owning body (world pose for unowned colliders)
    pub local: Transform,
}

/// One collider of an object specification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColliderSpec {
    pub shape: Shape,
    #[serde(default)]
    pub offset: Vec3,
    /// Registered as a trigger volume instead of solid geometry
    #[serde(default)]
    pub trigger: bool,
}

impl ColliderSpec {
    pub fn solid(shape: Shape) -> Self {
        Self {
            shape,
            offset: Vec3::ZERO,
            trigger: false,
        }
    }

    pub fn trigger(shape: Shape) -> Self {
        Self {
            shape,
            offset: Vec3::ZERO,
            trigger: true,
        }
    }

    pub fn with_offset(mut self, offset: Vec3) -> Self {
        self.offset = offset;
        self
    }
}

/// Everything needed to register an object with a scene
#[derive(Debug, Clone)]
pub struct ObjectSpec {
    pub name: String,
    pub transform: Transform,
    pub colliders: Vec<ColliderSpec>,
    /// Object-local sample points used by visibility tests
    pub visibility_points: Vec<Vec3>,
    pub flags: ObjectFlags,
    /// Simulated by the physics step (falls, settles)
    pub dynamic: bool,
}

impl ObjectSpec {
    pub fn new(name: impl Into<String>, position: Vec3) -> Self {
        Self {
            name: name.into(),
            transform: Transform::from_translation(position),
            colliders: Vec::new(),
            visibility_points: Vec::new(),
            flags: ObjectFlags::empty(),
            dynamic: false,
        }
    }

    /// Single solid box with one visibility point at its centre
    pub fn boxed(name: impl Into<String>, position: Vec3, half_extents: Vec3) -> Self {
        Self::new(name, position)
            .with_collider(ColliderSpec::solid(Shape::cuboid(half_extents)))
            .with_visibility_point(Vec3::ZERO)
    }

    pub fn with_collider(mut self, collider: ColliderSpec) -> Self {
        self.colliders.push(collider);
        self
    }

    pub fn with_visibility_point(mut self, point: Vec3) -> Self {
        self.visibility_points.push(point);
        self
    }

    pub fn with_flags(mut self, flags: ObjectFlags) -> Self {
        self.flags |= flags;
        self
    }

    pub fn with_yaw(mut self, yaw_degrees: f32) -> Self {
        self.transform = Transform::from_yaw(self.transform.translation, yaw_degrees);
        self
    }

    pub fn dynamic(mut self) -> Self {
        self.dynamic = true;
        self
    }
}

/// A registered object
#[derive(Debug, Clone)]
pub struct SpatialObject {
    pub id: ObjectId,
    pub name: String,
    pub body: RigidBodyHandle,
    pub colliders: SmallVec<[ColliderHandle; 4]>,
    pub visibility_points: Vec<Vec3>,
    pub flags: ObjectFlags,
    pub dynamic: bool,
}

impl SpatialObject {
    pub fn is_see_through(&self) -> bool {
        self.flags.contains(ObjectFlags::SEE_THROUGH)
    }

    pub fn is_pickupable(&self) -> bool {
        self.flags.contains(ObjectFlags::PICKUPABLE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boxed_spec_has_one_point_and_collider() {
        let spec = ObjectSpec::boxed("Crate", Vec3::new(1.0, 0.5, 0.0), Vec3::splat(0.5));
        assert_eq!(spec.colliders.len(), 1);
        assert_eq!(spec.visibility_points, vec![Vec3::ZERO]);
        assert!(!spec.colliders[0].trigger);
    }

    #[test]
    fn test_flags_accumulate() {
        let spec = ObjectSpec::new("Window", Vec3::ZERO)
            .with_flags(ObjectFlags::SEE_THROUGH)
            .with_flags(ObjectFlags::OPENABLE);
        assert!(spec.flags.contains(ObjectFlags::SEE_THROUGH | ObjectFlags::OPENABLE));
    }

    #[test]
    fn test_object_id_display() {
        assert_eq!(ObjectId::from_raw(7).to_string(), "Object(7)");
    }
}
