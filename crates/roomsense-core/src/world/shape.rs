//! Collision shapes as a tagged union

use glam::Vec3;
use rapier3d::prelude::SharedShape;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SceneError};
use crate::math::Transform;

/// Primitive collision shape, centred on its local origin
///
/// Capsules are aligned with the local Y axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    Capsule { half_height: f32, radius: f32 },
    Box { half_extents: Vec3 },
    Sphere { radius: f32 },
}

impl Shape {
    pub fn capsule(half_height: f32, radius: f32) -> Self {
        Shape::Capsule {
            half_height,
            radius,
        }
    }

    pub fn cuboid(half_extents: Vec3) -> Self {
        Shape::Box { half_extents }
    }

    pub fn sphere(radius: f32) -> Self {
        Shape::Sphere { radius }
    }

    /// All dimensions finite, radii and extents strictly positive
    /// (a capsule may have a zero-length segment)
    pub fn is_valid(&self) -> bool {
        match *self {
            Shape::Capsule {
                half_height,
                radius,
            } => half_height.is_finite() && half_height >= 0.0 && radius.is_finite() && radius > 0.0,
            Shape::Box { half_extents } => {
                half_extents.is_finite() && half_extents.min_element() > 0.0
            }
            Shape::Sphere { radius } => radius.is_finite() && radius > 0.0,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(SceneError::InvalidShape(format!("{self:?}")))
        }
    }

    /// Physics-engine representation
    pub fn to_shared(&self) -> SharedShape {
        match *self {
            Shape::Capsule {
                half_height,
                radius,
            } => SharedShape::capsule_y(half_height, radius),
            Shape::Box { half_extents } => {
                SharedShape::cuboid(half_extents.x, half_extents.y, half_extents.z)
            }
            Shape::Sphere { radius } => SharedShape::ball(radius),
        }
    }

    /// Axis-aligned bounds (min, max) of this shape placed at `pose`
    pub fn bounds(&self, pose: &Transform) -> (Vec3, Vec3) {
        let aabb = self.to_shared().compute_aabb(&pose.to_isometry());
        (
            Vec3::new(aabb.mins.x, aabb.mins.y, aabb.mins.z),
            Vec3::new(aabb.maxs.x, aabb.maxs.y, aabb.maxs.z),
        )
    }
}
