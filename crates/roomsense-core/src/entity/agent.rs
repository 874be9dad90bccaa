use glam::Vec3;
use rapier3d::prelude::{ColliderHandle, RigidBodyHandle};
use serde::{Deserialize, Serialize};

use crate::math::{Transform, normalize_degrees};
use crate::world::{ObjectId, Shape};

/// Standing or crouching; only changes the camera height
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub enum Stance {
    #[default]
    Standing,
    Crouching,
}

impl Stance {
    pub const ALL: [Stance; 2] = [Stance::Standing, Stance::Crouching];
}

/// Agent pose: capsule centre, heading, camera pitch and stance
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: Vec3,
    /// Degrees about +Y, 0 faces +Z
    pub yaw: f32,
    /// Camera pitch in degrees, positive looks down
    pub horizon: f32,
    pub stance: Stance,
}

impl Pose {
    pub fn new(position: Vec3, yaw: f32) -> Self {
        Self {
            position,
            yaw: normalize_degrees(yaw),
            horizon: 0.0,
            stance: Stance::Standing,
        }
    }

    /// Agent frame: position plus yaw (camera pitch excluded)
    pub fn frame(&self) -> Transform {
        Transform::from_yaw(self.position, self.yaw)
    }

    pub fn forward(&self) -> Vec3 {
        self.frame().transform_vector(Vec3::Z)
    }

    /// Unit vector to the agent's right
    pub fn right(&self) -> Vec3 {
        self.forward().cross(Vec3::Y)
    }

    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    pub fn with_yaw(mut self, yaw: f32) -> Self {
        self.yaw = normalize_degrees(yaw);
        self
    }

    pub fn with_stance(mut self, stance: Stance) -> Self {
        self.stance = stance;
        self
    }
}

/// Object attached to the agent's hand
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeldObject {
    pub object: ObjectId,
    /// Object transform relative to the agent frame
    pub local: Transform,
}

impl HeldObject {
    /// World transform of the held object for an agent frame
    pub fn world_transform(&self, agent_frame: &Transform) -> Transform {
        agent_frame.mul_transform(&self.local)
    }
}

/// The agent as registered in the scene
#[derive(Debug, Clone)]
pub struct AgentBody {
    pub pose: Pose,
    pub body: RigidBodyHandle,
    pub collider: ColliderHandle,
    pub capsule: Shape,
    pub held: Option<HeldObject>,
}

impl AgentBody {
    pub fn is_holding(&self) -> bool {
        self.held.is_some()
    }

    pub fn held_object(&self) -> Option<ObjectId> {
        self.held.map(|held| held.object)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pose_yaw_is_normalized() {
        let pose = Pose::new(Vec3::ZERO, -90.0);
        assert_eq!(pose.yaw, 270.0);
    }

    #[test]
    fn test_forward_and_right_are_perpendicular() {
        let pose = Pose::new(Vec3::ZERO, 30.0);
        assert!(pose.forward().dot(pose.right()).abs() < 1e-6);
        assert!((pose.right().length() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_held_object_follows_agent_frame() {
        let held = HeldObject {
            object: ObjectId::from_raw(1),
            local: Transform::from_translation(Vec3::new(0.0, 0.0, 0.5)),
        };
        let pose = Pose::new(Vec3::new(1.0, 0.5, 1.0), 90.0);
        let world = held.world_transform(&pose.frame());
        assert!((world.translation - Vec3::new(1.5, 0.5, 1.0)).length() < 1e-5);
    }
}
