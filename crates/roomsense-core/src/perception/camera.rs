use glam::{Quat, Vec3};

use crate::config::{AgentConfig, CameraConfig};
use crate::entity::{Pose, Stance};
use crate::math::planar_distance;

/// Pinhole camera attached to the agent's head
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub eye: Vec3,
    pub rotation: Quat,
    /// Vertical field of view in degrees
    pub vertical_fov: f32,
    /// Width / height
    pub aspect: f32,
}

impl Camera {
    pub fn from_pose(pose: &Pose, agent: &AgentConfig, camera: &CameraConfig) -> Self {
        Self {
            eye: Self::eye_position(pose, agent),
            rotation: Quat::from_rotation_y(pose.yaw.to_radians())
                * Quat::from_rotation_x(pose.horizon.to_radians()),
            vertical_fov: camera.field_of_view,
            aspect: camera.aspect_ratio,
        }
    }

    /// Camera position for a pose: capsule centre plus the stance offset
    pub fn eye_position(pose: &Pose, agent: &AgentConfig) -> Vec3 {
        let offset = match pose.stance {
            Stance::Standing => agent.standing_camera_offset,
            Stance::Crouching => agent.crouching_camera_offset,
        };
        pose.position + Vec3::Y * offset
    }

    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::Z
    }

    /// World point to viewport space.
    ///
    /// `x` grows to the right and `y` upwards, both in `[0, 1]` inside the
    /// frustum; `z` is the depth along the view direction. `x` and `y` carry
    /// no meaning when `z <= 0`.
    pub fn viewport_point(&self, point: Vec3) -> Vec3 {
        let local = self.rotation.inverse() * (point - self.eye);
        let tan_v = (self.vertical_fov.to_radians() * 0.5).tan();
        let tan_h = tan_v * self.aspect;
        let depth = if local.z.abs() > f32::EPSILON {
            local.z
        } else {
            f32::EPSILON
        };

        Vec3::new(
            0.5 * (1.0 + (-local.x) / (depth * tan_h)),
            0.5 * (1.0 + local.y / (depth * tan_v)),
            local.z,
        )
    }

    /// In front of the camera and inside the viewport (edges included)
    pub fn in_viewport(&self, point: Vec3) -> bool {
        let v = self.viewport_point(point);
        v.z > 0.0 && (0.0..=1.0).contains(&v.x) && (0.0..=1.0).contains(&v.y)
    }

    /// Distance from the eye ignoring height
    pub fn planar_distance(&self, point: Vec3) -> f32 {
        planar_distance(self.eye, point)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera(yaw: f32, horizon: f32) -> Camera {
        let mut pose = Pose::new(Vec3::new(0.0, 0.46, 0.0), yaw);
        pose.horizon = horizon;
        Camera::from_pose(&pose, &AgentConfig::default(), &CameraConfig::default())
    }

    #[test]
    fn test_point_ahead_projects_to_center() {
        let cam = camera(0.0, 0.0);
        let v = cam.viewport_point(cam.eye + Vec3::Z * 2.0);
        assert!((v.x - 0.5).abs() < 1e-5);
        assert!((v.y - 0.5).abs() < 1e-5);
        assert!((v.z - 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_point_behind_is_rejected() {
        let cam = camera(0.0, 0.0);
        assert!(!cam.in_viewport(cam.eye - Vec3::Z));
        assert!(cam.in_viewport(cam.eye + Vec3::Z));
    }

    #[test]
    fn test_right_is_right() {
        let cam = camera(0.0, 0.0);
        let right = Pose::new(Vec3::ZERO, 0.0).right();
        let v = cam.viewport_point(cam.eye + Vec3::Z + right * 0.5);
        assert!(v.x > 0.5);
    }

    #[test]
    fn test_positive_horizon_looks_down() {
        let cam = camera(0.0, 30.0);
        assert!(cam.forward().y < 0.0);
    }

    #[test]
    fn test_fov_edges() {
        // 90 degree fov: a point at 45 degrees sits on the edge
        let cam = camera(0.0, 0.0);
        assert!(!cam.in_viewport(cam.eye + Vec3::new(0.0, 1.1, 1.0)));
        assert!(cam.in_viewport(cam.eye + Vec3::new(0.0, 0.9, 1.0)));
    }

    #[test]
    fn test_crouching_lowers_eye() {
        let agent = AgentConfig::default();
        let pose = Pose::new(Vec3::new(0.0, 0.46, 0.0), 0.0);
        let standing = Camera::eye_position(&pose, &agent);
        let crouching = Camera::eye_position(&pose.with_stance(Stance::Crouching), &agent);
        assert!(crouching.y < standing.y);
    }
}
