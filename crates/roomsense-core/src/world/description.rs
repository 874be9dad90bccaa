//! Declarative scene descriptions loaded from RON

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::object::{ColliderSpec, ObjectFlags, ObjectSpec};
use super::scene::{Scene, SceneBounds};
use super::shape::Shape;
use crate::config::EngineConfig;
use crate::entity::{Pose, Stance};
use crate::error::{Result, SceneError};
use crate::math::Transform;

/// Complete description of a room, its objects and the agent start
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneDescription {
    pub bounds: SceneBounds,
    #[serde(default)]
    pub floors: Vec<StaticDescription>,
    #[serde(default)]
    pub structures: Vec<StaticDescription>,
    #[serde(default)]
    pub objects: Vec<ObjectDescription>,
    pub agent: AgentStart,
}

/// A floor or structure collider with a world pose
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaticDescription {
    pub shape: Shape,
    pub position: Vec3,
    #[serde(default)]
    pub yaw: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectDescription {
    pub name: String,
    pub position: Vec3,
    #[serde(default)]
    pub yaw: f32,
    pub colliders: Vec<ColliderSpec>,
    #[serde(default)]
    pub visibility_points: Vec<Vec3>,
    #[serde(default)]
    pub see_through: bool,
    #[serde(default)]
    pub openable: bool,
    #[serde(default)]
    pub pickupable: bool,
    #[serde(default)]
    pub receptacle: bool,
    #[serde(default)]
    pub dynamic: bool,
}

impl ObjectDescription {
    pub fn flags(&self) -> ObjectFlags {
        let mut flags = ObjectFlags::empty();
        flags.set(ObjectFlags::SEE_THROUGH, self.see_through);
        flags.set(ObjectFlags::OPENABLE, self.openable);
        flags.set(ObjectFlags::PICKUPABLE, self.pickupable);
        flags.set(ObjectFlags::RECEPTACLE, self.receptacle);
        flags
    }

    pub fn to_spec(&self) -> ObjectSpec {
        let mut spec = ObjectSpec::new(self.name.clone(), self.position)
            .with_yaw(self.yaw)
            .with_flags(self.flags());
        spec.colliders = self.colliders.clone();
        spec.visibility_points = self.visibility_points.clone();
        spec.dynamic = self.dynamic;
        spec
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentStart {
    pub position: Vec3,
    #[serde(default)]
    pub yaw: f32,
    #[serde(default)]
    pub horizon: f32,
    #[serde(default)]
    pub stance: Stance,
}

impl AgentStart {
    pub fn pose(&self) -> Pose {
        let mut pose = Pose::new(self.position, self.yaw).with_stance(self.stance);
        pose.horizon = self.horizon;
        pose
    }
}

impl SceneDescription {
    pub fn from_ron_str(source: &str) -> Result<Self> {
        ron::from_str(source).map_err(|e| SceneError::Description(e.to_string()))
    }

    pub fn to_ron_string(&self) -> Result<String> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| SceneError::Description(e.to_string()))
    }

    /// Rectangular room of `width` x `depth` centred on the origin: a floor
    /// slab whose top is at y = 0 and four walls of thickness 0.2 outside the
    /// interior. The agent starts standing at the centre.
    pub fn walled_room(width: f32, depth: f32, wall_height: f32, config: &EngineConfig) -> Self {
        let half_w = width * 0.5;
        let half_d = depth * 0.5;
        let thickness = 0.1;
        let half_h = wall_height * 0.5;

        let wall = |position: Vec3, half_extents: Vec3| StaticDescription {
            shape: Shape::cuboid(half_extents),
            position,
            yaw: 0.0,
        };

        Self {
            bounds: SceneBounds::new(
                Vec3::new(-half_w - 2.0 * thickness, -1.0, -half_d - 2.0 * thickness),
                Vec3::new(half_w + 2.0 * thickness, wall_height + 1.0, half_d + 2.0 * thickness),
            ),
            floors: vec![wall(
                Vec3::new(0.0, -thickness, 0.0),
                Vec3::new(half_w + 2.0 * thickness, thickness, half_d + 2.0 * thickness),
            )],
            structures: vec![
                wall(
                    Vec3::new(half_w + thickness, half_h, 0.0),
                    Vec3::new(thickness, half_h, half_d + 2.0 * thickness),
                ),
                wall(
                    Vec3::new(-half_w - thickness, half_h, 0.0),
                    Vec3::new(thickness, half_h, half_d + 2.0 * thickness),
                ),
                wall(
                    Vec3::new(0.0, half_h, half_d + thickness),
                    Vec3::new(half_w, half_h, thickness),
                ),
                wall(
                    Vec3::new(0.0, half_h, -half_d - thickness),
                    Vec3::new(half_w, half_h, thickness),
                ),
            ],
            objects: Vec::new(),
            agent: AgentStart {
                position: Vec3::new(0.0, standing_height(config), 0.0),
                yaw: 0.0,
                horizon: 0.0,
                stance: Stance::Standing,
            },
        }
    }

    pub fn build(&self, config: &EngineConfig) -> Result<Scene> {
        let start = self.agent.pose();
        if !self.bounds.contains(start.position) {
            return Err(SceneError::Description(format!(
                "agent start {:?} lies outside the scene bounds",
                start.position
            )));
        }

        let mut scene = Scene::new(self.bounds, start, &config.agent, config.settle.timestep);
        for floor in &self.floors {
            scene.add_floor(floor.shape, Transform::from_yaw(floor.position, floor.yaw))?;
        }
        for structure in &self.structures {
            scene.add_structure(
                structure.shape,
                Transform::from_yaw(structure.position, structure.yaw),
            )?;
        }
        for object in &self.objects {
            scene.add_object(object.to_spec())?;
        }

        log::info!(
            "Scene: built {} floors, {} structures, {} objects",
            self.floors.len(),
            self.structures.len(),
            self.objects.len()
        );
        Ok(scene)
    }
}

/// Capsule centre height for an agent standing on a floor at y = 0
pub fn standing_height(config: &EngineConfig) -> f32 {
    config.agent.height * 0.5 + config.agent.skin_width
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"(
        bounds: (min: (-2.0, -1.0, -2.0), max: (2.0, 3.0, 2.0)),
        floors: [(shape: Box(half_extents: (2.0, 0.1, 2.0)), position: (0.0, -0.1, 0.0))],
        objects: [
            (
                name: "Window",
                position: (0.0, 0.5, 1.0),
                colliders: [(shape: Box(half_extents: (0.5, 0.5, 0.02)))],
                visibility_points: [(0.0, 0.0, 0.0)],
                see_through: true,
            ),
        ],
        agent: (position: (0.0, 0.46, 0.0), yaw: 90.0),
    )"#;

    #[test]
    fn test_parse_and_build_sample() {
        let description = SceneDescription::from_ron_str(SAMPLE).unwrap();
        assert_eq!(description.objects.len(), 1);
        assert!(description.objects[0].flags().contains(ObjectFlags::SEE_THROUGH));

        let scene = description.build(&EngineConfig::default()).unwrap();
        assert_eq!(scene.objects().count(), 1);
        assert_eq!(scene.agent_pose().yaw, 90.0);
    }

    #[test]
    fn test_parse_error_is_reported() {
        let result = SceneDescription::from_ron_str("(bounds: nope)");
        assert!(matches!(result, Err(SceneError::Description(_))));
    }

    #[test]
    fn test_agent_outside_bounds_is_rejected() {
        let mut description = SceneDescription::walled_room(4.0, 4.0, 2.5, &EngineConfig::default());
        description.agent.position = Vec3::new(10.0, 0.5, 0.0);
        assert!(description.build(&EngineConfig::default()).is_err());
    }

    #[test]
    fn test_walled_room_round_trips_through_ron() {
        let description = SceneDescription::walled_room(4.0, 4.0, 2.5, &EngineConfig::default());
        let text = description.to_ron_string().unwrap();
        let parsed = SceneDescription::from_ron_str(&text).unwrap();
        assert_eq!(parsed.structures.len(), 4);
        assert_eq!(parsed.bounds, description.bounds);
    }
}
