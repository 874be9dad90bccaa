//! Engine configuration - every tunable constant of the spatial core
//!
//! Serializable so the application layer can load it from RON files and
//! environment overrides. All distances are in metres, angles in degrees.

use serde::{Deserialize, Serialize};

/// Complete engine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub agent: AgentConfig,

    #[serde(default)]
    pub camera: CameraConfig,

    #[serde(default)]
    pub visibility: VisibilityConfig,

    #[serde(default)]
    pub interaction: InteractionConfig,

    #[serde(default)]
    pub reachability: ReachabilityConfig,

    #[serde(default)]
    pub settle: SettleConfig,
}

/// Agent body and discrete action step sizes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Capsule radius
    pub radius: f32,
    /// Total capsule height (including both caps)
    pub height: f32,
    /// Extra sweep distance kept between the capsule and obstacles
    pub skin_width: f32,
    /// Camera height above the capsule centre while standing
    pub standing_camera_offset: f32,
    /// Camera height above the capsule centre while crouching
    pub crouching_camera_offset: f32,
    /// Distance of one move_ahead/back/left/right
    pub move_magnitude: f32,
    /// Degrees of one rotate_left/right
    pub rotate_step: f32,
    /// Degrees of one look_up/down
    pub horizon_step: f32,
    /// Lowest allowed horizon (looking up is negative)
    pub min_horizon: f32,
    /// Highest allowed horizon (looking down is positive)
    pub max_horizon: f32,
}

impl AgentConfig {
    /// Half height of the cylindrical part of the capsule
    pub fn capsule_half_height(&self) -> f32 {
        (self.height * 0.5 - self.radius).max(0.0)
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            radius: 0.2,
            height: 0.9,
            skin_width: 0.01,
            standing_camera_offset: 0.225,
            crouching_camera_offset: -0.225,
            move_magnitude: 0.25,
            rotate_step: 90.0,
            horizon_step: 30.0,
            min_horizon: -30.0,
            max_horizon: 60.0,
        }
    }
}

/// Camera intrinsics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraConfig {
    /// Vertical field of view in degrees
    pub field_of_view: f32,
    /// Viewport width / height
    pub aspect_ratio: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            field_of_view: 90.0,
            aspect_ratio: 1.0,
        }
    }
}

/// Visibility query settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisibilityConfig {
    /// Planar view distance; points at exactly this distance are not visible
    pub view_distance: f32,
    /// Extra ray length past each visibility point
    pub ray_slack: f32,
    /// Run the second pass against trigger volumes
    pub trigger_pass: bool,
    /// Evaluate every visibility point instead of stopping at the first hit
    pub enumerate_all_points: bool,
}

impl Default for VisibilityConfig {
    fn default() -> Self {
        Self {
            view_distance: 1.5,
            ray_slack: 0.05,
            trigger_pass: true,
            enumerate_all_points: false,
        }
    }
}

/// Hand and held-object settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionConfig {
    /// Maximum eye-to-target distance for pickups and hand moves (strict)
    pub reach_distance: f32,
    /// Angular spacing of the precomputed rotation check volumes
    pub rotation_check_increment: f32,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            reach_distance: 1.5,
            rotation_check_increment: 15.0,
        }
    }
}

/// Reachability flood fill settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReachabilityConfig {
    /// Default grid spacing
    pub grid_size: f32,
    /// Safety cap on dequeued cells
    pub max_iterations: usize,
    /// Require a floor collider under every reachable cell
    pub require_floor_support: bool,
    /// How far below the capsule centre the floor probe looks
    pub floor_probe_distance: f32,
}

impl Default for ReachabilityConfig {
    fn default() -> Self {
        Self {
            grid_size: 0.25,
            max_iterations: 10_000,
            require_floor_support: true,
            floor_probe_distance: 2.0,
        }
    }
}

/// Settling detection for dropped objects
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettleConfig {
    /// Ticks before giving up
    pub max_ticks: u32,
    /// Linear and angular speed below which an object counts as settled
    pub velocity_epsilon: f32,
    /// Physics timestep in seconds
    pub timestep: f32,
}

impl Default for SettleConfig {
    fn default() -> Self {
        Self {
            max_ticks: 1000,
            velocity_epsilon: 0.001,
            timestep: 1.0 / 60.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.reachability.max_iterations, 10_000);
        assert_eq!(config.settle.max_ticks, 1000);
        assert_eq!(config.interaction.rotation_check_increment, 15.0);
        assert!(config.visibility.trigger_pass);
    }

    #[test]
    fn test_capsule_half_height() {
        let agent = AgentConfig::default();
        assert!((agent.capsule_half_height() - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_partial_ron_uses_defaults() {
        let config: EngineConfig =
            ron::from_str("(reachability: (grid_size: 0.5, max_iterations: 50, require_floor_support: false, floor_probe_distance: 1.0))")
                .expect("parse config");
        assert_eq!(config.reachability.grid_size, 0.5);
        assert_eq!(config.agent.radius, 0.2);
    }
}
