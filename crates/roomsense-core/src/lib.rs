//! Spatial reasoning for an embodied agent in a physics-simulated room
//!
//! This crate implements:
//! - A collision oracle (overlap, sweep and ray queries with explicit filters)
//! - Occlusion-aware visibility with see-through pass-through
//! - Motion validation for translate, rotate, teleport and hand moves
//! - Grid reachability by breadth-first flood fill
//!
//! Scene geometry lives in a manually stepped rapier world; nothing moves
//! unless an action is committed or [`world::Scene::step`] is called.

pub mod config;
pub mod controller;
pub mod entity;
pub mod error;
pub mod math;
pub mod motion;
pub mod navigation;
pub mod perception;
pub mod simulation;
pub mod world;

pub use config::EngineConfig;
pub use controller::AgentController;
pub use entity::{HeldObject, Pose, Stance};
pub use error::{Result, SceneError};
pub use motion::{ActionPayload, ActionResult, FailureReason, MotionValidator};
pub use navigation::{GridCell, ReachabilityExplorer, ReachableSet, VisibleFrom};
pub use perception::{Camera, Visibility, VisibilityOracle, VisibleSet};
pub use simulation::{SettleStatus, SettleWatch};
pub use world::{
    ColliderCategory, CollisionOracle, ObjectFlags, ObjectId, ObjectSpec, QueryMask, Scene,
    SceneBounds, Shape,
};
