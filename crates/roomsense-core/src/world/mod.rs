//! Scene geometry, the physics world behind it and the collision oracle

pub mod collision;
pub mod description;
pub mod object;
pub mod physics;
pub mod scene;
pub mod shape;

pub use collision::{ColliderRef, CollisionOracle, QueryMask, RayHit, SweepHit};
pub use description::{AgentStart, ObjectDescription, SceneDescription, StaticDescription};
pub use object::{
    ColliderCategory, ColliderEntry, ColliderSpec, ObjectFlags, ObjectId, ObjectSpec,
    SpatialObject,
};
pub use physics::PhysicsWorld;
pub use scene::{AgentSnapshot, Scene, SceneBounds};
pub use shape::Shape;
