//! Scene: physics world, collider registry, object registry and the agent
//!
//! Every collider is registered once with its category and owning object, so
//! mapping a query hit back to an object is a single hash lookup.

use std::collections::BTreeMap;

use ahash::AHashMap;
use glam::Vec3;
use rapier3d::prelude::{
    ColliderBuilder, ColliderHandle, Isometry, Real, RigidBodyBuilder, RigidBodyType,
};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::object::{ColliderCategory, ColliderEntry, ObjectId, ObjectSpec, SpatialObject};
use super::physics::PhysicsWorld;
use super::shape::Shape;
use crate::config::AgentConfig;
use crate::entity::{AgentBody, HeldObject, Pose};
use crate::error::{Result, SceneError};
use crate::math::Transform;

/// Axis-aligned region every agent and object position must lie in
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SceneBounds {
    pub min: Vec3,
    pub max: Vec3,
}

impl SceneBounds {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self {
            min: min.min(max),
            max: min.max(max),
        }
    }

    /// Inclusive containment test
    pub fn contains(&self, point: Vec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }
}

/// Agent and held-object state captured before a hypothetical change
#[derive(Debug, Clone)]
pub struct AgentSnapshot {
    pose: Pose,
    agent_isometry: Isometry<Real>,
    held: Option<(HeldObject, Isometry<Real>)>,
    revision: u64,
}

impl AgentSnapshot {
    pub fn pose(&self) -> &Pose {
        &self.pose
    }

    pub fn held(&self) -> Option<&HeldObject> {
        self.held.as_ref().map(|(held, _)| held)
    }
}

pub struct Scene {
    physics: PhysicsWorld,
    registry: AHashMap<ColliderHandle, ColliderEntry>,
    objects: BTreeMap<ObjectId, SpatialObject>,
    agent: AgentBody,
    bounds: SceneBounds,
    /// Bumped on every non-agent geometry change
    revision: u64,
    next_id: u32,
}

impl Scene {
    /// Create an empty scene containing only the agent capsule
    pub fn new(bounds: SceneBounds, pose: Pose, agent: &AgentConfig, timestep: f32) -> Self {
        let mut physics = PhysicsWorld::new(timestep);
        let capsule = Shape::capsule(agent.capsule_half_height(), agent.radius);

        let frame = pose.frame();
        let body = physics.insert_body(
            RigidBodyBuilder::kinematic_position_based()
                .position(frame.to_isometry())
                .build(),
        );
        let collider = physics.insert_collider(ColliderBuilder::new(capsule.to_shared()).build(), body);
        physics.refresh_queries();

        let mut registry = AHashMap::new();
        registry.insert(
            collider,
            ColliderEntry {
                owner: None,
                category: ColliderCategory::AGENT,
                shape: capsule,
                local: Transform::IDENTITY,
            },
        );

        log::debug!(
            "Scene: created with bounds {:?}..{:?}, agent at {:?}",
            bounds.min,
            bounds.max,
            pose.position
        );

        Self {
            physics,
            registry,
            objects: BTreeMap::new(),
            agent: AgentBody {
                pose,
                body,
                collider,
                capsule,
                held: None,
            },
            bounds,
            revision: 0,
            next_id: 1,
        }
    }

    pub fn bounds(&self) -> &SceneBounds {
        &self.bounds
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub(crate) fn physics(&self) -> &PhysicsWorld {
        &self.physics
    }

    pub fn add_floor(&mut self, shape: Shape, transform: Transform) -> Result<ColliderHandle> {
        self.add_static(shape, transform, ColliderCategory::FLOOR)
    }

    /// Walls, ceilings and other immovable room geometry
    pub fn add_structure(&mut self, shape: Shape, transform: Transform) -> Result<ColliderHandle> {
        self.add_static(shape, transform, ColliderCategory::STRUCTURE)
    }

    fn add_static(
        &mut self,
        shape: Shape,
        transform: Transform,
        category: ColliderCategory,
    ) -> Result<ColliderHandle> {
        shape.validate()?;
        let handle = self.physics.insert_static_collider(
            ColliderBuilder::new(shape.to_shared())
                .position(transform.to_isometry())
                .build(),
        );
        self.registry.insert(
            handle,
            ColliderEntry {
                owner: None,
                category,
                shape,
                local: transform,
            },
        );
        self.revision += 1;
        Ok(handle)
    }

    /// Register an object; all shapes are validated before anything is inserted
    pub fn add_object(&mut self, spec: ObjectSpec) -> Result<ObjectId> {
        for collider in &spec.colliders {
            collider.shape.validate()?;
        }

        let id = ObjectId::from_raw(self.next_id);
        self.next_id += 1;

        if spec.visibility_points.is_empty() {
            log::warn!(
                "Scene: object {} ({}) registered without visibility points",
                id,
                spec.name
            );
        }

        let builder = if spec.dynamic {
            RigidBodyBuilder::dynamic()
        } else {
            RigidBodyBuilder::fixed()
        };
        let body = self
            .physics
            .insert_body(builder.position(spec.transform.to_isometry()).build());

        let mut colliders = SmallVec::new();
        for collider in &spec.colliders {
            let local = Transform::from_translation(collider.offset);
            let handle = self.physics.insert_collider(
                ColliderBuilder::new(collider.shape.to_shared())
                    .position(local.to_isometry())
                    .sensor(collider.trigger)
                    .build(),
                body,
            );
            let category = if collider.trigger {
                ColliderCategory::TRIGGER
            } else {
                ColliderCategory::OBJECT
            };
            self.registry.insert(
                handle,
                ColliderEntry {
                    owner: Some(id),
                    category,
                    shape: collider.shape,
                    local,
                },
            );
            colliders.push(handle);
        }
        self.physics.refresh_queries();

        log::debug!(
            "Scene: added {} ({}) with {} colliders",
            id,
            spec.name,
            colliders.len()
        );

        self.objects.insert(
            id,
            SpatialObject {
                id,
                name: spec.name,
                body,
                colliders,
                visibility_points: spec.visibility_points,
                flags: spec.flags,
                dynamic: spec.dynamic,
            },
        );
        self.revision += 1;
        Ok(id)
    }

    pub fn remove_object(&mut self, id: ObjectId) -> Result<SpatialObject> {
        let object = self.objects.remove(&id).ok_or(SceneError::UnknownObject(id))?;
        if self.agent.held_object() == Some(id) {
            self.agent.held = None;
        }
        for handle in &object.colliders {
            self.registry.remove(handle);
        }
        self.physics.remove_body(object.body);
        self.revision += 1;

        log::debug!("Scene: removed {} ({})", id, object.name);
        Ok(object)
    }

    pub fn object(&self, id: ObjectId) -> Result<&SpatialObject> {
        self.objects.get(&id).ok_or(SceneError::UnknownObject(id))
    }

    pub fn object_by_name(&self, name: &str) -> Option<&SpatialObject> {
        self.objects.values().find(|object| object.name == name)
    }

    /// Objects in id order
    pub fn objects(&self) -> impl Iterator<Item = &SpatialObject> {
        self.objects.values()
    }

    pub fn object_transform(&self, id: ObjectId) -> Result<Transform> {
        let object = self.object(id)?;
        self.physics
            .body_transform(object.body)
            .ok_or(SceneError::UnknownObject(id))
    }

    /// Move an object directly (no validation)
    pub fn set_object_transform(&mut self, id: ObjectId, transform: &Transform) -> Result<()> {
        let body = self.object(id)?.body;
        self.physics.set_body_transform(body, transform);
        self.revision += 1;
        Ok(())
    }

    /// World-space visibility points of an object at its current pose
    pub fn visibility_points(&self, id: ObjectId) -> Result<Vec<Vec3>> {
        let transform = self.object_transform(id)?;
        Ok(self
            .object(id)?
            .visibility_points
            .iter()
            .map(|p| transform.transform_point(*p))
            .collect())
    }

    /// Registry entry for a collider handle
    pub fn entry(&self, handle: ColliderHandle) -> Option<&ColliderEntry> {
        self.registry.get(&handle)
    }

    /// Shape and local pose of every collider an object owns
    pub fn object_colliders(&self, id: ObjectId) -> Result<Vec<(Shape, Transform, ColliderCategory)>> {
        Ok(self
            .object(id)?
            .colliders
            .iter()
            .filter_map(|handle| self.registry.get(handle))
            .map(|entry| (entry.shape, entry.local, entry.category))
            .collect())
    }

    pub fn agent(&self) -> &AgentBody {
        &self.agent
    }

    pub fn agent_pose(&self) -> &Pose {
        &self.agent.pose
    }

    /// Pose of the agent's physics body
    pub fn agent_transform(&self) -> Option<Transform> {
        self.physics.body_transform(self.agent.body)
    }

    /// Move the agent (and the held object with it) without validation
    pub fn set_agent_pose(&mut self, pose: Pose) {
        let frame = pose.frame();
        self.agent.pose = pose;
        self.physics.set_body_transform(self.agent.body, &frame);
        if let Some(held) = self.agent.held {
            self.place_held(&held, &frame);
        }
    }

    pub fn held(&self) -> Option<&HeldObject> {
        self.agent.held.as_ref()
    }

    /// Attach an object to the hand; its body turns kinematic while held
    pub fn attach_held(&mut self, id: ObjectId, local: Transform) -> Result<()> {
        let body = self.object(id)?.body;
        self.physics
            .set_body_type(body, RigidBodyType::KinematicPositionBased);
        let held = HeldObject { object: id, local };
        self.agent.held = Some(held);
        let frame = self.agent.pose.frame();
        self.place_held(&held, &frame);

        log::debug!("Scene: agent now holds {}", id);
        Ok(())
    }

    /// Release the held object, restoring its original body type
    pub fn detach_held(&mut self) -> Option<HeldObject> {
        let held = self.agent.held.take()?;
        if let Some(object) = self.objects.get(&held.object) {
            let body_type = if object.dynamic {
                RigidBodyType::Dynamic
            } else {
                RigidBodyType::Fixed
            };
            self.physics.set_body_type(object.body, body_type);
        }
        self.revision += 1;

        log::debug!("Scene: agent released {}", held.object);
        Some(held)
    }

    /// Change the held object's offset from the agent frame
    pub fn set_held_local(&mut self, local: Transform) -> Result<()> {
        let mut held = *self
            .agent
            .held
            .as_ref()
            .ok_or(SceneError::NothingHeld)?;
        held.local = local;
        self.agent.held = Some(held);
        let frame = self.agent.pose.frame();
        self.place_held(&held, &frame);
        Ok(())
    }

    fn place_held(&mut self, held: &HeldObject, frame: &Transform) {
        if let Some(object) = self.objects.get(&held.object) {
            let body = object.body;
            self.physics
                .set_body_transform(body, &held.world_transform(frame));
            self.revision += 1;
        }
    }

    /// Capture agent and held-object state for an exact rollback
    pub fn snapshot_agent(&self) -> AgentSnapshot {
        let agent_isometry = self
            .physics
            .body_isometry(self.agent.body)
            .unwrap_or_else(|| self.agent.pose.frame().to_isometry());
        let held = self.agent.held.and_then(|held| {
            let body = self.objects.get(&held.object)?.body;
            Some((held, self.physics.body_isometry(body)?))
        });
        AgentSnapshot {
            pose: self.agent.pose,
            agent_isometry,
            held,
            revision: self.revision,
        }
    }

    /// Restore a snapshot bit-identically (no transform conversions),
    /// revision included
    pub fn restore_agent(&mut self, snapshot: &AgentSnapshot) {
        self.agent.pose = snapshot.pose;
        self.physics
            .set_body_isometry(self.agent.body, snapshot.agent_isometry);
        match snapshot.held {
            Some((held, isometry)) => {
                self.agent.held = Some(held);
                if let Some(object) = self.objects.get(&held.object) {
                    let body = object.body;
                    self.physics.set_body_isometry(body, isometry);
                }
            }
            None => self.agent.held = None,
        }
        self.revision = snapshot.revision;
    }

    /// Linear and angular speed of an object's body
    pub fn body_velocity(&self, id: ObjectId) -> Result<(f32, f32)> {
        let object = self.object(id)?;
        let body = self
            .physics
            .body(object.body)
            .ok_or(SceneError::UnknownObject(id))?;
        Ok((body.linvel().norm(), body.angvel().norm()))
    }

    /// Advance the physics world by exactly one timestep
    pub fn step(&mut self) {
        self.physics.step();
        self.revision += 1;
    }

    pub fn steps(&self) -> u64 {
        self.physics.steps()
    }
}
