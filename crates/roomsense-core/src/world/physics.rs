//! Manually stepped rapier3d world
//!
//! The world never advances on its own: queries always see the geometry left
//! by the last explicit [`PhysicsWorld::step`] or pose change.

use rapier3d::prelude::*;

use crate::math::Transform;

/// Owns the rapier sets, pipelines and the query acceleration structure
pub struct PhysicsWorld {
    /// Rapier rigid body set
    rigid_body_set: RigidBodySet,

    /// Rapier collider set
    collider_set: ColliderSet,

    /// Physics pipeline
    pipeline: PhysicsPipeline,

    /// Integration parameters
    integration_parameters: IntegrationParameters,

    /// Gravity applied to dynamic bodies
    gravity: Vector<Real>,

    /// Island manager
    island_manager: IslandManager,

    /// Broad phase
    broad_phase: BroadPhase,

    /// Narrow phase
    narrow_phase: NarrowPhase,

    /// Impulse joint set
    impulse_joint_set: ImpulseJointSet,

    /// Multibody joint set
    multibody_joint_set: MultibodyJointSet,

    /// CCD solver
    ccd_solver: CCDSolver,

    /// Query pipeline
    query_pipeline: QueryPipeline,

    /// Number of steps taken so far
    steps: u64,
}

impl PhysicsWorld {
    pub fn new(timestep: f32) -> Self {
        let integration_parameters = IntegrationParameters {
            dt: timestep,
            ..Default::default()
        };

        Self {
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            pipeline: PhysicsPipeline::new(),
            integration_parameters,
            gravity: vector![0.0, -9.81, 0.0],
            island_manager: IslandManager::new(),
            broad_phase: BroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            steps: 0,
        }
    }

    /// Insert a collider that is not attached to any body (floors, walls)
    pub fn insert_static_collider(&mut self, collider: Collider) -> ColliderHandle {
        let handle = self.collider_set.insert(collider);
        self.refresh_queries();
        handle
    }

    pub fn insert_body(&mut self, body: RigidBody) -> RigidBodyHandle {
        self.rigid_body_set.insert(body)
    }

    pub fn insert_collider(&mut self, collider: Collider, parent: RigidBodyHandle) -> ColliderHandle {
        self.collider_set
            .insert_with_parent(collider, parent, &mut self.rigid_body_set)
    }

    /// Remove a body together with its colliders
    pub fn remove_body(&mut self, handle: RigidBodyHandle) {
        self.rigid_body_set.remove(
            handle,
            &mut self.island_manager,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            true,
        );
        self.refresh_queries();
    }

    pub fn body(&self, handle: RigidBodyHandle) -> Option<&RigidBody> {
        self.rigid_body_set.get(handle)
    }

    pub fn body_transform(&self, handle: RigidBodyHandle) -> Option<Transform> {
        self.rigid_body_set
            .get(handle)
            .map(|body| Transform::from_isometry(body.position()))
    }

    /// Teleport a body and its colliders; the query structure is rebuilt
    pub fn set_body_transform(&mut self, handle: RigidBodyHandle, transform: &Transform) {
        self.set_body_isometry(handle, transform.to_isometry());
    }

    /// Restore an exact isometry (used by rollbacks, no conversion round trip)
    pub fn set_body_isometry(&mut self, handle: RigidBodyHandle, isometry: Isometry<Real>) {
        if let Some(body) = self.rigid_body_set.get_mut(handle) {
            body.set_position(isometry, true);
            body.set_linvel(Vector::zeros(), true);
            body.set_angvel(Vector::zeros(), true);
        }
        self.rigid_body_set
            .propagate_modified_body_positions_to_colliders(&mut self.collider_set);
        self.refresh_queries();
    }

    pub fn body_isometry(&self, handle: RigidBodyHandle) -> Option<Isometry<Real>> {
        self.rigid_body_set.get(handle).map(|body| *body.position())
    }

    pub fn set_body_type(&mut self, handle: RigidBodyHandle, body_type: RigidBodyType) {
        if let Some(body) = self.rigid_body_set.get_mut(handle) {
            body.set_body_type(body_type, true);
        }
    }

    pub fn collider(&self, handle: ColliderHandle) -> Option<&Collider> {
        self.collider_set.get(handle)
    }

    pub(crate) fn bodies(&self) -> &RigidBodySet {
        &self.rigid_body_set
    }

    pub(crate) fn colliders(&self) -> &ColliderSet {
        &self.collider_set
    }

    pub(crate) fn query_pipeline(&self) -> &QueryPipeline {
        &self.query_pipeline
    }

    /// Rebuild the query acceleration structure from current collider poses
    pub fn refresh_queries(&mut self) {
        self.query_pipeline
            .update(&self.rigid_body_set, &self.collider_set);
    }

    /// Advance the simulation by one fixed timestep
    pub fn step(&mut self) {
        self.pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            &(),
        );
        self.steps += 1;

        log::trace!("Physics: step {} complete", self.steps);
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn timestep(&self) -> f32 {
        self.integration_parameters.dt
    }
}
