//! Agent controller: the public action/query surface
//!
//! Validates every action through the [`MotionValidator`] and commits the
//! result to the scene only on success.

use glam::Vec3;

use crate::config::EngineConfig;
use crate::entity::{Pose, Stance};
use crate::error::{Result, SceneError};
use crate::motion::{ActionPayload, ActionResult, FailureReason, MotionValidator};
use crate::navigation::{ReachabilityExplorer, ReachableSet, VisibleFrom};
use crate::perception::{Camera, Visibility, VisibleSet};
use crate::simulation::{SettleStatus, SettleWatch};
use crate::world::{ObjectId, Scene, SceneDescription};

pub struct AgentController {
    scene: Scene,
    config: EngineConfig,
    validator: MotionValidator,
    explorer: ReachabilityExplorer,
}

impl AgentController {
    pub fn new(scene: Scene, config: EngineConfig) -> Self {
        let validator = MotionValidator::new(config.clone());
        let explorer = ReachabilityExplorer::new(config.reachability.clone());
        Self {
            scene,
            config,
            validator,
            explorer,
        }
    }

    pub fn from_description(description: &SceneDescription, config: EngineConfig) -> Result<Self> {
        let scene = description.build(&config)?;
        Ok(Self::new(scene, config))
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Direct scene access for setup; held-object edits made here need a
    /// [`AgentController::refresh_rotation_checks`] afterwards
    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn validator(&self) -> &MotionValidator {
        &self.validator
    }

    pub fn pose(&self) -> &Pose {
        self.scene.agent_pose()
    }

    pub fn camera(&self) -> Camera {
        self.validator.camera_for(self.scene.agent_pose())
    }

    pub fn refresh_rotation_checks(&mut self) {
        self.validator.refresh_rotation_checks(&self.scene);
    }

    pub fn compute_reachable(&mut self, origin: Vec3, grid_size: f32) -> ReachableSet {
        self.explorer
            .compute_reachable(&self.scene, &self.validator, origin, grid_size)
    }

    /// Reachable positions from the agent at the configured grid size
    pub fn reachable_positions(&mut self) -> ActionResult {
        let origin = self.scene.agent_pose().position;
        let set = self.compute_reachable(origin, self.config.reachability.grid_size);
        let payload = ActionPayload::Positions(set.positions());
        match set.soft_failure() {
            Some(diagnostic) => ActionResult::partial(diagnostic, payload),
            None => ActionResult::ok_with(payload),
        }
    }

    pub fn is_visible(&self, object: ObjectId, max_distance: f32) -> Result<Visibility> {
        self.validator
            .visibility()
            .is_visible(&self.scene, object, &self.camera(), max_distance)
    }

    /// Visible objects around the agent at the configured view distance
    pub fn visible_objects(&self) -> VisibleSet {
        self.validator.visibility().visible_objects(
            &self.scene,
            &self.camera(),
            self.scene.agent_pose().position,
            self.config.visibility.view_distance,
        )
    }

    pub fn positions_from_which_visible(&mut self, object: ObjectId) -> Result<Vec<VisibleFrom>> {
        self.explorer
            .positions_from_which_visible(&self.scene, &self.validator, object)
    }

    pub fn try_translate(&mut self, direction: Vec3, magnitude: f32) -> ActionResult {
        let result = self.validator.can_translate(&self.scene, direction, magnitude);
        self.commit_pose(result)
    }

    pub fn try_rotate(&mut self, delta_yaw: f32) -> ActionResult {
        let result = self.validator.can_rotate(&self.scene, delta_yaw);
        self.commit_pose(result)
    }

    pub fn try_teleport(&mut self, pose: Pose, force: bool) -> ActionResult {
        self.validator.can_teleport(&mut self.scene, pose, force)
    }

    pub fn try_move_hand(&mut self, target: Vec3) -> ActionResult {
        let result = self.validator.can_move_hand(&self.scene, target);
        if let Some(ActionPayload::HeldLocal(local)) = &result.payload {
            if let Err(e) = self.scene.set_held_local(*local) {
                return ActionResult::fail(FailureReason::invalid(e.to_string()));
            }
            self.validator.refresh_rotation_checks(&self.scene);
            log::debug!("AgentController: hand moved to {:?}", target);
        }
        result
    }

    pub fn move_ahead(&mut self) -> ActionResult {
        let direction = self.scene.agent_pose().forward();
        self.try_translate(direction, self.config.agent.move_magnitude)
    }

    pub fn move_back(&mut self) -> ActionResult {
        let direction = -self.scene.agent_pose().forward();
        self.try_translate(direction, self.config.agent.move_magnitude)
    }

    pub fn move_right(&mut self) -> ActionResult {
        let direction = self.scene.agent_pose().right();
        self.try_translate(direction, self.config.agent.move_magnitude)
    }

    pub fn move_left(&mut self) -> ActionResult {
        let direction = -self.scene.agent_pose().right();
        self.try_translate(direction, self.config.agent.move_magnitude)
    }

    /// Turn towards [`Pose::right`] (yaw decreases)
    pub fn rotate_right(&mut self) -> ActionResult {
        self.try_rotate(-self.config.agent.rotate_step)
    }

    pub fn rotate_left(&mut self) -> ActionResult {
        self.try_rotate(self.config.agent.rotate_step)
    }

    pub fn look_up(&mut self) -> ActionResult {
        self.set_horizon(self.scene.agent_pose().horizon - self.config.agent.horizon_step)
    }

    pub fn look_down(&mut self) -> ActionResult {
        self.set_horizon(self.scene.agent_pose().horizon + self.config.agent.horizon_step)
    }

    fn set_horizon(&mut self, horizon: f32) -> ActionResult {
        let agent = &self.config.agent;
        if horizon < agent.min_horizon || horizon > agent.max_horizon {
            return ActionResult::fail(FailureReason::invalid(format!(
                "horizon {horizon} outside [{}, {}]",
                agent.min_horizon, agent.max_horizon
            )));
        }
        let mut pose = *self.scene.agent_pose();
        pose.horizon = horizon;
        self.scene.set_agent_pose(pose);
        ActionResult::ok_with(ActionPayload::Pose(pose))
    }

    pub fn crouch(&mut self) -> ActionResult {
        self.set_stance(Stance::Crouching)
    }

    pub fn stand(&mut self) -> ActionResult {
        self.set_stance(Stance::Standing)
    }

    fn set_stance(&mut self, stance: Stance) -> ActionResult {
        let pose = *self.scene.agent_pose();
        if pose.stance == stance {
            return ActionResult::fail(FailureReason::invalid(format!("already {stance:?}")));
        }
        let pose = pose.with_stance(stance);
        self.scene.set_agent_pose(pose);
        ActionResult::ok_with(ActionPayload::Pose(pose))
    }

    /// Pick up a visible, interactable, pickupable object within reach
    pub fn pickup(&mut self, object: ObjectId) -> ActionResult {
        if self.scene.held().is_some() {
            return ActionResult::fail(FailureReason::invalid("hand is not empty"));
        }
        let pickupable = match self.scene.object(object) {
            Ok(spatial) => spatial.is_pickupable(),
            Err(e) => return ActionResult::fail(FailureReason::invalid(e.to_string())),
        };
        if !pickupable {
            return ActionResult::fail(FailureReason::invalid(format!("{object} is not pickupable")));
        }

        let visibility = match self.is_visible(object, self.config.visibility.view_distance) {
            Ok(visibility) => visibility,
            Err(e) => return ActionResult::fail(FailureReason::invalid(e.to_string())),
        };
        if !visibility.visible || !visibility.interactable {
            return ActionResult::fail(FailureReason::NotInteractable);
        }

        let transform = match self.scene.object_transform(object) {
            Ok(transform) => transform,
            Err(e) => return ActionResult::fail(FailureReason::invalid(e.to_string())),
        };
        if !(transform.translation.distance(self.camera().eye) < self.config.interaction.reach_distance) {
            return ActionResult::fail(FailureReason::OutOfReach);
        }

        let local = self.scene.agent_pose().frame().inverse().mul_transform(&transform);
        if let Err(e) = self.scene.attach_held(object, local) {
            return ActionResult::fail(FailureReason::invalid(e.to_string()));
        }
        self.validator.refresh_rotation_checks(&self.scene);
        ActionResult::ok_with(ActionPayload::HeldLocal(local))
    }

    /// Release the held object; the payload tracks it coming to rest
    pub fn drop_held(&mut self) -> ActionResult {
        let Some(held) = self.scene.detach_held() else {
            return ActionResult::fail(FailureReason::invalid("no object is held"));
        };
        self.validator.refresh_rotation_checks(&self.scene);
        ActionResult::ok_with(ActionPayload::Settle(SettleWatch::new(
            held.object,
            &self.config.settle,
        )))
    }

    pub fn step_physics(&mut self) {
        self.scene.step();
    }

    /// Step the world until `watch` reaches a terminal state
    pub fn wait_until_settled(&mut self, watch: &mut SettleWatch) -> Result<SettleStatus> {
        loop {
            self.scene.step();
            let status = watch.poll(&self.scene)?;
            if status.is_done() {
                return Ok(status);
            }
        }
    }

    /// Remove an object from the scene, releasing it first if held
    pub fn remove_object(&mut self, object: ObjectId) -> Result<()> {
        if self.scene.agent().held_object() == Some(object) {
            self.scene.detach_held();
            self.validator.refresh_rotation_checks(&self.scene);
        }
        self.scene.remove_object(object)?;
        Ok(())
    }

    pub fn object_named(&self, name: &str) -> Result<ObjectId> {
        self.scene
            .object_by_name(name)
            .map(|object| object.id)
            .ok_or_else(|| SceneError::Description(format!("no object named {name:?}")))
    }

    fn commit_pose(&mut self, result: ActionResult) -> ActionResult {
        if let Some(ActionPayload::Pose(pose)) = &result.payload {
            if result.success {
                let pose = *pose;
                self.scene.set_agent_pose(pose);
                log::debug!(
                    "AgentController: agent at {:?} yaw {:.0}",
                    pose.position,
                    pose.yaw
                );
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Transform;
    use crate::world::{ObjectFlags, ObjectSpec};

    fn controller() -> AgentController {
        let config = EngineConfig::default();
        let description = SceneDescription::walled_room(4.0, 4.0, 2.0, &config);
        AgentController::from_description(&description, config).unwrap()
    }

    #[test]
    fn test_move_ahead_commits_pose() {
        let mut c = controller();
        let result = c.move_ahead();
        assert!(result.success);
        assert!((c.pose().position.z - 0.25).abs() < 1e-5);
    }

    #[test]
    fn test_failed_move_leaves_pose() {
        let mut c = controller();
        let before = *c.pose();
        let result = c.try_translate(Vec3::Z, 5.0);
        assert!(!result.success);
        assert_eq!(*c.pose(), before);
    }

    #[test]
    fn test_rotate_right_turns_towards_right() {
        let mut c = controller();
        let right = c.pose().right();
        assert!(c.rotate_right().success);
        assert!((c.pose().forward() - right).length() < 1e-5);
        assert!((c.pose().yaw - 270.0).abs() < 1e-4);
    }

    #[test]
    fn test_horizon_limits() {
        let mut c = controller();
        assert!(c.look_up().success);
        assert!(matches!(
            c.look_up().failure,
            Some(FailureReason::InvalidState(_))
        ));
        assert!(c.look_down().success);
        assert!(c.look_down().success);
        assert!(c.look_down().success);
        assert!(!c.look_down().success);
    }

    #[test]
    fn test_crouch_and_stand() {
        let mut c = controller();
        let standing_eye = c.camera().eye;
        assert!(c.crouch().success);
        assert!(c.camera().eye.y < standing_eye.y);
        assert!(!c.crouch().success);
        assert!(c.stand().success);
    }

    #[test]
    fn test_pickup_and_drop() {
        let mut c = controller();
        let cup = c
            .scene_mut()
            .add_object(
                ObjectSpec::boxed("Cup", Vec3::new(0.0, 0.55, 0.6), Vec3::splat(0.05))
                    .with_flags(ObjectFlags::PICKUPABLE)
                    .dynamic(),
            )
            .unwrap();
        // let the cup rest before picking it up
        c.scene_mut()
            .set_object_transform(cup, &Transform::from_translation(Vec3::new(0.0, 0.55, 0.6)))
            .unwrap();

        let result = c.pickup(cup);
        assert!(result.success, "{:?}", result.failure);
        assert_eq!(c.scene().agent().held_object(), Some(cup));
        assert!(c.validator().rotation_checks().is_some());

        let dropped = c.drop_held();
        let Some(ActionPayload::Settle(mut watch)) = dropped.payload else {
            panic!("expected a settle watch");
        };
        assert!(c.scene().held().is_none());
        let status = c.wait_until_settled(&mut watch).unwrap();
        assert!(status.is_done());
    }

    #[test]
    fn test_pickup_rejects_static_object_flags() {
        let mut c = controller();
        let table = c
            .scene_mut()
            .add_object(ObjectSpec::boxed("Table", Vec3::new(0.0, 0.3, 0.8), Vec3::splat(0.2)))
            .unwrap();
        assert!(matches!(
            c.pickup(table).failure,
            Some(FailureReason::InvalidState(_))
        ));
    }

    #[test]
    fn test_reachable_positions_payload() {
        let mut c = controller();
        let result = c.reachable_positions();
        assert!(result.success);
        match result.payload {
            Some(ActionPayload::Positions(positions)) => assert_eq!(positions.len(), 15 * 15),
            other => panic!("unexpected payload {other:?}"),
        }
    }
}
