//! Uniform action outcome and the closed failure taxonomy

use glam::Vec3;
use thiserror::Error;

use crate::entity::Pose;
use crate::math::Transform;
use crate::simulation::SettleWatch;
use crate::world::{ColliderCategory, ColliderRef, ObjectId};

/// Why an action was rejected
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FailureReason {
    #[error("Target {position} lies outside the scene bounds")]
    OutOfBounds { position: Vec3 },

    /// Blocked by a collider; `object` is `None` for room geometry
    #[error("Obstructed by {category:?} collider (object: {object:?})")]
    Obstruction {
        object: Option<ObjectId>,
        category: ColliderCategory,
    },

    #[error("Target is not visible or is occluded")]
    NotInteractable,

    #[error("Target is out of reach")]
    OutOfReach,

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Exploration stopped after {iterations} iterations")]
    SafetyCapExceeded { iterations: usize },
}

impl FailureReason {
    pub fn obstruction(collider: &ColliderRef) -> Self {
        FailureReason::Obstruction {
            object: collider.object,
            category: collider.category,
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        FailureReason::InvalidState(message.into())
    }
}

/// Data returned alongside a successful action
#[derive(Debug, Clone, PartialEq)]
pub enum ActionPayload {
    /// Agent pose after the action
    Pose(Pose),
    /// New held-object offset relative to the agent frame
    HeldLocal(Transform),
    /// World positions (reachable cells)
    Positions(Vec<Vec3>),
    /// Settling tracker for a released object
    Settle(SettleWatch),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActionResult {
    pub success: bool,
    /// Set on failure; on success it carries a soft diagnostic, if any
    pub failure: Option<FailureReason>,
    pub payload: Option<ActionPayload>,
}

impl ActionResult {
    pub fn ok() -> Self {
        Self {
            success: true,
            failure: None,
            payload: None,
        }
    }

    pub fn ok_with(payload: ActionPayload) -> Self {
        Self {
            success: true,
            failure: None,
            payload: Some(payload),
        }
    }

    /// Success that still reports a non-fatal diagnostic
    pub fn partial(diagnostic: FailureReason, payload: ActionPayload) -> Self {
        Self {
            success: true,
            failure: Some(diagnostic),
            payload: Some(payload),
        }
    }

    pub fn fail(reason: FailureReason) -> Self {
        Self {
            success: false,
            failure: Some(reason),
            payload: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn with_payload(mut self, payload: ActionPayload) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn into_result(self) -> std::result::Result<Option<ActionPayload>, FailureReason> {
        match (self.success, self.failure) {
            (false, Some(reason)) => Err(reason),
            (false, None) => Err(FailureReason::invalid("action failed without a reason")),
            (true, _) => Ok(self.payload),
        }
    }
}

impl From<FailureReason> for ActionResult {
    fn from(reason: FailureReason) -> Self {
        ActionResult::fail(reason)
    }
}
