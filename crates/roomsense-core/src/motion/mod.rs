//! Action validation for the agent and its held object

pub mod action;
pub mod rotation_checks;
pub mod validator;

pub use action::{ActionPayload, ActionResult, FailureReason};
pub use rotation_checks::{RotationChecks, RotationVolume};
pub use validator::MotionValidator;
