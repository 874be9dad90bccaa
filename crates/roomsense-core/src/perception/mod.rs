//! What the agent camera can see

pub mod camera;
pub mod visibility;

pub use camera::Camera;
pub use visibility::{Visibility, VisibilityOracle, VisibleObject, VisibleSet};
