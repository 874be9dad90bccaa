//! Configuration errors surfaced by scene queries
//!
//! Expected action failures (obstruction, out of reach, ...) are not errors;
//! they travel inside [`crate::ActionResult`]. This type is reserved for
//! scenes that were built wrong.

use thiserror::Error;

use crate::world::ObjectId;

/// Errors for invalid scene configuration or lookups
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SceneError {
    /// No object with this id is registered
    #[error("Unknown object: {0}")]
    UnknownObject(ObjectId),

    /// An object was registered without any visibility points
    #[error("Object {id} ({name}) has no visibility points")]
    NoVisibilityPoints {
        /// The misconfigured object
        id: ObjectId,
        /// Its display name
        name: String,
    },

    /// A collider shape has non-finite or non-positive dimensions
    #[error("Invalid shape: {0}")]
    InvalidShape(String),

    /// The operation needs a held object but the hand is empty
    #[error("No object is held")]
    NothingHeld,

    /// A scene description could not be turned into a scene
    #[error("Scene description error: {0}")]
    Description(String),
}

/// Convenience Result type alias.
pub type Result<T> = std::result::Result<T, SceneError>;
