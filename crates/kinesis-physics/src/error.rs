//! Error types for the physics backend.

use thiserror::Error;

/// Errors that can occur while building a physics scene.
#[derive(Error, Debug)]
pub enum PhysicsError {
    /// A collision shape has non-positive or non-finite dimensions.
    #[error("Invalid collision shape {name}: {reason}")]
    InvalidShape {
        /// Shape kind.
        name: &'static str,
        /// Reason for failure.
        reason: String,
    },

    /// The body handle does not refer to a live body.
    #[error("Rigid body not found")]
    UnknownBody,
}

/// Result type for physics scene operations.
pub type Result<T> = std::result::Result<T, PhysicsError>;
